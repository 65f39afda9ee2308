//! Name-keyed registries that dispatch protocol requests to specifications.
//!
//! A registry is what an MCP runtime talks to: it lists definitions and
//! routes `tools/call`, `prompts/get`, `resources/read` and
//! `completion/complete` requests to the matching callback. Entries live in
//! concurrent maps, so a registry can be shared across request tasks and
//! updated while serving.

use crate::{
    callback::{
        complete::{AsyncCompleteSpecification, SyncCompleteSpecification},
        prompt::{AsyncPromptSpecification, SyncPromptSpecification},
        resource::{
            AsyncResourceSpecification, AsyncResourceTemplateSpecification,
            SyncResourceSpecification, SyncResourceTemplateSpecification,
        },
        tool::{AsyncToolSpecification, SyncToolSpecification},
        Flavor,
    },
    error::{McpError, McpResult},
    logging::{log_dispatch, log_registry_replaced},
    protocol::{
        CallToolRequest, CallToolResult, CompleteRequest, CompleteResult, GetPromptRequest,
        GetPromptResult, Prompt, ReadResourceRequest, ReadResourceResult, Resource,
        ResourceTemplate, Tool,
    },
    provider::{AsyncProvider, SyncProvider},
};
use dashmap::DashMap;
use std::sync::Arc;

/// One kind of specification, keyed by name, URI or completion reference.
struct Table<T> {
    kind: &'static str,
    entries: DashMap<String, T>,
}

impl<T: Clone> Table<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
        }
    }

    /// Returns `true` when an existing entry was replaced.
    fn insert(&self, key: String, value: T) -> bool {
        let replaced = self.entries.insert(key.clone(), value).is_some();
        if replaced {
            log_registry_replaced(self.kind, &key);
        }
        replaced
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // Cloned out so no map guard is held while a callback runs.
    fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries sorted by key.
    fn sorted(&self) -> Vec<(String, T)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Registry of blocking specifications.
pub struct SyncRegistry<F> {
    tools: Table<SyncToolSpecification<F>>,
    prompts: Table<SyncPromptSpecification<F>>,
    resources: Table<SyncResourceSpecification<F>>,
    templates: Table<SyncResourceTemplateSpecification<F>>,
    completions: Table<SyncCompleteSpecification<F>>,
}

impl<F: Flavor> Default for SyncRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flavor> SyncRegistry<F> {
    pub fn new() -> Self {
        Self {
            tools: Table::new("tool"),
            prompts: Table::new("prompt"),
            resources: Table::new("resource"),
            templates: Table::new("resource_template"),
            completions: Table::new("completion"),
        }
    }

    /// Register everything `provider` builds.
    pub fn from_provider(provider: &SyncProvider<F>) -> McpResult<Self> {
        let registry = Self::new();
        for spec in provider.tools()? {
            registry.register_tool(spec);
        }
        for spec in provider.prompts()? {
            registry.register_prompt(spec);
        }
        for spec in provider.resources()? {
            registry.register_resource(spec);
        }
        for spec in provider.resource_templates()? {
            registry.register_resource_template(spec);
        }
        for spec in provider.completions()? {
            registry.register_completion(spec);
        }
        Ok(registry)
    }

    pub fn register_tool(&self, spec: SyncToolSpecification<F>) -> bool {
        self.tools.insert(spec.tool.name.clone(), spec)
    }

    pub fn register_prompt(&self, spec: SyncPromptSpecification<F>) -> bool {
        self.prompts.insert(spec.prompt.name.clone(), spec)
    }

    pub fn register_resource(&self, spec: SyncResourceSpecification<F>) -> bool {
        self.resources.insert(spec.resource.uri.clone(), spec)
    }

    pub fn register_resource_template(&self, spec: SyncResourceTemplateSpecification<F>) -> bool {
        self.templates.insert(spec.template.uri_template.clone(), spec)
    }

    pub fn register_completion(&self, spec: SyncCompleteSpecification<F>) -> bool {
        self.completions.insert(spec.reference.key(), spec)
    }

    pub fn remove_tool(&self, name: &str) -> bool {
        self.tools.remove(name)
    }

    pub fn remove_prompt(&self, name: &str) -> bool {
        self.prompts.remove(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.sorted().into_iter().map(|(_, s)| s.tool).collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.sorted().into_iter().map(|(_, s)| s.prompt).collect()
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.sorted().into_iter().map(|(_, s)| s.resource).collect()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.sorted().into_iter().map(|(_, s)| s.template).collect()
    }

    pub fn call_tool(
        &self,
        context: &F::Context,
        request: impl Into<Arc<CallToolRequest>>,
    ) -> McpResult<CallToolResult> {
        let request = request.into();
        log_dispatch("tool", &request.name);
        let spec = self
            .tools
            .get(&request.name)
            .ok_or_else(|| McpError::UnknownTool(request.name.clone()))?;
        spec.call(context, request)
    }

    pub fn get_prompt(
        &self,
        context: &F::Context,
        request: impl Into<Arc<GetPromptRequest>>,
    ) -> McpResult<GetPromptResult> {
        let request = request.into();
        log_dispatch("prompt", &request.name);
        let spec = self
            .prompts
            .get(&request.name)
            .ok_or_else(|| McpError::UnknownPrompt(request.name.clone()))?;
        spec.callback.call(context, request)
    }

    /// Exact URIs are tried before templates.
    pub fn read_resource(
        &self,
        context: &F::Context,
        request: impl Into<Arc<ReadResourceRequest>>,
    ) -> McpResult<ReadResourceResult> {
        let request = request.into();
        log_dispatch("resource", &request.uri);
        if let Some(spec) = self.resources.get(&request.uri) {
            return spec.callback.call(context, request);
        }
        let spec = self
            .templates
            .sorted()
            .into_iter()
            .map(|(_, spec)| spec)
            .find(|spec| spec.callback.template().matches(&request.uri))
            .ok_or_else(|| McpError::UnknownResource(request.uri.clone()))?;
        spec.callback.call(context, request)
    }

    pub fn complete(
        &self,
        context: &F::Context,
        request: impl Into<Arc<CompleteRequest>>,
    ) -> McpResult<CompleteResult> {
        let request = request.into();
        let key = request.reference.key();
        log_dispatch("completion", &key);
        let spec = self
            .completions
            .get(&key)
            .ok_or(McpError::UnknownCompletion(key))?;
        spec.callback.call(context, request)
    }
}

/// Registry of asynchronous specifications.
///
/// Calls resolve to `None` when a stream method completed without a value.
pub struct AsyncRegistry<F> {
    tools: Table<AsyncToolSpecification<F>>,
    prompts: Table<AsyncPromptSpecification<F>>,
    resources: Table<AsyncResourceSpecification<F>>,
    templates: Table<AsyncResourceTemplateSpecification<F>>,
    completions: Table<AsyncCompleteSpecification<F>>,
}

impl<F: Flavor> Default for AsyncRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flavor> AsyncRegistry<F> {
    pub fn new() -> Self {
        Self {
            tools: Table::new("tool"),
            prompts: Table::new("prompt"),
            resources: Table::new("resource"),
            templates: Table::new("resource_template"),
            completions: Table::new("completion"),
        }
    }

    pub fn from_provider(provider: &AsyncProvider<F>) -> McpResult<Self> {
        let registry = Self::new();
        for spec in provider.tools()? {
            registry.register_tool(spec);
        }
        for spec in provider.prompts()? {
            registry.register_prompt(spec);
        }
        for spec in provider.resources()? {
            registry.register_resource(spec);
        }
        for spec in provider.resource_templates()? {
            registry.register_resource_template(spec);
        }
        for spec in provider.completions()? {
            registry.register_completion(spec);
        }
        Ok(registry)
    }

    pub fn register_tool(&self, spec: AsyncToolSpecification<F>) -> bool {
        self.tools.insert(spec.tool.name.clone(), spec)
    }

    pub fn register_prompt(&self, spec: AsyncPromptSpecification<F>) -> bool {
        self.prompts.insert(spec.prompt.name.clone(), spec)
    }

    pub fn register_resource(&self, spec: AsyncResourceSpecification<F>) -> bool {
        self.resources.insert(spec.resource.uri.clone(), spec)
    }

    pub fn register_resource_template(
        &self,
        spec: AsyncResourceTemplateSpecification<F>,
    ) -> bool {
        self.templates.insert(spec.template.uri_template.clone(), spec)
    }

    pub fn register_completion(&self, spec: AsyncCompleteSpecification<F>) -> bool {
        self.completions.insert(spec.reference.key(), spec)
    }

    pub fn remove_tool(&self, name: &str) -> bool {
        self.tools.remove(name)
    }

    pub fn remove_prompt(&self, name: &str) -> bool {
        self.prompts.remove(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.sorted().into_iter().map(|(_, s)| s.tool).collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.sorted().into_iter().map(|(_, s)| s.prompt).collect()
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.sorted().into_iter().map(|(_, s)| s.resource).collect()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.sorted().into_iter().map(|(_, s)| s.template).collect()
    }

    pub async fn call_tool(
        &self,
        context: &F::Context,
        request: impl Into<Arc<CallToolRequest>>,
    ) -> McpResult<Option<CallToolResult>> {
        let request = request.into();
        log_dispatch("tool", &request.name);
        let spec = self
            .tools
            .get(&request.name)
            .ok_or_else(|| McpError::UnknownTool(request.name.clone()))?;
        spec.call(context, request).await
    }

    pub async fn get_prompt(
        &self,
        context: &F::Context,
        request: impl Into<Arc<GetPromptRequest>>,
    ) -> McpResult<Option<GetPromptResult>> {
        let request = request.into();
        log_dispatch("prompt", &request.name);
        let spec = self
            .prompts
            .get(&request.name)
            .ok_or_else(|| McpError::UnknownPrompt(request.name.clone()))?;
        spec.callback.call(context, request).await
    }

    pub async fn read_resource(
        &self,
        context: &F::Context,
        request: impl Into<Arc<ReadResourceRequest>>,
    ) -> McpResult<Option<ReadResourceResult>> {
        let request = request.into();
        log_dispatch("resource", &request.uri);
        if let Some(spec) = self.resources.get(&request.uri) {
            return spec.callback.call(context, request).await;
        }
        let spec = self
            .templates
            .sorted()
            .into_iter()
            .map(|(_, spec)| spec)
            .find(|spec| spec.callback.template().matches(&request.uri))
            .ok_or_else(|| McpError::UnknownResource(request.uri.clone()))?;
        spec.callback.call(context, request).await
    }

    pub async fn complete(
        &self,
        context: &F::Context,
        request: impl Into<Arc<CompleteRequest>>,
    ) -> McpResult<Option<CompleteResult>> {
        let request = request.into();
        let key = request.reference.key();
        log_dispatch("completion", &key);
        let spec = self
            .completions
            .get(&key)
            .ok_or(McpError::UnknownCompletion(key))?;
        spec.callback.call(context, request).await
    }
}
