//! Tool callbacks and specifications.

use super::{check_flavor, error_message, ErrorFilter, Flavor};
use crate::{
    binding::BindingPlan,
    error::{McpError, McpResult},
    logging::{log_invocation_error, log_specification_built},
    method::{AsyncInvoke, Method, SyncInvoke},
    protocol::{CallToolRequest, CallToolResult, JsonObject, Tool, ToolAnnotations},
    returns::{output_schema_for, pass_through, ReturnMode, Returns},
};
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, marker::PhantomData, sync::Arc};

/// Declarative attributes of a tool method.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMarker {
    /// Overrides the method name when non-blank
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub annotations: Option<ToolAnnotations>,
    /// Allow an output schema to be generated for the result type
    pub output_schema: bool,
    /// Tool group the method belongs to
    pub group: Option<String>,
}

impl Default for ToolMarker {
    fn default() -> Self {
        Self {
            name: None,
            title: None,
            description: None,
            annotations: None,
            output_schema: true,
            group: None,
        }
    }
}

impl ToolMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub fn without_output_schema(mut self) -> Self {
        self.output_schema = false;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The marker's name if non-blank, otherwise the method's own name.
    pub fn effective_name(&self, method_name: &str) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => method_name.to_string(),
        }
    }
}

/// What a tool method produced, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReturn {
    /// Already a tool result; passed through untouched
    Result(CallToolResult),
    /// Any other serializable value
    Value(Value),
}

impl ToolReturn {
    pub fn from_output<T: Serialize + 'static>(value: T) -> anyhow::Result<Self> {
        match pass_through::<T, CallToolResult>(value) {
            Ok(result) => Ok(Self::Result(result)),
            Err(value) => Ok(Self::Value(serde_json::to_value(&value)?)),
        }
    }

    /// Return description for a tool method producing `T`.
    pub fn returns<T>() -> Returns<T, ToolReturn>
    where
        T: Serialize + JsonSchema + 'static,
    {
        Returns::new::<CallToolResult>(output_schema_for::<T>, Self::from_output::<T>)
    }
}

/// Turn a method's raw result into a tool result envelope.
pub fn normalize(returned: ToolReturn, mode: ReturnMode) -> anyhow::Result<CallToolResult> {
    let value = match returned {
        ToolReturn::Result(result) => return Ok(result),
        ToolReturn::Value(value) => value,
    };
    match mode {
        ReturnMode::Void => Ok(CallToolResult::text("Done")),
        ReturnMode::Structured => {
            let structured: JsonObject = serde_json::from_value(value)?;
            Ok(CallToolResult::structured(structured))
        }
        ReturnMode::Text => Ok(CallToolResult::text(match value {
            Value::String(text) => text,
            other => other.to_string(),
        })),
    }
}

fn recover(
    method: &str,
    filter: &ErrorFilter,
    err: anyhow::Error,
) -> McpResult<CallToolResult> {
    if filter.catches(&err) {
        log_invocation_error("tool", method, &err);
        Ok(CallToolResult::error(error_message(&err)))
    } else {
        Err(McpError::from_anyhow(err))
    }
}

fn output_schema<O>(
    marker: &ToolMarker,
    method: &Method<CallToolRequest, O>,
    enabled: bool,
) -> Option<Value> {
    let returns = method.returns();
    if !enabled || !marker.output_schema || returns.passthrough || returns.is_void() {
        return None;
    }
    method.output_schema()
}

fn definition(
    name: String,
    marker: &ToolMarker,
    plan: &BindingPlan,
    output_schema: Option<Value>,
) -> Tool {
    Tool {
        name,
        title: marker.title.clone(),
        description: marker.description.clone(),
        input_schema: plan.input_schema(),
        output_schema,
        annotations: marker.annotations.clone(),
    }
}

/// Blocking tool callback.
pub struct SyncToolCallback<F> {
    plan: Arc<BindingPlan>,
    mode: ReturnMode,
    invoke: SyncInvoke<CallToolRequest, ToolReturn>,
    error_filter: ErrorFilter,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> SyncToolCallback<F> {
    pub fn new(
        method: &Method<CallToolRequest, ToolReturn>,
        mode: ReturnMode,
        error_filter: ErrorFilter,
    ) -> McpResult<Self> {
        let plan = method.plan()?;
        check_flavor::<F>(&plan)?;
        let invoke = method.sync_body().ok_or_else(|| {
            McpError::invalid_signature(
                method.name(),
                "an asynchronous method cannot back a synchronous tool",
            )
        })?;
        Ok(Self {
            plan: Arc::new(plan),
            mode,
            invoke,
            error_filter,
            _flavor: PhantomData,
        })
    }

    pub fn mode(&self) -> ReturnMode {
        self.mode
    }

    pub fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    /// Invoke the tool. Errors caught by the filter become error envelopes.
    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CallToolRequest>,
    ) -> McpResult<CallToolResult> {
        let call_context = F::call_context(context);
        let outcome = self
            .plan
            .bind(&request, &call_context, &request.arguments)
            .map_err(anyhow::Error::from)
            .and_then(|slots| (self.invoke)(slots))
            .and_then(|returned| normalize(returned, self.mode));

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => recover(self.plan.method(), &self.error_filter, err),
        }
    }
}

/// Tool callback whose method returns a future or a stream.
pub struct AsyncToolCallback<F> {
    plan: Arc<BindingPlan>,
    mode: ReturnMode,
    invoke: AsyncInvoke<CallToolRequest, ToolReturn>,
    error_filter: ErrorFilter,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> AsyncToolCallback<F> {
    pub fn new(
        method: &Method<CallToolRequest, ToolReturn>,
        mode: ReturnMode,
        error_filter: ErrorFilter,
    ) -> McpResult<Self> {
        let plan = method.plan()?;
        check_flavor::<F>(&plan)?;
        let invoke = method.async_body().ok_or_else(|| {
            McpError::invalid_signature(
                method.name(),
                "a synchronous method cannot back an asynchronous tool",
            )
        })?;
        Ok(Self {
            plan: Arc::new(plan),
            mode,
            invoke,
            error_filter,
            _flavor: PhantomData,
        })
    }

    pub fn mode(&self) -> ReturnMode {
        self.mode
    }

    pub fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    /// Invoke the tool.
    ///
    /// Resolves to `None` when a stream method completes without emitting,
    /// unless the tool is void, in which case completion means "Done".
    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CallToolRequest>,
    ) -> BoxFuture<'static, McpResult<Option<CallToolResult>>> {
        let call_context = F::call_context(context);
        let bound = self.plan.bind(&request, &call_context, &request.arguments);
        let invoke = Arc::clone(&self.invoke);
        let plan = Arc::clone(&self.plan);
        let filter = self.error_filter.clone();
        let mode = self.mode;

        Box::pin(async move {
            let outcome = match bound {
                Ok(slots) => invoke(slots).await,
                Err(err) => Err(err.into()),
            };
            let outcome = outcome.and_then(|returned| match returned {
                Some(returned) => normalize(returned, mode).map(Some),
                None if mode == ReturnMode::Void => Ok(Some(CallToolResult::text("Done"))),
                None => Ok(None),
            });

            match outcome {
                Ok(result) => Ok(result),
                Err(err) => recover(plan.method(), &filter, err).map(Some),
            }
        })
    }
}

/// A tool definition paired with its blocking callback.
pub struct SyncToolSpecification<F> {
    pub tool: Tool,
    pub callback: Arc<SyncToolCallback<F>>,
}

/// A tool definition paired with its asynchronous callback.
pub struct AsyncToolSpecification<F> {
    pub tool: Tool,
    pub callback: Arc<AsyncToolCallback<F>>,
}

impl<F: Flavor> SyncToolSpecification<F> {
    /// Build a specification, publishing the tool under `name`.
    pub fn build(
        name: impl Into<String>,
        marker: &ToolMarker,
        method: &Method<CallToolRequest, ToolReturn>,
        generate_output_schema: bool,
        error_filter: ErrorFilter,
    ) -> McpResult<Self> {
        let schema = output_schema(marker, method, generate_output_schema);
        let mode = ReturnMode::derive(method.returns(), schema.as_ref());
        let callback = SyncToolCallback::<F>::new(method, mode, error_filter)?;
        let tool = definition(name.into(), marker, callback.plan(), schema);
        log_specification_built("tool", &tool.name, F::NAME);
        Ok(Self {
            tool,
            callback: Arc::new(callback),
        })
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CallToolRequest>,
    ) -> McpResult<CallToolResult> {
        self.callback.call(context, request)
    }
}

impl<F: Flavor> AsyncToolSpecification<F> {
    pub fn build(
        name: impl Into<String>,
        marker: &ToolMarker,
        method: &Method<CallToolRequest, ToolReturn>,
        generate_output_schema: bool,
        error_filter: ErrorFilter,
    ) -> McpResult<Self> {
        let schema = output_schema(marker, method, generate_output_schema);
        let mode = ReturnMode::derive(method.returns(), schema.as_ref());
        let callback = AsyncToolCallback::<F>::new(method, mode, error_filter)?;
        let tool = definition(name.into(), marker, callback.plan(), schema);
        log_specification_built("tool", &tool.name, F::NAME);
        Ok(Self {
            tool,
            callback: Arc::new(callback),
        })
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CallToolRequest>,
    ) -> BoxFuture<'static, McpResult<Option<CallToolResult>>> {
        self.callback.call(context, request)
    }
}

impl<F> Clone for SyncToolSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            tool: self.tool.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> Clone for AsyncToolSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            tool: self.tool.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> fmt::Debug for SyncToolSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncToolSpecification")
            .field("tool", &self.tool)
            .field("mode", &self.callback.mode)
            .finish()
    }
}

impl<F> fmt::Debug for AsyncToolSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncToolSpecification")
            .field("tool", &self.tool)
            .field("mode", &self.callback.mode)
            .finish()
    }
}
