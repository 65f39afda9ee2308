//! Server-side providers for tools, prompts, resources and completions.

use super::{finish, Accepts, Names, Scan};
use crate::{
    callback::{
        complete::{AsyncCompleteSpecification, SyncCompleteSpecification},
        prompt::{AsyncPromptSpecification, SyncPromptSpecification},
        resource::{
            AsyncResourceEntry, AsyncResourceSpecification, AsyncResourceTemplateSpecification,
            SyncResourceEntry, SyncResourceSpecification, SyncResourceTemplateSpecification,
        },
        tool::{AsyncToolSpecification, SyncToolSpecification},
        ErrorFilter, Flavor, Stateful, Stateless,
    },
    component::{McpComponent, Methods},
    error::McpResult,
    options::ProviderOptions,
};
use std::{marker::PhantomData, sync::Arc};

macro_rules! server_provider {
    (
        $(#[$doc:meta])*
        $provider:ident {
            asynchronous: $asynchronous:expr,
            tool: $tool:ident,
            prompt: $prompt:ident,
            entry: $entry:ident,
            resource: $resource:ident,
            template: $template:ident,
            complete: $complete:ident $(,)?
        }
    ) => {
        $(#[$doc])*
        pub struct $provider<F> {
            scan: Scan,
            error_filter: ErrorFilter,
            _flavor: PhantomData<fn() -> F>,
        }

        impl<F: Flavor> $provider<F> {
            /// Collect the method tables of `components`.
            pub fn new(components: Vec<Arc<dyn McpComponent>>) -> Self {
                Self {
                    scan: Scan::new(&components),
                    error_filter: ErrorFilter::default(),
                    _flavor: PhantomData,
                }
            }

            pub fn with_options(mut self, options: ProviderOptions) -> Self {
                self.scan.set_options(options);
                self
            }

            /// Decide which tool errors become error envelopes.
            pub fn with_error_filter(mut self, error_filter: ErrorFilter) -> Self {
                self.error_filter = error_filter;
                self
            }

            /// Publish only tools in `groups`, named `{group}{separator}{name}`.
            ///
            /// Fails when a component does not implement every group.
            pub fn with_groups<I, S>(mut self, groups: I) -> McpResult<Self>
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.scan
                    .set_groups(groups.into_iter().map(Into::into).collect())?;
                Ok(self)
            }

            pub fn options(&self) -> &ProviderOptions {
                self.scan.options()
            }

            fn accepts() -> Accepts {
                Accepts {
                    asynchronous: $asynchronous,
                    sessionless: F::STATELESS,
                }
            }

            pub fn tools(&self) -> McpResult<Vec<$tool<F>>> {
                let options = self.scan.options();
                let mut names = Names::new("tool", options);
                let mut specs = Vec::new();
                for found in self.scan.eligible(Self::accepts(), Methods::tools)? {
                    let Some(name) = self.scan.tool_name(&found) else {
                        continue;
                    };
                    if !names.admit(&name) {
                        continue;
                    }
                    specs.push($tool::<F>::build(
                        name,
                        found.marker,
                        found.method,
                        options.generate_output_schema,
                        self.error_filter.clone(),
                    )?);
                }
                Ok(finish("tool", self.scan.component_count(), specs))
            }

            pub fn prompts(&self) -> McpResult<Vec<$prompt<F>>> {
                let mut names = Names::new("prompt", self.scan.options());
                let mut specs = Vec::new();
                for found in self.scan.eligible(Self::accepts(), Methods::prompts)? {
                    let spec = $prompt::<F>::build(found.marker, found.method)?;
                    if names.admit(&spec.prompt.name) {
                        specs.push(spec);
                    }
                }
                Ok(finish("prompt", self.scan.component_count(), specs))
            }

            fn resource_entries(&self) -> McpResult<Vec<$entry<F>>> {
                let mut names = Names::new("resource", self.scan.options());
                let mut entries = Vec::new();
                for found in self.scan.eligible(Self::accepts(), Methods::resources)? {
                    if names.admit(&found.marker.uri) {
                        entries.push($entry::<F>::build(found.marker, found.method)?);
                    }
                }
                Ok(entries)
            }

            /// Resources with a fixed URI.
            pub fn resources(&self) -> McpResult<Vec<$resource<F>>> {
                let specs = self
                    .resource_entries()?
                    .into_iter()
                    .filter_map(|entry| match entry {
                        $entry::Fixed(spec) => Some(spec),
                        $entry::Template(_) => None,
                    })
                    .collect();
                Ok(finish("resource", self.scan.component_count(), specs))
            }

            /// Resources addressed by a URI template with variables.
            pub fn resource_templates(&self) -> McpResult<Vec<$template<F>>> {
                let specs = self
                    .resource_entries()?
                    .into_iter()
                    .filter_map(|entry| match entry {
                        $entry::Template(spec) => Some(spec),
                        $entry::Fixed(_) => None,
                    })
                    .collect();
                Ok(finish("resource_template", self.scan.component_count(), specs))
            }

            pub fn completions(&self) -> McpResult<Vec<$complete<F>>> {
                let max_values = self.scan.options().max_completion_values;
                let mut names = Names::new("completion", self.scan.options());
                let mut specs = Vec::new();
                for found in self.scan.eligible(Self::accepts(), Methods::completions)? {
                    if names.admit(&found.marker.reference.key()) {
                        specs.push($complete::<F>::build(found.marker, found.method, max_values)?);
                    }
                }
                Ok(finish("completion", self.scan.component_count(), specs))
            }
        }
    };
}

server_provider!(
    /// Builds blocking specifications from synchronous methods.
    SyncProvider {
        asynchronous: false,
        tool: SyncToolSpecification,
        prompt: SyncPromptSpecification,
        entry: SyncResourceEntry,
        resource: SyncResourceSpecification,
        template: SyncResourceTemplateSpecification,
        complete: SyncCompleteSpecification,
    }
);

server_provider!(
    /// Builds asynchronous specifications from future and stream methods.
    AsyncProvider {
        asynchronous: true,
        tool: AsyncToolSpecification,
        prompt: AsyncPromptSpecification,
        entry: AsyncResourceEntry,
        resource: AsyncResourceSpecification,
        template: AsyncResourceTemplateSpecification,
        complete: AsyncCompleteSpecification,
    }
);

pub type StatefulSyncProvider = SyncProvider<Stateful>;
pub type StatelessSyncProvider = SyncProvider<Stateless>;
pub type StatefulAsyncProvider = AsyncProvider<Stateful>;
pub type StatelessAsyncProvider = AsyncProvider<Stateless>;
