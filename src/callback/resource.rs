//! Resource callbacks and specifications.
//!
//! A resource method is bound to a URI template. The template's variables
//! form the argument map, so every variable must correspond to exactly one
//! declared argument of the same name. A template without variables is a
//! fixed resource and takes no arguments.

use super::{AsyncInvoker, Flavor, SyncInvoker};
use crate::{
    binding::{schema::coerce_text_arguments, BindingPlan, Param},
    error::{McpError, McpResult},
    logging::log_specification_built,
    method::Method,
    protocol::{
        JsonObject, ReadResourceRequest, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate,
    },
    returns::{no_schema, Returns},
    uri_template::UriTemplate,
};
use futures_util::future::BoxFuture;
use std::{collections::BTreeSet, fmt, marker::PhantomData, sync::Arc};

/// Whether plain strings returned by a resource method are text or base64 blobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourceKind {
    #[default]
    Text,
    Blob,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMarker {
    pub uri: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub kind: ResourceKind,
}

impl ResourceMarker {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
            title: None,
            description: None,
            mime_type: None,
            kind: ResourceKind::Text,
        }
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

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn blob(mut self) -> Self {
        self.kind = ResourceKind::Blob;
        self
    }

    pub fn effective_name(&self, method_name: &str) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => method_name.to_string(),
        }
    }
}

/// What a resource method produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceReturn {
    Result(ReadResourceResult),
    Contents(Vec<ResourceContents>),
    Texts(Vec<String>),
}

pub trait IntoResourceReturn: Send + 'static {
    fn into_resource_return(self) -> ResourceReturn;
}

impl IntoResourceReturn for ReadResourceResult {
    fn into_resource_return(self) -> ResourceReturn {
        ResourceReturn::Result(self)
    }
}

impl IntoResourceReturn for Vec<ResourceContents> {
    fn into_resource_return(self) -> ResourceReturn {
        ResourceReturn::Contents(self)
    }
}

impl IntoResourceReturn for ResourceContents {
    fn into_resource_return(self) -> ResourceReturn {
        ResourceReturn::Contents(vec![self])
    }
}

impl IntoResourceReturn for String {
    fn into_resource_return(self) -> ResourceReturn {
        ResourceReturn::Texts(vec![self])
    }
}

impl IntoResourceReturn for Vec<String> {
    fn into_resource_return(self) -> ResourceReturn {
        ResourceReturn::Texts(self)
    }
}

impl ResourceReturn {
    pub fn returns<T: IntoResourceReturn>() -> Returns<T, ResourceReturn> {
        Returns::new::<ReadResourceResult>(no_schema, |value: T| Ok(value.into_resource_return()))
    }
}

/// Template, MIME type and content kind of one bound resource.
#[derive(Debug, Clone)]
struct ResourceBinding {
    template: UriTemplate,
    params: Vec<Param>,
    mime_type: Option<String>,
    kind: ResourceKind,
}

impl ResourceBinding {
    fn new(marker: &ResourceMarker, plan: &BindingPlan) -> McpResult<Self> {
        let template = UriTemplate::parse(&marker.uri)?;
        let expected: BTreeSet<&str> = template.variables().iter().map(String::as_str).collect();
        let found: BTreeSet<&str> = plan.argument_names().into_iter().collect();
        if expected != found {
            return Err(McpError::UriVariableMismatch {
                method: plan.method().to_string(),
                template: marker.uri.clone(),
                expected: template.variables().to_vec(),
                found: plan.argument_names().iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(Self {
            template,
            params: plan.params().to_vec(),
            mime_type: marker.mime_type.clone(),
            kind: marker.kind,
        })
    }

    /// Template variables of `uri`, typed after the declared arguments.
    fn arguments(&self, uri: &str) -> McpResult<JsonObject> {
        let mut arguments = self
            .template
            .extract(uri)
            .ok_or_else(|| McpError::UriMismatch {
                uri: uri.to_string(),
                template: self.template.to_string(),
            })?;
        coerce_text_arguments(&self.params, &mut arguments);
        Ok(arguments)
    }

    fn finish(&self, uri: &str, returned: ResourceReturn) -> ReadResourceResult {
        match returned {
            ResourceReturn::Result(result) => result,
            ResourceReturn::Contents(contents) => ReadResourceResult::new(contents),
            ResourceReturn::Texts(texts) => ReadResourceResult::new(
                texts
                    .into_iter()
                    .map(|text| match self.kind {
                        ResourceKind::Text => {
                            ResourceContents::text(uri, self.mime_type.clone(), text)
                        }
                        ResourceKind::Blob => {
                            ResourceContents::blob(uri, self.mime_type.clone(), text)
                        }
                    })
                    .collect(),
            ),
        }
    }
}

fn invocation_error(method: &str, source: anyhow::Error) -> McpError {
    McpError::Invocation {
        kind: "resource",
        method: method.to_string(),
        source,
    }
}

pub struct SyncResourceCallback<F> {
    inner: SyncInvoker<ReadResourceRequest, ResourceReturn>,
    binding: ResourceBinding,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> SyncResourceCallback<F> {
    pub fn new(
        marker: &ResourceMarker,
        method: &Method<ReadResourceRequest, ResourceReturn>,
    ) -> McpResult<Self> {
        let inner = SyncInvoker::new(method, F::STATELESS, "resource")?;
        let binding = ResourceBinding::new(marker, inner.plan())?;
        Ok(Self {
            inner,
            binding,
            _flavor: PhantomData,
        })
    }

    pub fn template(&self) -> &UriTemplate {
        &self.binding.template
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<ReadResourceRequest>,
    ) -> McpResult<ReadResourceResult> {
        let arguments = self.binding.arguments(&request.uri)?;
        self.inner
            .invoke(&F::call_context(context), &request, &arguments)
            .map(|returned| self.binding.finish(&request.uri, returned))
            .map_err(|err| invocation_error(self.inner.plan().method(), err))
    }
}

pub struct AsyncResourceCallback<F> {
    inner: AsyncInvoker<ReadResourceRequest, ResourceReturn>,
    binding: Arc<ResourceBinding>,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> AsyncResourceCallback<F> {
    pub fn new(
        marker: &ResourceMarker,
        method: &Method<ReadResourceRequest, ResourceReturn>,
    ) -> McpResult<Self> {
        let inner = AsyncInvoker::new(method, F::STATELESS, "resource")?;
        let binding = ResourceBinding::new(marker, inner.plan())?;
        Ok(Self {
            inner,
            binding: Arc::new(binding),
            _flavor: PhantomData,
        })
    }

    pub fn template(&self) -> &UriTemplate {
        &self.binding.template
    }

    /// Resolves to `None` when a stream method completes empty.
    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<ReadResourceRequest>,
    ) -> BoxFuture<'static, McpResult<Option<ReadResourceResult>>> {
        let arguments = match self.binding.arguments(&request.uri) {
            Ok(arguments) => arguments,
            Err(err) => return Box::pin(futures_util::future::ready(Err(err))),
        };
        let pending = self
            .inner
            .invoke(&F::call_context(context), &request, &arguments);
        let binding = Arc::clone(&self.binding);
        let method = self.inner.plan().method().to_string();
        Box::pin(async move {
            match pending.await {
                Ok(returned) => Ok(returned.map(|r| binding.finish(&request.uri, r))),
                Err(err) => Err(invocation_error(&method, err)),
            }
        })
    }
}

fn resource(name: String, marker: &ResourceMarker) -> Resource {
    Resource {
        uri: marker.uri.clone(),
        name,
        title: marker.title.clone(),
        description: marker.description.clone(),
        mime_type: marker.mime_type.clone(),
    }
}

fn resource_template(name: String, marker: &ResourceMarker) -> ResourceTemplate {
    ResourceTemplate {
        uri_template: marker.uri.clone(),
        name,
        title: marker.title.clone(),
        description: marker.description.clone(),
        mime_type: marker.mime_type.clone(),
    }
}

/// A fixed-URI resource and its blocking callback.
pub struct SyncResourceSpecification<F> {
    pub resource: Resource,
    pub callback: Arc<SyncResourceCallback<F>>,
}

/// A templated resource and its blocking callback.
pub struct SyncResourceTemplateSpecification<F> {
    pub template: ResourceTemplate,
    pub callback: Arc<SyncResourceCallback<F>>,
}

pub struct AsyncResourceSpecification<F> {
    pub resource: Resource,
    pub callback: Arc<AsyncResourceCallback<F>>,
}

pub struct AsyncResourceTemplateSpecification<F> {
    pub template: ResourceTemplate,
    pub callback: Arc<AsyncResourceCallback<F>>,
}

/// Either kind of blocking resource specification.
pub enum SyncResourceEntry<F> {
    Fixed(SyncResourceSpecification<F>),
    Template(SyncResourceTemplateSpecification<F>),
}

/// Either kind of asynchronous resource specification.
pub enum AsyncResourceEntry<F> {
    Fixed(AsyncResourceSpecification<F>),
    Template(AsyncResourceTemplateSpecification<F>),
}

impl<F: Flavor> SyncResourceEntry<F> {
    /// Build a fixed or templated specification depending on the marker's URI.
    pub fn build(
        marker: &ResourceMarker,
        method: &Method<ReadResourceRequest, ResourceReturn>,
    ) -> McpResult<Self> {
        let callback = Arc::new(SyncResourceCallback::<F>::new(marker, method)?);
        let name = marker.effective_name(method.name());
        log_specification_built("resource", &marker.uri, F::NAME);
        Ok(if callback.template().is_static() {
            Self::Fixed(SyncResourceSpecification {
                resource: resource(name, marker),
                callback,
            })
        } else {
            Self::Template(SyncResourceTemplateSpecification {
                template: resource_template(name, marker),
                callback,
            })
        })
    }
}

impl<F: Flavor> AsyncResourceEntry<F> {
    pub fn build(
        marker: &ResourceMarker,
        method: &Method<ReadResourceRequest, ResourceReturn>,
    ) -> McpResult<Self> {
        let callback = Arc::new(AsyncResourceCallback::<F>::new(marker, method)?);
        let name = marker.effective_name(method.name());
        log_specification_built("resource", &marker.uri, F::NAME);
        Ok(if callback.template().is_static() {
            Self::Fixed(AsyncResourceSpecification {
                resource: resource(name, marker),
                callback,
            })
        } else {
            Self::Template(AsyncResourceTemplateSpecification {
                template: resource_template(name, marker),
                callback,
            })
        })
    }
}

macro_rules! impl_spec_clone {
    ($($spec:ident { $field:ident }),* $(,)?) => {
        $(
            impl<F> Clone for $spec<F> {
                fn clone(&self) -> Self {
                    Self {
                        $field: self.$field.clone(),
                        callback: Arc::clone(&self.callback),
                    }
                }
            }
        )*
    };
}

impl_spec_clone!(
    SyncResourceSpecification { resource },
    SyncResourceTemplateSpecification { template },
    AsyncResourceSpecification { resource },
    AsyncResourceTemplateSpecification { template },
);

macro_rules! impl_spec_debug {
    ($($spec:ident { $field:ident }),* $(,)?) => {
        $(
            impl<F> fmt::Debug for $spec<F> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($spec))
                        .field(stringify!($field), &self.$field)
                        .finish_non_exhaustive()
                }
            }
        )*
    };
}

impl_spec_debug!(
    SyncResourceSpecification { resource },
    SyncResourceTemplateSpecification { template },
    AsyncResourceSpecification { resource },
    AsyncResourceTemplateSpecification { template },
);

impl<F> fmt::Debug for SyncResourceEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(spec) => f.debug_tuple("Fixed").field(spec).finish(),
            Self::Template(spec) => f.debug_tuple("Template").field(spec).finish(),
        }
    }
}

impl<F> fmt::Debug for AsyncResourceEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(spec) => f.debug_tuple("Fixed").field(spec).finish(),
            Self::Template(spec) => f.debug_tuple("Template").field(spec).finish(),
        }
    }
}
