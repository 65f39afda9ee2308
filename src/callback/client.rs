//! Client-side callbacks: handlers for requests and notifications a server
//! sends to the client.
//!
//! Client handlers have no session to bind, so exchange and request-context
//! extractors are rejected when the specification is built. Named arguments
//! are read from the incoming message's own serialized fields.

use super::{AsyncInvoker, SyncInvoker};
use crate::{
    binding::BindingPlan,
    context::{CallContext, StructuredElicitResult},
    error::{McpError, McpResult},
    logging::log_specification_built,
    method::Method,
    protocol::{
        CreateMessageRequest, CreateMessageResult, ElicitAction, ElicitRequest, ElicitResult,
        JsonObject, LoggingMessageNotification, McpRequest, ProgressNotification,
        PromptsChanged, ResourcesChanged, ToolsChanged,
    },
    returns::{no_schema, Returns},
};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Restricts a client handler to the named client connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMarker {
    /// Empty means every client
    pub clients: Vec<String>,
}

impl ClientMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clients<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clients: clients.into_iter().map(Into::into).collect(),
        }
    }

    pub fn applies_to(&self, client: &str) -> bool {
        self.clients.is_empty() || self.clients.iter().any(|c| c == client)
    }
}

/// A message a client handler can receive, and what the handler answers.
pub trait ClientRequest: McpRequest + Serialize {
    type Response: Send + 'static;

    const KIND: &'static str;
}

impl ClientRequest for ElicitRequest {
    type Response = ElicitResult;
    const KIND: &'static str = "elicitation";
}

impl ClientRequest for CreateMessageRequest {
    type Response = CreateMessageResult;
    const KIND: &'static str = "sampling";
}

impl ClientRequest for LoggingMessageNotification {
    type Response = ();
    const KIND: &'static str = "logging";
}

impl ClientRequest for ProgressNotification {
    type Response = ();
    const KIND: &'static str = "progress";
}

impl ClientRequest for ToolsChanged {
    type Response = ();
    const KIND: &'static str = "tools_changed";
}

impl ClientRequest for PromptsChanged {
    type Response = ();
    const KIND: &'static str = "prompts_changed";
}

impl ClientRequest for ResourcesChanged {
    type Response = ();
    const KIND: &'static str = "resources_changed";
}

/// Result types a client handler may return for a response type `Res`.
pub trait IntoClientResponse<Res>: Send + 'static {
    fn into_response(self) -> anyhow::Result<Res>;
}

impl IntoClientResponse<ElicitResult> for ElicitResult {
    fn into_response(self) -> anyhow::Result<ElicitResult> {
        Ok(self)
    }
}

impl IntoClientResponse<ElicitResult> for ElicitAction {
    fn into_response(self) -> anyhow::Result<ElicitResult> {
        Ok(self.into())
    }
}

impl<T: Serialize + Send + 'static> IntoClientResponse<ElicitResult>
    for StructuredElicitResult<T>
{
    fn into_response(self) -> anyhow::Result<ElicitResult> {
        let content = match self.content {
            Some(content) => match serde_json::to_value(content)? {
                Value::Object(map) => Some(map),
                other => anyhow::bail!("elicitation content must be a JSON object, got {other}"),
            },
            None => None,
        };
        Ok(ElicitResult {
            action: self.action,
            content,
            meta: self.meta,
        })
    }
}

impl IntoClientResponse<CreateMessageResult> for CreateMessageResult {
    fn into_response(self) -> anyhow::Result<CreateMessageResult> {
        Ok(self)
    }
}

impl IntoClientResponse<()> for () {
    fn into_response(self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Return description for a client handler of `R` producing `T`.
pub fn returns<R, T>() -> Returns<T, R::Response>
where
    R: ClientRequest,
    T: IntoClientResponse<R::Response>,
{
    Returns::new::<R::Response>(
        no_schema,
        <T as IntoClientResponse<R::Response>>::into_response,
    )
}

fn arguments<R: Serialize>(request: &R) -> JsonObject {
    match serde_json::to_value(request) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

fn invocation_error<R: ClientRequest>(method: &str, source: anyhow::Error) -> McpError {
    McpError::Invocation {
        kind: R::KIND,
        method: method.to_string(),
        source,
    }
}

pub struct SyncClientCallback<R: ClientRequest> {
    inner: SyncInvoker<R, R::Response>,
}

impl<R: ClientRequest> SyncClientCallback<R> {
    pub fn new(method: &Method<R, R::Response>) -> McpResult<Self> {
        Ok(Self {
            inner: SyncInvoker::new(method, true, R::KIND)?,
        })
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    pub fn call(&self, request: Arc<R>) -> McpResult<R::Response> {
        self.inner
            .invoke(&CallContext::None, &request, &arguments(request.as_ref()))
            .map_err(|err| invocation_error::<R>(self.plan().method(), err))
    }
}

pub struct AsyncClientCallback<R: ClientRequest> {
    inner: AsyncInvoker<R, R::Response>,
}

impl<R: ClientRequest> AsyncClientCallback<R> {
    pub fn new(method: &Method<R, R::Response>) -> McpResult<Self> {
        Ok(Self {
            inner: AsyncInvoker::new(method, true, R::KIND)?,
        })
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    /// Resolves to `None` when a stream handler completes empty.
    pub fn call(&self, request: Arc<R>) -> BoxFuture<'static, McpResult<Option<R::Response>>> {
        let pending = self
            .inner
            .invoke(&CallContext::None, &request, &arguments(request.as_ref()));
        let method = self.plan().method().to_string();
        Box::pin(async move {
            pending
                .await
                .map_err(|err| invocation_error::<R>(&method, err))
        })
    }
}

/// A client handler and the clients it is registered for.
pub struct SyncClientSpecification<R: ClientRequest> {
    pub clients: Vec<String>,
    pub callback: Arc<SyncClientCallback<R>>,
}

pub struct AsyncClientSpecification<R: ClientRequest> {
    pub clients: Vec<String>,
    pub callback: Arc<AsyncClientCallback<R>>,
}

impl<R: ClientRequest> SyncClientSpecification<R> {
    pub fn build(marker: &ClientMarker, method: &Method<R, R::Response>) -> McpResult<Self> {
        let callback = SyncClientCallback::new(method)?;
        log_specification_built(R::KIND, method.name(), "client");
        Ok(Self {
            clients: marker.clients.clone(),
            callback: Arc::new(callback),
        })
    }

    pub fn call(&self, request: Arc<R>) -> McpResult<R::Response> {
        self.callback.call(request)
    }
}

impl<R: ClientRequest> AsyncClientSpecification<R> {
    pub fn build(marker: &ClientMarker, method: &Method<R, R::Response>) -> McpResult<Self> {
        let callback = AsyncClientCallback::new(method)?;
        log_specification_built(R::KIND, method.name(), "client");
        Ok(Self {
            clients: marker.clients.clone(),
            callback: Arc::new(callback),
        })
    }

    pub fn call(&self, request: Arc<R>) -> BoxFuture<'static, McpResult<Option<R::Response>>> {
        self.callback.call(request)
    }
}

impl<R: ClientRequest> Clone for SyncClientSpecification<R> {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<R: ClientRequest> Clone for AsyncClientSpecification<R> {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<R: ClientRequest> fmt::Debug for SyncClientSpecification<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClientSpecification")
            .field("kind", &R::KIND)
            .field("method", &self.callback.plan().method())
            .field("clients", &self.clients)
            .finish()
    }
}

impl<R: ClientRequest> fmt::Debug for AsyncClientSpecification<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncClientSpecification")
            .field("kind", &R::KIND)
            .field("method", &self.callback.plan().method())
            .field("clients", &self.clients)
            .finish()
    }
}

pub type SyncElicitationSpecification = SyncClientSpecification<ElicitRequest>;
pub type SyncSamplingSpecification = SyncClientSpecification<CreateMessageRequest>;
pub type SyncLoggingSpecification = SyncClientSpecification<LoggingMessageNotification>;
pub type SyncProgressSpecification = SyncClientSpecification<ProgressNotification>;
pub type SyncToolsChangedSpecification = SyncClientSpecification<ToolsChanged>;
pub type SyncPromptsChangedSpecification = SyncClientSpecification<PromptsChanged>;
pub type SyncResourcesChangedSpecification = SyncClientSpecification<ResourcesChanged>;

pub type AsyncElicitationSpecification = AsyncClientSpecification<ElicitRequest>;
pub type AsyncSamplingSpecification = AsyncClientSpecification<CreateMessageRequest>;
pub type AsyncLoggingSpecification = AsyncClientSpecification<LoggingMessageNotification>;
pub type AsyncProgressSpecification = AsyncClientSpecification<ProgressNotification>;
pub type AsyncToolsChangedSpecification = AsyncClientSpecification<ToolsChanged>;
pub type AsyncPromptsChangedSpecification = AsyncClientSpecification<PromptsChanged>;
pub type AsyncResourcesChangedSpecification = AsyncClientSpecification<ResourcesChanged>;
