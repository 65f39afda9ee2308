//! Handles to the session and transport a bound method runs inside.
//!
//! The hosting MCP runtime owns the real session. It hands the binding layer
//! either an [`Exchange`] (stateful callbacks) or a [`TransportContext`]
//! (stateless callbacks). [`RequestContext`] bundles the exchange with the
//! current request's progress token and metadata so a handler can talk back
//! to the client.

use crate::{
    binding::schema::schema_value,
    error::{McpError, McpResult},
    logging::log_capability_skipped,
    meta::Meta,
    protocol::{
        ClientCapabilities, CreateMessageRequest, CreateMessageResult, ElicitAction,
        ElicitRequest, ElicitResult, Implementation, JsonObject, ListRootsResult,
        LoggingLevel, LoggingMessageNotification, ProgressNotification, ProgressToken, Root,
        ServerNotification,
    },
};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{collections::HashMap, fmt, future::Future, ops::Deref, sync::Arc};
use tokio::sync::mpsc;

/// Immutable key/value bag the transport attaches to a request.
///
/// Cloning is cheap; [`TransportContext::with`] copies on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportContext {
    values: Arc<HashMap<String, Value>>,
}

impl TransportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.values).insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Session-bound channel back to the connected client.
///
/// Implemented by the hosting runtime. Notifications are fire-and-forget and
/// therefore synchronous; peer requests are async.
#[async_trait]
pub trait ServerExchange: Send + Sync + 'static {
    fn session_id(&self) -> Option<&str>;

    fn client_info(&self) -> Option<&Implementation>;

    fn client_capabilities(&self) -> &ClientCapabilities;

    fn transport_context(&self) -> TransportContext;

    fn notify(&self, notification: ServerNotification) -> McpResult<()>;

    async fn create_message(&self, request: CreateMessageRequest) -> McpResult<CreateMessageResult>;

    async fn create_elicitation(&self, request: ElicitRequest) -> McpResult<ElicitResult>;

    async fn list_roots(&self) -> McpResult<ListRootsResult>;
}

/// Cloneable handle over a [`ServerExchange`].
#[derive(Clone)]
pub struct Exchange(Arc<dyn ServerExchange>);

impl Exchange {
    pub fn new(exchange: impl ServerExchange) -> Self {
        Self(Arc::new(exchange))
    }

    pub fn from_arc(exchange: Arc<dyn ServerExchange>) -> Self {
        Self(exchange)
    }

    /// Whether two handles refer to the same session object.
    pub fn same_session(&self, other: &Exchange) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn log(
        &self,
        level: LoggingLevel,
        logger: Option<&str>,
        data: impl Into<Value>,
    ) -> McpResult<()> {
        self.0
            .notify(ServerNotification::LoggingMessage(LoggingMessageNotification::new(
                level,
                logger.map(str::to_string),
                data,
            )))
    }
}

impl Deref for Exchange {
    type Target = dyn ServerExchange;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("session_id", &self.0.session_id())
            .finish()
    }
}

/// What the hosting runtime supplies alongside a request.
#[derive(Debug, Clone, Default)]
pub enum CallContext {
    Exchange(Exchange),
    Transport(TransportContext),
    #[default]
    None,
}

impl CallContext {
    pub fn exchange(&self) -> Option<&Exchange> {
        match self {
            Self::Exchange(exchange) => Some(exchange),
            _ => None,
        }
    }

    /// Transport context, taken from the exchange for stateful calls.
    pub fn transport_context(&self) -> TransportContext {
        match self {
            Self::Exchange(exchange) => exchange.transport_context(),
            Self::Transport(context) => context.clone(),
            Self::None => TransportContext::default(),
        }
    }
}

impl From<Exchange> for CallContext {
    fn from(exchange: Exchange) -> Self {
        Self::Exchange(exchange)
    }
}

impl From<TransportContext> for CallContext {
    fn from(context: TransportContext) -> Self {
        Self::Transport(context)
    }
}

/// Result of an operation that is skipped when the peer lacks a capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Skipped { reason: String },
}

impl<T> Outcome<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Skipped { reason } => Outcome::Skipped { reason },
        }
    }
}

/// Elicitation result whose content was decoded into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredElicitResult<T> {
    pub action: ElicitAction,
    pub content: Option<T>,
    pub meta: Option<JsonObject>,
}

impl<T> StructuredElicitResult<T> {
    pub fn accept(content: T) -> Self {
        Self {
            action: ElicitAction::Accept,
            content: Some(content),
            meta: None,
        }
    }

    pub fn decline() -> Self {
        Self {
            action: ElicitAction::Decline,
            content: None,
            meta: None,
        }
    }
}

impl<T: DeserializeOwned> TryFrom<ElicitResult> for StructuredElicitResult<T> {
    type Error = McpError;

    fn try_from(result: ElicitResult) -> McpResult<Self> {
        let content = match result.content {
            Some(map) if result.action == ElicitAction::Accept => {
                Some(serde_json::from_value(Value::Object(map))?)
            }
            _ => None,
        };
        Ok(Self {
            action: result.action,
            content,
            meta: result.meta,
        })
    }
}

/// Per-invocation context: the exchange plus the request's progress token and metadata.
#[derive(Debug, Clone)]
pub struct RequestContext {
    exchange: Exchange,
    progress_token: Option<ProgressToken>,
    meta: Meta,
}

impl RequestContext {
    pub fn new(exchange: Exchange, progress_token: Option<ProgressToken>, meta: Meta) -> Self {
        Self {
            exchange,
            progress_token,
            meta,
        }
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn progress_token(&self) -> Option<&ProgressToken> {
        self.progress_token.as_ref()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn client_capabilities(&self) -> &ClientCapabilities {
        self.exchange.client_capabilities()
    }

    /// Report progress. Skipped when the request carried no progress token.
    pub fn progress(
        &self,
        progress: f64,
        total: Option<f64>,
        message: Option<&str>,
    ) -> McpResult<Outcome<()>> {
        let Some(token) = self.progress_token.clone() else {
            return Ok(skip("progress", "request carried no progress token"));
        };
        self.exchange
            .notify(ServerNotification::Progress(ProgressNotification {
                progress_token: token,
                progress,
                total,
                message: message.map(str::to_string),
                meta: None,
            }))?;
        Ok(Outcome::Completed(()))
    }

    pub fn log(&self, level: LoggingLevel, data: impl Into<Value>) -> McpResult<()> {
        self.exchange.log(level, None, data)
    }

    pub fn info(&self, message: impl Into<String>) -> McpResult<()> {
        self.log(LoggingLevel::Info, message.into())
    }

    pub fn debug(&self, message: impl Into<String>) -> McpResult<()> {
        self.log(LoggingLevel::Debug, message.into())
    }

    pub fn warn(&self, message: impl Into<String>) -> McpResult<()> {
        self.log(LoggingLevel::Warning, message.into())
    }

    /// Ask the user for input matching `requested_schema`.
    pub async fn elicit(
        &self,
        message: impl Into<String>,
        requested_schema: Value,
    ) -> McpResult<Outcome<ElicitResult>> {
        if self.client_capabilities().elicitation.is_none() {
            return Ok(skip("elicitation", "client does not support elicitation"));
        }
        let request = ElicitRequest::new(message, requested_schema);
        Ok(Outcome::Completed(
            self.exchange.create_elicitation(request).await?,
        ))
    }

    /// Ask the user for a `T`, using the schema generated from `T`.
    pub async fn elicit_as<T>(
        &self,
        message: impl Into<String>,
    ) -> McpResult<Outcome<StructuredElicitResult<T>>>
    where
        T: JsonSchema + DeserializeOwned,
    {
        match self.elicit(message, schema_value::<T>()).await? {
            Outcome::Completed(result) => Ok(Outcome::Completed(result.try_into()?)),
            Outcome::Skipped { reason } => Ok(Outcome::Skipped { reason }),
        }
    }

    pub async fn sample(
        &self,
        request: CreateMessageRequest,
    ) -> McpResult<Outcome<CreateMessageResult>> {
        if self.client_capabilities().sampling.is_none() {
            return Ok(skip("sampling", "client does not support sampling"));
        }
        Ok(Outcome::Completed(self.exchange.create_message(request).await?))
    }

    pub async fn roots(&self) -> McpResult<Outcome<Vec<Root>>> {
        if self.client_capabilities().roots.is_none() {
            return Ok(skip("roots", "client does not support roots"));
        }
        Ok(Outcome::Completed(self.exchange.list_roots().await?.roots))
    }
}

fn skip<T>(capability: &str, reason: &str) -> Outcome<T> {
    log_capability_skipped(capability, reason);
    Outcome::skipped(reason)
}

type Responder<Req, Res> = Arc<dyn Fn(Req) -> BoxFuture<'static, McpResult<Res>> + Send + Sync>;

/// A [`ServerExchange`] that forwards notifications into a tokio channel and
/// answers peer requests with configured responders.
///
/// Useful for tests and for runtimes that bridge the exchange onto their own
/// transport task.
pub struct ChannelExchange {
    session_id: Option<String>,
    client_info: Option<Implementation>,
    capabilities: ClientCapabilities,
    transport: TransportContext,
    sender: mpsc::UnboundedSender<ServerNotification>,
    sampling: Option<Responder<CreateMessageRequest, CreateMessageResult>>,
    elicitation: Option<Responder<ElicitRequest, ElicitResult>>,
    roots: Option<Responder<(), ListRootsResult>>,
}

impl ChannelExchange {
    pub fn new(
        capabilities: ClientCapabilities,
    ) -> (Self, mpsc::UnboundedReceiver<ServerNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let exchange = Self {
            session_id: None,
            client_info: None,
            capabilities,
            transport: TransportContext::default(),
            sender,
            sampling: None,
            elicitation: None,
            roots: None,
        };
        (exchange, receiver)
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = Some(Implementation {
            name: name.into(),
            version: version.into(),
        });
        self
    }

    pub fn with_transport_context(mut self, transport: TransportContext) -> Self {
        self.transport = transport;
        self
    }

    pub fn on_sampling<F, Fut>(mut self, responder: F) -> Self
    where
        F: Fn(CreateMessageRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<CreateMessageResult>> + Send + 'static,
    {
        self.sampling = Some(Arc::new(move |request| Box::pin(responder(request))));
        self
    }

    pub fn on_elicitation<F, Fut>(mut self, responder: F) -> Self
    where
        F: Fn(ElicitRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<ElicitResult>> + Send + 'static,
    {
        self.elicitation = Some(Arc::new(move |request| Box::pin(responder(request))));
        self
    }

    pub fn on_list_roots<F, Fut>(mut self, responder: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<ListRootsResult>> + Send + 'static,
    {
        self.roots = Some(Arc::new(move |()| Box::pin(responder())));
        self
    }

    pub fn into_exchange(self) -> Exchange {
        Exchange::new(self)
    }
}

fn no_responder(what: &str) -> McpError {
    McpError::Internal(format!("no {what} responder configured"))
}

#[async_trait]
impl ServerExchange for ChannelExchange {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn client_info(&self) -> Option<&Implementation> {
        self.client_info.as_ref()
    }

    fn client_capabilities(&self) -> &ClientCapabilities {
        &self.capabilities
    }

    fn transport_context(&self) -> TransportContext {
        self.transport.clone()
    }

    fn notify(&self, notification: ServerNotification) -> McpResult<()> {
        self.sender
            .send(notification)
            .map_err(|_| McpError::ChannelClosed)
    }

    async fn create_message(&self, request: CreateMessageRequest) -> McpResult<CreateMessageResult> {
        let responder = self.sampling.clone().ok_or_else(|| no_responder("sampling"))?;
        responder(request).await
    }

    async fn create_elicitation(&self, request: ElicitRequest) -> McpResult<ElicitResult> {
        let responder = self
            .elicitation
            .clone()
            .ok_or_else(|| no_responder("elicitation"))?;
        responder(request).await
    }

    async fn list_roots(&self) -> McpResult<ListRootsResult> {
        let responder = self.roots.clone().ok_or_else(|| no_responder("roots"))?;
        responder(()).await
    }
}
