//! Callbacks: compiled methods ready to be invoked by an MCP runtime.
//!
//! Every capability comes in a synchronous and an asynchronous variant, and
//! server-side callbacks are additionally parameterised by a [`Flavor`]:
//! [`Stateful`] callbacks receive the session [`Exchange`], [`Stateless`]
//! ones only a [`TransportContext`].

pub mod client;
pub mod complete;
pub mod prompt;
pub mod resource;
pub mod tool;

use crate::{
    binding::BindingPlan,
    context::{CallContext, Exchange, TransportContext},
    error::{McpError, McpResult},
    method::{AsyncInvoke, Method, Pending, SyncInvoke},
    protocol::{JsonObject, McpRequest},
};
use std::{fmt, sync::Arc};

/// Prefix of the text in every error envelope.
pub const ERROR_PREFIX: &str = "Error invoking method: ";

/// Selects the context a server-side callback is invoked with.
pub trait Flavor: Clone + Send + Sync + 'static {
    /// What the hosting runtime passes to `call`.
    type Context: Send + Sync;

    /// Stateless callbacks cannot bind session-only roles.
    const STATELESS: bool;

    const NAME: &'static str;

    fn call_context(context: &Self::Context) -> CallContext;
}

/// Session-bound callbacks, invoked with an [`Exchange`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Stateful;

/// Request-scoped callbacks, invoked with a [`TransportContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Stateless;

impl Flavor for Stateful {
    type Context = Exchange;
    const STATELESS: bool = false;
    const NAME: &'static str = "stateful";

    fn call_context(context: &Exchange) -> CallContext {
        CallContext::Exchange(context.clone())
    }
}

impl Flavor for Stateless {
    type Context = TransportContext;
    const STATELESS: bool = true;
    const NAME: &'static str = "stateless";

    fn call_context(context: &TransportContext) -> CallContext {
        CallContext::Transport(context.clone())
    }
}

/// Decides which invocation errors become error envelopes.
///
/// Errors the filter does not catch propagate to the caller as `Err`.
#[derive(Clone)]
pub struct ErrorFilter {
    name: &'static str,
    predicate: Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>,
}

impl ErrorFilter {
    /// Catch every error.
    pub fn all() -> Self {
        Self::new("all", |_| true)
    }

    /// Catch errors with an `E` anywhere in their chain.
    pub fn of<E>() -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(std::any::type_name::<E>(), |err| {
            err.is::<E>() || err.chain().any(|cause| cause.is::<E>())
        })
    }

    pub fn new(
        name: &'static str,
        predicate: impl Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            predicate: Arc::new(predicate),
        }
    }

    pub fn catches(&self, err: &anyhow::Error) -> bool {
        (self.predicate)(err)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for ErrorFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for ErrorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorFilter").field(&self.name).finish()
    }
}

/// Reject plans that need a session when the flavor cannot supply one.
pub(crate) fn check_flavor<F: Flavor>(plan: &BindingPlan) -> McpResult<()> {
    if F::STATELESS && plan.requires_session() {
        return Err(McpError::ExchangeUnavailable {
            method: plan.method().to_string(),
        });
    }
    Ok(())
}

/// Compiled plan plus blocking body, shared by the non-tool callbacks.
pub(crate) struct SyncInvoker<R, O> {
    plan: Arc<BindingPlan>,
    invoke: SyncInvoke<R, O>,
}

impl<R: McpRequest, O> SyncInvoker<R, O> {
    /// `sessionless` rejects methods that bind an exchange.
    pub(crate) fn new(method: &Method<R, O>, sessionless: bool, kind: &str) -> McpResult<Self> {
        let plan = compile(method, sessionless)?;
        let invoke = method.sync_body().ok_or_else(|| {
            McpError::invalid_signature(
                method.name(),
                format!("an asynchronous method cannot back a synchronous {kind}"),
            )
        })?;
        Ok(Self {
            plan: Arc::new(plan),
            invoke,
        })
    }

    pub(crate) fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    pub(crate) fn invoke(
        &self,
        context: &CallContext,
        request: &Arc<R>,
        arguments: &JsonObject,
    ) -> anyhow::Result<O> {
        let slots = self.plan.bind(request, context, arguments)?;
        (self.invoke)(slots)
    }
}

/// Compiled plan plus asynchronous body, shared by the non-tool callbacks.
pub(crate) struct AsyncInvoker<R, O> {
    plan: Arc<BindingPlan>,
    invoke: AsyncInvoke<R, O>,
}

impl<R: McpRequest, O: Send + 'static> AsyncInvoker<R, O> {
    pub(crate) fn new(method: &Method<R, O>, sessionless: bool, kind: &str) -> McpResult<Self> {
        let plan = compile(method, sessionless)?;
        let invoke = method.async_body().ok_or_else(|| {
            McpError::invalid_signature(
                method.name(),
                format!("a synchronous method cannot back an asynchronous {kind}"),
            )
        })?;
        Ok(Self {
            plan: Arc::new(plan),
            invoke,
        })
    }

    pub(crate) fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    pub(crate) fn invoke(
        &self,
        context: &CallContext,
        request: &Arc<R>,
        arguments: &JsonObject,
    ) -> Pending<O> {
        match self.plan.bind(request, context, arguments) {
            Ok(slots) => (self.invoke)(slots),
            Err(err) => Box::pin(futures_util::future::ready(Err(err.into()))),
        }
    }
}

fn compile<R, O>(method: &Method<R, O>, sessionless: bool) -> McpResult<BindingPlan> {
    let plan = method.plan()?;
    if sessionless && plan.requires_session() {
        return Err(McpError::ExchangeUnavailable {
            method: plan.method().to_string(),
        });
    }
    Ok(plan)
}

pub(crate) fn error_message(err: &anyhow::Error) -> String {
    format!("{ERROR_PREFIX}{err}")
}
