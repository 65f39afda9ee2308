//! Method descriptors.
//!
//! A [`Method`] is a declared handler with its signature already analysed:
//! the roles of its parameters, its named arguments, the classification of
//! its result, and a type-erased body. The body takes bound slots and yields
//! the capability's intermediate value `O` (for tools a [`ToolReturn`],
//! for prompts a [`PromptReturn`], and so on).
//!
//! [`ToolReturn`]: crate::callback::tool::ToolReturn
//! [`PromptReturn`]: crate::callback::prompt::PromptReturn

use crate::{
    binding::{ArgType, BindingPlan, Handler, Param, ParamRole, Slot},
    error::McpResult,
    protocol::McpRequest,
    returns::{ReturnType, Returns},
};
use futures_util::{future::BoxFuture, Stream, StreamExt};
use serde_json::Value;
use std::{future::Future, sync::Arc};

pub type SyncInvoke<R, O> = Arc<dyn Fn(Vec<Slot<R>>) -> anyhow::Result<O> + Send + Sync>;

/// `Ok(None)` means the method completed without producing a value.
pub type AsyncInvoke<R, O> = Arc<dyn Fn(Vec<Slot<R>>) -> Pending<O> + Send + Sync>;

pub type Pending<O> = BoxFuture<'static, anyhow::Result<Option<O>>>;

pub enum MethodBody<R, O> {
    Sync(SyncInvoke<R, O>),
    Async(AsyncInvoke<R, O>),
}

impl<R, O> Clone for MethodBody<R, O> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(invoke) => Self::Sync(Arc::clone(invoke)),
            Self::Async(invoke) => Self::Async(Arc::clone(invoke)),
        }
    }
}

pub struct Method<R, O> {
    name: String,
    roles: Vec<ParamRole>,
    argument_types: Vec<ArgType>,
    params: Vec<Param>,
    returns: ReturnType,
    output_schema: fn() -> Option<Value>,
    body: MethodBody<R, O>,
}

impl<R, O> Clone for Method<R, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            roles: self.roles.clone(),
            argument_types: self.argument_types.clone(),
            params: self.params.clone(),
            returns: self.returns,
            output_schema: self.output_schema,
            body: self.body.clone(),
        }
    }
}

impl<R: McpRequest, O: Send + 'static> Method<R, O> {
    /// A blocking method.
    pub fn sync<H, Args, T, E>(
        name: impl Into<String>,
        params: Vec<Param>,
        handler: H,
        returns: Returns<T, O>,
    ) -> Self
    where
        H: Handler<R, Args, Output = Result<T, E>>,
        T: 'static,
        E: Into<anyhow::Error>,
    {
        let convert = returns.convert;
        let invoke: SyncInvoke<R, O> =
            Arc::new(move |slots: Vec<Slot<R>>| -> anyhow::Result<O> {
                let value = handler.call(slots)?.map_err(Into::<anyhow::Error>::into)?;
                convert(value)
            });
        Self::assemble::<H, Args, T>(name, params, &returns, MethodBody::Sync(invoke))
    }

    /// A method whose result arrives through a future.
    pub fn future<H, Args, Fut, T, E>(
        name: impl Into<String>,
        params: Vec<Param>,
        handler: H,
        returns: Returns<T, O>,
    ) -> Self
    where
        H: Handler<R, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error>,
    {
        let convert = returns.convert;
        let invoke: AsyncInvoke<R, O> = Arc::new(move |slots: Vec<Slot<R>>| -> Pending<O> {
            let called = handler.call(slots);
            Box::pin(async move {
                let value = called?.await.map_err(Into::<anyhow::Error>::into)?;
                convert(value).map(Some)
            })
        });
        Self::assemble::<H, Args, T>(name, params, &returns, MethodBody::Async(invoke))
    }

    /// A method that produces a stream; only its first item is used and the
    /// rest of the stream is dropped.
    pub fn stream<H, Args, S, T, E>(
        name: impl Into<String>,
        params: Vec<Param>,
        handler: H,
        returns: Returns<T, O>,
    ) -> Self
    where
        H: Handler<R, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<anyhow::Error>,
    {
        let returns = returns.streamed();
        let convert = returns.convert;
        let invoke: AsyncInvoke<R, O> = Arc::new(move |slots: Vec<Slot<R>>| -> Pending<O> {
            let called = handler.call(slots);
            Box::pin(async move {
                let mut stream = Box::pin(called?);
                match stream.next().await {
                    Some(item) => convert(item.map_err(Into::<anyhow::Error>::into)?).map(Some),
                    None => Ok(None),
                }
            })
        });
        Self::assemble::<H, Args, T>(name, params, &returns, MethodBody::Async(invoke))
    }

    fn assemble<H: Handler<R, Args>, Args, T>(
        name: impl Into<String>,
        params: Vec<Param>,
        returns: &Returns<T, O>,
        body: MethodBody<R, O>,
    ) -> Self {
        Self {
            name: name.into(),
            roles: H::roles(),
            argument_types: H::argument_types(),
            params,
            returns: returns.kind,
            output_schema: returns.output_schema,
            body,
        }
    }
}

impl<R, O> Method<R, O> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[ParamRole] {
        &self.roles
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn returns(&self) -> &ReturnType {
        &self.returns
    }

    pub fn body(&self) -> &MethodBody<R, O> {
        &self.body
    }

    pub fn is_async(&self) -> bool {
        matches!(self.body, MethodBody::Async(_))
    }

    pub fn requires_session(&self) -> bool {
        self.roles.iter().any(|role| role.requires_session())
    }

    /// Generate the output schema of the produced type, if it has one.
    pub fn output_schema(&self) -> Option<Value> {
        (self.output_schema)()
    }

    /// Compile the binding plan for this method and check each argument's
    /// declared type against the handler's.
    pub fn plan(&self) -> McpResult<BindingPlan> {
        BindingPlan::compile(&self.name, &self.roles, &self.params)?
            .check_argument_types(&self.argument_types)
    }

    pub(crate) fn sync_body(&self) -> Option<SyncInvoke<R, O>> {
        match &self.body {
            MethodBody::Sync(invoke) => Some(Arc::clone(invoke)),
            MethodBody::Async(_) => None,
        }
    }

    pub(crate) fn async_body(&self) -> Option<AsyncInvoke<R, O>> {
        match &self.body {
            MethodBody::Async(invoke) => Some(Arc::clone(invoke)),
            MethodBody::Sync(_) => None,
        }
    }
}

impl<R, O> std::fmt::Debug for Method<R, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("async", &self.is_async())
            .finish()
    }
}
