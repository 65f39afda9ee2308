//! Completion callbacks and specifications.

use super::{AsyncInvoker, Flavor, SyncInvoker};
use crate::{
    binding::{schema::coerce_text_arguments, BindingPlan},
    error::{McpError, McpResult},
    logging::log_specification_built,
    method::Method,
    protocol::{
        CompleteReference, CompleteRequest, CompleteResult, Completion, JsonObject,
        MAX_COMPLETION_VALUES,
    },
    returns::{no_schema, Returns},
};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::{fmt, marker::PhantomData, sync::Arc};

/// Which prompt or resource a completion method serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMarker {
    pub reference: CompleteReference,
}

impl CompleteMarker {
    pub fn prompt(name: impl Into<String>) -> Self {
        Self {
            reference: CompleteReference::prompt(name),
        }
    }

    pub fn resource(uri: impl Into<String>) -> Self {
        Self {
            reference: CompleteReference::resource(uri),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompleteReturn {
    Result(CompleteResult),
    Completion(Completion),
    Values(Vec<String>),
}

pub trait IntoCompleteReturn: Send + 'static {
    fn into_complete_return(self) -> CompleteReturn;
}

impl IntoCompleteReturn for CompleteResult {
    fn into_complete_return(self) -> CompleteReturn {
        CompleteReturn::Result(self)
    }
}

impl IntoCompleteReturn for Completion {
    fn into_complete_return(self) -> CompleteReturn {
        CompleteReturn::Completion(self)
    }
}

impl IntoCompleteReturn for Vec<String> {
    fn into_complete_return(self) -> CompleteReturn {
        CompleteReturn::Values(self)
    }
}

impl IntoCompleteReturn for String {
    fn into_complete_return(self) -> CompleteReturn {
        CompleteReturn::Values(vec![self])
    }
}

impl CompleteReturn {
    pub fn returns<T: IntoCompleteReturn>() -> Returns<T, CompleteReturn> {
        Returns::new::<CompleteResult>(no_schema, |value: T| Ok(value.into_complete_return()))
    }

    /// Bare values are capped at `max`; results the method built itself pass through.
    fn finish(self, max: usize) -> CompleteResult {
        match self {
            Self::Result(result) => result,
            Self::Completion(completion) => CompleteResult::new(completion),
            Self::Values(values) => CompleteResult::new(Completion::capped(values, max)),
        }
    }
}

/// Already-resolved context arguments plus the argument being completed,
/// typed after the declared arguments.
fn arguments(request: &CompleteRequest, plan: &BindingPlan) -> JsonObject {
    let mut arguments: JsonObject = request
        .context
        .iter()
        .flat_map(|context| context.arguments.iter())
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    arguments.insert(
        request.argument.name.clone(),
        Value::String(request.argument.value.clone()),
    );
    coerce_text_arguments(plan.params(), &mut arguments);
    arguments
}

fn invocation_error(method: &str, source: anyhow::Error) -> McpError {
    McpError::Invocation {
        kind: "completion",
        method: method.to_string(),
        source,
    }
}

pub struct SyncCompleteCallback<F> {
    inner: SyncInvoker<CompleteRequest, CompleteReturn>,
    max_values: usize,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> SyncCompleteCallback<F> {
    pub fn new(method: &Method<CompleteRequest, CompleteReturn>) -> McpResult<Self> {
        Ok(Self {
            inner: SyncInvoker::new(method, F::STATELESS, "completion")?,
            max_values: MAX_COMPLETION_VALUES,
            _flavor: PhantomData,
        })
    }

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values.min(MAX_COMPLETION_VALUES);
        self
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CompleteRequest>,
    ) -> McpResult<CompleteResult> {
        self.inner
            .invoke(&F::call_context(context), &request, &arguments(&request, self.plan()))
            .map(|returned| returned.finish(self.max_values))
            .map_err(|err| invocation_error(self.plan().method(), err))
    }
}

pub struct AsyncCompleteCallback<F> {
    inner: AsyncInvoker<CompleteRequest, CompleteReturn>,
    max_values: usize,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> AsyncCompleteCallback<F> {
    pub fn new(method: &Method<CompleteRequest, CompleteReturn>) -> McpResult<Self> {
        Ok(Self {
            inner: AsyncInvoker::new(method, F::STATELESS, "completion")?,
            max_values: MAX_COMPLETION_VALUES,
            _flavor: PhantomData,
        })
    }

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values.min(MAX_COMPLETION_VALUES);
        self
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<CompleteRequest>,
    ) -> BoxFuture<'static, McpResult<Option<CompleteResult>>> {
        let pending = self
            .inner
            .invoke(&F::call_context(context), &request, &arguments(&request, self.plan()));
        let max = self.max_values;
        let method = self.plan().method().to_string();
        Box::pin(async move {
            match pending.await {
                Ok(returned) => Ok(returned.map(|r| r.finish(max))),
                Err(err) => Err(invocation_error(&method, err)),
            }
        })
    }
}

pub struct SyncCompleteSpecification<F> {
    pub reference: CompleteReference,
    pub callback: Arc<SyncCompleteCallback<F>>,
}

pub struct AsyncCompleteSpecification<F> {
    pub reference: CompleteReference,
    pub callback: Arc<AsyncCompleteCallback<F>>,
}

impl<F: Flavor> SyncCompleteSpecification<F> {
    pub fn build(
        marker: &CompleteMarker,
        method: &Method<CompleteRequest, CompleteReturn>,
        max_values: usize,
    ) -> McpResult<Self> {
        let callback = SyncCompleteCallback::<F>::new(method)?.with_max_values(max_values);
        log_specification_built("completion", &marker.reference.key(), F::NAME);
        Ok(Self {
            reference: marker.reference.clone(),
            callback: Arc::new(callback),
        })
    }
}

impl<F: Flavor> AsyncCompleteSpecification<F> {
    pub fn build(
        marker: &CompleteMarker,
        method: &Method<CompleteRequest, CompleteReturn>,
        max_values: usize,
    ) -> McpResult<Self> {
        let callback = AsyncCompleteCallback::<F>::new(method)?.with_max_values(max_values);
        log_specification_built("completion", &marker.reference.key(), F::NAME);
        Ok(Self {
            reference: marker.reference.clone(),
            callback: Arc::new(callback),
        })
    }
}

impl<F> Clone for SyncCompleteSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> Clone for AsyncCompleteSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> fmt::Debug for SyncCompleteSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCompleteSpecification")
            .field("reference", &self.reference)
            .field("max_values", &self.callback.max_values)
            .finish_non_exhaustive()
    }
}

impl<F> fmt::Debug for AsyncCompleteSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCompleteSpecification")
            .field("reference", &self.reference)
            .field("max_values", &self.callback.max_values)
            .finish_non_exhaustive()
    }
}
