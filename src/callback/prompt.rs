//! Prompt callbacks and specifications.

use super::{AsyncInvoker, Flavor, SyncInvoker};
use crate::{
    binding::BindingPlan,
    error::{McpError, McpResult},
    logging::log_specification_built,
    method::Method,
    protocol::{GetPromptRequest, GetPromptResult, Prompt, PromptArgument, PromptMessage},
    returns::{no_schema, Returns},
};
use futures_util::future::BoxFuture;
use std::{fmt, marker::PhantomData, sync::Arc};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptMarker {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PromptMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn effective_name(&self, method_name: &str) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => method_name.to_string(),
        }
    }
}

/// What a prompt method produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptReturn {
    Result(GetPromptResult),
    Messages(Vec<PromptMessage>),
}

/// Result types a prompt method may return.
///
/// Plain strings become assistant text messages.
pub trait IntoPromptReturn: Send + 'static {
    fn into_prompt_return(self) -> PromptReturn;
}

impl IntoPromptReturn for GetPromptResult {
    fn into_prompt_return(self) -> PromptReturn {
        PromptReturn::Result(self)
    }
}

impl IntoPromptReturn for Vec<PromptMessage> {
    fn into_prompt_return(self) -> PromptReturn {
        PromptReturn::Messages(self)
    }
}

impl IntoPromptReturn for PromptMessage {
    fn into_prompt_return(self) -> PromptReturn {
        PromptReturn::Messages(vec![self])
    }
}

impl IntoPromptReturn for String {
    fn into_prompt_return(self) -> PromptReturn {
        PromptReturn::Messages(vec![PromptMessage::assistant(self)])
    }
}

impl IntoPromptReturn for Vec<String> {
    fn into_prompt_return(self) -> PromptReturn {
        PromptReturn::Messages(self.into_iter().map(PromptMessage::assistant).collect())
    }
}

impl PromptReturn {
    pub fn returns<T: IntoPromptReturn>() -> Returns<T, PromptReturn> {
        Returns::new::<GetPromptResult>(no_schema, |value: T| Ok(value.into_prompt_return()))
    }

    fn finish(self, description: Option<&str>) -> GetPromptResult {
        match self {
            Self::Result(result) => result,
            Self::Messages(messages) => {
                GetPromptResult::new(description.map(str::to_string), messages)
            }
        }
    }
}

fn definition(name: String, marker: &PromptMarker, plan: &BindingPlan) -> Prompt {
    Prompt {
        name,
        title: marker.title.clone(),
        description: marker.description.clone(),
        arguments: plan
            .params()
            .iter()
            .map(|param| PromptArgument {
                name: param.name().to_string(),
                title: None,
                description: param.description_text().map(str::to_string),
                required: param.is_required(),
            })
            .collect(),
    }
}

fn invocation_error(method: &str, source: anyhow::Error) -> McpError {
    McpError::Invocation {
        kind: "prompt",
        method: method.to_string(),
        source,
    }
}

pub struct SyncPromptCallback<F> {
    inner: SyncInvoker<GetPromptRequest, PromptReturn>,
    description: Option<String>,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> SyncPromptCallback<F> {
    pub fn new(
        marker: &PromptMarker,
        method: &Method<GetPromptRequest, PromptReturn>,
    ) -> McpResult<Self> {
        Ok(Self {
            inner: SyncInvoker::new(method, F::STATELESS, "prompt")?,
            description: marker.description.clone(),
            _flavor: PhantomData,
        })
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<GetPromptRequest>,
    ) -> McpResult<GetPromptResult> {
        self.inner
            .invoke(&F::call_context(context), &request, &request.arguments)
            .map(|returned| returned.finish(self.description.as_deref()))
            .map_err(|err| invocation_error(self.plan().method(), err))
    }
}

pub struct AsyncPromptCallback<F> {
    inner: AsyncInvoker<GetPromptRequest, PromptReturn>,
    description: Option<String>,
    _flavor: PhantomData<fn() -> F>,
}

impl<F: Flavor> AsyncPromptCallback<F> {
    pub fn new(
        marker: &PromptMarker,
        method: &Method<GetPromptRequest, PromptReturn>,
    ) -> McpResult<Self> {
        Ok(Self {
            inner: AsyncInvoker::new(method, F::STATELESS, "prompt")?,
            description: marker.description.clone(),
            _flavor: PhantomData,
        })
    }

    pub fn plan(&self) -> &BindingPlan {
        self.inner.plan()
    }

    /// Resolves to `None` when a stream method completes empty.
    pub fn call(
        &self,
        context: &F::Context,
        request: Arc<GetPromptRequest>,
    ) -> BoxFuture<'static, McpResult<Option<GetPromptResult>>> {
        let pending = self
            .inner
            .invoke(&F::call_context(context), &request, &request.arguments);
        let description = self.description.clone();
        let method = self.plan().method().to_string();
        Box::pin(async move {
            match pending.await {
                Ok(returned) => Ok(returned.map(|r| r.finish(description.as_deref()))),
                Err(err) => Err(invocation_error(&method, err)),
            }
        })
    }
}

pub struct SyncPromptSpecification<F> {
    pub prompt: Prompt,
    pub callback: Arc<SyncPromptCallback<F>>,
}

pub struct AsyncPromptSpecification<F> {
    pub prompt: Prompt,
    pub callback: Arc<AsyncPromptCallback<F>>,
}

impl<F: Flavor> SyncPromptSpecification<F> {
    pub fn build(
        marker: &PromptMarker,
        method: &Method<GetPromptRequest, PromptReturn>,
    ) -> McpResult<Self> {
        let callback = SyncPromptCallback::<F>::new(marker, method)?;
        let prompt = definition(marker.effective_name(method.name()), marker, callback.plan());
        log_specification_built("prompt", &prompt.name, F::NAME);
        Ok(Self {
            prompt,
            callback: Arc::new(callback),
        })
    }
}

impl<F: Flavor> AsyncPromptSpecification<F> {
    pub fn build(
        marker: &PromptMarker,
        method: &Method<GetPromptRequest, PromptReturn>,
    ) -> McpResult<Self> {
        let callback = AsyncPromptCallback::<F>::new(marker, method)?;
        let prompt = definition(marker.effective_name(method.name()), marker, callback.plan());
        log_specification_built("prompt", &prompt.name, F::NAME);
        Ok(Self {
            prompt,
            callback: Arc::new(callback),
        })
    }
}

impl<F> Clone for SyncPromptSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            prompt: self.prompt.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> Clone for AsyncPromptSpecification<F> {
    fn clone(&self) -> Self {
        Self {
            prompt: self.prompt.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<F> fmt::Debug for SyncPromptSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPromptSpecification")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl<F> fmt::Debug for AsyncPromptSpecification<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPromptSpecification")
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Role;

    #[test]
    fn test_strings_become_assistant_messages() {
        let result = vec!["a".to_string(), "b".to_string()]
            .into_prompt_return()
            .finish(Some("two lines"));

        assert_eq!(result.description.as_deref(), Some("two lines"));
        assert_eq!(result.messages.len(), 2);
        assert!(result.messages.iter().all(|m| m.role == Role::Assistant));
    }

    #[test]
    fn test_result_passes_through() {
        let original = GetPromptResult::new(None, vec![PromptMessage::user("hi")]);
        let result = original.clone().into_prompt_return().finish(Some("ignored"));
        assert_eq!(result, original);
    }
}
