//! Components and their method tables.
//!
//! A component is any shared object that declares MCP methods. Instead of
//! being discovered by inspection, each method is declared explicitly into a
//! [`Methods`] table together with its marker, its named arguments and a
//! closure whose parameter types are extractors.
//!
//! # Examples
//! ```rust,ignore
//! use mcpbind::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! impl McpComponent for Greeter {
//!     fn declare(self: Arc<Self>, methods: &mut Methods) {
//!         let this = Arc::clone(&self);
//!         methods.tool(
//!             "greet",
//!             ToolMarker::new().description("Greet someone"),
//!             vec![Param::new::<String>("name")],
//!             move |Arg(name): Arg<String>| -> anyhow::Result<String> {
//!                 Ok(format!("{}, {name}!", this.greeting))
//!             },
//!         );
//!     }
//! }
//! ```

use crate::{
    binding::{Handler, Param},
    callback::{
        client::{returns as client_returns, ClientMarker, ClientRequest, IntoClientResponse},
        complete::{CompleteMarker, CompleteReturn, IntoCompleteReturn},
        prompt::{IntoPromptReturn, PromptMarker, PromptReturn},
        resource::{IntoResourceReturn, ResourceMarker, ResourceReturn},
        tool::{ToolMarker, ToolReturn},
    },
    method::Method,
    protocol::{
        CallToolRequest, CompleteRequest, CreateMessageRequest, CreateMessageResult,
        ElicitRequest, ElicitResult, GetPromptRequest, LoggingMessageNotification,
        ProgressNotification, PromptsChanged, ReadResourceRequest, ResourcesChanged,
        ToolsChanged,
    },
};
use futures_util::Stream;
use schemars::JsonSchema;
use serde::Serialize;
use std::{collections::BTreeSet, future::Future, sync::Arc};

/// An object exposing MCP methods.
pub trait McpComponent: Send + Sync + 'static {
    /// Add this component's methods to `methods`.
    fn declare(self: Arc<Self>, methods: &mut Methods);

    /// Name used in log output.
    fn component_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// One declared method and its marker.
#[derive(Clone)]
pub enum Declared {
    Tool(ToolMarker, Method<CallToolRequest, ToolReturn>),
    Prompt(PromptMarker, Method<GetPromptRequest, PromptReturn>),
    Resource(ResourceMarker, Method<ReadResourceRequest, ResourceReturn>),
    Completion(CompleteMarker, Method<CompleteRequest, CompleteReturn>),
    Elicitation(ClientMarker, Method<ElicitRequest, ElicitResult>),
    Sampling(ClientMarker, Method<CreateMessageRequest, CreateMessageResult>),
    Logging(ClientMarker, Method<LoggingMessageNotification, ()>),
    Progress(ClientMarker, Method<ProgressNotification, ()>),
    ToolsChanged(ClientMarker, Method<ToolsChanged, ()>),
    PromptsChanged(ClientMarker, Method<PromptsChanged, ()>),
    ResourcesChanged(ClientMarker, Method<ResourcesChanged, ()>),
}

impl Declared {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tool(..) => "tool",
            Self::Prompt(..) => "prompt",
            Self::Resource(..) => "resource",
            Self::Completion(..) => "completion",
            Self::Elicitation(..) => ElicitRequest::KIND,
            Self::Sampling(..) => CreateMessageRequest::KIND,
            Self::Logging(..) => LoggingMessageNotification::KIND,
            Self::Progress(..) => ProgressNotification::KIND,
            Self::ToolsChanged(..) => ToolsChanged::KIND,
            Self::PromptsChanged(..) => PromptsChanged::KIND,
            Self::ResourcesChanged(..) => ResourcesChanged::KIND,
        }
    }

    pub fn method_name(&self) -> &str {
        match self {
            Self::Tool(_, m) => m.name(),
            Self::Prompt(_, m) => m.name(),
            Self::Resource(_, m) => m.name(),
            Self::Completion(_, m) => m.name(),
            Self::Elicitation(_, m) => m.name(),
            Self::Sampling(_, m) => m.name(),
            Self::Logging(_, m) => m.name(),
            Self::Progress(_, m) => m.name(),
            Self::ToolsChanged(_, m) => m.name(),
            Self::PromptsChanged(_, m) => m.name(),
            Self::ResourcesChanged(_, m) => m.name(),
        }
    }
}

impl std::fmt::Debug for Declared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Declared")
            .field("kind", &self.kind())
            .field("method", &self.method_name())
            .finish()
    }
}

/// Client message types that can be declared in a [`Methods`] table.
pub trait DeclaredClient: ClientRequest + Sized {
    fn wrap(marker: ClientMarker, method: Method<Self, Self::Response>) -> Declared;

    fn select(declared: &Declared) -> Option<(&ClientMarker, &Method<Self, Self::Response>)>;
}

macro_rules! declared_client {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl DeclaredClient for $ty {
                fn wrap(marker: ClientMarker, method: Method<Self, Self::Response>) -> Declared {
                    Declared::$variant(marker, method)
                }

                fn select(
                    declared: &Declared,
                ) -> Option<(&ClientMarker, &Method<Self, Self::Response>)> {
                    match declared {
                        Declared::$variant(marker, method) => Some((marker, method)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

declared_client!(
    ElicitRequest => Elicitation,
    CreateMessageRequest => Sampling,
    LoggingMessageNotification => Logging,
    ProgressNotification => Progress,
    ToolsChanged => ToolsChanged,
    PromptsChanged => PromptsChanged,
    ResourcesChanged => ResourcesChanged,
);

/// The methods one component declares, plus the tool groups it implements.
#[derive(Debug, Clone)]
pub struct Methods {
    component: String,
    declared: Vec<Declared>,
    groups: BTreeSet<String>,
}

impl Default for Methods {
    fn default() -> Self {
        Self::new("methods")
    }
}

impl Methods {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            declared: Vec::new(),
            groups: BTreeSet::new(),
        }
    }

    /// Collect everything `component` declares.
    pub fn of(component: &Arc<dyn McpComponent>) -> Self {
        let mut methods = Self::new(component.component_name());
        Arc::clone(component).declare(&mut methods);
        methods
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn declared(&self) -> &[Declared] {
        &self.declared
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn push(&mut self, declared: Declared) -> &mut Self {
        self.declared.push(declared);
        self
    }

    /// Mark this component as implementing a tool group.
    pub fn implements_group(&mut self, group: impl Into<String>) -> &mut Self {
        self.groups.insert(group.into());
        self
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    // -- tools --

    pub fn tool<H, Args, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ToolMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CallToolRequest, Args, Output = Result<T, E>>,
        T: Serialize + JsonSchema + 'static,
        E: Into<anyhow::Error>,
    {
        let method = Method::sync(name, params, handler, ToolReturn::returns::<T>());
        self.push(Declared::Tool(marker, method))
    }

    pub fn tool_async<H, Args, Fut, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ToolMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CallToolRequest, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + JsonSchema + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let method = Method::future(name, params, handler, ToolReturn::returns::<T>());
        self.push(Declared::Tool(marker, method))
    }

    /// A tool answered by the first item of a stream.
    pub fn tool_stream<H, Args, S, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ToolMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CallToolRequest, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: Serialize + JsonSchema + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let method = Method::stream(name, params, handler, ToolReturn::returns::<T>());
        self.push(Declared::Tool(marker, method))
    }

    // -- prompts --

    pub fn prompt<H, Args, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: PromptMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<GetPromptRequest, Args, Output = Result<T, E>>,
        T: IntoPromptReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::sync(name, params, handler, PromptReturn::returns::<T>());
        self.push(Declared::Prompt(marker, method))
    }

    pub fn prompt_async<H, Args, Fut, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: PromptMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<GetPromptRequest, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: IntoPromptReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::future(name, params, handler, PromptReturn::returns::<T>());
        self.push(Declared::Prompt(marker, method))
    }

    pub fn prompt_stream<H, Args, S, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: PromptMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<GetPromptRequest, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: IntoPromptReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::stream(name, params, handler, PromptReturn::returns::<T>());
        self.push(Declared::Prompt(marker, method))
    }

    // -- resources --

    /// A resource whose URI template variables are its named arguments.
    ///
    /// Variables arrive as text. A variable declared as a number or boolean
    /// is parsed before conversion, so `Param::new::<u32>("page")` binds
    /// `Arg<u32>`.
    pub fn resource<H, Args, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ResourceMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<ReadResourceRequest, Args, Output = Result<T, E>>,
        T: IntoResourceReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::sync(name, params, handler, ResourceReturn::returns::<T>());
        self.push(Declared::Resource(marker, method))
    }

    pub fn resource_async<H, Args, Fut, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ResourceMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<ReadResourceRequest, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: IntoResourceReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::future(name, params, handler, ResourceReturn::returns::<T>());
        self.push(Declared::Resource(marker, method))
    }

    pub fn resource_stream<H, Args, S, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ResourceMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<ReadResourceRequest, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: IntoResourceReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::stream(name, params, handler, ResourceReturn::returns::<T>());
        self.push(Declared::Resource(marker, method))
    }

    // -- completions --

    pub fn completion<H, Args, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: CompleteMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CompleteRequest, Args, Output = Result<T, E>>,
        T: IntoCompleteReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::sync(name, params, handler, CompleteReturn::returns::<T>());
        self.push(Declared::Completion(marker, method))
    }

    pub fn completion_async<H, Args, Fut, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: CompleteMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CompleteRequest, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: IntoCompleteReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::future(name, params, handler, CompleteReturn::returns::<T>());
        self.push(Declared::Completion(marker, method))
    }

    pub fn completion_stream<H, Args, S, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: CompleteMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        H: Handler<CompleteRequest, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: IntoCompleteReturn,
        E: Into<anyhow::Error>,
    {
        let method = Method::stream(name, params, handler, CompleteReturn::returns::<T>());
        self.push(Declared::Completion(marker, method))
    }

    // -- client handlers --

    /// A blocking handler for the client message `R`.
    pub fn client<R, H, Args, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ClientMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        R: DeclaredClient,
        H: Handler<R, Args, Output = Result<T, E>>,
        T: IntoClientResponse<R::Response>,
        E: Into<anyhow::Error>,
    {
        let method = Method::sync(name, params, handler, client_returns::<R, T>());
        self.push(R::wrap(marker, method))
    }

    pub fn client_async<R, H, Args, Fut, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ClientMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        R: DeclaredClient,
        H: Handler<R, Args, Output = Fut>,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: IntoClientResponse<R::Response>,
        E: Into<anyhow::Error>,
    {
        let method = Method::future(name, params, handler, client_returns::<R, T>());
        self.push(R::wrap(marker, method))
    }

    pub fn client_stream<R, H, Args, S, T, E>(
        &mut self,
        name: impl Into<String>,
        marker: ClientMarker,
        params: Vec<Param>,
        handler: H,
    ) -> &mut Self
    where
        R: DeclaredClient,
        H: Handler<R, Args, Output = S>,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        T: IntoClientResponse<R::Response>,
        E: Into<anyhow::Error>,
    {
        let method = Method::stream(name, params, handler, client_returns::<R, T>());
        self.push(R::wrap(marker, method))
    }

    // -- lookups used by the providers --

    pub fn tools(&self) -> Vec<(&ToolMarker, &Method<CallToolRequest, ToolReturn>)> {
        self.declared
            .iter()
            .filter_map(|d| match d {
                Declared::Tool(marker, method) => Some((marker, method)),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<(&PromptMarker, &Method<GetPromptRequest, PromptReturn>)> {
        self.declared
            .iter()
            .filter_map(|d| match d {
                Declared::Prompt(marker, method) => Some((marker, method)),
                _ => None,
            })
            .collect()
    }

    pub fn resources(
        &self,
    ) -> Vec<(&ResourceMarker, &Method<ReadResourceRequest, ResourceReturn>)> {
        self.declared
            .iter()
            .filter_map(|d| match d {
                Declared::Resource(marker, method) => Some((marker, method)),
                _ => None,
            })
            .collect()
    }

    pub fn completions(
        &self,
    ) -> Vec<(&CompleteMarker, &Method<CompleteRequest, CompleteReturn>)> {
        self.declared
            .iter()
            .filter_map(|d| match d {
                Declared::Completion(marker, method) => Some((marker, method)),
                _ => None,
            })
            .collect()
    }

    pub fn clients<R: DeclaredClient>(&self) -> Vec<(&ClientMarker, &Method<R, R::Response>)> {
        self.declared.iter().filter_map(R::select).collect()
    }
}

/// Named shorthands for [`Methods::client`] and [`Methods::client_async`].
macro_rules! client_shorthands {
    ($($sync:ident, $async_:ident => $ty:ty);* $(;)?) => {
        impl Methods {
            $(
                pub fn $sync<H, Args, T, E>(
                    &mut self,
                    name: impl Into<String>,
                    marker: ClientMarker,
                    params: Vec<Param>,
                    handler: H,
                ) -> &mut Self
                where
                    H: Handler<$ty, Args, Output = Result<T, E>>,
                    T: IntoClientResponse<<$ty as ClientRequest>::Response>,
                    E: Into<anyhow::Error>,
                {
                    self.client::<$ty, H, Args, T, E>(name, marker, params, handler)
                }

                pub fn $async_<H, Args, Fut, T, E>(
                    &mut self,
                    name: impl Into<String>,
                    marker: ClientMarker,
                    params: Vec<Param>,
                    handler: H,
                ) -> &mut Self
                where
                    H: Handler<$ty, Args, Output = Fut>,
                    Fut: Future<Output = Result<T, E>> + Send + 'static,
                    T: IntoClientResponse<<$ty as ClientRequest>::Response>,
                    E: Into<anyhow::Error>,
                {
                    self.client_async::<$ty, H, Args, Fut, T, E>(name, marker, params, handler)
                }
            )*
        }
    };
}

client_shorthands!(
    elicitation, elicitation_async => ElicitRequest;
    sampling, sampling_async => CreateMessageRequest;
    logging, logging_async => LoggingMessageNotification;
    progress, progress_async => ProgressNotification;
    tools_changed, tools_changed_async => ToolsChanged;
    prompts_changed, prompts_changed_async => PromptsChanged;
    resources_changed, resources_changed_async => ResourcesChanged;
);

/// A prebuilt table is itself a component.
impl McpComponent for Methods {
    fn declare(self: Arc<Self>, methods: &mut Methods) {
        methods.declared.extend(self.declared.iter().cloned());
        methods.groups.extend(self.groups.iter().cloned());
    }

    fn component_name(&self) -> String {
        self.component.clone()
    }
}
