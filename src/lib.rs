//! Declarative method binding for Model Context Protocol servers and clients.
//!
//! Components declare plain Rust closures as tools, prompts, resources,
//! completions or client-side handlers. Providers turn those declarations
//! into specifications: protocol definitions (with generated JSON schemas)
//! paired with callbacks that bind incoming requests to closure parameters
//! and package results back into protocol envelopes.
//!
//! Callbacks come in blocking and asynchronous variants. Server-side
//! callbacks are either stateful (invoked with a session [`Exchange`]) or
//! stateless (invoked with a [`TransportContext`] only).

pub mod binding;
pub mod callback;
pub mod component;
pub mod context;
pub mod error;
pub mod logging;
pub mod meta;
pub mod method;
pub mod options;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod returns;
pub mod uri_template;

// Test modules
#[cfg(test)]
mod tests;

// Re-export key types
pub use binding::{Arg, ArgType, BindingPlan, BindingRule, FromSlot, Handler, Param, ParamRole};
pub use callback::{ErrorFilter, Flavor, Stateful, Stateless, ERROR_PREFIX};
pub use component::{Declared, McpComponent, Methods};
pub use context::{
    CallContext, ChannelExchange, Exchange, Outcome, RequestContext, ServerExchange,
    StructuredElicitResult, TransportContext,
};
pub use error::{McpError, McpResult};
pub use meta::Meta;
pub use method::Method;
pub use options::ProviderOptions;
pub use provider::{
    AsyncProvider, ClientProvider, StatefulAsyncProvider, StatefulSyncProvider,
    StatelessAsyncProvider, StatelessSyncProvider, SyncProvider,
};
pub use registry::{AsyncRegistry, SyncRegistry};
pub use returns::{ReturnMode, ReturnShape, ReturnType};
pub use uri_template::UriTemplate;

// Re-export commonly used external types
pub use schemars::JsonSchema;
pub use serde_json::{json, Value};

/// Everything needed to declare components.
pub mod prelude {
    pub use crate::{
        binding::{Arg, Param},
        callback::{
            client::ClientMarker,
            complete::CompleteMarker,
            prompt::PromptMarker,
            resource::{ResourceKind, ResourceMarker},
            tool::ToolMarker,
            ErrorFilter, Stateful, Stateless,
        },
        component::{McpComponent, Methods},
        context::{Exchange, Outcome, RequestContext, TransportContext},
        meta::Meta,
        options::ProviderOptions,
        protocol::*,
        provider::{
            AsyncProvider, ClientProvider, StatefulAsyncProvider, StatefulSyncProvider,
            StatelessAsyncProvider, StatelessSyncProvider, SyncProvider,
        },
        registry::{AsyncRegistry, SyncRegistry},
        McpError, McpResult,
    };
}
