//! MCP protocol model.
//!
//! Plain serde types for the parts of the Model Context Protocol that the
//! binding layer reads and produces. Transport framing, sessions and
//! capability negotiation belong to the hosting runtime.

pub mod client;
pub mod completion;
pub mod content;
pub mod prompts;
pub mod resources;
pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use client::{
    ClientCapabilities, CreateMessageRequest, CreateMessageResult, ElicitAction, ElicitRequest,
    ElicitResult, ListRootsResult, LoggingLevel, LoggingMessageNotification, ProgressNotification,
    PromptsChanged, ResourcesChanged, Root, RootsCapability, SamplingMessage, ServerNotification,
    ToolsChanged,
};
pub use completion::{
    CompleteArgument, CompleteContext, CompleteReference, CompleteRequest, CompleteResult,
    Completion, MAX_COMPLETION_VALUES,
};
pub use content::{BlobResourceContents, Content, ResourceContents, Role, TextResourceContents};
pub use prompts::{GetPromptRequest, GetPromptResult, Prompt, PromptArgument, PromptMessage};
pub use resources::{ReadResourceRequest, ReadResourceResult, Resource, ResourceTemplate};
pub use tools::{CallToolRequest, CallToolResult, Tool, ToolAnnotations};

/// A JSON object, the shape of argument maps and `_meta` maps.
pub type JsonObject = serde_json::Map<String, Value>;

/// Protocol revision the model follows.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Key under `_meta` that carries the progress correlation token.
pub const PROGRESS_TOKEN_KEY: &str = "progressToken";

/// Correlation token for progress notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    Number(i64),
    String(String),
}

impl ProgressToken {
    /// Read a token out of a raw JSON value, ignoring anything that is not a
    /// string or an integer.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(token) => Some(Self::String(token.clone())),
            Value::Number(number) => number.as_i64().map(Self::Number),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ProgressToken {
    fn from(token: &str) -> Self {
        Self::String(token.to_string())
    }
}

impl From<i64> for ProgressToken {
    fn from(token: i64) -> Self {
        Self::Number(token)
    }
}

/// Name and version of a peer implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// Any inbound request or notification that a bound method can receive.
///
/// The binding layer only needs the free-form `_meta` map; the progress token
/// lives inside it under [`PROGRESS_TOKEN_KEY`].
pub trait McpRequest: Send + Sync + 'static {
    fn meta(&self) -> Option<&JsonObject>;

    fn progress_token(&self) -> Option<ProgressToken> {
        self.meta()
            .and_then(|meta| meta.get(PROGRESS_TOKEN_KEY))
            .and_then(ProgressToken::from_value)
    }
}

/// Implements [`McpRequest`] for types with a `meta: Option<JsonObject>` field.
macro_rules! impl_mcp_request {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::protocol::McpRequest for $ty {
                fn meta(&self) -> Option<&$crate::protocol::JsonObject> {
                    self.meta.as_ref()
                }
            }
        )*
    };
}
pub(crate) use impl_mcp_request;
