use crate::binding::ParamRole;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    // Binding errors, raised while a provider builds a specification
    #[error("Invalid signature for method '{method}': {reason}")]
    InvalidSignature { method: String, reason: String },

    #[error("Method '{method}' declares more than one {role} parameter")]
    DuplicateRole { method: String, role: ParamRole },

    #[error(
        "Method '{method}' does not match URI template '{template}': expected variables {expected:?}, found arguments {found:?}"
    )]
    UriVariableMismatch {
        method: String,
        template: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid URI template '{0}': {1}")]
    InvalidUriTemplate(String, String),

    #[error(
        "Method '{method}' declares argument '{name}' as {declared} but converts it into {found}"
    )]
    ArgumentTypeMismatch {
        method: String,
        name: String,
        declared: &'static str,
        found: &'static str,
    },

    #[error("Method '{method}' needs a session exchange, which a stateless or client-side callback cannot supply")]
    ExchangeUnavailable { method: String },

    #[error("Component '{component}' does not implement tool group '{group}'")]
    MissingToolGroup { component: String, group: String },

    // Conversion errors, raised per invocation
    #[error("Cannot convert argument '{name}': {source}")]
    ArgumentConversion {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("URI '{uri}' does not match template '{template}'")]
    UriMismatch { uri: String, template: String },

    #[error("Error invoking {kind} method '{method}': {source}")]
    Invocation {
        kind: &'static str,
        method: String,
        #[source]
        source: anyhow::Error,
    },

    // Lookup errors
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Prompt not found: {0}")]
    UnknownPrompt(String),

    #[error("Resource not found: {0}")]
    UnknownResource(String),

    #[error("No completion registered for: {0}")]
    UnknownCompletion(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Exchange channel closed")]
    ChannelClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Errors raised by user handlers that were not turned into envelopes
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::UnknownTool(_)
            | Self::UnknownPrompt(_)
            | Self::UnknownResource(_)
            | Self::UnknownCompletion(_) => -32601,
            Self::InvalidParams(_)
            | Self::ArgumentConversion { .. }
            | Self::UriMismatch { .. } => -32602,
            Self::Json(_) => -32700,
            _ => -32603, // Internal error
        }
    }

    /// Create JSON-RPC error response
    pub fn to_json_rpc_error(&self, id: Option<Value>) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "id": id,
        })
    }

    /// Whether this error was raised while building a specification.
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature { .. }
                | Self::DuplicateRole { .. }
                | Self::UriVariableMismatch { .. }
                | Self::ArgumentTypeMismatch { .. }
                | Self::InvalidUriTemplate(..)
                | Self::ExchangeUnavailable { .. }
                | Self::MissingToolGroup { .. }
        )
    }

    /// Recover an `McpError` that travelled through a handler as `anyhow::Error`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<McpError>() {
            Ok(mcp) => mcp,
            Err(other) => Self::Handler(other),
        }
    }

    pub(crate) fn invalid_signature(method: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;
