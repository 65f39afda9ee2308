//! Provider configuration.

use crate::protocol::MAX_COMPLETION_VALUES;
use serde::{Deserialize, Serialize};

/// Settings shared by all providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderOptions {
    /// Generate output schemas for tools whose result is a JSON object
    pub generate_output_schema: bool,

    /// Drop later specifications that reuse a name instead of emitting both
    pub deduplicate_names: bool,

    /// Placed between a tool group and the tool name
    pub group_separator: String,

    /// Upper bound on values returned by completion methods
    pub max_completion_values: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            generate_output_schema: true,
            deduplicate_names: false,
            group_separator: "_".to_string(),
            max_completion_values: MAX_COMPLETION_VALUES,
        }
    }
}

impl ProviderOptions {
    /// Unique names and small completion lists
    pub fn strict() -> Self {
        Self {
            deduplicate_names: true,
            max_completion_values: 20,
            ..Self::default()
        }
    }

    /// Tools are always published without an output schema and answer in text
    pub fn without_output_schemas() -> Self {
        Self {
            generate_output_schema: false,
            ..Self::default()
        }
    }

    pub fn with_group_separator(mut self, separator: impl Into<String>) -> Self {
        self.group_separator = separator.into();
        self
    }
}
