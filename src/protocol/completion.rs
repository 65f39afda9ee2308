//! Argument completion types.

use super::{impl_mcp_request, JsonObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on values in a single completion response.
pub const MAX_COMPLETION_VALUES: usize = 100;

/// What is being completed: a prompt argument or a resource-template variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompleteReference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    Resource { uri: String },
}

impl CompleteReference {
    pub fn prompt(name: impl Into<String>) -> Self {
        Self::Prompt { name: name.into() }
    }

    pub fn resource(uri: impl Into<String>) -> Self {
        Self::Resource { uri: uri.into() }
    }

    /// Registry key: `prompt:{name}` or `resource:{uri}`.
    pub fn key(&self) -> String {
        match self {
            Self::Prompt { name } => format!("prompt:{name}"),
            Self::Resource { uri } => format!("resource:{uri}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteArgument {
    pub name: String,
    pub value: String,
}

/// Values of arguments the client has already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteContext {
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

/// Inbound `completion/complete` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRequest {
    #[serde(rename = "ref")]
    pub reference: CompleteReference,
    pub argument: CompleteArgument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CompleteContext>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonObject>,
}

impl CompleteRequest {
    pub fn new(
        reference: CompleteReference,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            reference,
            argument: CompleteArgument {
                name: name.into(),
                value: value.into(),
            },
            context: None,
            meta: None,
        }
    }

    pub fn with_context(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(CompleteContext::default)
            .arguments
            .insert(name.into(), value.into());
        self
    }
}

impl_mcp_request!(CompleteRequest);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl Completion {
    /// Build a completion, truncating to [`MAX_COMPLETION_VALUES`].
    pub fn new(values: Vec<String>) -> Self {
        Self::capped(values, MAX_COMPLETION_VALUES)
    }

    /// Build a completion holding at most `max` values. When values are
    /// dropped, `total` records the original count and `hasMore` is set.
    pub fn capped(mut values: Vec<String>, max: usize) -> Self {
        if values.len() <= max {
            return Self {
                values,
                total: None,
                has_more: None,
            };
        }
        let total = u32::try_from(values.len()).unwrap_or(u32::MAX);
        values.truncate(max);
        Self {
            values,
            total: Some(total),
            has_more: Some(true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResult {
    pub completion: Completion,
}

impl CompleteResult {
    pub fn new(completion: Completion) -> Self {
        Self { completion }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_wire_format() {
        let reference: CompleteReference =
            serde_json::from_value(json!({"type": "ref/prompt", "name": "greet"})).unwrap();
        assert_eq!(reference, CompleteReference::prompt("greet"));
        assert_eq!(reference.key(), "prompt:greet");
    }

    #[test]
    fn test_completion_truncates_to_limit() {
        let values = (0..150).map(|i| i.to_string()).collect();
        let completion = Completion::new(values);

        assert_eq!(completion.values.len(), MAX_COMPLETION_VALUES);
        assert_eq!(completion.total, Some(150));
        assert_eq!(completion.has_more, Some(true));
    }

    #[test]
    fn test_small_completion_has_no_paging_fields() {
        let completion = Completion::new(vec!["a".into(), "b".into()]);
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json, json!({"values": ["a", "b"]}));
    }

    #[test]
    fn test_request_context_builder() {
        let request = CompleteRequest::new(CompleteReference::resource("db/{table}"), "table", "us")
            .with_context("schema", "public");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ref"]["type"], "ref/resource");
        assert_eq!(json["context"]["arguments"]["schema"], "public");
    }
}
