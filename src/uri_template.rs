//! URI templates for resource methods.
//!
//! Supports simple `{name}` variables (RFC 6570 level 1). Each variable
//! matches exactly one non-empty path segment.

use crate::{
    error::{McpError, McpResult},
    protocol::JsonObject,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::{collections::HashSet, fmt};

static VARIABLE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}"));

fn is_brace(c: char) -> bool {
    c == '{' || c == '}'
}

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    regex: Regex,
    variables: Vec<String>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> McpResult<Self> {
        let invalid =
            |reason: &str| McpError::InvalidUriTemplate(template.to_string(), reason.into());
        let variable = VARIABLE
            .as_ref()
            .map_err(|e| McpError::Internal(e.to_string()))?;

        let mut variables = Vec::new();
        let mut seen = HashSet::new();
        let mut pattern = String::from("^");
        let mut last = 0;

        for captures in variable.captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let literal = &template[last..whole.start()];
            if literal.contains(is_brace) {
                return Err(invalid("unbalanced or malformed braces"));
            }
            pattern.push_str(&regex::escape(literal));
            pattern.push_str("([^/]+)");
            if !seen.insert(name.as_str()) {
                return Err(invalid(&format!("variable '{}' appears twice", name.as_str())));
            }
            variables.push(name.as_str().to_string());
            last = whole.end();
        }

        let tail = &template[last..];
        if tail.contains(is_brace) {
            return Err(invalid("unbalanced or malformed braces"));
        }
        pattern.push_str(&regex::escape(tail));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            regex,
            variables,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Variable names in order of appearance.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// A template without variables addresses a single fixed URI.
    pub fn is_static(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }

    /// Extract the variable values of `uri` as string arguments.
    pub fn extract(&self, uri: &str) -> Option<JsonObject> {
        let captures = self.regex.captures(uri)?;
        let mut values = JsonObject::new();
        for (index, name) in self.variables.iter().enumerate() {
            let value = captures.get(index + 1)?;
            values.insert(name.clone(), Value::String(value.as_str().to_string()));
        }
        Some(values)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_single_variable() {
        let template = UriTemplate::parse("docs/{id}").unwrap();
        let values = template.extract("docs/42").unwrap();
        assert_eq!(values.get("id"), Some(&json!("42")));
    }

    #[test]
    fn test_variable_matches_one_segment() {
        let template = UriTemplate::parse("docs/{id}").unwrap();
        assert!(template.extract("docs/42/raw").is_none());
        assert!(template.extract("docs/").is_none());
        assert!(!template.matches("other/42"));
    }

    #[test]
    fn test_multiple_variables_and_literals_escaped() {
        let template = UriTemplate::parse("db://{schema}/tables/{table}.json").unwrap();
        assert_eq!(template.variables(), &["schema".to_string(), "table".to_string()]);

        let values = template.extract("db://public/tables/users.json").unwrap();
        assert_eq!(values["schema"], "public");
        assert_eq!(values["table"], "users");
        assert!(template.extract("db://public/tables/usersXjson").is_none());
    }

    #[test]
    fn test_static_template() {
        let template = UriTemplate::parse("config://app").unwrap();
        assert!(template.is_static());
        assert_eq!(template.extract("config://app"), Some(JsonObject::new()));
    }

    #[test]
    fn test_rejects_malformed_templates() {
        assert!(matches!(
            UriTemplate::parse("docs/{id"),
            Err(McpError::InvalidUriTemplate(..))
        ));
        assert!(UriTemplate::parse("docs/{id}/{id}").is_err());
        assert!(UriTemplate::parse("docs/{}").is_err());
    }
}
