//! JSON-Schema generation helpers.

use super::Param;
use crate::protocol::JsonObject;
use schemars::{generate::SchemaSettings, JsonSchema};
use serde_json::{json, Map, Value};

/// Schema of `T` with every subschema inlined and the `$schema` marker removed.
pub fn schema_value<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft2020_12()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let mut value = Value::from(schema);
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
    }
    value
}

/// Whether a schema describes a JSON object.
pub fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
}

/// JSON types a schema's `type` keyword allows.
fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(ty)) => vec![ty.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Turn string arguments into numbers or booleans where the declared schema
/// asks for them and does not also accept a string.
///
/// URI variables and completion context values always arrive as text.
pub fn coerce_text_arguments(params: &[Param], arguments: &mut JsonObject) {
    for param in params {
        let Some(Value::String(text)) = arguments.get(param.name()) else {
            continue;
        };
        let types = declared_types(param.schema());
        if types.is_empty() || types.contains(&"string") {
            continue;
        }
        let coerced = match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Bool(flag)) if types.contains(&"boolean") => Value::Bool(flag),
            Ok(Value::Number(n)) if types.contains(&"number") => Value::Number(n),
            Ok(Value::Number(n)) if types.contains(&"integer") && !n.is_f64() => Value::Number(n),
            _ => continue,
        };
        arguments.insert(param.name().to_string(), coerced);
    }
}

/// Object schema whose properties are the declared named arguments.
pub fn input_schema<'a>(params: impl IntoIterator<Item = &'a Param>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut schema = param.schema().clone();
        if let Some(object) = schema.as_object_mut() {
            // root schemas carry the type name as title
            object.remove("title");
            if let Some(description) = param.description_text() {
                object.insert("description".into(), Value::String(description.to_string()));
            }
        }
        properties.insert(param.name().to_string(), schema);
        if param.is_required() {
            required.push(Value::String(param.name().to_string()));
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}
