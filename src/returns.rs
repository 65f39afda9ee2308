//! Return-value classification.
//!
//! The shape of a method's result is fixed by how it was declared: a plain
//! or async method yields a single value, a stream method yields the first
//! item of a stream, and `()` is void. Whether the value passes through
//! untouched is decided by comparing its `TypeId` with the capability's
//! canonical result type. Nothing here inspects types at call time.

use crate::binding::schema::{is_object_schema, schema_value};
use schemars::JsonSchema;
use serde_json::Value;
use std::any::{type_name, Any, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// One value, produced directly or by a future
    Value,
    /// The first item of a stream
    Stream,
    /// No value
    Void,
}

/// How a tool result is packaged into its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnMode {
    Text,
    Structured,
    Void,
}

impl ReturnMode {
    /// Void methods are VOID, methods with an output schema are STRUCTURED,
    /// everything else is TEXT.
    pub fn derive(returns: &ReturnType, output_schema: Option<&Value>) -> Self {
        if returns.shape == ReturnShape::Void {
            Self::Void
        } else if output_schema.is_some() {
            Self::Structured
        } else {
            Self::Text
        }
    }
}

/// Classification of one method's declared result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnType {
    pub shape: ReturnShape,
    /// The produced type is the capability's own result type
    pub passthrough: bool,
    pub type_name: &'static str,
}

impl ReturnType {
    /// Classify `T` for a capability whose canonical result type is `P`.
    pub fn classify<T: 'static, P: 'static>(streamed: bool) -> Self {
        let shape = if TypeId::of::<T>() == TypeId::of::<()>() {
            ReturnShape::Void
        } else if streamed {
            ReturnShape::Stream
        } else {
            ReturnShape::Value
        };
        Self {
            shape,
            passthrough: TypeId::of::<T>() == TypeId::of::<P>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn is_void(&self) -> bool {
        self.shape == ReturnShape::Void
    }
}

/// Output schema for `T`, or `None` unless `T` serializes as a JSON object.
pub fn output_schema_for<T: JsonSchema>() -> Option<Value> {
    let schema = schema_value::<T>();
    is_object_schema(&schema).then_some(schema)
}

/// `Ok(p)` when `T` is `P`, otherwise the value back unchanged.
pub fn pass_through<T: 'static, P: 'static>(value: T) -> Result<P, T> {
    let mut slot = Some(value);
    if let Some(hit) = (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<P>>()
        .and_then(Option::take)
    {
        return Ok(hit);
    }
    match slot {
        Some(value) => Err(value),
        None => unreachable!("slot is only emptied when T and P are the same type"),
    }
}

/// Everything the builders need to know about a handler's result type `T`,
/// and how to turn a `T` into the capability's intermediate value `O`.
pub struct Returns<T, O> {
    pub(crate) kind: ReturnType,
    pub(crate) output_schema: fn() -> Option<Value>,
    pub(crate) convert: fn(T) -> anyhow::Result<O>,
}

impl<T: 'static, O> Returns<T, O> {
    /// `P` is the capability's pass-through result type.
    pub fn new<P: 'static>(
        output_schema: fn() -> Option<Value>,
        convert: fn(T) -> anyhow::Result<O>,
    ) -> Self {
        Self {
            kind: ReturnType::classify::<T, P>(false),
            output_schema,
            convert,
        }
    }

    pub(crate) fn streamed(mut self) -> Self {
        self.kind = ReturnType {
            shape: if self.kind.is_void() {
                ReturnShape::Void
            } else {
                ReturnShape::Stream
            },
            ..self.kind
        };
        self
    }
}

/// No output schema.
pub fn no_schema() -> Option<Value> {
    None
}
