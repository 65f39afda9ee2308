//! Argument binding.
//!
//! A bound method is an ordinary closure whose parameters are extractors
//! (see [`extract`]). Each extractor names a [`ParamRole`]. When a provider
//! builds a specification it compiles those roles, together with the
//! method's declared named arguments, into a [`BindingPlan`]. At call time the
//! plan turns the incoming request, the call context and the argument map into
//! one [`Slot`] per parameter, in declaration order.

pub mod extract;
pub mod schema;

use crate::{
    context::{CallContext, Exchange, RequestContext, TransportContext},
    error::{McpError, McpResult},
    meta::Meta,
    protocol::{JsonObject, McpRequest, ProgressToken},
};
use schemars::JsonSchema;
use serde_json::Value;
use std::{any::TypeId, collections::HashSet, fmt, sync::Arc};

pub use extract::{Arg, FromSlot, Handler};

/// What a method parameter receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// The request's progress correlation token, if any
    ProgressToken,
    /// The request's `_meta` map
    Meta,
    /// The full request, reference-identical to the caller's
    Request,
    /// Session exchange (stateful callbacks only)
    Exchange,
    /// Transport key/value context
    TransportContext,
    /// Exchange plus progress token and metadata
    RequestContext,
    /// A named value from the argument map
    Argument,
}

impl ParamRole {
    /// Context roles are mutually exclusive: a method takes at most one.
    pub fn is_context(self) -> bool {
        matches!(
            self,
            Self::Exchange | Self::TransportContext | Self::RequestContext
        )
    }

    /// Roles that can only be satisfied by a live session.
    pub fn requires_session(self) -> bool {
        matches!(self, Self::Exchange | Self::RequestContext)
    }
}

impl fmt::Display for ParamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProgressToken => "progress token",
            Self::Meta => "metadata",
            Self::Request => "request",
            Self::Exchange => "exchange",
            Self::TransportContext => "transport context",
            Self::RequestContext => "request context",
            Self::Argument => "argument",
        };
        f.write_str(name)
    }
}

/// The Rust type an argument is declared as, or converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgType {
    id: TypeId,
    name: &'static str,
}

impl ArgType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Types a typed `Param` can be converted into: `T`, `Option<T>`, or raw JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Accepts {
    declared: ArgType,
    nullable: ArgType,
}

impl Accepts {
    fn of<T: 'static>() -> Self {
        Self {
            declared: ArgType::of::<T>(),
            nullable: ArgType::of::<Option<T>>(),
        }
    }

    fn allows(&self, target: ArgType) -> bool {
        target == self.declared || target == self.nullable || target == ArgType::of::<Value>()
    }
}

/// Declaration of one named argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    schema: Value,
    required: bool,
    description: Option<String>,
    accepts: Option<Accepts>,
}

impl Param {
    /// A required argument whose schema is generated from `T`.
    ///
    /// The handler's matching [`Arg`] must convert into `T`, `Option<T>` or
    /// `serde_json::Value`; anything else is rejected when the plan compiles.
    pub fn new<T: JsonSchema + 'static>(name: impl Into<String>) -> Self {
        Self {
            accepts: Some(Accepts::of::<T>()),
            ..Self::raw(name, schema::schema_value::<T>())
        }
    }

    /// An optional argument whose schema is generated from `T`.
    pub fn optional<T: JsonSchema + 'static>(name: impl Into<String>) -> Self {
        Self::new::<T>(name).required(false)
    }

    /// A required argument with a hand-written schema. Its conversion type
    /// is not checked.
    pub fn raw(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
            description: None,
            accepts: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// How one parameter is filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingRule {
    Fixed(ParamRole),
    FromArgs { name: String },
}

/// Precompiled parameter binding for one method.
#[derive(Debug, Clone)]
pub struct BindingPlan {
    method: String,
    rules: Vec<BindingRule>,
    params: Vec<Param>,
}

impl BindingPlan {
    /// Validate a method's parameter roles against its declared arguments.
    ///
    /// `roles` come from the handler's extractor types, `params` from the
    /// declaration. The n-th [`ParamRole::Argument`] binds the n-th `Param`.
    pub fn compile(method: &str, roles: &[ParamRole], params: &[Param]) -> McpResult<Self> {
        let mut seen_roles = HashSet::new();
        let mut context_role: Option<ParamRole> = None;

        for &role in roles {
            if role == ParamRole::Argument {
                continue;
            }
            if role.is_context() {
                if context_role.is_some() {
                    return Err(McpError::DuplicateRole {
                        method: method.to_string(),
                        role,
                    });
                }
                context_role = Some(role);
            }
            if !seen_roles.insert(role) {
                return Err(McpError::DuplicateRole {
                    method: method.to_string(),
                    role,
                });
            }
        }

        let arg_count = roles.iter().filter(|r| **r == ParamRole::Argument).count();
        if arg_count != params.len() {
            return Err(McpError::invalid_signature(
                method,
                format!(
                    "{arg_count} argument parameter(s) but {} declared argument name(s)",
                    params.len()
                ),
            ));
        }

        let mut names = HashSet::new();
        for param in params {
            if param.name().trim().is_empty() {
                return Err(McpError::invalid_signature(method, "argument name is blank"));
            }
            if !names.insert(param.name()) {
                return Err(McpError::invalid_signature(
                    method,
                    format!("argument '{}' is declared twice", param.name()),
                ));
            }
        }

        let mut declared = params.iter();
        let rules = roles
            .iter()
            .map(|&role| match role {
                // counts were checked above
                ParamRole::Argument => declared.next().map(|p| BindingRule::FromArgs {
                    name: p.name().to_string(),
                }),
                other => Some(BindingRule::Fixed(other)),
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| McpError::invalid_signature(method, "argument count mismatch"))?;

        Ok(Self {
            method: method.to_string(),
            rules,
            params: params.to_vec(),
        })
    }

    /// Check the conversion target of every `Arg` extractor against the type
    /// its `Param` was declared with, so the published schema matches what
    /// the handler accepts. `targets` are in argument order.
    pub fn check_argument_types(self, targets: &[ArgType]) -> McpResult<Self> {
        if targets.len() != self.params.len() {
            return Err(McpError::invalid_signature(
                &self.method,
                "argument count mismatch",
            ));
        }
        for (param, target) in self.params.iter().zip(targets) {
            if let Some(accepts) = param.accepts {
                if !accepts.allows(*target) {
                    return Err(McpError::ArgumentTypeMismatch {
                        method: self.method.clone(),
                        name: param.name().to_string(),
                        declared: accepts.declared.name(),
                        found: target.name(),
                    });
                }
            }
        }
        Ok(self)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn rules(&self) -> &[BindingRule] {
        &self.rules
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn has_role(&self, role: ParamRole) -> bool {
        self.rules.contains(&BindingRule::Fixed(role))
    }

    pub fn requires_session(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule, BindingRule::Fixed(role) if role.requires_session()))
    }

    /// Names of the arguments filled from the argument map, in order.
    pub fn argument_names(&self) -> Vec<&str> {
        self.params.iter().map(Param::name).collect()
    }

    pub fn input_schema(&self) -> Value {
        schema::input_schema(&self.params)
    }

    /// Produce one slot per parameter for a single invocation.
    ///
    /// A key missing from `arguments` binds `null`.
    pub fn bind<R: McpRequest>(
        &self,
        request: &Arc<R>,
        context: &CallContext,
        arguments: &JsonObject,
    ) -> McpResult<Vec<Slot<R>>> {
        self.rules
            .iter()
            .map(|rule| self.bind_one(rule, request, context, arguments))
            .collect()
    }

    fn bind_one<R: McpRequest>(
        &self,
        rule: &BindingRule,
        request: &Arc<R>,
        context: &CallContext,
        arguments: &JsonObject,
    ) -> McpResult<Slot<R>> {
        let slot = match rule {
            BindingRule::FromArgs { name } => Slot::Argument {
                name: name.clone(),
                value: arguments.get(name).cloned().unwrap_or(Value::Null),
            },
            BindingRule::Fixed(ParamRole::ProgressToken) => {
                Slot::ProgressToken(request.progress_token())
            }
            BindingRule::Fixed(ParamRole::Meta) => Slot::Meta(Meta::new(request.meta())),
            BindingRule::Fixed(ParamRole::Request) => Slot::Request(Arc::clone(request)),
            BindingRule::Fixed(ParamRole::Exchange) => Slot::Exchange(self.exchange(context)?),
            BindingRule::Fixed(ParamRole::TransportContext) => {
                Slot::TransportContext(context.transport_context())
            }
            BindingRule::Fixed(ParamRole::RequestContext) => {
                Slot::RequestContext(RequestContext::new(
                    self.exchange(context)?,
                    request.progress_token(),
                    Meta::new(request.meta()),
                ))
            }
            BindingRule::Fixed(ParamRole::Argument) => {
                return Err(McpError::Internal(format!(
                    "unnamed argument rule in plan for '{}'",
                    self.method
                )))
            }
        };
        Ok(slot)
    }

    fn exchange(&self, context: &CallContext) -> McpResult<Exchange> {
        context
            .exchange()
            .cloned()
            .ok_or_else(|| McpError::ExchangeUnavailable {
                method: self.method.clone(),
            })
    }
}

/// A bound value for one parameter.
pub enum Slot<R> {
    ProgressToken(Option<ProgressToken>),
    Meta(Meta),
    Request(Arc<R>),
    Exchange(Exchange),
    TransportContext(TransportContext),
    RequestContext(RequestContext),
    Argument { name: String, value: Value },
}

impl<R> Slot<R> {
    pub fn role(&self) -> ParamRole {
        match self {
            Self::ProgressToken(_) => ParamRole::ProgressToken,
            Self::Meta(_) => ParamRole::Meta,
            Self::Request(_) => ParamRole::Request,
            Self::Exchange(_) => ParamRole::Exchange,
            Self::TransportContext(_) => ParamRole::TransportContext,
            Self::RequestContext(_) => ParamRole::RequestContext,
            Self::Argument { .. } => ParamRole::Argument,
        }
    }
}

impl<R> fmt::Debug for Slot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument { name, value } => f
                .debug_struct("Argument")
                .field("name", name)
                .field("value", value)
                .finish(),
            other => write!(f, "Slot({})", other.role()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CallToolRequest;
    use serde_json::json;

    fn plan(roles: &[ParamRole], params: &[Param]) -> McpResult<BindingPlan> {
        BindingPlan::compile("m", roles, params)
    }

    #[test]
    fn test_compile_zips_arguments_in_order() {
        let plan = plan(
            &[ParamRole::Argument, ParamRole::Exchange, ParamRole::Argument],
            &[Param::new::<String>("a"), Param::new::<i32>("b")],
        )
        .unwrap();

        assert_eq!(
            plan.rules(),
            &[
                BindingRule::FromArgs { name: "a".into() },
                BindingRule::Fixed(ParamRole::Exchange),
                BindingRule::FromArgs { name: "b".into() },
            ]
        );
        assert!(plan.requires_session());
    }

    #[test]
    fn test_two_exchanges_rejected() {
        let err = plan(&[ParamRole::Exchange, ParamRole::Exchange], &[]).unwrap_err();
        assert!(matches!(
            err,
            McpError::DuplicateRole {
                role: ParamRole::Exchange,
                ..
            }
        ));
    }

    #[test]
    fn test_mixed_context_roles_rejected() {
        let err = plan(&[ParamRole::TransportContext, ParamRole::RequestContext], &[]).unwrap_err();
        assert!(matches!(
            err,
            McpError::DuplicateRole {
                role: ParamRole::RequestContext,
                ..
            }
        ));
    }

    #[test]
    fn test_two_requests_rejected() {
        let err = plan(&[ParamRole::Request, ParamRole::Request], &[]).unwrap_err();
        assert!(err.is_binding_error());
    }

    #[test]
    fn test_argument_count_mismatch() {
        let err = plan(&[ParamRole::Argument], &[]).unwrap_err();
        assert!(matches!(err, McpError::InvalidSignature { .. }));

        let err = plan(&[], &[Param::new::<String>("x")]).unwrap_err();
        assert!(matches!(err, McpError::InvalidSignature { .. }));
    }

    #[test]
    fn test_duplicate_argument_names() {
        let err = plan(
            &[ParamRole::Argument, ParamRole::Argument],
            &[Param::new::<String>("x"), Param::new::<String>("x")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_argument_types_must_match_declaration() {
        let roles = [ParamRole::Argument, ParamRole::Argument];
        let params = [Param::new::<String>("a"), Param::optional::<u32>("b")];

        let ok = plan(&roles, &params)
            .unwrap()
            .check_argument_types(&[ArgType::of::<String>(), ArgType::of::<Option<u32>>()]);
        assert!(ok.is_ok());

        let raw_json = plan(&roles, &params)
            .unwrap()
            .check_argument_types(&[ArgType::of::<Value>(), ArgType::of::<u32>()]);
        assert!(raw_json.is_ok());

        let err = plan(&roles, &params)
            .unwrap()
            .check_argument_types(&[ArgType::of::<i64>(), ArgType::of::<u32>()])
            .unwrap_err();
        match err {
            McpError::ArgumentTypeMismatch { ref name, declared, found, .. } => {
                assert_eq!(name, "a");
                assert!(declared.ends_with("String"));
                assert_eq!(found, "i64");
            }
            ref other => panic!("expected ArgumentTypeMismatch, got {other:?}"),
        }
        assert!(err.is_binding_error());
    }

    #[test]
    fn test_raw_params_skip_type_check() {
        let plan = plan(&[ParamRole::Argument], &[Param::raw("any", json!({}))]).unwrap();
        assert!(plan.check_argument_types(&[ArgType::of::<i64>()]).is_ok());
    }

    #[test]
    fn test_bind_missing_key_is_null() {
        let plan = plan(&[ParamRole::Argument], &[Param::new::<String>("name")]).unwrap();
        let request = Arc::new(CallToolRequest::new("m"));
        let slots = plan
            .bind(&request, &CallContext::None, &request.arguments)
            .unwrap();

        match &slots[0] {
            Slot::Argument { name, value } => {
                assert_eq!(name, "name");
                assert_eq!(value, &Value::Null);
            }
            other => panic!("unexpected slot {other:?}"),
        }
    }

    #[test]
    fn test_bind_exchange_without_session_fails() {
        let plan = plan(&[ParamRole::Exchange], &[]).unwrap();
        let request = Arc::new(CallToolRequest::new("m"));
        let err = plan
            .bind(&request, &CallContext::None, &request.arguments)
            .unwrap_err();
        assert!(matches!(err, McpError::ExchangeUnavailable { .. }));
    }

    #[test]
    fn test_bind_request_is_same_allocation() {
        let plan = plan(&[ParamRole::Request, ParamRole::Meta], &[]).unwrap();
        let request = Arc::new(
            CallToolRequest::new("m").with_meta(json!({"k": 1}).as_object().cloned().unwrap()),
        );
        let slots = plan
            .bind(&request, &CallContext::None, &request.arguments)
            .unwrap();

        match (&slots[0], &slots[1]) {
            (Slot::Request(bound), Slot::Meta(meta)) => {
                assert!(Arc::ptr_eq(bound, &request));
                assert_eq!(meta.get("k"), Some(&json!(1)));
            }
            other => panic!("unexpected slots {other:?}"),
        }
    }
}
