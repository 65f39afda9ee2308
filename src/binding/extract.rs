//! Extractor types and the [`Handler`] trait.
//!
//! Every closure parameter type implements [`FromSlot`], which names the role
//! it binds to. `Handler` is implemented for closures of up to ten extractor
//! parameters, so a method's binding roles are known statically and the
//! closure is invoked without any runtime signature inspection.

use super::{ArgType, ParamRole, Slot};
use crate::{
    context::{Exchange, RequestContext, TransportContext},
    error::{McpError, McpResult},
    meta::Meta,
    protocol::ProgressToken,
};
use serde::de::DeserializeOwned;
use std::{ops::Deref, sync::Arc};

/// A parameter type that can be filled from a bound [`Slot`].
pub trait FromSlot<R>: Sized + Send + 'static {
    const ROLE: ParamRole;

    /// The type a named argument converts into; `None` for every other role.
    fn argument_type() -> Option<ArgType> {
        None
    }

    fn from_slot(slot: Slot<R>) -> McpResult<Self>;
}

fn unexpected<R>(expected: ParamRole, slot: &Slot<R>) -> McpError {
    McpError::Internal(format!(
        "binding produced a {} slot where a {expected} was expected",
        slot.role()
    ))
}

impl<R> FromSlot<R> for Option<ProgressToken> {
    const ROLE: ParamRole = ParamRole::ProgressToken;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::ProgressToken(token) => Ok(token),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

impl<R> FromSlot<R> for Meta {
    const ROLE: ParamRole = ParamRole::Meta;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::Meta(meta) => Ok(meta),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

impl<R: Send + Sync + 'static> FromSlot<R> for Arc<R> {
    const ROLE: ParamRole = ParamRole::Request;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::Request(request) => Ok(request),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

impl<R> FromSlot<R> for Exchange {
    const ROLE: ParamRole = ParamRole::Exchange;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::Exchange(exchange) => Ok(exchange),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

impl<R> FromSlot<R> for TransportContext {
    const ROLE: ParamRole = ParamRole::TransportContext;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::TransportContext(context) => Ok(context),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

impl<R> FromSlot<R> for RequestContext {
    const ROLE: ParamRole = ParamRole::RequestContext;

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::RequestContext(context) => Ok(context),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

/// A named argument converted from its raw JSON value into `T`.
///
/// The value goes through `serde_json::from_value`, so any `DeserializeOwned`
/// type works, including `Vec<T>`, maps and nested structs. A missing key is
/// `null`, which only converts into types that accept it (such as `Option<T>`).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg<T>(pub T);

impl<T> Arg<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Arg<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<R, T> FromSlot<R> for Arg<T>
where
    T: DeserializeOwned + Send + 'static,
{
    const ROLE: ParamRole = ParamRole::Argument;

    fn argument_type() -> Option<ArgType> {
        Some(ArgType::of::<T>())
    }

    fn from_slot(slot: Slot<R>) -> McpResult<Self> {
        match slot {
            Slot::Argument { name, value } => serde_json::from_value(value)
                .map(Arg)
                .map_err(|source| McpError::ArgumentConversion { name, source }),
            other => Err(unexpected(<Self as FromSlot<R>>::ROLE, &other)),
        }
    }
}

/// A closure that can be invoked with bound slots.
///
/// `Args` is the tuple of the closure's extractor types; it only exists to
/// keep the per-arity implementations apart.
pub trait Handler<R, Args>: Send + Sync + 'static {
    type Output;

    /// Roles of the closure's parameters, in order.
    fn roles() -> Vec<ParamRole>;

    /// Conversion targets of the closure's `Arg` parameters, in order.
    fn argument_types() -> Vec<ArgType>;

    fn call(&self, slots: Vec<Slot<R>>) -> McpResult<Self::Output>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<R, Func, Out, $($ty,)*> Handler<R, ($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Out + Send + Sync + 'static,
            $($ty: FromSlot<R>,)*
        {
            type Output = Out;

            fn roles() -> Vec<ParamRole> {
                vec![$(<$ty as FromSlot<R>>::ROLE),*]
            }

            fn argument_types() -> Vec<ArgType> {
                let targets: Vec<Option<ArgType>> =
                    vec![$(<$ty as FromSlot<R>>::argument_type()),*];
                targets.into_iter().flatten().collect()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, slots: Vec<Slot<R>>) -> McpResult<Out> {
                let expected = <Self as Handler<R, ($($ty,)*)>>::roles().len();
                if slots.len() != expected {
                    return Err(McpError::Internal(format!(
                        "handler takes {expected} parameter(s) but {} were bound",
                        slots.len()
                    )));
                }
                let mut slots = slots.into_iter();
                $(
                    let $ty = match slots.next() {
                        Some(slot) => <$ty as FromSlot<R>>::from_slot(slot)?,
                        None => return Err(McpError::Internal("missing slot".into())),
                    };
                )*
                Ok((self)($($ty),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
