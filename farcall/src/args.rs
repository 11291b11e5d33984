//! Ordered, typed call arguments.
//!
//! An [`ArgumentList`] is built once at the call site from the method's
//! invocation arguments and is immutable afterward. Slots hold either a
//! serializable value (a dynamic [`serde_json::Value`] tree, so one list
//! type covers every method signature) or a [`CancellationToken`], which is
//! never serialized and never crosses the wire.
//!
//! Which slot (if any) holds the cancellation token is decided by the
//! [`RpcMethodDef`](crate::method::RpcMethodDef), not by the list itself:
//! the list only answers positional queries.

use crate::error::RpcError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// One argument slot.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// A serializable value, stored as a dynamic JSON tree.
    Value(serde_json::Value),

    /// A cancellation-token slot. Serializes as `null`; the token itself
    /// stays on the caller's side of the wire.
    Token(CancellationToken),
}

impl ArgValue {
    /// Build a value slot from any serializable type.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SerializationFailed`] if the value cannot be
    /// represented as a JSON tree.
    pub fn value<T: Serialize>(value: &T) -> Result<Self, RpcError> {
        Ok(ArgValue::Value(serde_json::to_value(value)?))
    }

    /// Build a cancellation-token slot.
    pub fn token(token: CancellationToken) -> Self {
        ArgValue::Token(token)
    }

    /// The kind of this slot.
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Value(_) => ArgKind::Value,
            ArgValue::Token(_) => ArgKind::Token,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Value(a), ArgValue::Value(b)) => a == b,
            // Token slots carry no serializable identity; two token slots
            // are positionally equivalent.
            (ArgValue::Token(_), ArgValue::Token(_)) => true,
            _ => false,
        }
    }
}

/// Slot kind, without the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Serializable value slot.
    Value,
    /// Cancellation-token slot.
    Token,
}

/// Runtime shape of an argument list: arity plus per-slot kinds.
///
/// The shape is the "type tag" a serializer needs to reconstruct a list from
/// a payload: value slots are decoded from the wire, token slots are
/// restored as fresh default tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentShape(Vec<ArgKind>);

impl ArgumentShape {
    /// Create a shape from per-slot kinds.
    pub fn new(kinds: Vec<ArgKind>) -> Self {
        Self(kinds)
    }

    /// Number of slots.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Per-slot kinds, in positional order.
    pub fn kinds(&self) -> &[ArgKind] {
        &self.0
    }
}

/// Ordered, fixed-arity argument sequence for one outbound call.
///
/// Owned exclusively by the
/// [`RpcOutboundContext`](crate::outbound::RpcOutboundContext) for the
/// duration of the call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgumentList {
    slots: Vec<ArgValue>,
}

impl ArgumentList {
    /// Create a list from its slots. Arity and slot kinds are fixed from
    /// here on.
    pub fn new(slots: Vec<ArgValue>) -> Self {
        Self { slots }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the list has no arguments.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Positional access.
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.slots.get(index)
    }

    /// All slots, in positional order.
    pub fn slots(&self) -> &[ArgValue] {
        &self.slots
    }

    /// The runtime shape of this list.
    pub fn shape(&self) -> ArgumentShape {
        ArgumentShape(self.slots.iter().map(ArgValue::kind).collect())
    }

    /// Extract the cancellation token at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::MissingCancellationToken`] if `index` is out of
    /// bounds or the slot does not hold a token.
    pub fn cancellation_token(&self, index: usize) -> Result<CancellationToken, RpcError> {
        match self.slots.get(index) {
            Some(ArgValue::Token(token)) => Ok(token.clone()),
            _ => Err(RpcError::MissingCancellationToken {
                index,
                arity: self.slots.len(),
            }),
        }
    }
}
