//! Argument serialization for outbound calls.
//!
//! Two traits share the work:
//!
//! - [`ArgumentSerializer`] is the object-safe surface the rest of the crate
//!   uses: assemble an [`RpcMessage`] from an argument list, or recover an
//!   argument list from an envelope.
//! - [`PayloadCodec`] is the payload-specific half: encode an argument list
//!   into one concrete wire representation (`Data`) and decode it back.
//!
//! [`CodecArgumentSerializer`] composes the two, writing the envelope
//! assembly once so byte-oriented and structured payload formats only differ
//! in their codec. This mirrors the split between the generic `Serializer`
//! trait and the type-erased message serializer in the rest of the stack:
//! generic methods cannot live behind a trait object, so the erasure happens
//! in a small adapter rather than in every call site.
//!
//! # Representation mismatches
//!
//! Every payload carries the [`FORMAT`](PayloadCodec::FORMAT) tag of the
//! codec that produced it. Deserializing an envelope whose payload was
//! produced by a different codec is a configuration error
//! ([`RpcError::PayloadTypeMismatch`]), never a transient one: it means two
//! sides of the process were wired with different serializers.
//!
//! # Default
//!
//! [`default_serializer`] returns the conventional JSON serializer. It is a
//! plain factory: the hub injects it at construction time, there is no
//! process-global mutable default.

use crate::args::{ArgKind, ArgValue, ArgumentList, ArgumentShape};
use crate::error::RpcError;
use crate::message::{CallId, Payload, RpcHeader, RpcMessage};
use crate::method::RpcMethodDef;
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Object-safe envelope assembly and disassembly.
///
/// Implementations are shared, read-mostly, and safe for concurrent use by
/// many simultaneous calls. Both operations are deterministic and free of
/// side effects on the rest of the system.
pub trait ArgumentSerializer: Send + Sync {
    /// Build a wire envelope for one call attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SerializationFailed`] if the arguments cannot be
    /// encoded.
    fn create_message(
        &self,
        call_id: CallId,
        method: &RpcMethodDef,
        arguments: &ArgumentList,
        headers: Vec<RpcHeader>,
    ) -> Result<RpcMessage, RpcError>;

    /// Recover an argument list from an envelope, given the expected shape.
    ///
    /// Token slots in `shape` are restored as fresh default tokens; tokens
    /// never cross the wire.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::PayloadTypeMismatch`] if the envelope's payload
    /// was produced by a different codec, [`RpcError::ArityMismatch`] if the
    /// decoded data does not fit `shape`, or
    /// [`RpcError::DeserializationFailed`] if decoding fails.
    fn deserialize(
        &self,
        message: &RpcMessage,
        shape: &ArgumentShape,
    ) -> Result<ArgumentList, RpcError>;
}

/// Payload-specific encode/decode for one wire representation.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Concrete wire representation this codec produces.
    type Data: Any + Send + Sync;

    /// Format tag stamped on every payload this codec produces.
    const FORMAT: &'static str;

    /// Encode an argument list into the wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::SerializationFailed`] on encoding failure.
    fn encode(&self, arguments: &ArgumentList) -> Result<Self::Data, RpcError>;

    /// Decode the wire representation back into an argument list of the
    /// given shape.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::DeserializationFailed`] or
    /// [`RpcError::ArityMismatch`] on decoding failure.
    fn decode(&self, data: &Self::Data, shape: &ArgumentShape) -> Result<ArgumentList, RpcError>;
}

/// Adapter implementing [`ArgumentSerializer`] for any [`PayloadCodec`].
///
/// Envelope assembly (call id, service/method names, headers, format tag)
/// lives here; only the argument↔payload conversion is delegated.
pub struct CodecArgumentSerializer<C: PayloadCodec> {
    codec: C,
}

impl<C: PayloadCodec> CodecArgumentSerializer<C> {
    /// Wrap a codec.
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: PayloadCodec> ArgumentSerializer for CodecArgumentSerializer<C> {
    fn create_message(
        &self,
        call_id: CallId,
        method: &RpcMethodDef,
        arguments: &ArgumentList,
        headers: Vec<RpcHeader>,
    ) -> Result<RpcMessage, RpcError> {
        let data = self.codec.encode(arguments)?;
        Ok(RpcMessage::new(
            call_id,
            method.service_name(),
            method.method_name(),
            Payload::new(C::FORMAT, data),
            headers,
        ))
    }

    fn deserialize(
        &self,
        message: &RpcMessage,
        shape: &ArgumentShape,
    ) -> Result<ArgumentList, RpcError> {
        let payload = message.payload();
        if payload.format() != C::FORMAT {
            return Err(RpcError::PayloadTypeMismatch {
                expected: C::FORMAT,
                actual: payload.format(),
            });
        }
        let data = payload
            .downcast_ref::<C::Data>()
            .ok_or(RpcError::PayloadTypeMismatch {
                expected: C::FORMAT,
                actual: payload.format(),
            })?;
        self.codec.decode(data, shape)
    }
}

/// JSON payload codec over `serde_json`.
///
/// Value slots serialize as their JSON trees; token slots serialize as
/// `null` and are restored as fresh default tokens on decode. Human-readable
/// and cross-language, the conventional default for this crate.
#[derive(Debug, Clone, Default)]
pub struct JsonArgumentCodec;

impl JsonArgumentCodec {
    /// Create the JSON codec.
    pub fn new() -> Self {
        Self
    }
}

impl PayloadCodec for JsonArgumentCodec {
    type Data = Vec<u8>;

    const FORMAT: &'static str = "json";

    fn encode(&self, arguments: &ArgumentList) -> Result<Self::Data, RpcError> {
        let values: Vec<serde_json::Value> = arguments
            .slots()
            .iter()
            .map(|slot| match slot {
                ArgValue::Value(value) => value.clone(),
                ArgValue::Token(_) => serde_json::Value::Null,
            })
            .collect();
        Ok(serde_json::to_vec(&values)?)
    }

    fn decode(&self, data: &Self::Data, shape: &ArgumentShape) -> Result<ArgumentList, RpcError> {
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(data).map_err(|e| RpcError::DeserializationFailed {
                message: e.to_string(),
            })?;
        if values.len() != shape.arity() {
            return Err(RpcError::ArityMismatch {
                expected: shape.arity(),
                actual: values.len(),
            });
        }
        let slots = shape
            .kinds()
            .iter()
            .zip(values)
            .map(|(kind, value)| match kind {
                ArgKind::Value => ArgValue::Value(value),
                ArgKind::Token => ArgValue::Token(CancellationToken::new()),
            })
            .collect();
        Ok(ArgumentList::new(slots))
    }
}

/// The conventional default serializer: JSON over `serde_json`.
pub fn default_serializer() -> Arc<dyn ArgumentSerializer> {
    Arc::new(CodecArgumentSerializer::new(JsonArgumentCodec))
}
