//! Transport-agnostic wire envelope for outbound calls.
//!
//! An [`RpcMessage`] is created by the argument serializer at send time and
//! handed to the resolved peer. Call id, service name, and method name are
//! set once at construction and never change; the whole envelope is
//! immutable after creation. Whether an envelope outlives the hand-off (for
//! a retried resend) is the retry layer's decision, not the envelope's.
//!
//! The payload is generic over its wire representation: a byte-oriented
//! codec stores `Vec<u8>`, a structured codec can store its own tree type.
//! [`Payload`] erases that type behind a format tag so envelopes flow
//! through one non-generic pipeline, while a serializer specialized to a
//! different representation still detects the mismatch at runtime.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Caller-assigned identifier for one logical call.
///
/// Unique within the issuing hub's lifetime; also used as the correlation
/// target for causally related calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    /// Wrap a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One key/value metadata header attached to an outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl RpcHeader {
    /// Create a header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Type-erased serialized argument data plus the format that produced it.
pub struct Payload {
    format: &'static str,
    data: Box<dyn Any + Send + Sync>,
}

impl Payload {
    /// Wrap serialized data produced by the codec identified by `format`.
    pub fn new<T: Any + Send + Sync>(format: &'static str, data: T) -> Self {
        Self {
            format,
            data: Box::new(data),
        }
    }

    /// The format tag of the codec that produced this payload.
    pub fn format(&self) -> &'static str {
        self.format
    }

    /// Borrow the data as its concrete representation, if it matches.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Wire unit for one outbound call attempt.
#[derive(Debug)]
pub struct RpcMessage {
    call_id: CallId,
    service: String,
    method: String,
    payload: Payload,
    headers: Vec<RpcHeader>,
}

impl RpcMessage {
    /// Assemble an envelope. All fields are frozen from here on.
    pub fn new(
        call_id: CallId,
        service: impl Into<String>,
        method: impl Into<String>,
        payload: Payload,
        headers: Vec<RpcHeader>,
    ) -> Self {
        Self {
            call_id,
            service: service.into(),
            method: method.into(),
            payload,
            headers,
        }
    }

    /// The caller-assigned call id.
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Owning service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method name within the service.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The serialized argument payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Headers attached at send time.
    pub fn headers(&self) -> &[RpcHeader] {
        &self.headers
    }
}
