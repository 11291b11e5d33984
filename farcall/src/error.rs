//! Error types for the outbound RPC core.
//!
//! One enum covers the whole crate, split along the failure taxonomy the
//! retry layer cares about:
//!
//! - **Protocol-usage errors** ([`RpcError::AlreadyInvoked`],
//!   [`RpcError::NoActiveContext`], [`RpcError::MissingCancellationToken`]):
//!   programming mistakes, never retried.
//! - **Configuration errors** ([`RpcError::PayloadTypeMismatch`],
//!   [`RpcError::ArityMismatch`]): a serializer was wired to the wrong
//!   payload representation, never retried.
//! - **Serialization errors**: the payload codec rejected the data.
//! - **Transport errors**: opaque to this crate; the
//!   [`TransientErrorClassifier`](crate::transient::TransientErrorClassifier)
//!   decides whether they are retryable.
//! - **Cancellation** ([`RpcError::Cancelled`]): distinguished from ordinary
//!   failure; never retried.
//!
//! The core itself never retries and never swallows: every failure
//! propagates to the immediate caller.

use thiserror::Error;

/// Errors produced by the outbound call pipeline.
#[derive(Debug, Error)]
pub enum RpcError {
    /// An at-most-once operation was invoked a second time.
    #[error("{operation} already invoked on this context")]
    AlreadyInvoked {
        /// Name of the violated operation.
        operation: &'static str,
    },

    /// The ambient context was read outside any active scope.
    #[error("no active outbound call context")]
    NoActiveContext,

    /// A call object was constructed from a context whose dispatch fields
    /// were never recorded by `send_call`.
    #[error("context not prepared for dispatch: missing {field}")]
    ContextNotPrepared {
        /// The dispatch field that was absent.
        field: &'static str,
    },

    /// The method declared a cancellation-token argument, but the slot does
    /// not hold one.
    #[error("no cancellation token at argument {index} (arity {arity})")]
    MissingCancellationToken {
        /// Declared positional index of the token.
        index: usize,
        /// Arity of the argument list that was searched.
        arity: usize,
    },

    /// An envelope carried a payload representation this serializer does not
    /// speak.
    #[error("payload type mismatch: expected {expected}, got {actual}")]
    PayloadTypeMismatch {
        /// Format the serializer is specialized for.
        expected: &'static str,
        /// Format found in the envelope.
        actual: &'static str,
    },

    /// A decoded argument list did not match the expected shape.
    #[error("argument arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Arity of the expected argument shape.
        expected: usize,
        /// Arity recovered from the payload.
        actual: usize,
    },

    /// Argument encoding failed.
    #[error("serialization failed: {message}")]
    SerializationFailed {
        /// Details from the payload codec.
        message: String,
    },

    /// Argument decoding failed.
    #[error("deserialization failed: {message}")]
    DeserializationFailed {
        /// Details from the payload codec.
        message: String,
    },

    /// The peer transport rejected or lost the hand-off.
    #[error("transport error: {message}")]
    Transport {
        /// Details from the transport layer.
        message: String,
    },

    /// The call's cancellation token fired before the hand-off completed.
    #[error("call cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::SerializationFailed {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RpcError::AlreadyInvoked {
            operation: "send_call",
        };
        assert_eq!(err.to_string(), "send_call already invoked on this context");

        let err = RpcError::MissingCancellationToken { index: 2, arity: 2 };
        assert_eq!(
            err.to_string(),
            "no cancellation token at argument 2 (arity 2)"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<u64>("not a number").unwrap_err();
        let err: RpcError = json_err.into();
        assert!(matches!(err, RpcError::SerializationFailed { .. }));
    }
}
