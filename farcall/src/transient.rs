//! Transient-error classification.
//!
//! The outbound core never retries; the layer above owns the retry loop and
//! consults a [`TransientErrorClassifier`] to decide whether a failure is
//! worth another attempt. Classification is a pure function of the error
//! value: no ambient state, no mutation.
//!
//! [`ClassifierFor`] exists for call sites whose types expect a classifier
//! parameterized by a context type. It wraps a context-free classifier and
//! delegates every verdict unchanged; the type parameter carries no logic.

use crate::error::RpcError;
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

/// Decides whether an error represents a transient (retryable) condition.
pub trait TransientErrorClassifier: Send + Sync + 'static {
    /// `true` if `error` is safe to retry.
    ///
    /// Must depend only on `error` itself.
    fn is_transient(&self, error: &(dyn Error + 'static)) -> bool;
}

/// Stock classifier for this crate's error taxonomy.
///
/// Transport failures are transient. Protocol-usage, configuration, and
/// serialization errors are permanent: retrying a misuse or a miswired
/// serializer cannot succeed. Cancellation is not a retry signal. Errors
/// from outside this crate's taxonomy are treated as permanent; transports
/// raising their own error types should supply their own classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransientClassifier;

impl TransientErrorClassifier for DefaultTransientClassifier {
    fn is_transient(&self, error: &(dyn Error + 'static)) -> bool {
        match error.downcast_ref::<RpcError>() {
            Some(RpcError::Transport { .. }) => true,
            Some(_) => false,
            None => error.downcast_ref::<std::io::Error>().is_some(),
        }
    }
}

/// A context-free classifier narrowed to a call-site context type `C`.
///
/// Delegates every call to the wrapped classifier; the type parameter only
/// satisfies type-level expectations at the call site.
pub struct ClassifierFor<C: ?Sized> {
    inner: Arc<dyn TransientErrorClassifier>,
    _scope: PhantomData<fn() -> *const C>,
}

impl<C: ?Sized> ClassifierFor<C> {
    /// Narrow `inner` to context type `C`.
    pub fn new(inner: Arc<dyn TransientErrorClassifier>) -> Self {
        Self {
            inner,
            _scope: PhantomData,
        }
    }
}

impl<C: ?Sized> Clone for ClassifierFor<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _scope: PhantomData,
        }
    }
}

impl<C: ?Sized + 'static> TransientErrorClassifier for ClassifierFor<C> {
    fn is_transient(&self, error: &(dyn Error + 'static)) -> bool {
        self.inner.is_transient(error)
    }
}

/// Narrowing extension for shared classifiers.
pub trait TransientErrorClassifierExt {
    /// View this classifier as one parameterized for context type `C`.
    fn for_scope<C: ?Sized>(&self) -> ClassifierFor<C>;
}

impl TransientErrorClassifierExt for Arc<dyn TransientErrorClassifier> {
    fn for_scope<C: ?Sized>(&self) -> ClassifierFor<C> {
        ClassifierFor::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::RpcOutboundContext;

    fn classify(error: &RpcError) -> bool {
        DefaultTransientClassifier.is_transient(error)
    }

    #[test]
    fn test_transport_errors_are_transient() {
        assert!(classify(&RpcError::Transport {
            message: "connection reset".to_string(),
        }));
    }

    #[test]
    fn test_usage_errors_are_permanent() {
        assert!(!classify(&RpcError::AlreadyInvoked {
            operation: "send_call",
        }));
        assert!(!classify(&RpcError::NoActiveContext));
        assert!(!classify(&RpcError::PayloadTypeMismatch {
            expected: "json",
            actual: "debug",
        }));
        assert!(!classify(&RpcError::Cancelled));
    }

    #[test]
    fn test_io_errors_are_transient() {
        let err = std::io::Error::other("socket closed");
        assert!(DefaultTransientClassifier.is_transient(&err));
    }

    #[test]
    fn test_narrowed_classifier_matches_base() {
        let base: Arc<dyn TransientErrorClassifier> = Arc::new(DefaultTransientClassifier);
        let narrowed = base.for_scope::<RpcOutboundContext>();

        let samples: Vec<RpcError> = vec![
            RpcError::Transport {
                message: "timeout".to_string(),
            },
            RpcError::NoActiveContext,
            RpcError::Cancelled,
            RpcError::SerializationFailed {
                message: "bad value".to_string(),
            },
        ];
        for err in &samples {
            assert_eq!(narrowed.is_transient(err), base.is_transient(err));
        }
    }

    #[test]
    fn test_narrowing_is_context_type_agnostic() {
        let base: Arc<dyn TransientErrorClassifier> = Arc::new(DefaultTransientClassifier);
        let err = RpcError::Transport {
            message: "reset".to_string(),
        };
        assert!(base.for_scope::<RpcOutboundContext>().is_transient(&err));
        assert!(base.for_scope::<str>().is_transient(&err));
        assert!(base.for_scope::<()>().is_transient(&err));
    }
}
