//! Resolved destination peers and the transport hand-off seam.
//!
//! This crate does not establish connections or define socket formats. A
//! [`RpcPeer`] is an opaque handle to an already-provided transport; the
//! only operation the outbound core needs is [`Transport::hand_off`], the
//! suspension point where an envelope leaves this crate. `hand_off`
//! resolves when the transport layer has accepted the message, not when the
//! remote call completes.

use crate::error::RpcError;
use crate::message::RpcMessage;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Accepts envelopes for delivery to one remote endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand an envelope to the transport layer.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] (or any error the transport chooses)
    /// if the message cannot be accepted. The caller layer consults the
    /// [`TransientErrorClassifier`](crate::transient::TransientErrorClassifier)
    /// to decide whether such failures are retryable.
    async fn hand_off(&self, message: RpcMessage) -> Result<(), RpcError>;
}

/// A resolved destination endpoint for outbound calls.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct RpcPeer {
    name: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl RpcPeer {
    /// Create a peer handle over a transport.
    pub fn new(name: impl Into<Arc<str>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    /// Human-readable peer name, for logs and resolver decisions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand an envelope to this peer's transport.
    ///
    /// # Errors
    ///
    /// Propagates the transport's hand-off failure unchanged.
    pub async fn send(&self, message: RpcMessage) -> Result<(), RpcError> {
        self.transport.hand_off(message).await
    }
}

impl fmt::Debug for RpcPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcPeer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
