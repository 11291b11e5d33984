//! Outbound call objects.
//!
//! An [`OutboundCall`] is one in-flight remote invocation. Its `send`
//! operation resolves when the envelope has been handed to the peer's
//! transport: dispatch acknowledgement, not the remote result, which is
//! the inbound side's concern.
//!
//! [`RpcOutboundCall`] is the stock implementation: it snapshots the
//! context's frozen dispatch fields at construction, builds the envelope
//! through the hub's serializer at send time, and races the hand-off
//! against the call's cancellation token.

use crate::args::ArgumentList;
use crate::error::RpcError;
use crate::hub::RpcHub;
use crate::message::{CallId, RpcHeader};
use crate::method::{CallFactory, RpcMethodDef};
use crate::outbound::context::RpcOutboundContext;
use crate::peer::RpcPeer;
use crate::serialization::ArgumentSerializer;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One in-flight remote invocation.
#[async_trait]
pub trait OutboundCall: Send + Sync {
    /// The caller-assigned id of this call.
    fn id(&self) -> CallId;

    /// Serialize the arguments and hand the envelope to the peer.
    ///
    /// Resolves when transport accepts the message, not when the remote
    /// call completes.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Cancelled`] if the call's cancellation token
    /// fires first; serialization and transport failures propagate
    /// unchanged.
    async fn send(&self) -> Result<(), RpcError>;
}

/// Stock outbound call: serializer-built envelope, cancellable hand-off.
pub struct RpcOutboundCall {
    id: CallId,
    context: Arc<RpcOutboundContext>,
    method: Arc<RpcMethodDef>,
    arguments: ArgumentList,
    headers: Vec<RpcHeader>,
    peer: RpcPeer,
    cancellation: CancellationToken,
    serializer: Arc<dyn ArgumentSerializer>,
}

impl std::fmt::Debug for RpcOutboundCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcOutboundCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl RpcOutboundCall {
    /// Build a call from a context prepared by `send_call`.
    ///
    /// The context's dispatch fields (method, arguments, peer) must already
    /// be recorded; headers and cancellation are snapshotted here, matching
    /// the freeze point of the dispatch protocol.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ContextNotPrepared`] if a dispatch field is
    /// absent.
    pub fn from_context(
        id: CallId,
        context: Arc<RpcOutboundContext>,
        serializer: Arc<dyn ArgumentSerializer>,
    ) -> Result<Self, RpcError> {
        let method = context
            .method()
            .ok_or(RpcError::ContextNotPrepared { field: "method" })?;
        let arguments = context
            .arguments()
            .ok_or(RpcError::ContextNotPrepared { field: "arguments" })?;
        let peer = context
            .peer()
            .ok_or(RpcError::ContextNotPrepared { field: "peer" })?;
        let headers = context.headers();
        let cancellation = context.cancellation_token();
        Ok(Self {
            id,
            context,
            method,
            arguments,
            headers,
            peer,
            cancellation,
            serializer,
        })
    }

    /// The context this call belongs to.
    pub fn context(&self) -> &Arc<RpcOutboundContext> {
        &self.context
    }
}

#[async_trait]
impl OutboundCall for RpcOutboundCall {
    fn id(&self) -> CallId {
        self.id
    }

    async fn send(&self) -> Result<(), RpcError> {
        let message = self.serializer.create_message(
            self.id,
            &self.method,
            &self.arguments,
            self.headers.clone(),
        )?;
        trace!(call_id = %self.id, peer = %self.peer.name(), "handing envelope to transport");
        tokio::select! {
            _ = self.cancellation.cancelled() => Err(RpcError::Cancelled),
            result = self.peer.send(message) => result,
        }
    }
}

/// Stock call factory: ids from the hub's sequence, envelopes from the
/// hub's serializer.
pub struct RpcCallFactory {
    hub: Arc<RpcHub>,
}

impl RpcCallFactory {
    /// Create a factory backed by `hub`.
    pub fn new(hub: Arc<RpcHub>) -> Self {
        Self { hub }
    }
}

impl CallFactory for RpcCallFactory {
    fn create_outbound(
        &self,
        context: Arc<RpcOutboundContext>,
    ) -> Result<Arc<dyn OutboundCall>, RpcError> {
        let call = RpcOutboundCall::from_context(
            self.hub.next_call_id(),
            context,
            self.hub.serializer().clone(),
        )?;
        Ok(Arc::new(call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::default_serializer;

    #[test]
    fn test_from_context_requires_dispatch_fields() {
        let context = RpcOutboundContext::new();
        let err = RpcOutboundCall::from_context(CallId::new(1), context, default_serializer())
            .unwrap_err();
        assert!(matches!(
            err,
            RpcError::ContextNotPrepared { field: "method" }
        ));
    }
}
