//! The hub: shared capabilities behind every method descriptor.
//!
//! An [`RpcHub`] carries the process-wide, read-mostly services one outbound
//! call pipeline needs: peer resolution, the argument serializer, the
//! transient-error classifier, and the call-id sequence. Method descriptors
//! keep a back-reference to their hub; the hub itself stays an opaque
//! capability provider with no per-call state.
//!
//! Everything is injected at construction through [`RpcHubBuilder`]; there
//! are no process-global mutable defaults. Conventional defaults exist for
//! every capability except peer resolution, which defaults to "no peer"
//! (every call becomes an intentionally local no-op) and is the one field
//! real deployments always set.

use crate::message::CallId;
use crate::outbound::RpcOutboundContext;
use crate::peer::RpcPeer;
use crate::serialization::{default_serializer, ArgumentSerializer};
use crate::transient::{DefaultTransientClassifier, TransientErrorClassifier};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Resolves the destination peer for one outbound call.
///
/// Invoked at most once per `send_call`, with the full context, so a
/// resolver may route on headers, method identity, or the related-call id.
/// Returning `None` means the call has no reachable destination by design
/// (a local-only operation) and completes as a silent no-op.
pub trait PeerResolver: Send + Sync {
    /// Resolve a peer for `context`, or `None` for local-only calls.
    fn resolve(&self, context: &RpcOutboundContext) -> Option<RpcPeer>;
}

impl<F> PeerResolver for F
where
    F: Fn(&RpcOutboundContext) -> Option<RpcPeer> + Send + Sync,
{
    fn resolve(&self, context: &RpcOutboundContext) -> Option<RpcPeer> {
        self(context)
    }
}

/// Shared capability provider for one outbound call pipeline.
pub struct RpcHub {
    peer_resolver: Arc<dyn PeerResolver>,
    serializer: Arc<dyn ArgumentSerializer>,
    classifier: Arc<dyn TransientErrorClassifier>,
    next_call_id: AtomicU64,
}

impl RpcHub {
    /// Start building a hub.
    pub fn builder() -> RpcHubBuilder {
        RpcHubBuilder::new()
    }

    /// Resolve the destination peer for `context`.
    pub fn resolve_peer(&self, context: &RpcOutboundContext) -> Option<RpcPeer> {
        self.peer_resolver.resolve(context)
    }

    /// The argument serializer shared by this hub's calls.
    pub fn serializer(&self) -> &Arc<dyn ArgumentSerializer> {
        &self.serializer
    }

    /// The transient-error classifier the retry layer should consult.
    pub fn classifier(&self) -> &Arc<dyn TransientErrorClassifier> {
        &self.classifier
    }

    /// Allocate the next call id. Ids are unique per hub and never reused.
    pub fn next_call_id(&self) -> CallId {
        CallId::new(self.next_call_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for RpcHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcHub")
            .field(
                "next_call_id",
                &self.next_call_id.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Builder for [`RpcHub`] with conventional defaults.
///
/// # Example
///
/// ```rust,ignore
/// let hub = RpcHub::builder()
///     .peer_resolver(move |ctx: &RpcOutboundContext| cluster.route(ctx))
///     .build();
/// ```
pub struct RpcHubBuilder {
    peer_resolver: Arc<dyn PeerResolver>,
    serializer: Arc<dyn ArgumentSerializer>,
    classifier: Arc<dyn TransientErrorClassifier>,
}

impl RpcHubBuilder {
    /// Create a builder with the default serializer and classifier and a
    /// "no peer" resolver.
    pub fn new() -> Self {
        Self {
            peer_resolver: Arc::new(|_: &RpcOutboundContext| None::<RpcPeer>),
            serializer: default_serializer(),
            classifier: Arc::new(DefaultTransientClassifier),
        }
    }

    /// Set the peer resolver.
    pub fn peer_resolver(mut self, resolver: impl PeerResolver + 'static) -> Self {
        self.peer_resolver = Arc::new(resolver);
        self
    }

    /// Replace the default argument serializer.
    pub fn serializer(mut self, serializer: Arc<dyn ArgumentSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replace the default transient-error classifier.
    pub fn classifier(mut self, classifier: impl TransientErrorClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Build the hub.
    pub fn build(self) -> Arc<RpcHub> {
        Arc::new(RpcHub {
            peer_resolver: self.peer_resolver,
            serializer: self.serializer,
            classifier: self.classifier,
            next_call_id: AtomicU64::new(1),
        })
    }
}

impl Default for RpcHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_ids_are_unique_and_increasing() {
        let hub = RpcHub::builder().build();
        let a = hub.next_call_id();
        let b = hub.next_call_id();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_default_resolver_yields_no_peer() {
        let hub = RpcHub::builder().build();
        let context = RpcOutboundContext::new();
        assert!(hub.resolve_peer(&context).is_none());
    }
}
