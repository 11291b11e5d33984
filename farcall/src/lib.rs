//! # Farcall
//!
//! The outbound half of an RPC client pipeline: turn a local method
//! invocation into a dispatched, serialized, cancellable call to a remote
//! peer, and classify failures so the retry layer above can decide what to
//! do with them.
//!
//! This crate provides:
//! - **Ambient call contexts**: per-call state available to the whole
//!   logical call path without explicit passing, with stack-disciplined
//!   scope guards and async-aware propagation
//! - **Argument serialization**: envelope assembly generic over wire
//!   payload representations, with a JSON default
//! - **Peer dispatch**: cancellation-aware hand-off of envelopes to
//!   resolved peers
//! - **Transient-error classification**: the retryability primitive for
//!   the retry layer above
//!
//! ## Sending a call
//!
//! ```rust,ignore
//! use farcall::{ArgumentList, ArgValue, RpcHub, RpcMethodDef, RpcOutboundContext};
//!
//! let hub = RpcHub::builder().peer_resolver(resolver).build();
//! let deposit = Arc::new(RpcMethodDef::new(hub, "Accounts", "Deposit", Some(2)));
//!
//! let scope = RpcOutboundContext::new_or_active();
//! let context = scope.context().clone();
//! context.push_header(RpcHeader::new("tenant", "acme"))?;
//! drop(scope);
//!
//! let args = ArgumentList::new(vec![
//!     ArgValue::value(&"alice")?,
//!     ArgValue::value(&1250u64)?,
//!     ArgValue::token(cancel_token),
//! ]);
//! context.send_call(deposit, args).await?;
//! ```
//!
//! Inbound RPC, connection establishment, and retry policy live in the
//! surrounding layers; this crate only guarantees that failures reach them
//! unswallowed.

#![deny(missing_docs)]

// =============================================================================
// Modules
// =============================================================================

/// Ordered, typed call arguments.
pub mod args;

/// Error types for the outbound RPC core.
pub mod error;

/// Shared hub capabilities: peer resolution, serializer, classifier.
pub mod hub;

/// Transport-agnostic wire envelopes.
pub mod message;

/// Static method descriptors.
pub mod method;

/// Outbound dispatch: contexts, scopes, call objects.
pub mod outbound;

/// Resolved peers and the transport hand-off seam.
pub mod peer;

/// Argument serialization over pluggable payload codecs.
pub mod serialization;

/// Transient-error classification.
pub mod transient;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use args::{ArgKind, ArgValue, ArgumentList, ArgumentShape};
pub use error::RpcError;
pub use hub::{PeerResolver, RpcHub, RpcHubBuilder};
pub use message::{CallId, Payload, RpcHeader, RpcMessage};
pub use method::{CallFactory, RpcMethodDef};
pub use outbound::{
    ContextFutureExt, ContextScope, InContext, OutboundCall, RpcCallFactory, RpcOutboundCall,
    RpcOutboundContext,
};
pub use peer::{RpcPeer, Transport};
pub use serialization::{
    default_serializer, ArgumentSerializer, CodecArgumentSerializer, JsonArgumentCodec,
    PayloadCodec,
};
pub use transient::{
    ClassifierFor, DefaultTransientClassifier, TransientErrorClassifier,
    TransientErrorClassifierExt,
};
