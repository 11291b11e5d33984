//! Outbound call dispatch: the ambient context, scope guards, and call
//! objects.

/// Outbound call objects and the stock call factory.
pub mod call;

/// The ambient outbound call context and its scoping machinery.
pub mod context;

pub use call::{OutboundCall, RpcCallFactory, RpcOutboundCall};
pub use context::{ContextFutureExt, ContextScope, InContext, RpcOutboundContext};
