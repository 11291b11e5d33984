//! Static method descriptors.
//!
//! An [`RpcMethodDef`] describes one remotely invocable method: its owning
//! service and method names, where (if anywhere) a cancellation token sits
//! in its argument list, the factory that builds outbound call objects for
//! it, and the hub that supplies peer resolution. Descriptors are registered
//! once at startup and shared read-only by every call to the method; they
//! are never mutated per call.

use crate::error::RpcError;
use crate::hub::RpcHub;
use crate::outbound::{OutboundCall, RpcCallFactory, RpcOutboundContext};
use std::fmt;
use std::sync::Arc;

/// Builds outbound call objects bound to a context.
///
/// Invoked exactly once per dispatched call, after the peer has resolved
/// and the context's dispatch fields are recorded.
pub trait CallFactory: Send + Sync {
    /// Construct an outbound call for `context`.
    ///
    /// # Errors
    ///
    /// Construction failures propagate unchanged through `send_call`.
    fn create_outbound(
        &self,
        context: Arc<RpcOutboundContext>,
    ) -> Result<Arc<dyn OutboundCall>, RpcError>;
}

/// Static metadata for one remotely invocable method.
pub struct RpcMethodDef {
    service_name: String,
    method_name: String,
    cancellation_token_index: Option<usize>,
    call_factory: Arc<dyn CallFactory>,
    hub: Arc<RpcHub>,
}

impl RpcMethodDef {
    /// Create a descriptor using the stock call factory backed by `hub`'s
    /// serializer and call-id sequence.
    ///
    /// `cancellation_token_index` is the positional slot of the method's
    /// cancellation-token argument, or `None` for methods without one.
    pub fn new(
        hub: Arc<RpcHub>,
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        cancellation_token_index: Option<usize>,
    ) -> Self {
        let call_factory = Arc::new(RpcCallFactory::new(hub.clone()));
        Self::with_call_factory(
            hub,
            service_name,
            method_name,
            cancellation_token_index,
            call_factory,
        )
    }

    /// Create a descriptor with an explicit call factory.
    pub fn with_call_factory(
        hub: Arc<RpcHub>,
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        cancellation_token_index: Option<usize>,
        call_factory: Arc<dyn CallFactory>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            cancellation_token_index,
            call_factory,
            hub,
        }
    }

    /// Owning service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Method name within the service.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// `Service.Method`, for logs and diagnostics.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.service_name, self.method_name)
    }

    /// Positional index of the cancellation-token argument, if the method
    /// declares one.
    pub fn cancellation_token_index(&self) -> Option<usize> {
        self.cancellation_token_index
    }

    /// The factory that builds outbound calls for this method.
    pub fn call_factory(&self) -> &Arc<dyn CallFactory> {
        &self.call_factory
    }

    /// The hub supplying peer resolution for this method.
    pub fn hub(&self) -> &Arc<RpcHub> {
        &self.hub
    }
}

impl fmt::Debug for RpcMethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcMethodDef")
            .field("service_name", &self.service_name)
            .field("method_name", &self.method_name)
            .field("cancellation_token_index", &self.cancellation_token_index)
            .finish_non_exhaustive()
    }
}
