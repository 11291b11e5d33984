//! The ambient outbound call context.
//!
//! One [`RpcOutboundContext`] represents one logical outbound call in
//! flight. Application code activates a context into an ambient slot, sets
//! headers, and invokes [`send_call`](RpcOutboundContext::send_call);
//! everything below it on the call path (interceptors, serializers, the
//! call factory) reads the same context without it being passed explicitly.
//!
//! # Ambient storage
//!
//! The slot is thread-local, managed by two cooperating pieces:
//!
//! - [`ContextScope`], a guard that swaps the context in on creation and
//!   restores the previous value on drop, on every exit path including
//!   panics and cancellation. Scopes nest: releasing an inner scope restores the
//!   outer context, not "none". Activating the context that is already
//!   current is a no-op with respect to the restore stack. The guard is
//!   `!Send`, so it cannot be held across a suspension point that might
//!   migrate to another worker.
//! - [`ContextFutureExt::in_context`], a future combinator that re-enters
//!   the context around every poll (in the manner of `tracing`'s
//!   `Instrument`). This is what makes the slot *logical-call-path-local*
//!   rather than plain thread-local: a continuation resumed on another
//!   worker still observes its own context, and two concurrent calls
//!   sharing a worker pool never observe each other's.
//!
//! # At-most-once dispatch
//!
//! `send_call` may run at most once per context. Once it has attached a
//! call object, headers and peer are frozen and a second invocation fails
//! with [`RpcError::AlreadyInvoked`].

use crate::args::ArgumentList;
use crate::error::RpcError;
use crate::message::{CallId, RpcHeader};
use crate::method::RpcMethodDef;
use crate::outbound::call::OutboundCall;
use crate::peer::RpcPeer;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

thread_local! {
    /// Ambient slot for the current worker. Never read directly outside
    /// this module; the scope guard and the poll combinator own it.
    static CURRENT_CONTEXT: RefCell<Option<Arc<RpcOutboundContext>>> =
        const { RefCell::new(None) };
}

/// Mutable state of one outbound call.
#[derive(Default)]
struct ContextInner {
    headers: Vec<RpcHeader>,
    method: Option<Arc<RpcMethodDef>>,
    arguments: Option<ArgumentList>,
    cancellation: Option<CancellationToken>,
    peer: Option<RpcPeer>,
    call: Option<Arc<dyn OutboundCall>>,
    related_call_id: Option<CallId>,
}

/// State for one logical outbound call on the current execution path.
///
/// Exclusively owned by one logical call; the interior lock exists for
/// `Send`/`Sync` plumbing, not for sharing between concurrent calls.
pub struct RpcOutboundContext {
    inner: Mutex<ContextInner>,
}

impl std::fmt::Debug for RpcOutboundContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcOutboundContext").finish_non_exhaustive()
    }
}

impl RpcOutboundContext {
    /// Allocate a fresh, unactivated context.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ContextInner::default()),
        })
    }

    /// The context active on the current execution path.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::NoActiveContext`] outside any active scope:
    /// reading outbound call state with no call in flight is a programming
    /// error.
    pub fn current() -> Result<Arc<Self>, RpcError> {
        CURRENT_CONTEXT
            .with(|cell| cell.borrow().clone())
            .ok_or(RpcError::NoActiveContext)
    }

    /// Guard over the currently active context, or over a freshly allocated
    /// one if no scope is active.
    ///
    /// Lets independent call sites compose: a top-level call creates the
    /// context, and nested calls made synchronously within its scope reuse
    /// it instead of creating a disconnected one.
    pub fn new_or_active() -> ContextScope {
        let context = CURRENT_CONTEXT
            .with(|cell| cell.borrow().clone())
            .unwrap_or_else(RpcOutboundContext::new);
        ContextScope::enter(context)
    }

    /// Activate this context on the current execution path.
    pub fn activate(self: Arc<Self>) -> ContextScope {
        ContextScope::enter(self)
    }

    /// Append a header. Valid only before `send_call`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::AlreadyInvoked`] once a call is attached: headers
    /// are part of the dispatched envelope and frozen from then on.
    pub fn push_header(&self, header: RpcHeader) -> Result<(), RpcError> {
        let mut inner = self.inner.lock();
        if inner.call.is_some() {
            return Err(RpcError::AlreadyInvoked {
                operation: "send_call",
            });
        }
        inner.headers.push(header);
        Ok(())
    }

    /// Snapshot of the headers set so far.
    pub fn headers(&self) -> Vec<RpcHeader> {
        self.inner.lock().headers.clone()
    }

    /// Pre-assign the destination peer, bypassing hub resolution.
    /// Valid only before `send_call`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::AlreadyInvoked`] once a call is attached.
    pub fn set_peer(&self, peer: RpcPeer) -> Result<(), RpcError> {
        let mut inner = self.inner.lock();
        if inner.call.is_some() {
            return Err(RpcError::AlreadyInvoked {
                operation: "send_call",
            });
        }
        inner.peer = Some(peer);
        Ok(())
    }

    /// The resolved (or pre-assigned) peer, if any.
    pub fn peer(&self) -> Option<RpcPeer> {
        self.inner.lock().peer.clone()
    }

    /// Link this call to a causally related prior call.
    pub fn set_related_call_id(&self, call_id: CallId) {
        self.inner.lock().related_call_id = Some(call_id);
    }

    /// Id of the causally related prior call, if any.
    pub fn related_call_id(&self) -> Option<CallId> {
        self.inner.lock().related_call_id
    }

    /// The method recorded by `send_call`, if it ran.
    pub fn method(&self) -> Option<Arc<RpcMethodDef>> {
        self.inner.lock().method.clone()
    }

    /// The argument list recorded by `send_call`, if it ran.
    pub fn arguments(&self) -> Option<ArgumentList> {
        self.inner.lock().arguments.clone()
    }

    /// The cancellation token derived at `send_call` time.
    ///
    /// The non-cancellable default until `send_call` runs, or when the
    /// method declares no cancellation-token argument.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner
            .lock()
            .cancellation
            .clone()
            .unwrap_or_default()
    }

    /// The active outbound call, once dispatched.
    pub fn call(&self) -> Option<Arc<dyn OutboundCall>> {
        self.inner.lock().call.clone()
    }

    /// Dispatch `method` with `arguments`.
    ///
    /// Records the method and arguments on this context, derives the
    /// cancellation token from the argument slot the method declares (or
    /// the non-cancellable default), resolves the peer through the method's
    /// hub unless one was pre-assigned, builds the outbound call through
    /// the method's factory, and sends it.
    ///
    /// Resolves when the envelope has been handed to transport, not when
    /// the remote call completes. If no peer resolves, the call is an
    /// intentionally local no-op: `Ok(())` with no call attached, nothing
    /// serialized, nothing sent.
    ///
    /// # Errors
    ///
    /// - [`RpcError::AlreadyInvoked`] on the second invocation; no envelope
    ///   is constructed.
    /// - [`RpcError::MissingCancellationToken`] if the declared token slot
    ///   does not hold one.
    /// - Any failure from peer resolution, call construction, or the send
    ///   itself, propagated unchanged. This method never retries.
    pub async fn send_call(
        self: Arc<Self>,
        method: Arc<RpcMethodDef>,
        arguments: ArgumentList,
    ) -> Result<(), RpcError> {
        let preassigned = {
            let mut inner = self.inner.lock();
            if inner.call.is_some() {
                return Err(RpcError::AlreadyInvoked {
                    operation: "send_call",
                });
            }

            let token = match method.cancellation_token_index() {
                Some(index) => arguments.cancellation_token(index),
                None => Ok(CancellationToken::new()),
            };
            inner.method = Some(method.clone());
            inner.arguments = Some(arguments);
            inner.cancellation = Some(token?);
            inner.peer.clone()
        };

        // Resolution sees the full context (headers, method, correlation),
        // so the lock is released first.
        let peer = match preassigned {
            Some(peer) => Some(peer),
            None => {
                let resolved = method.hub().resolve_peer(&self);
                self.inner.lock().peer = resolved.clone();
                resolved
            }
        };
        let Some(peer) = peer else {
            trace!(method = %method.full_name(), "no peer resolved, completing as local no-op");
            return Ok(());
        };

        let call = method.call_factory().create_outbound(self.clone())?;
        self.inner.lock().call = Some(call.clone());
        debug!(
            call_id = %call.id(),
            method = %method.full_name(),
            peer = %peer.name(),
            "dispatching outbound call"
        );
        call.send().await
    }
}

/// Scoped activation guard for an [`RpcOutboundContext`].
///
/// Restores the previously ambient context (possibly "none") when dropped,
/// on every exit path. `!Send`: a scope must be released on the thread that
/// entered it.
pub struct ContextScope {
    context: Arc<RpcOutboundContext>,
    previous: Option<Arc<RpcOutboundContext>>,
    restore: bool,
    _not_send: PhantomData<*const ()>,
}

impl ContextScope {
    /// Enter a scope for `context`.
    ///
    /// If `context` is already the current ambient value, the scope is a
    /// no-op: it records nothing and restores nothing, so reentrant
    /// activation cannot corrupt the save/restore stack.
    pub fn enter(context: Arc<RpcOutboundContext>) -> Self {
        CURRENT_CONTEXT.with(|cell| {
            let mut slot = cell.borrow_mut();
            let reentrant = slot
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &context));
            if reentrant {
                Self {
                    context,
                    previous: None,
                    restore: false,
                    _not_send: PhantomData,
                }
            } else {
                let previous = slot.replace(context.clone());
                Self {
                    context,
                    previous,
                    restore: true,
                    _not_send: PhantomData,
                }
            }
        })
    }

    /// The context this scope activated.
    pub fn context(&self) -> &Arc<RpcOutboundContext> {
        &self.context
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if self.restore {
            CURRENT_CONTEXT.with(|cell| {
                *cell.borrow_mut() = self.previous.take();
            });
        }
    }
}

/// Future wrapper created by [`ContextFutureExt::in_context`].
///
/// Enters the context before each poll of the inner future and leaves it
/// afterwards, so the context follows this logical call across suspension
/// points without leaking to other tasks on the same worker.
pub struct InContext<F> {
    future: F,
    context: Arc<RpcOutboundContext>,
}

impl<F: Future> Future for InContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Safety: `future` is structurally pinned and never moved out;
        // `context` is only cloned.
        let this = unsafe { self.get_unchecked_mut() };
        let _scope = ContextScope::enter(this.context.clone());
        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        future.poll(cx)
    }
}

/// Attach an outbound context to a future's entire execution.
pub trait ContextFutureExt: Future + Sized {
    /// Run this future with `context` ambient at every poll.
    fn in_context(self, context: Arc<RpcOutboundContext>) -> InContext<Self> {
        InContext {
            future: self,
            context,
        }
    }
}

impl<F: Future> ContextFutureExt for F {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_fails_outside_scope() {
        let err = RpcOutboundContext::current().unwrap_err();
        assert!(matches!(err, RpcError::NoActiveContext));
    }

    #[test]
    fn test_scope_exposes_exact_instance() {
        let context = RpcOutboundContext::new();
        let scope = context.clone().activate();
        let current = RpcOutboundContext::current().unwrap();
        assert!(Arc::ptr_eq(&current, &context));
        drop(scope);
        assert!(RpcOutboundContext::current().is_err());
    }

    #[test]
    fn test_nested_scopes_restore_in_reverse_order() {
        let a = RpcOutboundContext::new();
        let b = RpcOutboundContext::new();

        let scope_a = a.clone().activate();
        {
            let scope_b = b.clone().activate();
            assert!(Arc::ptr_eq(
                &RpcOutboundContext::current().unwrap(),
                &b
            ));
            drop(scope_b);
        }
        // Releasing B restores A, not "none".
        assert!(Arc::ptr_eq(&RpcOutboundContext::current().unwrap(), &a));
        drop(scope_a);
        assert!(RpcOutboundContext::current().is_err());
    }

    #[test]
    fn test_reentrant_activation_is_noop() {
        let context = RpcOutboundContext::new();
        let outer = context.clone().activate();
        {
            let inner = context.clone().activate();
            assert!(Arc::ptr_eq(
                &RpcOutboundContext::current().unwrap(),
                &context
            ));
            drop(inner);
        }
        // The inner no-op scope must not have cleared the slot.
        assert!(Arc::ptr_eq(
            &RpcOutboundContext::current().unwrap(),
            &context
        ));
        drop(outer);
        assert!(RpcOutboundContext::current().is_err());
    }

    #[test]
    fn test_scope_restores_on_panic() {
        let outer = RpcOutboundContext::new();
        let scope = outer.clone().activate();

        let result = std::panic::catch_unwind(|| {
            let inner = RpcOutboundContext::new().activate();
            let _ = &inner;
            panic!("boom");
        });
        assert!(result.is_err());

        // The panicking scope still restored the outer context.
        assert!(Arc::ptr_eq(
            &RpcOutboundContext::current().unwrap(),
            &outer
        ));
        drop(scope);
    }

    #[test]
    fn test_new_or_active_reuses_current() {
        let first = RpcOutboundContext::new_or_active();
        let top = first.context().clone();

        let nested = RpcOutboundContext::new_or_active();
        assert!(Arc::ptr_eq(nested.context(), &top));
        drop(nested);

        // Still active after the nested (no-op) scope released.
        assert!(Arc::ptr_eq(&RpcOutboundContext::current().unwrap(), &top));
        drop(first);
        assert!(RpcOutboundContext::current().is_err());
    }

    #[test]
    fn test_headers_mutable_until_frozen() {
        let context = RpcOutboundContext::new();
        context
            .push_header(RpcHeader::new("tenant", "acme"))
            .unwrap();
        assert_eq!(context.headers().len(), 1);
    }

    #[test]
    fn test_default_cancellation_token_is_inert() {
        let context = RpcOutboundContext::new();
        assert!(!context.cancellation_token().is_cancelled());
    }
}
