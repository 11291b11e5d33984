//! Ambient context propagation across asynchronous continuations.
//!
//! The ambient slot is logical-call-path-local: a continuation resumed
//! after a suspension point still observes its own context, and unrelated
//! calls sharing a worker pool never observe each other's.

use farcall::{ContextFutureExt, RpcError, RpcOutboundContext};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_no_context_in_plain_task() {
    let err = tokio::spawn(async { RpcOutboundContext::current().map(|_| ()) })
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RpcError::NoActiveContext));
}

#[tokio::test]
async fn test_context_follows_suspension_points() {
    let context = RpcOutboundContext::new();
    let expected = context.clone();

    async move {
        for _ in 0..10 {
            let current = RpcOutboundContext::current().unwrap();
            assert!(Arc::ptr_eq(&current, &expected));
            tokio::task::yield_now().await;
        }
    }
    .in_context(context)
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_context_survives_worker_migration() {
    let context = RpcOutboundContext::new();
    let expected = context.clone();

    let task = tokio::spawn(
        async move {
            for _ in 0..50 {
                let current = RpcOutboundContext::current().unwrap();
                assert!(Arc::ptr_eq(&current, &expected));
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        .in_context(context),
    );
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_calls_never_observe_each_other() {
    let run = |name: &'static str| {
        let context = RpcOutboundContext::new();
        let expected = context.clone();
        tokio::spawn(
            async move {
                for _ in 0..100 {
                    let current = RpcOutboundContext::current()
                        .unwrap_or_else(|_| panic!("{name}: lost its context"));
                    assert!(
                        Arc::ptr_eq(&current, &expected),
                        "{name}: observed a foreign context"
                    );
                    tokio::task::yield_now().await;
                }
            }
            .in_context(context),
        )
    };

    let (a, b) = tokio::join!(run("call-a"), run("call-b"));
    a.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn test_worker_slot_clean_between_polls() {
    let context = RpcOutboundContext::new();

    async {
        assert!(RpcOutboundContext::current().is_ok());
        tokio::task::yield_now().await;
    }
    .in_context(context)
    .await;

    // Once the wrapped future completes, nothing lingers on the worker.
    assert!(RpcOutboundContext::current().is_err());
}

#[tokio::test]
async fn test_dropped_future_restores_slot() {
    let context = RpcOutboundContext::new();
    let mut wrapped = Box::pin(
        async {
            std::future::pending::<()>().await;
        }
        .in_context(context),
    );

    // Poll once so the scope has been entered and exited, then drop the
    // future mid-flight, as cancellation would.
    tokio::select! {
        biased;
        _ = &mut wrapped => unreachable!(),
        _ = tokio::task::yield_now() => {}
    }
    drop(wrapped);

    assert!(RpcOutboundContext::current().is_err());
}
