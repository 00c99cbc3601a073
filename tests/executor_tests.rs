#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::wildcard_enum_match_arm)]

/// Tests for the delivery contract
///
/// 1. Exactly-once delivery for successes and failures
/// 2. Panic containment
/// 3. Cancellation before, during and after a run
/// 4. Isolation between concurrent invocations
/// 5. Scope shutdown
use async_trait::async_trait;
use interactor::{
    ErrorInfo, ErrorKind, ExecutionScope, ExecutionStatus, Executor, FnOperation, Operation,
    Outcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Divides 84 by its input with no guard against zero
struct DivideInto84;

#[async_trait]
impl Operation for DivideInto84 {
    type Params = i32;
    type Output = i32;

    async fn run(&self, divisor: i32) -> Outcome<i32> {
        Outcome::Success(84 / divisor)
    }
}

/// Echoes its input back after a short, input-dependent delay
struct DelayedEcho;

#[async_trait]
impl Operation for DelayedEcho {
    type Params = u64;
    type Output = u64;

    async fn run(&self, n: u64) -> Outcome<u64> {
        tokio::time::sleep(Duration::from_millis(n % 7)).await;
        Outcome::Success(n)
    }
}

/// Helper to set up a scope on the test runtime
fn setup_scope(name: &str) -> Arc<ExecutionScope> {
    Arc::new(ExecutionScope::current(name).unwrap())
}

/// Collects every delivery so tests can assert on counts
struct Deliveries<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for Deliveries<T> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Send + 'static> Deliveries<T> {
    fn callback(&self) -> Box<dyn FnOnce(T) + Send> {
        let seen = Arc::clone(&self.seen);
        Box::new(move |value| seen.lock().unwrap().push(value))
    }

    fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_success_delivered_exactly_once() {
    let scope = setup_scope("success");
    let op = FnOperation::new("ok", |n: i32| async move {
        assert_eq!(n, 42);
        Outcome::Success("ok".to_string())
    });
    let executor = Executor::new(Arc::new(op), scope.clone());
    let deliveries = Deliveries::default();

    let handle = executor.execute(42, deliveries.callback()).unwrap();
    assert_eq!(handle.wait().await, ExecutionStatus::Completed);
    assert_eq!(scope.shutdown(Duration::from_secs(1)).await, 0);

    assert_eq!(deliveries.take(), vec![Outcome::Success("ok".to_string())]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_divide_by_zero_delivered_as_failure() {
    let scope = setup_scope("divide");
    let executor = Executor::new(Arc::new(DivideInto84), scope.clone());
    let deliveries = Deliveries::default();

    let handle = executor.execute(0, deliveries.callback()).unwrap();
    assert_eq!(handle.wait().await, ExecutionStatus::Failed);

    let delivered = deliveries.take();
    assert_eq!(delivered.len(), 1);
    let info = delivered.into_iter().next().unwrap().failure().unwrap();
    assert_eq!(info.kind, ErrorKind::Panic);
    assert!(
        info.message.contains("divide by zero"),
        "Failure should identify the error: {}",
        info.message
    );

    // The runtime survived and the scope has nothing left over
    let deliveries = Deliveries::default();
    let handle = executor.execute(2, deliveries.callback()).unwrap();
    assert_eq!(handle.wait().await, ExecutionStatus::Completed);
    assert_eq!(deliveries.take(), vec![Outcome::Success(42)]);
    assert_eq!(scope.shutdown(Duration::from_secs(1)).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_do_not_cross_talk() {
    let scope = setup_scope("fanout");
    let executor = Executor::new(Arc::new(DelayedEcho), scope.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handles = Vec::new();
    for n in 0..100_u64 {
        let tx = tx.clone();
        let handle = executor
            .execute(n, move |outcome| {
                tx.send((n, outcome)).unwrap();
            })
            .unwrap();
        handles.push(handle);
    }
    drop(tx);

    let mut delivered = Vec::new();
    while let Some((n, outcome)) = rx.recv().await {
        assert_eq!(outcome, Outcome::Success(n), "Result for {n} crossed over");
        delivered.push(n);
    }

    delivered.sort_unstable();
    assert_eq!(delivered, (0..100).collect::<Vec<_>>());
    for handle in &handles {
        assert_eq!(handle.status(), ExecutionStatus::Completed);
    }
    assert_eq!(scope.shutdown(Duration::from_secs(1)).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_immediately_suppresses_delivery() {
    let scope = setup_scope("cancel");
    let op = FnOperation::new("slow", |_: ()| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Outcome::Success(())
    });
    let executor = Executor::new(Arc::new(op), scope.clone());
    let deliveries = Deliveries::default();

    let handle = executor.execute((), deliveries.callback()).unwrap();
    assert!(handle.cancel());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(deliveries.take().is_empty());
    assert_eq!(handle.status(), ExecutionStatus::Cancelled);
    assert_eq!(handle.wait().await, ExecutionStatus::Cancelled);
    assert_eq!(scope.active_tasks(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_races_resolve_to_one_terminal_state() {
    let scope = setup_scope("race");
    let op = FnOperation::new("instant", |n: usize| async move { Outcome::Success(n) });
    let executor = Executor::new(Arc::new(op), scope.clone());
    let delivered = Arc::new(AtomicUsize::new(0));

    for n in 0..200 {
        let counter = Arc::clone(&delivered);
        let before = counter.load(Ordering::SeqCst);
        let handle = executor
            .execute(n, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        if n % 3 == 0 {
            tokio::task::yield_now().await;
        }
        let cancelled = handle.cancel();
        let status = handle.wait().await;
        let after = delivered.load(Ordering::SeqCst);

        if cancelled {
            assert_eq!(status, ExecutionStatus::Cancelled);
            assert_eq!(after, before, "Cancelled invocation {n} delivered");
        } else {
            assert_eq!(status, ExecutionStatus::Completed);
            assert_eq!(after, before + 1, "Completed invocation {n} not delivered once");
        }
    }

    assert_eq!(scope.shutdown(Duration::from_secs(1)).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_cancels_stragglers() {
    let scope = setup_scope("teardown");
    let op = FnOperation::new("forever", |_: ()| async {
        std::future::pending::<()>().await;
        Outcome::<()>::Failure(ErrorInfo::new(ErrorKind::Operation, "unreachable"))
    });
    let executor = Executor::new(Arc::new(op), scope.clone());
    let deliveries = Deliveries::default();

    let first = executor.execute((), deliveries.callback()).unwrap();
    let second = executor.execute((), deliveries.callback()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(scope.shutdown(Duration::from_millis(50)).await, 2);
    assert_eq!(first.wait().await, ExecutionStatus::Cancelled);
    assert_eq!(second.wait().await, ExecutionStatus::Cancelled);
    assert!(deliveries.take().is_empty());
    assert!(executor.execute((), deliveries.callback()).is_err());
}

#[test]
fn test_owned_scope_serves_synchronous_callers() {
    let scope = Arc::new(
        ExecutionScope::with_runtime("sync-caller", &interactor::config::ScopeConfig::default())
            .unwrap(),
    );
    let executor = Executor::new(Arc::new(DivideInto84), scope.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    executor
        .execute(4, move |outcome| tx.send(outcome).unwrap())
        .unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Outcome::Success(21));
    assert_eq!(scope.shutdown_blocking(Duration::from_secs(1)).unwrap(), 0);
}
