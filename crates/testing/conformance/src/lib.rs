//! # Executor conformance suite
//!
//! Behavioral checks every [`Executor`] implementation must pass, whether it
//! runs in-process or behind one of the wire bindings. Each check takes a
//! fresh [`Fixture`] and panics with a descriptive message on failure.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use evolve_execution_conformance::{executor_conformance_tests, Fixture};
//! use evolve_execution_dummy::DummyExecutor;
//!
//! async fn fixture() -> Fixture {
//!     let executor = Arc::new(DummyExecutor::new());
//!     Fixture::new(executor.clone()).with_injector(executor)
//! }
//!
//! executor_conformance_tests!(fixture);
//! ```
//!
//! The macro expands to one `#[tokio::test]` per check, so the calling crate
//! needs `tokio` (with `macros` and `rt-multi-thread`) as a dev-dependency.
//!
//! Errors are compared with [`assert_rejected`]: an exact variant match passes,
//! and so does an [`ExecutorError::Rpc`] whose message carries the expected
//! error text, since the JSON-RPC binding collapses backend errors into one
//! code.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use evolve_execution::conversion::truncate_to_seconds;
use evolve_execution::{Executor, ExecutorError, ExecutorResult, Hash, Tx, TxInjector};

/// Chain ID used by every check.
pub const CHAIN_ID: &str = "test-chain";

/// Number of blocks produced by [`check_multiple_blocks`].
pub const MULTIPLE_BLOCKS: u64 = 10;

/// Executor under test plus whatever keeps it alive.
pub struct Fixture {
    /// The executor the checks call.
    pub executor: Arc<dyn Executor>,
    /// Mempool access, when the backend behind `executor` has a local one.
    pub injector: Option<Arc<dyn TxInjector>>,
    /// Resources dropped with the fixture, e.g. a server handle.
    pub guard: Option<Box<dyn Any + Send>>,
}

impl Fixture {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            injector: None,
            guard: None,
        }
    }

    pub fn with_injector(mut self, injector: Arc<dyn TxInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Keep `guard` alive for as long as the fixture.
    pub fn with_guard(mut self, guard: impl Any + Send) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("has_injector", &self.injector.is_some())
            .field("has_guard", &self.guard.is_some())
            .finish()
    }
}

/// Assert that `result` failed with `expected`.
///
/// Accepts the exact variant, or an `Rpc` error whose message contains the
/// text of `expected`.
pub fn assert_rejected<T: fmt::Debug>(result: ExecutorResult<T>, expected: &ExecutorError) {
    match result {
        Ok(value) => panic!("expected {expected:?}, got Ok({value:?})"),
        Err(err) if &err == expected => {}
        Err(ExecutorError::Rpc { message, .. }) if message.contains(&expected.to_string()) => {}
        Err(err) => panic!("expected {expected:?}, got {err:?}"),
    }
}

/// Assert that an oversized transaction was refused.
///
/// The backend answers [`ExecutorError::TxTooLarge`], checked with
/// [`assert_rejected`]. A transport that refuses the request before it
/// reaches the backend may answer [`ExecutorError::RequestTooLarge`] or a
/// [`ExecutorError::Transport`] error instead. Anything else fails.
pub fn assert_oversize_rejected<T: fmt::Debug>(result: ExecutorResult<T>) {
    match result {
        Err(ExecutorError::RequestTooLarge) | Err(ExecutorError::Transport(_)) => {}
        other => assert_rejected(other, &ExecutorError::TxTooLarge),
    }
}

/// Current time at second resolution, which every binding carries exactly.
fn now() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

async fn init(executor: &dyn Executor) -> (Hash, u64) {
    executor
        .init_chain(now(), 1, CHAIN_ID)
        .await
        .expect("init_chain should succeed")
}

pub async fn check_init_chain(fixture: Fixture) {
    let (state_root, max_bytes) = init(fixture.executor.as_ref()).await;
    assert!(!state_root.is_empty(), "genesis state root must not be empty");
    assert!(max_bytes > 0, "max_bytes must be positive");
}

/// Repeating `init_chain` with identical parameters replays the first result.
pub async fn check_init_chain_is_idempotent(fixture: Fixture) {
    let genesis_time = now();
    let first = fixture
        .executor
        .init_chain(genesis_time, 1, CHAIN_ID)
        .await
        .expect("first init_chain should succeed");
    let second = fixture
        .executor
        .init_chain(genesis_time, 1, CHAIN_ID)
        .await
        .expect("repeated init_chain should succeed");
    assert_eq!(first, second, "repeated init_chain must replay");
}

pub async fn check_get_txs(fixture: Fixture) {
    let Some(injector) = fixture.injector.as_ref() else {
        return;
    };

    let txs = fixture.executor.get_txs().await.expect("get_txs should succeed");
    assert!(txs.is_empty(), "fresh mempool must be empty, got {txs:?}");

    let tx1 = injector.inject_random_tx().await;
    let tx2 = injector.inject_random_tx().await;

    let txs = fixture.executor.get_txs().await.expect("get_txs should succeed");
    assert_eq!(txs.len(), 2);
    assert!(txs.contains(&tx1), "injected tx missing from mempool");
    assert!(txs.contains(&tx2), "injected tx missing from mempool");
}

pub async fn check_execute_txs(fixture: Fixture) {
    let executor = fixture.executor.as_ref();
    let (genesis_root, _) = init(executor).await;

    let (empty_root, max_bytes) = executor
        .execute_txs(&[], 1, now(), &genesis_root)
        .await
        .expect("empty batch should execute");
    assert!(!empty_root.is_empty());
    assert_ne!(empty_root, genesis_root, "execution must change the root");
    assert!(max_bytes > 0);

    let txs = [Tx::from("tx1"), Tx::from("tx2")];
    let (root, _) = executor
        .execute_txs(&txs, 2, now(), &empty_root)
        .await
        .expect("two-tx batch should execute");
    assert!(!root.is_empty());
    assert_ne!(root, empty_root, "execution must change the root");

    // same inputs at another height give the same root
    let (again, _) = executor
        .execute_txs(&txs, 3, now(), &empty_root)
        .await
        .expect("repeated batch should execute");
    assert_eq!(again, root, "execution must be deterministic");
}

pub async fn check_execute_txs_rejections(fixture: Fixture) {
    let executor = fixture.executor.as_ref();
    let (genesis_root, max_bytes) = init(executor).await;

    assert_rejected(
        executor
            .execute_txs(&[Tx::from("tx1")], 1, now(), &Hash::empty())
            .await,
        &ExecutorError::EmptyStateRoot,
    );
    assert_rejected(
        executor
            .execute_txs(&[Tx::from("tx1"), Tx::default()], 1, now(), &genesis_root)
            .await,
        &ExecutorError::EmptyTx,
    );

    let max_bytes = usize::try_from(max_bytes).expect("max_bytes should fit in memory");
    let oversized = Tx::new(vec![0xab; max_bytes + 1]);
    assert_oversize_rejected(
        executor
            .execute_txs(&[oversized], 1, now(), &genesis_root)
            .await,
    );

    // nothing above may leave a pending block behind
    assert_rejected(
        executor.set_final(1).await,
        &ExecutorError::BlockNotFound(1),
    );
}

pub async fn check_executed_txs_leave_mempool(fixture: Fixture) {
    let Some(injector) = fixture.injector.as_ref() else {
        return;
    };
    let executor = fixture.executor.as_ref();
    let (genesis_root, _) = init(executor).await;

    let executed = injector.inject_random_tx().await;
    let kept = injector.inject_random_tx().await;

    executor
        .execute_txs(std::slice::from_ref(&executed), 1, now(), &genesis_root)
        .await
        .expect("execute_txs should succeed");

    let txs = executor.get_txs().await.expect("get_txs should succeed");
    assert_eq!(txs, vec![kept], "executed tx must leave the mempool");
}

pub async fn check_set_final(fixture: Fixture) {
    let executor = fixture.executor.as_ref();
    let (genesis_root, _) = init(executor).await;

    assert_rejected(
        executor.set_final(7).await,
        &ExecutorError::BlockNotFound(7),
    );

    executor
        .execute_txs(&[Tx::from("tx1")], 1, now(), &genesis_root)
        .await
        .expect("execute_txs should succeed");
    executor.set_final(1).await.expect("set_final should succeed");

    assert_rejected(
        executor.set_final(1).await,
        &ExecutorError::BlockNotFound(1),
    );
}

/// Produce [`MULTIPLE_BLOCKS`] blocks, each fetched, executed and finalized.
pub async fn check_multiple_blocks(fixture: Fixture) {
    let executor = fixture.executor.as_ref();
    let (mut prev_root, _) = init(executor).await;

    for height in 1..=MULTIPLE_BLOCKS {
        let injected = match fixture.injector.as_ref() {
            Some(injector) => Some(injector.inject_random_tx().await),
            None => None,
        };

        let txs = executor.get_txs().await.expect("get_txs should succeed");
        if let Some(tx) = &injected {
            assert_eq!(&txs, std::slice::from_ref(tx), "block {height} txs");
        }

        let (root, max_bytes) = executor
            .execute_txs(&txs, height, now(), &prev_root)
            .await
            .unwrap_or_else(|e| panic!("execute_txs at height {height} failed: {e}"));
        assert!(!root.is_empty());
        assert_ne!(root, prev_root, "root must change at height {height}");
        assert!(max_bytes > 0);

        executor
            .set_final(height)
            .await
            .unwrap_or_else(|e| panic!("set_final at height {height} failed: {e}"));

        prev_root = root;
    }
}

/// Generate one `#[tokio::test]` per conformance check.
///
/// `$factory` is an `async fn() -> Fixture` called once per test.
#[macro_export]
macro_rules! executor_conformance_tests {
    ($factory:path) => {
        $crate::executor_conformance_tests!(
            @checks $factory;
            check_init_chain,
            check_init_chain_is_idempotent,
            check_get_txs,
            check_execute_txs,
            check_execute_txs_rejections,
            check_executed_txs_leave_mempool,
            check_set_final,
            check_multiple_blocks,
        );
    };
    (@checks $factory:path; $($check:ident),+ $(,)?) => {
        $(
            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn $check() {
                let fixture: $crate::Fixture = $factory().await;
                $crate::$check(fixture).await;
            }
        )+
    };
}
