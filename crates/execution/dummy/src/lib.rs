//! In-memory reference executor.
//!
//! [`DummyExecutor`] implements the executor contract with a deterministic
//! placeholder state transition: every state root is the SHA-512 digest of the
//! previous root followed by the raw bytes of each executed transaction. It is
//! the conformance fixture for the wire bindings and the default backend of the
//! `dummy-executor` binary.
//!
//! State per block height:
//!
//! ```text
//! NoBlock --execute_txs(h)--> Pending(root) --set_final(h)--> Final
//!                               ^      |
//!                               +------+ execute_txs(h) overwrites
//! ```
//!
//! Finalizing removes the pending entry, so a second `set_final(h)` fails with
//! [`ExecutorError::BlockNotFound`]. Finality is observable through
//! [`DummyExecutor::state_root`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evolve_execution::validation::{validate_execution, validate_genesis};
use evolve_execution::{Executor, ExecutorError, ExecutorResult, Hash, Tx, TxInjector};
use sha2::{Digest, Sha512};
use tokio::sync::RwLock;

/// Default maximum transaction size in bytes.
pub const DEFAULT_MAX_BYTES: u64 = 1_000_000;

/// Size of the random transactions produced by [`TxInjector::inject_random_tx`].
const RANDOM_TX_LEN: usize = 32;

/// Compute the state root reached by executing `txs` on top of `prev`.
pub fn compute_state_root(prev: &Hash, txs: &[Tx]) -> Hash {
    let mut hasher = Sha512::new();
    hasher.update(prev.as_bytes());
    for tx in txs {
        hasher.update(tx.as_bytes());
    }
    Hash::new(hasher.finalize().to_vec())
}

/// Genesis parameters recorded by the first successful `init_chain`.
#[derive(Debug, Clone)]
struct Genesis {
    genesis_time: DateTime<Utc>,
    initial_height: u64,
    chain_id: String,
    state_root: Hash,
    max_bytes: u64,
}

impl Genesis {
    fn matches(&self, genesis_time: DateTime<Utc>, initial_height: u64, chain_id: &str) -> bool {
        self.genesis_time == genesis_time
            && self.initial_height == initial_height
            && self.chain_id == chain_id
    }
}

/// Chain state owned by one executor instance.
#[derive(Debug)]
struct ChainState {
    /// Last finalized state root.
    state_root: Hash,
    /// Roots computed by `execute_txs` and not yet finalized, by height.
    pending_roots: BTreeMap<u64, Hash>,
    /// Maximum transaction size in bytes.
    max_bytes: u64,
    /// Candidate transactions.
    mempool: Vec<Tx>,
    genesis: Option<Genesis>,
}

impl ChainState {
    fn new(max_bytes: u64) -> Self {
        Self {
            state_root: Hash::empty(),
            pending_roots: BTreeMap::new(),
            max_bytes,
            mempool: Vec::new(),
            genesis: None,
        }
    }

    /// Drop every mempool entry byte-equal to one of `executed`.
    fn remove_executed(&mut self, executed: &[Tx]) {
        if executed.is_empty() {
            return;
        }
        self.mempool.retain(|tx| !executed.contains(tx));
    }
}

/// Reference implementation of the executor contract.
///
/// All state lives behind one `RwLock`: `get_txs` takes the read lock, every
/// mutating call takes the write lock, so no caller observes a half-applied
/// `execute_txs`.
#[derive(Debug)]
pub struct DummyExecutor {
    state: RwLock<ChainState>,
}

impl Default for DummyExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyExecutor {
    /// Create an executor with an empty state and the default `max_bytes`.
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_BYTES)
    }

    /// Create an executor with a custom maximum transaction size.
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            state: RwLock::new(ChainState::new(max_bytes)),
        }
    }

    /// Last finalized state root.
    pub async fn state_root(&self) -> Hash {
        self.state.read().await.state_root.clone()
    }

    /// Pending root for `height`, if any.
    pub async fn pending_root(&self, height: u64) -> Option<Hash> {
        self.state.read().await.pending_roots.get(&height).cloned()
    }

    pub async fn max_bytes(&self) -> u64 {
        self.state.read().await.max_bytes
    }

    /// Change the maximum transaction size reported to callers.
    pub async fn set_max_bytes(&self, max_bytes: u64) {
        self.state.write().await.max_bytes = max_bytes;
    }
}

#[async_trait]
impl Executor for DummyExecutor {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        initial_height: u64,
        chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        validate_genesis(genesis_time, initial_height, chain_id, Utc::now())?;

        let mut state = self.state.write().await;

        if let Some(genesis) = &state.genesis {
            if genesis.matches(genesis_time, initial_height, chain_id) {
                tracing::debug!("init_chain replayed for chain_id={}", chain_id);
                return Ok((genesis.state_root.clone(), genesis.max_bytes));
            }
            tracing::warn!(
                "init_chain rejected: chain already initialized as {} at height {}",
                genesis.chain_id,
                genesis.initial_height
            );
            return Err(ExecutorError::GenesisMismatch);
        }

        let state_root = compute_state_root(&state.state_root, &[]);
        state.state_root = state_root.clone();
        let max_bytes = state.max_bytes;
        state.genesis = Some(Genesis {
            genesis_time,
            initial_height,
            chain_id: chain_id.to_string(),
            state_root: state_root.clone(),
            max_bytes,
        });

        tracing::info!(
            "Chain initialized: chain_id={}, initial_height={}, genesis_time={}, state_root={}",
            chain_id,
            initial_height,
            genesis_time,
            state_root
        );

        Ok((state_root, max_bytes))
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        let state = self.state.read().await;
        Ok(state.mempool.clone())
    }

    async fn execute_txs(
        &self,
        txs: &[Tx],
        block_height: u64,
        timestamp: DateTime<Utc>,
        prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        let mut state = self.state.write().await;

        validate_execution(
            txs,
            block_height,
            timestamp,
            prev_state_root,
            state.max_bytes,
            Utc::now(),
        )?;

        let pending = compute_state_root(prev_state_root, txs);
        if state
            .pending_roots
            .insert(block_height, pending.clone())
            .is_some()
        {
            tracing::debug!("Overwrote pending root at height {}", block_height);
        }
        state.remove_executed(txs);

        tracing::debug!(
            "Executed block {}: {} txs, pending root {}",
            block_height,
            txs.len(),
            pending
        );

        Ok((pending, state.max_bytes))
    }

    async fn set_final(&self, block_height: u64) -> ExecutorResult<()> {
        let mut state = self.state.write().await;

        let root = state
            .pending_roots
            .remove(&block_height)
            .ok_or(ExecutorError::BlockNotFound(block_height))?;
        state.state_root = root;

        tracing::info!(
            "Finalized block {}: state_root={}",
            block_height,
            state.state_root
        );

        Ok(())
    }
}

#[async_trait]
impl TxInjector for DummyExecutor {
    async fn inject_tx(&self, tx: Tx) {
        self.state.write().await.mempool.push(tx);
    }

    async fn inject_random_tx(&self) -> Tx {
        let tx = Tx::new(rand::random::<[u8; RANDOM_TX_LEN]>().to_vec());
        self.inject_tx(tx.clone()).await;
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn some_root() -> Hash {
        Hash::new(vec![1, 2, 3])
    }

    #[tokio::test]
    async fn init_chain_validates_parameters() {
        let now = Utc::now();
        let cases: Vec<(&str, DateTime<Utc>, u64, String, Option<ExecutorError>)> = vec![
            ("valid case", now, 1, "test-chain".to_string(), None),
            ("very large initial height", now, 1_000_000, "test-chain".to_string(), None),
            (
                "zero height",
                now,
                0,
                "test-chain".to_string(),
                Some(ExecutorError::ZeroInitialHeight),
            ),
            (
                "empty chain ID",
                now,
                1,
                String::new(),
                Some(ExecutorError::EmptyChainId),
            ),
            (
                "future genesis time",
                now + TimeDelta::hours(1),
                1,
                "test-chain".to_string(),
                Some(ExecutorError::FutureGenesisTime),
            ),
            (
                "invalid chain ID characters",
                now,
                1,
                "@invalid".to_string(),
                Some(ExecutorError::InvalidChainId),
            ),
            (
                "invalid chain ID length",
                now,
                1,
                "a".repeat(50),
                Some(ExecutorError::ChainIdTooLong),
            ),
        ];

        for (name, genesis_time, initial_height, chain_id, expected) in cases {
            let executor = DummyExecutor::new();
            let result = executor
                .init_chain(genesis_time, initial_height, &chain_id)
                .await;
            match expected {
                Some(err) => assert_eq!(result, Err(err), "case: {name}"),
                None => {
                    let (root, max_bytes) = result.unwrap_or_else(|e| panic!("{name}: {e}"));
                    assert!(!root.is_empty(), "case: {name}");
                    assert!(max_bytes > 0, "case: {name}");
                }
            }
        }
    }

    #[tokio::test]
    async fn init_chain_replays_identical_genesis() {
        let executor = DummyExecutor::new();
        let genesis_time = Utc::now();

        let first = executor
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("first init should succeed");
        let second = executor
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("repeated init should succeed");

        assert_eq!(first, second);
        assert_eq!(executor.state_root().await, first.0);
    }

    #[tokio::test]
    async fn init_chain_rejects_different_genesis() {
        let executor = DummyExecutor::new();
        let genesis_time = Utc::now();
        executor
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("init should succeed");

        let err = executor
            .init_chain(genesis_time, 2, "test-chain")
            .await
            .expect_err("different genesis must be rejected");
        assert_eq!(err, ExecutorError::GenesisMismatch);
    }

    #[tokio::test]
    async fn genesis_root_is_deterministic_across_instances() {
        let genesis_time = Utc::now();
        let a = DummyExecutor::new()
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("init should succeed");
        let b = DummyExecutor::new()
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("init should succeed");
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
    }

    #[tokio::test]
    async fn executed_txs_are_removed_from_mempool() {
        let executor = DummyExecutor::new();
        let tx1 = Tx::new(vec![1, 2, 3]);
        let tx2 = Tx::new(vec![3, 2, 1]);
        executor.inject_tx(tx1.clone()).await;
        executor.inject_tx(tx2.clone()).await;

        // reading does not drain the pool
        for _ in 0..2 {
            let txs = executor.get_txs().await.expect("get_txs should succeed");
            assert_eq!(txs.len(), 2);
            assert!(txs.contains(&tx1));
            assert!(txs.contains(&tx2));
        }

        let (root, _) = executor
            .execute_txs(
                std::slice::from_ref(&tx1),
                1,
                Utc::now(),
                &Hash::new(b"dummy-state-root".to_vec()),
            )
            .await
            .expect("execute_txs should succeed");
        assert!(!root.is_empty());

        let txs = executor.get_txs().await.expect("get_txs should succeed");
        assert_eq!(txs, vec![tx2]);
    }

    #[tokio::test]
    async fn mempool_removal_is_by_byte_equality() {
        let executor = DummyExecutor::new();
        executor.inject_tx(Tx::from("dup")).await;
        executor.inject_tx(Tx::from("dup")).await;
        executor.inject_tx(Tx::from("keep")).await;

        executor
            .execute_txs(&[Tx::from("dup")], 1, Utc::now(), &some_root())
            .await
            .expect("execute_txs should succeed");

        assert_eq!(
            executor.get_txs().await.expect("get_txs should succeed"),
            vec![Tx::from("keep")]
        );
    }

    #[tokio::test]
    async fn execute_txs_rejections() {
        let now = Utc::now();
        let cases: Vec<(&str, Vec<Tx>, u64, DateTime<Utc>, Hash, Option<ExecutorError>)> = vec![
            (
                "valid multiple transactions",
                vec![Tx::from("tx1"), Tx::from("tx2"), Tx::from("tx3")],
                1,
                now,
                some_root(),
                None,
            ),
            (
                "empty state root",
                vec![Tx::from("tx1")],
                1,
                now,
                Hash::empty(),
                Some(ExecutorError::EmptyStateRoot),
            ),
            (
                "future timestamp",
                vec![Tx::from("tx1")],
                1,
                now + TimeDelta::hours(24),
                some_root(),
                Some(ExecutorError::FutureBlockTime),
            ),
            (
                "zero height",
                vec![Tx::from("tx1")],
                0,
                now,
                some_root(),
                Some(ExecutorError::InvalidBlockHeight),
            ),
            (
                "empty transaction",
                vec![Tx::from("tx1"), Tx::default()],
                1,
                now,
                some_root(),
                Some(ExecutorError::EmptyTx),
            ),
        ];

        for (name, txs, height, timestamp, prev, expected) in cases {
            let executor = DummyExecutor::new();
            let result = executor.execute_txs(&txs, height, timestamp, &prev).await;
            match expected {
                Some(err) => assert_eq!(result, Err(err), "case: {name}"),
                None => {
                    let (root, max_bytes) = result.unwrap_or_else(|e| panic!("{name}: {e}"));
                    assert!(!root.is_empty(), "case: {name}");
                    assert!(max_bytes > 0, "case: {name}");
                }
            }
        }
    }

    #[tokio::test]
    async fn oversized_tx_is_rejected_and_pool_untouched() {
        let executor = DummyExecutor::with_max_bytes(4);
        executor.inject_tx(Tx::from("ok")).await;

        let err = executor
            .execute_txs(
                &[Tx::from("ok"), Tx::from("too big")],
                1,
                Utc::now(),
                &some_root(),
            )
            .await
            .expect_err("oversized tx must be rejected");

        assert_eq!(err, ExecutorError::TxTooLarge);
        assert_eq!(executor.pending_root(1).await, None);
        assert_eq!(
            executor.get_txs().await.expect("get_txs should succeed"),
            vec![Tx::from("ok")]
        );
    }

    #[tokio::test]
    async fn empty_tx_wins_over_an_earlier_oversized_tx() {
        let executor = DummyExecutor::with_max_bytes(3);
        let result = executor
            .execute_txs(
                &[Tx::from("toolong"), Tx::default()],
                1,
                Utc::now(),
                &some_root(),
            )
            .await;

        assert_eq!(result, Err(ExecutorError::EmptyTx));
        assert_eq!(executor.pending_root(1).await, None);
    }

    #[tokio::test]
    async fn max_bytes_can_change() {
        let executor = DummyExecutor::new();
        executor.set_max_bytes(2).await;
        assert_eq!(executor.max_bytes().await, 2);

        let (_, max_bytes) = executor
            .execute_txs(&[Tx::from("ab")], 1, Utc::now(), &some_root())
            .await
            .expect("tx at the limit should execute");
        assert_eq!(max_bytes, 2);
    }

    #[tokio::test]
    async fn pending_root_is_overwritten_and_finalized_once() {
        let executor = DummyExecutor::new();
        let (first, _) = executor
            .execute_txs(&[Tx::from("a")], 5, Utc::now(), &some_root())
            .await
            .expect("execute_txs should succeed");
        let (second, _) = executor
            .execute_txs(&[Tx::from("b")], 5, Utc::now(), &some_root())
            .await
            .expect("execute_txs should succeed");
        assert_ne!(first, second);
        assert_eq!(executor.pending_root(5).await, Some(second.clone()));

        executor.set_final(5).await.expect("finalize should succeed");
        assert_eq!(executor.state_root().await, second);
        assert_eq!(executor.pending_root(5).await, None);

        let err = executor
            .set_final(5)
            .await
            .expect_err("second finalize must fail");
        assert_eq!(err, ExecutorError::BlockNotFound(5));
    }

    #[tokio::test]
    async fn execute_does_not_touch_finalized_root() {
        let executor = DummyExecutor::new();
        let (genesis, _) = executor
            .init_chain(Utc::now(), 1, "test-chain")
            .await
            .expect("init should succeed");

        executor
            .execute_txs(&[Tx::from("a")], 1, Utc::now(), &genesis)
            .await
            .expect("execute_txs should succeed");

        assert_eq!(executor.state_root().await, genesis);
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let executor = DummyExecutor::new();
        let genesis_time = Utc::now();
        executor.inject_tx(Tx::from("waiting")).await;

        let (r0, _) = executor
            .init_chain(genesis_time, 1, "test-chain")
            .await
            .expect("init should succeed");
        assert!(!r0.is_empty());

        let (r1, _) = executor
            .execute_txs(&[], 1, genesis_time + TimeDelta::seconds(1), &r0)
            .await
            .expect("empty batch should execute");
        assert_ne!(r1, r0);

        assert_eq!(
            executor.get_txs().await.expect("get_txs should succeed"),
            vec![Tx::from("waiting")]
        );

        executor.set_final(1).await.expect("finalize should succeed");
        let err = executor
            .set_final(1)
            .await
            .expect_err("second finalize must fail");
        assert!(err.to_string().contains("block not found"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_injection_loses_nothing() {
        const INJECTORS: usize = 10;
        const TXS_PER_INJECTOR: usize = 100;

        let executor = Arc::new(DummyExecutor::new());
        let mut tasks = tokio::task::JoinSet::new();
        for id in 0..INJECTORS {
            let executor = Arc::clone(&executor);
            tasks.spawn(async move {
                for j in 0..TXS_PER_INJECTOR {
                    executor.inject_tx(Tx::from(format!("tx-{id}-{j}").as_str())).await;
                }
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.expect("injector task should not panic");
        }

        let txs = executor.get_txs().await.expect("get_txs should succeed");
        assert_eq!(txs.len(), INJECTORS * TXS_PER_INJECTOR);
        let unique: HashSet<_> = txs.into_iter().collect();
        assert_eq!(unique.len(), INJECTORS * TXS_PER_INJECTOR);
    }

    #[tokio::test]
    async fn random_txs_are_distinct() {
        let executor = DummyExecutor::new();
        let a = executor.inject_random_tx().await;
        let b = executor.inject_random_tx().await;
        assert_ne!(a, b);
        assert_eq!(a.len(), RANDOM_TX_LEN);
        assert_eq!(executor.get_txs().await.expect("get_txs should succeed").len(), 2);
    }

    fn arb_txs() -> impl Strategy<Value = Vec<Tx>> {
        proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..64).prop_map(Tx::new),
            0..8,
        )
    }

    proptest! {
        #[test]
        fn prop_execution_is_deterministic(
            prev in proptest::collection::vec(any::<u8>(), 1..64),
            txs in arb_txs(),
            height in 1u64..1_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime should build");
            let prev = Hash::new(prev);
            let now = Utc::now();

            let (a, _) = rt
                .block_on(DummyExecutor::new().execute_txs(&txs, height, now, &prev))
                .expect("valid batch should execute");
            let (b, _) = rt
                .block_on(DummyExecutor::new().execute_txs(&txs, height, now, &prev))
                .expect("valid batch should execute");

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a, compute_state_root(&prev, &txs));
        }

        #[test]
        fn prop_any_empty_tx_fails_the_batch(
            txs in arb_txs(),
            at in 0usize..8,
            max_bytes in 1u64..32,
        ) {
            let mut txs = txs;
            let at = at.min(txs.len());
            txs.insert(at, Tx::default());

            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime should build");
            let result = rt.block_on(DummyExecutor::with_max_bytes(max_bytes).execute_txs(
                &txs,
                1,
                Utc::now(),
                &Hash::new(vec![7]),
            ));
            prop_assert_eq!(result, Err(ExecutorError::EmptyTx));
        }
    }
}
