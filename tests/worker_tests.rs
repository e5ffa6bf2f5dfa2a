use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use ethers::utils::parse_ether;
use tokio::sync::Notify;
use tokio::time::sleep;

use token_faucet::chain::TransferExecutor;
use token_faucet::faucet::{DispatchWorker, FaucetState};

/// Scripted executor: records submission order, can fail specific
/// accounts, and can hold the confirmation wait open until released.
struct MockExecutor {
    submits: Mutex<Vec<Address>>,
    fail_accounts: Mutex<HashSet<Address>>,
    revert_accounts: Mutex<HashSet<Address>>,
    reverting_hashes: Mutex<HashSet<TxHash>>,
    block_confirm: AtomicBool,
    release: Notify,
    active: AtomicUsize,
    max_active: AtomicUsize,
    next_hash: AtomicU64,
}

impl MockExecutor {
    fn new() -> Self {
        Self {
            submits: Mutex::new(Vec::new()),
            fail_accounts: Mutex::new(HashSet::new()),
            revert_accounts: Mutex::new(HashSet::new()),
            reverting_hashes: Mutex::new(HashSet::new()),
            block_confirm: AtomicBool::new(false),
            release: Notify::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            next_hash: AtomicU64::new(1),
        }
    }

    fn fail_for(&self, account: Address) {
        self.fail_accounts.lock().unwrap().insert(account);
    }

    /// Submission succeeds but the transaction reverts on-chain.
    fn revert_for(&self, account: Address) {
        self.revert_accounts.lock().unwrap().insert(account);
    }

    fn submitted(&self) -> Vec<Address> {
        self.submits.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferExecutor for MockExecutor {
    async fn submit(&self, account: Address, _amount: U256) -> Result<TxHash> {
        self.submits.lock().unwrap().push(account);

        if self.fail_accounts.lock().unwrap().contains(&account) {
            anyhow::bail!("broadcast rejected");
        }

        // In-flight span runs from here to the end of confirm.
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let tx_hash = TxHash::from_low_u64_be(self.next_hash.fetch_add(1, Ordering::SeqCst));
        if self.revert_accounts.lock().unwrap().contains(&account) {
            self.reverting_hashes.lock().unwrap().insert(tx_hash);
        }
        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<()> {
        if self.block_confirm.load(Ordering::SeqCst) {
            self.release.notified().await;
        } else {
            sleep(Duration::from_millis(10)).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.reverting_hashes.lock().unwrap().contains(&tx_hash) {
            anyhow::bail!("transaction {:?} reverted", tx_hash);
        }
        Ok(())
    }
}

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn start_worker(state: &Arc<FaucetState>, executor: &Arc<MockExecutor>) {
    let worker = Arc::new(DispatchWorker::new(
        state.clone(),
        executor.clone(),
        parse_ether("25.0").unwrap(),
    ));
    worker.spawn();
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_dispatch_is_fifo() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());

    state.try_enqueue(addr(1)).unwrap();
    state.try_enqueue(addr(2)).unwrap();
    state.try_enqueue(addr(3)).unwrap();

    start_worker(&state, &executor);

    let exec = executor.clone();
    wait_until("all submissions", move || exec.submitted().len() == 3).await;
    assert_eq!(executor.submitted(), vec![addr(1), addr(2), addr(3)]);
}

#[tokio::test]
async fn test_single_submission_in_flight() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());

    for n in 1..=4 {
        state.try_enqueue(addr(n)).unwrap();
    }

    start_worker(&state, &executor);

    let exec = executor.clone();
    wait_until("all transfers settled", move || {
        exec.submitted().len() == 4 && exec.active.load(Ordering::SeqCst) == 0
    })
    .await;

    assert_eq!(executor.max_active.load(Ordering::SeqCst), 1);
    assert!(state.processing_snapshot().is_empty());
}

#[tokio::test]
async fn test_submit_failure_drops_request_and_continues() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());
    executor.fail_for(addr(3));

    state.try_enqueue(addr(3)).unwrap();
    state.try_enqueue(addr(4)).unwrap();

    start_worker(&state, &executor);

    let exec = executor.clone();
    wait_until("worker to move past the failure", move || {
        exec.submitted().len() == 2
    })
    .await;

    // The failed request never entered the registry and the next one
    // was dispatched.
    assert!(!state.is_processing(addr(3)));
    assert_eq!(executor.submitted(), vec![addr(3), addr(4)]);

    let st = state.clone();
    wait_until("registry to drain", move || st.processing_snapshot().is_empty()).await;
}

#[tokio::test]
async fn test_confirm_failure_clears_registry_and_continues() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());
    executor.revert_for(addr(5));

    state.try_enqueue(addr(5)).unwrap();
    state.try_enqueue(addr(6)).unwrap();

    start_worker(&state, &executor);

    let exec = executor.clone();
    wait_until("worker to move past the revert", move || {
        exec.submitted().len() == 2
    })
    .await;
    assert_eq!(executor.submitted(), vec![addr(5), addr(6)]);

    // The reverted transfer leaves the registry exactly once; nothing
    // dangles and the reverted account may request again.
    let st = state.clone();
    wait_until("registry to drain", move || st.processing_snapshot().is_empty()).await;
    assert!(!state.is_processing(addr(5)));
    assert!(state.try_enqueue(addr(5)).is_ok());
}

#[tokio::test]
async fn test_registry_tracks_inflight_confirmation() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());
    executor.block_confirm.store(true, Ordering::SeqCst);

    state.try_enqueue(addr(7)).unwrap();
    start_worker(&state, &executor);

    let st = state.clone();
    wait_until("entry to appear in registry", move || st.is_processing(addr(7))).await;

    let snapshot = state.processing_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].account, addr(7));
    assert_eq!(snapshot[0].tx_hash, TxHash::from_low_u64_be(1));

    // While confirmation is pending the account cannot re-enter the queue.
    assert!(state.try_enqueue(addr(7)).is_err());

    executor.release.notify_one();

    let st = state.clone();
    wait_until("entry to leave registry", move || !st.is_processing(addr(7))).await;
    assert!(state.processing_snapshot().is_empty());

    // And afterwards it can.
    assert!(state.try_enqueue(addr(7)).is_ok());
}

#[tokio::test]
async fn test_requests_admitted_during_confirmation_are_served_after() {
    let state = Arc::new(FaucetState::new(10));
    let executor = Arc::new(MockExecutor::new());
    executor.block_confirm.store(true, Ordering::SeqCst);

    state.try_enqueue(addr(1)).unwrap();
    start_worker(&state, &executor);

    let st = state.clone();
    wait_until("first transfer in flight", move || st.is_processing(addr(1))).await;

    // Confirmation wait blocks only the worker; other accounts still
    // get admitted.
    state.try_enqueue(addr(2)).unwrap();
    assert_eq!(state.queue_len(), 1);
    assert_eq!(executor.submitted(), vec![addr(1)]);

    executor.block_confirm.store(false, Ordering::SeqCst);
    executor.release.notify_one();

    let exec = executor.clone();
    wait_until("second transfer dispatched", move || {
        exec.submitted().len() == 2
    })
    .await;
    assert_eq!(executor.submitted(), vec![addr(1), addr(2)]);
}
