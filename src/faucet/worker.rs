//! Dispatch worker.
//!
//! One perpetual loop drives all transfer submissions, strictly one at a
//! time: the signing account has a single sequential nonce, so concurrent
//! submissions would corrupt ordering or get dropped by the node.

use std::sync::Arc;

use ethers::types::U256;

use crate::chain::TransferExecutor;
use crate::faucet::state::FaucetState;
use crate::faucet::types::{now_millis, DispenseRequest, ProcessingEntry};

pub struct DispatchWorker {
    state: Arc<FaucetState>,
    executor: Arc<dyn TransferExecutor>,
    token_per_request: U256,
}

impl DispatchWorker {
    pub fn new(
        state: Arc<FaucetState>,
        executor: Arc<dyn TransferExecutor>,
        token_per_request: U256,
    ) -> Self {
        Self {
            state,
            executor,
            token_per_request,
        }
    }

    /// Run the dispatch loop. Never returns; a failed request is logged
    /// and dropped, and the loop moves on to the next one.
    pub async fn run(&self) {
        log::info!("Dispatch worker started");
        loop {
            let request = self.state.next_request().await;
            self.dispatch(request).await;
        }
    }

    async fn dispatch(&self, request: DispenseRequest) {
        let account = request.account;
        log::info!("Transferring to {:?}", account);

        let tx_hash = match self.executor.submit(account, self.token_per_request).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                // No retry, no requeue: the request is gone.
                log::error!("Submission failed for {:?}: {:#}", account, e);
                return;
            }
        };

        log::info!("Submitted {:?} for {:?}", tx_hash, account);
        self.state.begin_processing(ProcessingEntry {
            account,
            tx_hash,
            started_at: now_millis(),
        });

        // Blocks until the transaction is terminal on-chain. Only the
        // worker waits here; admissions keep flowing meanwhile.
        match self.executor.confirm(tx_hash).await {
            Ok(()) => log::info!("Confirmed {:?} for {:?}", tx_hash, account),
            Err(e) => log::error!("Confirmation failed for {:?}: {:#}", account, e),
        }

        // Unconditional: the entry must never dangle.
        self.state.finish_processing(account);
    }

    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}
