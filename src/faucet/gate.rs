//! Admission gate.
//!
//! Synchronous accept/reject decision for dispense requests. Checks in
//! order, short-circuiting on the first failure:
//!
//! 1. Balance ceiling against the on-chain balance (pre-check only; a
//!    balance change between admission and dispatch is not re-detected)
//! 2. Queue capacity
//! 3. Per-account duplicate, against both the queue and the registry
//!
//! Checks 2 and 3 plus the append run atomically under the state mutex.

use std::sync::Arc;

use ethers::types::Address;

use crate::chain::BalanceOracle;
use crate::faucet::state::FaucetState;
use crate::faucet::types::{AdmissionError, FaucetConfig};

pub struct AdmissionGate {
    state: Arc<FaucetState>,
    oracle: Arc<dyn BalanceOracle>,
    config: FaucetConfig,
}

impl AdmissionGate {
    pub fn new(
        state: Arc<FaucetState>,
        oracle: Arc<dyn BalanceOracle>,
        config: FaucetConfig,
    ) -> Self {
        Self {
            state,
            oracle,
            config,
        }
    }

    pub async fn try_admit(&self, account: Address) -> Result<(), AdmissionError> {
        // Oracle unreachable rejects rather than admitting blind.
        let balance = self.oracle.balance_of(account).await.map_err(|e| {
            log::warn!("Balance lookup failed for {:?}: {:#}", account, e);
            AdmissionError::Oracle(e.to_string())
        })?;

        // Equality rejects; overflow can only mean the cap is long blown.
        let over_cap = balance
            .checked_add(self.config.token_per_request)
            .map_or(true, |projected| projected >= self.config.max_token);
        if over_cap {
            return Err(AdmissionError::LimitReached);
        }

        self.state.try_enqueue(account)
    }
}
