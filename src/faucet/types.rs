//! Core types for the dispatch queue.

use std::fmt;

use ethers::types::{Address, TxHash, U256};
use serde::Serialize;

/// A dispense request accepted by the admission gate, waiting in the queue.
#[derive(Debug, Clone)]
pub struct DispenseRequest {
    pub account: Address,
    /// Epoch millis at admission time.
    pub submitted_at: i64,
}

/// An in-flight transfer: submitted on-chain but not yet confirmed.
///
/// Lives in the processing registry from successful submission until the
/// confirmation wait completes (success or failure).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEntry {
    pub account: Address,
    pub tx_hash: TxHash,
    /// Epoch millis at submission time.
    pub started_at: i64,
}

/// Amounts are wei-denominated; parsed once at startup from decimal
/// ether strings.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    pub token_per_request: U256,
    pub max_token: U256,
    pub queue_size: usize,
}

impl FaucetConfig {
    pub fn from_app_config(config: &crate::configure::AppConfig) -> anyhow::Result<Self> {
        use anyhow::Context;
        use ethers::utils::parse_ether;

        Ok(Self {
            token_per_request: parse_ether(&config.token_per_request)
                .context("invalid token_per_request")?,
            max_token: parse_ether(&config.max_token).context("invalid max_token")?,
            queue_size: config.queue_size,
        })
    }
}

/// Rejection reasons returned by the admission gate.
///
/// `Display` carries the user-visible message returned by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// `balance + token_per_request >= max_token` (equality rejects).
    LimitReached,
    /// Dispatch queue is at capacity.
    QueueFull,
    /// Account already queued or in-flight.
    PendingExists,
    /// Balance oracle unreachable; admission fails closed.
    Oracle(String),
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitReached => write!(f, "Token request reaches the limit"),
            Self::QueueFull => write!(f, "Queue is full. Try again later."),
            Self::PendingExists => {
                write!(f, "You have a pending transaction. Try again later.")
            }
            Self::Oracle(_) => write!(f, "Balance check failed. Try again later."),
        }
    }
}

impl std::error::Error for AdmissionError {}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
