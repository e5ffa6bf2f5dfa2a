//! Transfer dispatch core: admission gate, bounded FIFO queue with a
//! single worker, and the in-flight processing registry.

pub mod gate;
pub mod state;
pub mod types;
pub mod worker;

pub use gate::AdmissionGate;
pub use state::FaucetState;
pub use types::{AdmissionError, DispenseRequest, FaucetConfig, ProcessingEntry};
pub use worker::DispatchWorker;
