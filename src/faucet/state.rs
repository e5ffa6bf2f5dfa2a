//! Shared queue + registry state.
//!
//! The dispatch queue and the processing registry live behind one mutex so
//! the admission gate's capacity/duplicate checks and the worker's registry
//! mutations always observe a consistent snapshot of both. The lock is only
//! held for short synchronous sections, never across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use ethers::types::Address;
use tokio::sync::Notify;

use crate::faucet::types::{now_millis, AdmissionError, DispenseRequest, ProcessingEntry};

struct StateInner {
    queue: VecDeque<DispenseRequest>,
    processing: HashMap<Address, ProcessingEntry>,
}

pub struct FaucetState {
    inner: Mutex<StateInner>,
    notify: Notify,
    queue_size: usize,
}

impl FaucetState {
    pub fn new(queue_size: usize) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                queue: VecDeque::with_capacity(queue_size),
                processing: HashMap::new(),
            }),
            notify: Notify::new(),
            queue_size,
        }
    }

    /// Capacity check, duplicate check (queue and registry) and append,
    /// as one atomic step. Called by the admission gate after the balance
    /// pre-check passed.
    pub fn try_enqueue(&self, account: Address) -> Result<(), AdmissionError> {
        {
            let mut inner = self.inner.lock().unwrap();

            if inner.queue.len() >= self.queue_size {
                return Err(AdmissionError::QueueFull);
            }

            let duplicate = inner.queue.iter().any(|req| req.account == account)
                || inner.processing.contains_key(&account);
            if duplicate {
                return Err(AdmissionError::PendingExists);
            }

            inner.queue.push_back(DispenseRequest {
                account,
                submitted_at: now_millis(),
            });
        }

        self.notify.notify_one();
        Ok(())
    }

    /// Wait until the queue is non-empty, then remove and return the head.
    /// Single consumer: only the dispatch worker calls this.
    pub async fn next_request(&self) -> DispenseRequest {
        loop {
            let notified = self.notify.notified();
            if let Some(req) = self.inner.lock().unwrap().queue.pop_front() {
                return req;
            }
            notified.await;
        }
    }

    /// Record an in-flight transfer. Called by the worker right after a
    /// successful submission, before the confirmation wait starts.
    pub fn begin_processing(&self, entry: ProcessingEntry) {
        let mut inner = self.inner.lock().unwrap();
        inner.processing.insert(entry.account, entry);
    }

    /// Drop the in-flight record once confirmation completed, success or
    /// failure alike.
    pub fn finish_processing(&self, account: Address) {
        let mut inner = self.inner.lock().unwrap();
        inner.processing.remove(&account);
    }

    pub fn is_processing(&self, account: Address) -> bool {
        self.inner.lock().unwrap().processing.contains_key(&account)
    }

    /// Read-only snapshot of in-flight transfers for the status endpoint.
    /// Iteration order is not guaranteed.
    pub fn processing_snapshot(&self) -> Vec<ProcessingEntry> {
        self.inner
            .lock()
            .unwrap()
            .processing
            .values()
            .cloned()
            .collect()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}
