//! Process-wide collection of verification failures.
//!
//! Probe failures are reported once, consolidated, at the end of the run
//! rather than interleaved with build output. The aggregator is shared by
//! every environment build in a session and deduplicates by library
//! identity.

use std::sync::{Arc, Mutex};

use crate::builder::probe::ProbeFailure;
use crate::core::library::Library;

/// One recorded failure: the descriptor plus the probe's message.
#[derive(Debug, Clone)]
pub struct RecordedFailure {
    pub library: Arc<Library>,
    pub failure: ProbeFailure,
}

/// Append-only, thread-safe failure list.
#[derive(Debug, Default)]
pub struct FailureAggregator {
    failed: Mutex<Vec<RecordedFailure>>,
}

impl FailureAggregator {
    pub fn new() -> Self {
        FailureAggregator::default()
    }

    /// Record a failure. A library already recorded (by identity) is not
    /// recorded again.
    pub fn record(&self, library: Arc<Library>, failure: ProbeFailure) {
        let mut failed = self.failed.lock().unwrap_or_else(|e| e.into_inner());
        if failed.iter().any(|f| f.library.id == library.id) {
            return;
        }
        failed.push(RecordedFailure { library, failure });
    }

    /// Snapshot of the recorded failures.
    pub fn snapshot(&self) -> Vec<RecordedFailure> {
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Take the recorded failures, leaving the aggregator empty.
    pub fn drain(&self) -> Vec<RecordedFailure> {
        std::mem::take(&mut *self.failed.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn is_empty(&self) -> bool {
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.failed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
