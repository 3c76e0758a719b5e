//! At-most-once library verification.
//!
//! The cache memoizes probe outcomes per library identity for the lifetime
//! of a run. Each identity maps to a shared once-cell; concurrent callers
//! asking about the same library block on the single in-flight probe
//! instead of running their own. In-tree libraries are trusted and never
//! probed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::builder::probe::{ProbeFailure, Prober};
use crate::core::environment::Environment;
use crate::core::library::{Library, LibraryId};

type ProbeCell = Arc<OnceLock<Result<(), ProbeFailure>>>;

/// Per-run memo of library verification outcomes.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    entries: Mutex<HashMap<LibraryId, ProbeCell>>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        AvailabilityCache::default()
    }

    /// Verify a library, probing at most once per identity.
    pub fn verify(
        &self,
        library: &Library,
        env: &Environment,
        prober: &dyn Prober,
    ) -> Result<(), ProbeFailure> {
        if library.is_internal() {
            return Ok(());
        }

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(entries.entry(library.id.clone()).or_default())
        };

        // get_or_init runs outside the map lock so a slow probe of one
        // library never serializes probes of the others.
        cell.get_or_init(|| prober.probe(library, env)).clone()
    }

    /// Outcome recorded for an identity, if any.
    pub fn outcome(&self, id: &LibraryId) -> Option<Result<(), ProbeFailure>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(id).and_then(|cell| cell.get().cloned())
    }

    /// Number of identities with a recorded outcome.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|c| c.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
