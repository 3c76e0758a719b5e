//! Registry of declared targets.
//!
//! Script tests name their dependencies by target name; the registry is the
//! lookup table that resolves those names to the records of previously
//! declared targets. It also owns default-target selection: degraded
//! targets stay registered but are withheld from the default set.

use thiserror::Error;

use std::collections::BTreeMap;

use crate::core::target::TargetRecord;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A named dependency does not match any declared target.
#[derive(Debug, Clone, Error)]
#[error("no target named `{name}`")]
pub struct DependencyNotFoundError {
    pub name: String,
    pub known: Vec<String>,
}

impl DependencyNotFoundError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(format!("no target named `{}`", self.name));
        if !self.known.is_empty() {
            diag = diag.with_context(format!("declared targets: {}", self.known.join(", ")));
        }
        diag.with_suggestion(suggestions::TARGET_NOT_FOUND)
    }
}

/// What to do when a script test names a dependency that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDepPolicy {
    /// Fail the declaration with a [`DependencyNotFoundError`]
    Fail,
    /// Skip the missing name with a warning
    Skip,
}

/// Name-keyed store of target records for one run.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, TargetRecord>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        TargetRegistry::default()
    }

    /// Register a target record, replacing any previous record of the same
    /// name.
    pub fn register(&mut self, record: TargetRecord) {
        if self.targets.contains_key(&record.name) {
            tracing::warn!(name = %record.name, "target declared twice, last declaration wins");
        }
        self.targets.insert(record.name.clone(), record);
    }

    pub fn get(&self, name: &str) -> Option<&TargetRecord> {
        self.targets.get(name)
    }

    /// Resolve a name to a record or produce an error listing what exists.
    pub fn lookup(&self, name: &str) -> Result<&TargetRecord, DependencyNotFoundError> {
        self.targets
            .get(name)
            .ok_or_else(|| DependencyNotFoundError {
                name: name.to_string(),
                known: self.targets.keys().cloned().collect(),
            })
    }

    /// All records in name order.
    pub fn all(&self) -> impl Iterator<Item = &TargetRecord> {
        self.targets.values()
    }

    /// Names of targets in the default build set: exposed and not degraded.
    pub fn default_targets(&self) -> Vec<&TargetRecord> {
        self.targets
            .values()
            .filter(|t| t.exposed && !t.is_degraded())
            .collect()
    }

    /// Records that are degraded.
    pub fn degraded(&self) -> Vec<&TargetRecord> {
        self.targets.values().filter(|t| t.is_degraded()).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::TargetKind;

    fn record(name: &str) -> TargetRecord {
        TargetRecord::new(name, TargetKind::Program)
    }

    #[test]
    fn test_lookup_lists_known_targets() {
        let mut registry = TargetRegistry::new();
        registry.register(record("viewer"));
        registry.register(record("encoder"));

        let err = registry.lookup("viewerr").unwrap_err();
        assert_eq!(err.known, vec!["encoder", "viewer"]);

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no target named `viewerr`"));
        assert!(output.contains("declared targets: encoder, viewer"));
    }

    #[test]
    fn test_default_set_excludes_degraded() {
        let mut registry = TargetRegistry::new();
        registry.register(record("viewer"));

        let mut degraded = record("broken");
        degraded.missing.insert("gl".to_string());
        registry.register(degraded);

        let defaults: Vec<&str> = registry
            .default_targets()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(defaults, vec!["viewer"]);
        assert_eq!(registry.degraded().len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_redeclaration_last_wins() {
        let mut registry = TargetRegistry::new();
        registry.register(record("viewer"));

        let mut replacement = record("viewer");
        replacement.exposed = false;
        registry.register(replacement);

        assert!(!registry.get("viewer").unwrap().exposed);
        assert_eq!(registry.len(), 1);
    }
}
