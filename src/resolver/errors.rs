//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// A dependency graph contains a cycle.
#[derive(Debug, Clone, Error)]
#[error("cycle detected in library dependencies")]
pub struct CyclicDependencyError {
    /// The cycle path, first and last entry being the same library
    pub cycle: Vec<String>,
}

impl CyclicDependencyError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error("cycle detected in library dependencies")
            .with_context(format!("cycle: {}", self.cycle.join(" -> ")))
            .with_suggestion("Break the cycle by removing or restructuring dependencies")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_diagnostic() {
        let err = CyclicDependencyError {
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cycle: a -> b -> a"));
    }
}
