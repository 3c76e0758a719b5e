//! End-of-run configuration report.
//!
//! All probe failures collected during a run are reported here, once and
//! consolidated, together with the targets they degraded. The report
//! renders for humans or as JSON for tooling.

use std::str::FromStr;

use serde::Serialize;

use crate::project::aggregator::FailureAggregator;
use crate::project::registry::TargetRegistry;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("invalid output format '{}'; expected 'human' or 'json'", s)),
        }
    }
}

/// One library that failed verification.
#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub library: String,
    pub message: String,
}

/// One target withheld from the default build set.
#[derive(Debug, Clone, Serialize)]
pub struct DegradedTarget {
    pub target: String,
    pub missing: Vec<String>,
}

/// Consolidated outcome of a configuration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub failures: Vec<FailureEntry>,
    pub degraded: Vec<DegradedTarget>,
    pub targets_total: usize,
    pub targets_buildable: usize,
    #[serde(skip)]
    ignore_errors: bool,
}

impl RunReport {
    /// Assemble the report from the session's aggregator and registry.
    pub fn assemble(
        aggregator: &FailureAggregator,
        registry: &TargetRegistry,
        ignore_errors: bool,
    ) -> Self {
        let failures = aggregator
            .snapshot()
            .into_iter()
            .map(|f| FailureEntry {
                library: f.library.id.to_string(),
                message: f.failure.message.clone(),
            })
            .collect();

        let degraded = registry
            .degraded()
            .into_iter()
            .map(|t| DegradedTarget {
                target: t.name.clone(),
                missing: t.missing.iter().cloned().collect(),
            })
            .collect();

        RunReport {
            failures,
            degraded,
            targets_total: registry.len(),
            targets_buildable: registry.default_targets().len(),
            ignore_errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit code: failures are fatal unless errors are ignored.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() || self.ignore_errors {
            0
        } else {
            1
        }
    }

    /// Render for terminal output.
    pub fn render_human(&self, color: bool) -> String {
        if self.is_clean() {
            return format!(
                "configured {} target(s), all buildable\n",
                self.targets_total
            );
        }

        let mut out = String::new();
        for failure in &self.failures {
            let diag = Diagnostic::error(format!("library `{}` is not usable", failure.library))
                .with_context(failure.message.clone())
                .with_suggestion(suggestions::PROBE_FAILED);
            out.push_str(&diag.format(color));
        }

        for degraded in &self.degraded {
            let diag = Diagnostic::warning(format!(
                "target `{}` is excluded from the default build",
                degraded.target
            ))
            .with_context(format!("missing: {}", degraded.missing.join(", ")));
            out.push_str(&diag.format(color));
        }

        out.push_str(&format!(
            "\n{} of {} target(s) buildable, {} librar(ies) missing\n",
            self.targets_buildable,
            self.targets_total,
            self.failures.len()
        ));

        if !self.ignore_errors {
            out.push_str(&format!("help: {}\n", suggestions::IGNORE_ERRORS));
        }

        out
    }

    /// Render as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Render in the requested format.
    pub fn render(&self, format: OutputFormat, color: bool) -> String {
        match format {
            OutputFormat::Human => self.render_human(color),
            OutputFormat::Json => self.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::probe::ProbeFailure;
    use crate::core::library::{ExternalSpec, Library};
    use crate::core::target::{TargetKind, TargetRecord};
    use std::sync::Arc;

    fn fixture() -> (FailureAggregator, TargetRegistry) {
        let aggregator = FailureAggregator::new();
        aggregator.record(
            Arc::new(Library::external("gl", ExternalSpec::default())),
            ProbeFailure {
                library: "gl".to_string(),
                message: "GL/gl.h: No such file or directory".to_string(),
            },
        );

        let mut registry = TargetRegistry::new();
        registry.register(TargetRecord::new("encoder", TargetKind::Program));
        let mut viewer = TargetRecord::new("viewer", TargetKind::Program);
        viewer.missing.insert("gl".to_string());
        registry.register(viewer);

        (aggregator, registry)
    }

    #[test]
    fn test_clean_report() {
        let aggregator = FailureAggregator::new();
        let registry = TargetRegistry::new();
        let report = RunReport::assemble(&aggregator, &registry, false);

        assert!(report.is_clean());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_failure_report_human() {
        let (aggregator, registry) = fixture();
        let report = RunReport::assemble(&aggregator, &registry, false);

        assert_eq!(report.exit_code(), 1);
        let rendered = report.render_human(false);
        assert!(rendered.contains("library `gl` is not usable"));
        assert!(rendered.contains("target `viewer` is excluded"));
        assert!(rendered.contains("1 of 2 target(s) buildable"));
    }

    #[test]
    fn test_ignore_errors_zeroes_exit_code() {
        let (aggregator, registry) = fixture();
        let report = RunReport::assemble(&aggregator, &registry, true);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_json_report() {
        let (aggregator, registry) = fixture();
        let report = RunReport::assemble(&aggregator, &registry, false);

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["failures"][0]["library"], "gl");
        assert_eq!(json["degraded"][0]["target"], "viewer");
        assert_eq!(json["targets_total"], 2);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("human".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
