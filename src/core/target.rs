//! Target kinds and per-target build records.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::library::Library;

/// What kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Executable program
    #[serde(alias = "exe", alias = "bin")]
    Program,

    /// Static library archive
    #[serde(alias = "static")]
    StaticLib,

    /// Shared library
    #[serde(alias = "shared", alias = "dylib")]
    SharedLib,

    /// Compiled test executable
    #[serde(alias = "test")]
    UnitTest,

    /// Interpreted test script, run rather than compiled
    #[serde(alias = "script")]
    ScriptTest,
}

impl TargetKind {
    /// Platform filename prefix for the artifact.
    pub fn prefix(&self) -> &'static str {
        match self {
            TargetKind::StaticLib | TargetKind::SharedLib => "lib",
            _ => "",
        }
    }

    /// Platform filename extension for the artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetKind::Program | TargetKind::UnitTest => {
                if cfg!(windows) {
                    ".exe"
                } else {
                    ""
                }
            }
            TargetKind::StaticLib => ".a",
            TargetKind::SharedLib => {
                if cfg!(target_os = "macos") {
                    ".dylib"
                } else {
                    ".so"
                }
            }
            TargetKind::ScriptTest => "",
        }
    }

    /// Filename of the artifact for a target name.
    pub fn output_filename(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix(), name, self.extension())
    }

    /// Whether targets of this kind run as tests.
    pub fn is_test(&self) -> bool {
        matches!(self, TargetKind::UnitTest | TargetKind::ScriptTest)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Program => "program",
            TargetKind::StaticLib => "static-lib",
            TargetKind::SharedLib => "shared-lib",
            TargetKind::UnitTest => "unit-test",
            TargetKind::ScriptTest => "script-test",
        };
        f.write_str(s)
    }
}

/// Opaque handle to an artifact scheduled by the executor.
///
/// The configuration layer never inspects the handle; it only stores it so
/// later targets (script tests, default-target selection) can refer to the
/// node it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ArtifactHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record of one declared target.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub name: String,
    pub kind: TargetKind,

    /// Handle produced by the executor; `None` when the target could not be
    /// scheduled at all
    pub artifact: Option<ArtifactHandle>,

    /// Whether the target is part of the default build set
    pub exposed: bool,

    /// Descriptor later targets can depend on; set for library targets
    pub library: Option<Arc<Library>>,

    /// Names of libraries this target needed but could not be verified
    pub missing: BTreeSet<String>,
}

impl TargetRecord {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        TargetRecord {
            name: name.into(),
            kind,
            artifact: None,
            exposed: true,
            library: None,
            missing: BTreeSet::new(),
        }
    }

    /// A target is degraded when at least one of its libraries failed
    /// verification; it stays declared but is withheld from the default
    /// build set.
    pub fn is_degraded(&self) -> bool {
        !self.missing.is_empty()
    }
}
