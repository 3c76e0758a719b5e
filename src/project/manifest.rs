//! `Slipway.toml` parsing.
//!
//! The manifest declares the project's libraries and targets:
//!
//! ```toml
//! [project]
//! name = "imgtools"
//!
//! [libs.z]
//! libs = ["z"]
//! header = "zlib.h"
//!
//! [libs.png]
//! libs = ["png"]
//! header = "png.h"
//! dependencies = ["z"]
//!
//! [libs.imgcore]
//! kind = "internal"
//! include-path = "libs/imgcore/include"
//!
//! [[target]]
//! name = "viewer"
//! kind = "program"
//! sources = ["src/viewer/**/*.c"]
//! libraries = ["png", "imgcore"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::library::{ExternalSpec, HeaderOnlySpec, InternalSpec, Language, Library};
use crate::core::target::TargetKind;
use crate::resolver::CyclicDependencyError;
use crate::util::fs::read_to_string;

pub const MANIFEST_FILENAME: &str = "Slipway.toml";

/// Error turning manifest declarations into a library graph.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("library `{referrer}` depends on unknown library `{name}`")]
    UnknownLibrary { name: String, referrer: String },

    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),
}

/// What kind of library a `[libs.*]` table declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibKind {
    #[default]
    External,
    HeaderOnly,
    Internal,
}

/// One `[libs.<name>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LibSpec {
    pub kind: LibKind,
    pub language: Language,
    pub variant: Option<String>,
    pub dependencies: Vec<String>,

    // External / header-only fields
    pub header: Option<String>,
    pub libs: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    pub lib_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub ccflags: Vec<String>,
    pub ldflags: Vec<String>,

    // Internal fields
    pub include_path: Option<PathBuf>,
    pub lib_path: Option<PathBuf>,
    pub link_name: Option<String>,
    pub extra_sources: Vec<PathBuf>,
}

/// One `[[target]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TargetSpec {
    pub name: String,
    pub kind: TargetKind,

    /// Glob patterns relative to the project root
    pub sources: Vec<String>,

    /// Library names from `[libs.*]`
    pub libraries: Vec<String>,

    /// Part of the default build set
    pub exposed: bool,
}

impl Default for TargetSpec {
    fn default() -> Self {
        TargetSpec {
            name: String::new(),
            kind: TargetKind::Program,
            sources: Vec::new(),
            libraries: Vec::new(),
            exposed: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: String,
}

/// A parsed `Slipway.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub project: ProjectSection,
    pub libs: BTreeMap<String, LibSpec>,
    #[serde(rename = "target")]
    pub targets: Vec<TargetSpec>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse a manifest from a string.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse manifest")
    }

    /// Build the library descriptor graph declared by `[libs.*]`.
    ///
    /// Dependency references are resolved by name; a reference to an
    /// undeclared name or a cyclic reference chain is an error.
    pub fn libraries(&self) -> Result<BTreeMap<String, Arc<Library>>, ManifestError> {
        let mut built: BTreeMap<String, Arc<Library>> = BTreeMap::new();
        let mut in_progress: Vec<String> = Vec::new();

        for name in self.libs.keys() {
            self.build_library(name, &mut built, &mut in_progress)?;
        }

        Ok(built)
    }

    fn build_library(
        &self,
        name: &str,
        built: &mut BTreeMap<String, Arc<Library>>,
        in_progress: &mut Vec<String>,
    ) -> Result<Arc<Library>, ManifestError> {
        if let Some(lib) = built.get(name) {
            return Ok(Arc::clone(lib));
        }

        if in_progress.iter().any(|n| n == name) {
            let mut cycle: Vec<String> = in_progress
                .iter()
                .skip_while(|n| *n != name)
                .cloned()
                .collect();
            cycle.push(name.to_string());
            return Err(CyclicDependencyError { cycle }.into());
        }

        let spec = self
            .libs
            .get(name)
            .ok_or_else(|| ManifestError::UnknownLibrary {
                name: name.to_string(),
                referrer: in_progress
                    .last()
                    .cloned()
                    .unwrap_or_else(|| self.project.name.clone()),
            })?;

        in_progress.push(name.to_string());
        let mut deps = Vec::new();
        for dep_name in &spec.dependencies {
            deps.push(self.build_library(dep_name, built, in_progress)?);
        }
        in_progress.pop();

        let lib = Arc::new(spec.to_library(name).with_dependencies(deps));
        built.insert(name.to_string(), Arc::clone(&lib));
        Ok(lib)
    }
}

impl LibSpec {
    fn to_library(&self, name: &str) -> Library {
        let mut lib = match self.kind {
            LibKind::External => Library::external(
                name,
                ExternalSpec {
                    header: self.header.clone(),
                    libs: if self.libs.is_empty() {
                        // An external library links as its own name unless
                        // told otherwise.
                        vec![name.to_string()]
                    } else {
                        self.libs.clone()
                    },
                    include_paths: self.include_paths.clone(),
                    lib_paths: self.lib_paths.clone(),
                    defines: self.defines.clone(),
                    ccflags: self.ccflags.clone(),
                    ldflags: self.ldflags.clone(),
                },
            ),
            LibKind::HeaderOnly => Library::header_only(
                name,
                HeaderOnlySpec {
                    header: self.header.clone(),
                    include_paths: self.include_paths.clone(),
                    defines: self.defines.clone(),
                },
            ),
            LibKind::Internal => Library::internal(
                name,
                InternalSpec {
                    include_path: self.include_path.clone(),
                    lib_path: self.lib_path.clone(),
                    link_name: self.link_name.clone(),
                    extra_sources: self.extra_sources.clone(),
                    defines: self.defines.clone(),
                },
            ),
        };

        lib = lib.with_language(self.language);
        if let Some(ref variant) = self.variant {
            lib = lib.with_variant(variant.clone());
        }
        lib
    }
}

/// Search upward from a directory for the manifest file.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(MANIFEST_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::LibraryKind;

    const MANIFEST: &str = r#"
[project]
name = "imgtools"

[libs.z]
header = "zlib.h"

[libs.png]
header = "png.h"
dependencies = ["z"]

[libs.imgcore]
kind = "internal"
include-path = "libs/imgcore/include"

[[target]]
name = "viewer"
kind = "program"
sources = ["src/viewer/**/*.c"]
libraries = ["png", "imgcore"]
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.project.name, "imgtools");
        assert_eq!(manifest.libs.len(), 3);
        assert_eq!(manifest.targets.len(), 1);
        assert_eq!(manifest.targets[0].kind, TargetKind::Program);
        assert!(manifest.targets[0].exposed);
    }

    #[test]
    fn test_library_graph_wires_dependencies() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let libs = manifest.libraries().unwrap();

        let png = &libs["png"];
        assert_eq!(png.dependencies.len(), 1);
        assert_eq!(png.dependencies[0].id.name, "z");
        assert!(libs["imgcore"].is_internal());
    }

    #[test]
    fn test_external_defaults_link_name() {
        let manifest = Manifest::parse("[libs.z]\nheader = \"zlib.h\"\n").unwrap();
        let libs = manifest.libraries().unwrap();

        match &libs["z"].kind {
            LibraryKind::External(spec) => assert_eq!(spec.libs, vec!["z"]),
            other => panic!("expected external, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let manifest = Manifest::parse("[libs.png]\ndependencies = [\"nope\"]\n").unwrap();
        let err = manifest.libraries().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::UnknownLibrary { ref name, ref referrer }
                if name == "nope" && referrer == "png"
        ));
    }

    #[test]
    fn test_cyclic_dependency_rejected() {
        let manifest = Manifest::parse(
            "[libs.a]\ndependencies = [\"b\"]\n[libs.b]\ndependencies = [\"a\"]\n",
        )
        .unwrap();
        let err = manifest.libraries().unwrap_err();
        assert!(matches!(err, ManifestError::Cycle(_)));
    }

    #[test]
    fn test_find_manifest_searches_upward() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILENAME), "").unwrap();
        let nested = tmp.path().join("src").join("viewer");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_manifest(&nested).unwrap();
        assert_eq!(found, tmp.path().join(MANIFEST_FILENAME));
    }
}
