//! Project layer: target declaration over a build session.
//!
//! A [`Project`] is the surface a manifest (or a library consumer) declares
//! targets through. Each declaration scans sources, builds the target's
//! environment, hands the result to the [`Executor`], and registers the
//! outcome. Probe failures degrade the affected target instead of aborting;
//! [`Project::finish`] renders everything that went wrong, once,
//! consolidated.

pub mod aggregator;
pub mod manifest;
pub mod registry;
pub mod report;
pub mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::environment::Environment;
use crate::core::library::Library;
use crate::core::target::{ArtifactHandle, TargetKind, TargetRecord};
use crate::project::manifest::{Manifest, ManifestError};
use crate::project::registry::{DependencyNotFoundError, MissingDepPolicy};
use crate::project::report::RunReport;
use crate::project::script_test::{read_deps, ScriptDeps};
use crate::project::session::BuildSession;
use crate::resolver::CyclicDependencyError;
use crate::util::fs::{scan_sources, DEFAULT_REJECT};

/// A compiled target matched no source files.
#[derive(Debug, Clone, Error)]
#[error("target `{target}` has no sources")]
pub struct NoSourcesError {
    pub target: String,
    pub patterns: Vec<String>,
}

/// Error declaring a target.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    NoSources(#[from] NoSourcesError),

    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),

    #[error(transparent)]
    DependencyNotFound(#[from] DependencyNotFoundError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Seam to the build engine.
///
/// The configuration layer decides what to build and with which
/// environment; the executor owns how. Implementations return an opaque
/// handle for the scheduled artifact.
pub trait Executor {
    fn construct(
        &self,
        kind: TargetKind,
        name: &str,
        sources: &[PathBuf],
        env: &Environment,
    ) -> anyhow::Result<ArtifactHandle>;
}

/// Executor that only records what would be built.
///
/// Used by `slipway build` in its default dry-run form and by tests.
#[derive(Debug, Default)]
pub struct PlanExecutor;

impl Executor for PlanExecutor {
    fn construct(
        &self,
        kind: TargetKind,
        name: &str,
        sources: &[PathBuf],
        env: &Environment,
    ) -> anyhow::Result<ArtifactHandle> {
        tracing::info!(
            name,
            kind = %kind,
            sources = sources.len(),
            libs = env.libs.len(),
            "planned {}",
            kind.output_filename(name)
        );
        Ok(ArtifactHandle::new(format!("{}:{}", kind, name)))
    }
}

/// A project being configured.
pub struct Project {
    root: PathBuf,
    pub session: BuildSession,
    executor: Box<dyn Executor>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, session: BuildSession, executor: Box<dyn Executor>) -> Self {
        Project {
            root: root.into(),
            session,
            executor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Declare a program target.
    pub fn program(
        &mut self,
        name: &str,
        sources: &[String],
        libraries: &[Arc<Library>],
    ) -> Result<(), ProjectError> {
        self.declare(name, TargetKind::Program, sources, libraries, true)
    }

    /// Declare a static library target.
    pub fn static_library(
        &mut self,
        name: &str,
        sources: &[String],
        libraries: &[Arc<Library>],
    ) -> Result<(), ProjectError> {
        self.declare(name, TargetKind::StaticLib, sources, libraries, true)
    }

    /// Declare a shared library target.
    pub fn shared_library(
        &mut self,
        name: &str,
        sources: &[String],
        libraries: &[Arc<Library>],
    ) -> Result<(), ProjectError> {
        self.declare(name, TargetKind::SharedLib, sources, libraries, true)
    }

    /// Declare a compiled test target.
    pub fn unit_test(
        &mut self,
        name: &str,
        sources: &[String],
        libraries: &[Arc<Library>],
    ) -> Result<(), ProjectError> {
        self.declare(name, TargetKind::UnitTest, sources, libraries, true)
    }

    /// Declare a compiled target.
    pub fn declare(
        &mut self,
        name: &str,
        kind: TargetKind,
        source_patterns: &[String],
        libraries: &[Arc<Library>],
        exposed: bool,
    ) -> Result<(), ProjectError> {
        let mut sources = scan_sources(&self.root, source_patterns, DEFAULT_REJECT)
            .map_err(ProjectError::Other)?;
        if sources.is_empty() {
            return Err(NoSourcesError {
                target: name.to_string(),
                patterns: source_patterns.to_vec(),
            }
            .into());
        }

        let base = self.session.base_env.clone();
        let built = self.session.env_builder().build(&base, libraries, name)?;
        let mut env = built.env;

        if kind == TargetKind::SharedLib {
            for flag in &self.session.toolchain.flags.shared_object {
                env.add_ccflag(*flag);
            }
        }
        if kind.is_test() {
            env.add_alias("test");
        }

        // In-tree dependencies can contribute sources that compile directly
        // into the dependent target.
        sources.extend(env.extra_sources.iter().cloned());

        let mut record = TargetRecord::new(name, kind);
        record.exposed = exposed;
        record.missing = built.missing;

        // Library targets expose a descriptor so later declarations can
        // depend on the built artifact; its dependencies carry the
        // transitive configuration along.
        if matches!(kind, TargetKind::StaticLib | TargetKind::SharedLib) {
            let spec = crate::core::library::InternalSpec {
                link_name: Some(name.to_string()),
                ..Default::default()
            };
            record.library = Some(Arc::new(
                Library::internal(name, spec).with_dependencies(libraries.iter().cloned()),
            ));
        }

        if record.is_degraded() {
            tracing::warn!(
                name,
                missing = ?record.missing,
                "target degraded, withheld from default build"
            );
        } else {
            let artifact = self
                .executor
                .construct(kind, name, &sources, &env)
                .map_err(ProjectError::Other)?;
            record.artifact = Some(artifact);
        }

        self.session.registry.register(record);
        Ok(())
    }

    /// Descriptor exposed by a previously declared library target.
    pub fn library(&self, name: &str) -> Option<Arc<Library>> {
        self.session
            .registry
            .get(name)
            .and_then(|record| record.library.clone())
    }

    /// Declare script tests from script files.
    ///
    /// Each script declares its target dependencies in its leading comment
    /// block (`# slipway: viewer encoder` or `# slipway: all`). A name that
    /// matches no declared target either fails the declaration or skips the
    /// script, per the session's missing-dependency policy.
    pub fn script_tests(&mut self, script_patterns: &[String]) -> Result<(), ProjectError> {
        let scripts = scan_sources(&self.root, script_patterns, DEFAULT_REJECT)
            .map_err(ProjectError::Other)?;

        for script in scripts {
            let name = script
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| script.display().to_string());

            let deps = read_deps(&script).map_err(ProjectError::Other)?;
            let dep_names: Vec<String> = match deps {
                ScriptDeps::All => self
                    .session
                    .registry
                    .default_targets()
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
                ScriptDeps::Named(names) => names,
            };

            let mut missing = std::collections::BTreeSet::new();
            let mut skip = false;
            for dep in &dep_names {
                match self.session.registry.lookup(dep) {
                    Ok(record) => {
                        // A degraded dependency degrades the script too.
                        for lib in &record.missing {
                            missing.insert(lib.clone());
                        }
                    }
                    Err(err) => match self.session.options.missing_dep_policy {
                        MissingDepPolicy::Fail => return Err(err.into()),
                        MissingDepPolicy::Skip => {
                            tracing::warn!(
                                script = %script.display(),
                                dependency = dep,
                                "skipping script test, dependency not declared"
                            );
                            skip = true;
                        }
                    },
                }
            }
            if skip {
                continue;
            }

            let mut record = TargetRecord::new(&name, TargetKind::ScriptTest);
            record.missing = missing;
            if !record.is_degraded() {
                let artifact = self
                    .executor
                    .construct(
                        TargetKind::ScriptTest,
                        &name,
                        std::slice::from_ref(&script),
                        &self.session.base_env,
                    )
                    .map_err(ProjectError::Other)?;
                record.artifact = Some(artifact);
            }
            self.session.registry.register(record);
        }

        Ok(())
    }

    /// Declare everything a manifest describes.
    pub fn declare_from_manifest(&mut self, manifest: &Manifest) -> Result<(), ProjectError> {
        let libs = manifest.libraries()?;

        for spec in &manifest.targets {
            if spec.kind == TargetKind::ScriptTest {
                self.script_tests(&spec.sources)?;
                continue;
            }

            // A target's libraries resolve against `[libs.*]` first, then
            // against descriptors exposed by earlier library targets.
            let mut requested = Vec::new();
            for lib_name in &spec.libraries {
                let lib = libs
                    .get(lib_name)
                    .cloned()
                    .or_else(|| self.library(lib_name))
                    .ok_or_else(|| ManifestError::UnknownLibrary {
                        name: lib_name.clone(),
                        referrer: spec.name.clone(),
                    })?;
                requested.push(lib);
            }

            self.declare(&spec.name, spec.kind, &spec.sources, &requested, spec.exposed)?;
        }

        Ok(())
    }

    /// Finish the run: consolidate failures and degraded targets.
    pub fn finish(&self) -> RunReport {
        RunReport::assemble(
            &self.session.aggregator,
            &self.session.registry,
            self.session.options.ignore_errors,
        )
    }
}
