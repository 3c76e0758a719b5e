//! Library descriptors.
//!
//! A [`Library`] describes one dependency a target can declare: an external
//! system library that must be probed, a header-only library, or an in-tree
//! library built by the same project. Descriptors are immutable after
//! construction and shared through `Arc`; per-run state (probe outcomes)
//! lives in the availability cache, not here.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::environment::Environment;
use crate::util::config::OptionRegistry;

/// Source language a library's check program is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    C,
    #[serde(alias = "c++")]
    Cxx,
}

/// Identity of a library: name plus variant.
///
/// The same external library can be declared in several variants (for
/// example `boost` with different component sets); each variant is probed
/// and deduplicated independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryId {
    pub name: String,
    pub variant: Option<String>,
}

impl LibraryId {
    pub fn new(name: impl Into<String>) -> Self {
        LibraryId {
            name: name.into(),
            variant: None,
        }
    }

    pub fn with_variant(name: impl Into<String>, variant: impl Into<String>) -> Self {
        LibraryId {
            name: name.into(),
            variant: Some(variant.into()),
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}/{}", self.name, variant),
            None => f.write_str(&self.name),
        }
    }
}

/// Configuration contributed by an external (system-installed) library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSpec {
    /// Representative header included by the probe program
    pub header: Option<String>,

    /// Link-library names (`-l` arguments)
    pub libs: Vec<String>,

    /// Include search paths
    pub include_paths: Vec<PathBuf>,

    /// Library search paths
    pub lib_paths: Vec<PathBuf>,

    /// Preprocessor defines
    pub defines: Vec<String>,

    /// Extra compiler flags
    pub ccflags: Vec<String>,

    /// Extra linker flags
    pub ldflags: Vec<String>,
}

/// Configuration contributed by a header-only library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderOnlySpec {
    /// Representative header included by the probe program
    pub header: Option<String>,

    /// Include search paths
    pub include_paths: Vec<PathBuf>,

    /// Preprocessor defines
    pub defines: Vec<String>,
}

/// Configuration contributed by an in-tree library built by this project.
#[derive(Debug, Clone, Default)]
pub struct InternalSpec {
    /// Public include directory
    pub include_path: Option<PathBuf>,

    /// Directory the built archive/shared object lands in
    pub lib_path: Option<PathBuf>,

    /// Link-library name; defaults to the library name when empty
    pub link_name: Option<String>,

    /// Sources compiled directly into targets that depend on this library
    /// at the top level
    pub extra_sources: Vec<PathBuf>,

    /// Preprocessor defines exported to dependents
    pub defines: Vec<String>,
}

/// What kind of library a descriptor is, with the kind-specific data.
#[derive(Debug, Clone)]
pub enum LibraryKind {
    External(ExternalSpec),
    HeaderOnly(HeaderOnlySpec),
    Internal(InternalSpec),
}

/// An immutable library descriptor.
#[derive(Debug, Clone)]
pub struct Library {
    pub id: LibraryId,
    pub language: Language,
    pub kind: LibraryKind,
    pub dependencies: Vec<Arc<Library>>,
}

impl Library {
    /// Create an external library descriptor.
    pub fn external(name: impl Into<String>, spec: ExternalSpec) -> Self {
        Library {
            id: LibraryId::new(name),
            language: Language::C,
            kind: LibraryKind::External(spec),
            dependencies: Vec::new(),
        }
    }

    /// Create a header-only library descriptor.
    pub fn header_only(name: impl Into<String>, spec: HeaderOnlySpec) -> Self {
        Library {
            id: LibraryId::new(name),
            language: Language::C,
            kind: LibraryKind::HeaderOnly(spec),
            dependencies: Vec::new(),
        }
    }

    /// Create an in-tree library descriptor.
    pub fn internal(name: impl Into<String>, spec: InternalSpec) -> Self {
        Library {
            id: LibraryId::new(name),
            language: Language::C,
            kind: LibraryKind::Internal(spec),
            dependencies: Vec::new(),
        }
    }

    /// Set the variant part of the identity.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.id.variant = Some(variant.into());
        self
    }

    /// Set the check-program language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, dep: Arc<Library>) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Add several dependencies.
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = Arc<Library>>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    /// Whether this library is built by the project itself and therefore
    /// trusted without probing.
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, LibraryKind::Internal(_))
    }

    /// Representative header for the probe program, if the kind has one.
    pub fn probe_header(&self) -> Option<&str> {
        match &self.kind {
            LibraryKind::External(spec) => spec.header.as_deref(),
            LibraryKind::HeaderOnly(spec) => spec.header.as_deref(),
            LibraryKind::Internal(_) => None,
        }
    }

    /// Whether the probe needs a link step in addition to compilation.
    pub fn probe_links(&self) -> bool {
        matches!(&self.kind, LibraryKind::External(spec) if !spec.libs.is_empty())
    }

    /// Register this library's configurable options for the run.
    ///
    /// Idempotent: the first call per name wins, later calls are no-ops.
    pub fn declare_options(&self, registry: &mut OptionRegistry) {
        registry.declare(&self.id.name);
        for dep in &self.dependencies {
            dep.declare_options(registry);
        }
    }

    /// Merge this library's configuration into an environment.
    ///
    /// `depth` is the distance from the requesting target: the target's own
    /// dependencies are at depth 0, their dependencies at depth 1, and so
    /// on. In-tree libraries contribute their extra sources only at depth 0;
    /// deeper in the graph those sources are already part of the built
    /// archive being linked.
    pub fn apply(&self, env: &mut Environment, depth: usize, options: &OptionRegistry) {
        match &self.kind {
            LibraryKind::External(spec) => {
                let overrides = options.overrides(&self.id.name);

                let include_override = overrides.and_then(|o| o.include_dir());
                match include_override {
                    Some(dir) => env.add_extern_include_path(dir),
                    None => {
                        for path in &spec.include_paths {
                            env.add_extern_include_path(path.clone());
                        }
                    }
                }

                let lib_override = overrides.and_then(|o| o.lib_dir());
                match lib_override {
                    Some(dir) => env.add_lib_path(dir),
                    None => {
                        for path in &spec.lib_paths {
                            env.add_lib_path(path.clone());
                        }
                    }
                }

                let libs_override = overrides.and_then(|o| o.libs.as_ref());
                match libs_override {
                    Some(libs) => {
                        for lib in libs {
                            env.add_lib(lib.clone());
                        }
                    }
                    None => {
                        for lib in &spec.libs {
                            env.add_lib(lib.clone());
                        }
                    }
                }

                for define in &spec.defines {
                    env.add_define(define.clone());
                }
                for flag in &spec.ccflags {
                    env.add_ccflag(flag.clone());
                }
                for flag in &spec.ldflags {
                    env.add_ldflag(flag.clone());
                }
            }

            LibraryKind::HeaderOnly(spec) => {
                let include_override = options
                    .overrides(&self.id.name)
                    .and_then(|o| o.include_dir());
                match include_override {
                    Some(dir) => env.add_extern_include_path(dir),
                    None => {
                        for path in &spec.include_paths {
                            env.add_extern_include_path(path.clone());
                        }
                    }
                }
                for define in &spec.defines {
                    env.add_define(define.clone());
                }
            }

            LibraryKind::Internal(spec) => {
                if let Some(ref path) = spec.include_path {
                    env.add_include_path(path.clone());
                }
                if let Some(ref path) = spec.lib_path {
                    env.add_lib_path(path.clone());
                }
                let link_name = spec.link_name.as_deref().unwrap_or(&self.id.name);
                env.prepend_lib(link_name);
                for define in &spec.defines {
                    env.add_define(define.clone());
                }
                if depth == 0 {
                    for source in &spec.extra_sources {
                        env.add_extra_source(source.clone());
                    }
                }
            }
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LibraryKind::External(_) => "external",
            LibraryKind::HeaderOnly(_) => "header-only",
            LibraryKind::Internal(_) => "internal",
        };
        write!(f, "{} ({})", self.id, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> Library {
        Library::external(
            "png",
            ExternalSpec {
                header: Some("png.h".to_string()),
                libs: vec!["png".to_string()],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(LibraryId::new("png").to_string(), "png");
        assert_eq!(
            LibraryId::with_variant("boost", "filesystem").to_string(),
            "boost/filesystem"
        );
    }

    #[test]
    fn test_external_apply_appends_libs() {
        let mut env = Environment::new();
        let options = OptionRegistry::default();

        png().apply(&mut env, 0, &options);
        png().apply(&mut env, 1, &options);

        assert_eq!(env.libs, vec!["png"]);
    }

    #[test]
    fn test_external_apply_honors_overrides() {
        use crate::util::config::{Config, LibraryOverrides};

        let mut config = Config::default();
        config.libs.insert(
            "png".to_string(),
            LibraryOverrides {
                dir: Some(PathBuf::from("/opt/png")),
                libs: Some(vec!["png16".to_string()]),
                ..Default::default()
            },
        );
        let options = OptionRegistry::from_config(&config);

        let mut env = Environment::new();
        png().apply(&mut env, 0, &options);

        assert_eq!(
            env.extern_include_paths,
            vec![PathBuf::from("/opt/png/include")]
        );
        assert_eq!(env.lib_paths, vec![PathBuf::from("/opt/png/lib")]);
        assert_eq!(env.libs, vec!["png16"]);
    }

    #[test]
    fn test_internal_apply_prepends_and_gates_sources() {
        let lib = Library::internal(
            "imgcore",
            InternalSpec {
                include_path: Some(PathBuf::from("libs/imgcore/include")),
                lib_path: Some(PathBuf::from("build/libs/imgcore")),
                extra_sources: vec![PathBuf::from("libs/imgcore/src/init.c")],
                ..Default::default()
            },
        );
        let options = OptionRegistry::default();

        let mut env = Environment::new();
        env.add_lib("z");
        lib.apply(&mut env, 0, &options);
        assert_eq!(env.libs, vec!["imgcore", "z"]);
        assert_eq!(env.extra_sources.len(), 1);

        let mut deep = Environment::new();
        lib.apply(&mut deep, 1, &options);
        assert!(deep.extra_sources.is_empty());
    }

    #[test]
    fn test_declare_options_covers_dependencies() {
        let z = Arc::new(Library::external("z", ExternalSpec::default()));
        let png = png().with_dependency(z);

        let mut registry = OptionRegistry::default();
        png.declare_options(&mut registry);
        assert!(registry.is_declared("png"));
        assert!(registry.is_declared("z"));
    }

    #[test]
    fn test_probe_shape() {
        assert!(png().probe_links());
        let hdr = Library::header_only(
            "span-lite",
            HeaderOnlySpec {
                header: Some("span.hpp".to_string()),
                ..Default::default()
            },
        );
        assert!(!hdr.probe_links());
        assert_eq!(hdr.probe_header(), Some("span.hpp"));
    }
}
