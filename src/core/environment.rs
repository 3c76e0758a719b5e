//! Per-target build environment.
//!
//! An [`Environment`] is the configuration bag a target is constructed
//! against: include paths, preprocessor defines, compiler and linker flags,
//! library search paths, link libraries, and extra sources contributed by
//! in-tree libraries. Libraries merge their configuration into an
//! environment leaf-first; every list field keeps first-occurrence order and
//! never holds duplicates.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Append a value to a list unless an equal value is already present.
fn append_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Prepend a value, removing any equal value already present.
///
/// Used for link libraries of in-tree dependencies, which must come before
/// the libraries they themselves depend on in the link line.
fn prepend_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    list.retain(|v| *v != value);
    list.insert(0, value);
}

/// Typed build configuration for one target.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Project-local include paths (`-I`)
    pub include_paths: Vec<PathBuf>,

    /// Include paths of external libraries, kept separate so warnings from
    /// third-party headers can be suppressed (`-isystem`)
    pub extern_include_paths: Vec<PathBuf>,

    /// Preprocessor defines (`-D`)
    pub defines: Vec<String>,

    /// Flags for both C and C++ compilation
    pub ccflags: Vec<String>,

    /// C++-only flags
    pub cxxflags: Vec<String>,

    /// Linker flags
    pub ldflags: Vec<String>,

    /// Library search paths (`-L`)
    pub lib_paths: Vec<PathBuf>,

    /// Link libraries (`-l`), dependency-before-dependent order
    pub libs: Vec<String>,

    /// Extra source files contributed by in-tree libraries that compile
    /// directly into the depending target
    pub extra_sources: Vec<PathBuf>,

    /// Untyped settings for tool-specific configuration the typed fields do
    /// not cover
    pub extras: BTreeMap<String, Vec<String>>,

    /// Named build groups the target joins ("test", "doc", ...)
    pub aliases: Vec<String>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        append_unique(&mut self.include_paths, path.into());
    }

    pub fn add_extern_include_path(&mut self, path: impl Into<PathBuf>) {
        append_unique(&mut self.extern_include_paths, path.into());
    }

    pub fn add_define(&mut self, define: impl Into<String>) {
        append_unique(&mut self.defines, define.into());
    }

    pub fn add_ccflag(&mut self, flag: impl Into<String>) {
        append_unique(&mut self.ccflags, flag.into());
    }

    pub fn add_cxxflag(&mut self, flag: impl Into<String>) {
        append_unique(&mut self.cxxflags, flag.into());
    }

    pub fn add_ldflag(&mut self, flag: impl Into<String>) {
        append_unique(&mut self.ldflags, flag.into());
    }

    pub fn add_lib_path(&mut self, path: impl Into<PathBuf>) {
        append_unique(&mut self.lib_paths, path.into());
    }

    /// Append a link library (external dependency position).
    pub fn add_lib(&mut self, lib: impl Into<String>) {
        append_unique(&mut self.libs, lib.into());
    }

    /// Prepend a link library (in-tree dependency position).
    pub fn prepend_lib(&mut self, lib: impl Into<String>) {
        prepend_unique(&mut self.libs, lib.into());
    }

    pub fn add_extra_source(&mut self, path: impl Into<PathBuf>) {
        append_unique(&mut self.extra_sources, path.into());
    }

    /// Append values under an untyped key.
    pub fn add_extra(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = String>) {
        let slot = self.extras.entry(key.into()).or_default();
        for value in values {
            append_unique(slot, value);
        }
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        append_unique(&mut self.aliases, alias.into());
    }
}
