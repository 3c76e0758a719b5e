//! Configuration file support for slipway.
//!
//! Two configuration file locations are supported:
//! - Global: `~/.slipway/config.toml` - user-wide defaults
//! - Project: `.slipway/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config. Besides build
//! options, the config carries per-library overrides for machines where an
//! external library is not installed under `/usr/include` and `/usr/lib`:
//!
//! ```toml
//! [libs.jpeg]
//! incdir = "/opt/custom/jpeg/include"
//! libdir = "/opt/custom/jpeg/lib"
//!
//! # or, when the subdirectories use the standard names:
//! [libs.png]
//! dir = "/opt/custom/png"
//!
//! # the link line can be overridden as well:
//! [libs.tiff]
//! libs = ["tiff_custom", "mt"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Compilation mode selecting the flag set applied to every environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Debug,
    Release,
    #[default]
    Production,
}

impl Mode {
    /// All recognized modes, for help text.
    pub const ALL: &'static [Mode] = &[Mode::Debug, Mode::Release, Mode::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Debug => "debug",
            Mode::Release => "release",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Mode::Debug),
            "release" => Ok(Mode::Release),
            "production" => Ok(Mode::Production),
            _ => Err(format!(
                "invalid mode '{}'; expected 'debug', 'release', or 'production'",
                s
            )),
        }
    }
}

/// Build options, settable from config files and overridden by the CLI.
///
/// Every field is optional so layered configs can tell "explicitly set"
/// apart from "left at the default": a project config setting a field wins
/// over the global config even when it sets the default value. Use the
/// accessor methods for effective values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Compilation mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Whether external libraries are verified before use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_libs: Option<bool>,

    /// Keep going when a library probe fails; degraded targets are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_configure_errors: Option<bool>,

    /// Parallel verification jobs (0 = rayon default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Compiler override (e.g. "clang"); auto-detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
}

impl BuildOptions {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    pub fn check_libs(&self) -> bool {
        self.check_libs.unwrap_or(true)
    }

    pub fn ignore_configure_errors(&self) -> bool {
        self.ignore_configure_errors.unwrap_or(false)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or(0)
    }
}

/// Per-library location overrides from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryOverrides {
    /// Root directory with standard `include`/`lib` subdirectories
    pub dir: Option<PathBuf>,

    /// Explicit include directory
    pub incdir: Option<PathBuf>,

    /// Explicit library directory
    pub libdir: Option<PathBuf>,

    /// Replacement link-library names
    pub libs: Option<Vec<String>>,
}

impl LibraryOverrides {
    /// Effective include directory, derived from `incdir` or `dir`.
    pub fn include_dir(&self) -> Option<PathBuf> {
        self.incdir
            .clone()
            .or_else(|| self.dir.as_ref().map(|d| d.join("include")))
    }

    /// Effective library directory, derived from `libdir` or `dir`.
    pub fn lib_dir(&self) -> Option<PathBuf> {
        self.libdir
            .clone()
            .or_else(|| self.dir.as_ref().map(|d| d.join("lib")))
    }

    /// Check if any override is set.
    pub fn is_empty(&self) -> bool {
        self == &LibraryOverrides::default()
    }
}

/// slipway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build options
    pub build: BuildOptions,

    /// Per-library location overrides, keyed by library name
    pub libs: BTreeMap<String, LibraryOverrides>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config into this one. Fields the other config sets
    /// explicitly take precedence, in either direction.
    pub fn merge(&mut self, other: Config) {
        if other.build.mode.is_some() {
            self.build.mode = other.build.mode;
        }
        if other.build.check_libs.is_some() {
            self.build.check_libs = other.build.check_libs;
        }
        if other.build.ignore_configure_errors.is_some() {
            self.build.ignore_configure_errors = other.build.ignore_configure_errors;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.compiler.is_some() {
            self.build.compiler = other.build.compiler;
        }
        for (name, overrides) in other.libs {
            self.libs.insert(name, overrides);
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`.slipway/config.toml`)
/// 2. Global config (`~/.slipway/config.toml`)
/// 3. Defaults
pub fn load_config(project_root: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config.merge(Config::load_or_default(&global_path));
        }
    }

    let project_path = project_config_path(project_root);
    if project_path.exists() {
        config.merge(Config::load_or_default(&project_path));
    }

    config
}

/// Get the global slipway config directory (`~/.slipway`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".slipway"))
}

/// Get the global config path (`~/.slipway/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (`.slipway/config.toml`).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".slipway").join("config.toml")
}

/// Shared registry of library options declared during a run.
///
/// Libraries declare their options (location overrides) once per run;
/// re-declaring is a no-op. Values are seeded from the config file's
/// `[libs.*]` tables.
#[derive(Debug, Default)]
pub struct OptionRegistry {
    overrides: BTreeMap<String, LibraryOverrides>,
    declared: BTreeSet<String>,
}

impl OptionRegistry {
    /// Create an option registry seeded from a config.
    pub fn from_config(config: &Config) -> Self {
        OptionRegistry {
            overrides: config.libs.clone(),
            declared: BTreeSet::new(),
        }
    }

    /// Declare a library's options. Returns false if already declared.
    pub fn declare(&mut self, name: &str) -> bool {
        self.declared.insert(name.to_string())
    }

    /// Check whether a library has declared its options.
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Get the overrides for a library, if any are configured.
    pub fn overrides(&self, name: &str) -> Option<&LibraryOverrides> {
        self.overrides.get(name).filter(|o| !o.is_empty())
    }
}
