//! Compiler toolchain detection and symbolic flag tables.
//!
//! Mode and warning settings are expressed symbolically in the rest of the
//! crate; the flag table of the detected compiler family translates them to
//! concrete arguments. gcc and clang share most of the table, with clang
//! diverging on debug-symbol flags and version reporting.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::util::config::Mode;
use crate::util::process::{find_ar, find_c_compiler, find_cxx_compiler, ProcessBuilder};

/// Compiler family determining the flag dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    Gcc,
    Clang,
}

impl CompilerFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
        }
    }
}

/// Symbolic-to-concrete flag translation for one compiler family.
#[derive(Debug, Clone)]
pub struct FlagTable {
    pub define_prefix: &'static str,
    pub optimize: Vec<&'static str>,
    pub no_optimize: Vec<&'static str>,
    pub debug: Vec<&'static str>,
    pub release: Vec<&'static str>,
    pub warning1: Vec<&'static str>,
    pub warning2: Vec<&'static str>,
    pub warning3: Vec<&'static str>,
    pub visibility_hidden: Vec<&'static str>,
    pub shared_object: Vec<&'static str>,
    pub profile: Vec<&'static str>,
    pub cover: Vec<&'static str>,
    pub link_cover: Vec<&'static str>,
}

impl FlagTable {
    pub fn gcc() -> Self {
        FlagTable {
            define_prefix: "-D",
            optimize: vec!["-O3"],
            no_optimize: vec!["-O0"],
            debug: vec!["-g3", "-ggdb3", "-gstabs3", "-O0"],
            release: vec!["-DRELEASE", "-O3"],
            warning1: vec!["-Wall"],
            warning2: vec!["-Wall", "-Wno-return-type"],
            warning3: vec!["-Wall", "-Wno-return-type", "-Winline"],
            visibility_hidden: vec!["-fvisibility=hidden"],
            shared_object: vec!["-fpic", "-fvisibility=hidden"],
            profile: vec!["-pg"],
            cover: vec!["-fprofile-arcs", "-ftest-coverage"],
            link_cover: vec!["-lgcov"],
        }
    }

    pub fn clang() -> Self {
        // clang takes the gcc dialect except for debug symbols, where the
        // gdb/stabs variants are not supported.
        FlagTable {
            debug: vec!["-g", "-O0"],
            ..FlagTable::gcc()
        }
    }

    pub fn for_family(family: CompilerFamily) -> Self {
        match family {
            CompilerFamily::Gcc => FlagTable::gcc(),
            CompilerFamily::Clang => FlagTable::clang(),
        }
    }

    /// Compiler flags for a mode.
    pub fn mode_flags(&self, mode: Mode) -> &[&'static str] {
        match mode {
            Mode::Debug => &self.debug,
            Mode::Release | Mode::Production => &self.release,
        }
    }

    /// Warning flags for a level (1..=3, clamped).
    pub fn warning_flags(&self, level: u8) -> &[&'static str] {
        match level {
            0 | 1 => &self.warning1,
            2 => &self.warning2,
            _ => &self.warning3,
        }
    }

    /// Render a define as a compiler argument.
    pub fn define_arg(&self, define: &str) -> String {
        format!("{}{}", self.define_prefix, define)
    }
}

/// A detected toolchain: compiler binaries plus the matching flag table.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub family: CompilerFamily,
    pub cc: PathBuf,
    pub cxx: Option<PathBuf>,
    pub ar: Option<PathBuf>,
    pub version: Option<String>,
    pub flags: FlagTable,
}

impl Toolchain {
    /// Detect the toolchain from the environment, optionally forcing a
    /// specific compiler binary.
    pub fn detect(compiler_override: Option<&str>) -> Result<Self> {
        let cc = match compiler_override {
            Some(name) => crate::util::process::find_executable(name)
                .ok_or_else(|| anyhow!("compiler `{}` not found in PATH", name))?,
            None => find_c_compiler().ok_or_else(|| anyhow!("no C compiler found in PATH"))?,
        };

        let version_output = ProcessBuilder::new(&cc).arg("--version").exec().ok();
        let version_text = version_output
            .as_ref()
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())
            .unwrap_or_default();

        let family = classify(&cc, &version_text);
        let version = first_line(&version_text);

        tracing::debug!(
            compiler = %cc.display(),
            family = family.as_str(),
            version = version.as_deref().unwrap_or("unknown"),
            "detected toolchain"
        );

        Ok(Toolchain {
            family,
            cc,
            cxx: find_cxx_compiler(),
            ar: find_ar(),
            version,
            flags: FlagTable::for_family(family),
        })
    }

    /// Detect, falling back to a gcc-dialect placeholder when no compiler is
    /// installed. Used by commands that only print configuration.
    pub fn detect_or_default(compiler_override: Option<&str>) -> Self {
        Toolchain::detect(compiler_override).unwrap_or_else(|e| {
            tracing::warn!("toolchain detection failed: {}", e);
            Toolchain {
                family: CompilerFamily::Gcc,
                cc: PathBuf::from("cc"),
                cxx: None,
                ar: None,
                version: None,
                flags: FlagTable::gcc(),
            }
        })
    }
}

fn classify(cc: &std::path::Path, version_text: &str) -> CompilerFamily {
    let name = cc
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.contains("clang") || version_text.contains("clang version") {
        CompilerFamily::Clang
    } else {
        CompilerFamily::Gcc
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}
