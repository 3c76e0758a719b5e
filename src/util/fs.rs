//! Filesystem utilities: source scanning and small helpers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Default reject markers for source scanning.
///
/// A path containing any of these substrings is excluded. The `@` marker
/// follows the convention of flagging generated or disabled files.
pub const DEFAULT_REJECT: &[&str] = &["@"];

/// Read a file to string, with a path in the error message.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Scan for source files matching glob patterns under a base directory.
///
/// Paths containing any of the `reject` substrings are dropped. The result
/// is sorted and deduplicated so that declaration order in a manifest does
/// not affect the scanned file list.
pub fn scan_sources(base: &Path, patterns: &[String], reject: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    let display = path.to_string_lossy();
                    if reject.iter().any(|r| display.contains(r)) {
                        continue;
                    }
                    results.push(path);
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}
