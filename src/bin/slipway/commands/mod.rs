//! Command implementations.

pub mod build;
pub mod check;
pub mod completions;
pub mod flags;
pub mod targets;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use slipway::project::manifest::{find_manifest, Manifest, MANIFEST_FILENAME};
use slipway::util::diagnostic::suggestions;

/// Locate and load the manifest, returning the project root alongside it.
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<(PathBuf, Manifest)> {
    let path = match manifest_path {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().context("cannot determine current directory")?;
            find_manifest(&cwd).ok_or_else(|| {
                anyhow!(
                    "no {} found in `{}` or any parent directory\nhelp: {}",
                    MANIFEST_FILENAME,
                    cwd.display(),
                    suggestions::NO_MANIFEST
                )
            })?
        }
    };

    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let manifest = Manifest::load(&path)?;
    Ok((root, manifest))
}
