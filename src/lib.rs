//! Slipway - a build-configuration layer for C/C++ projects
//!
//! This crate provides the core library functionality for slipway:
//! dependency closure resolution, external-library probing with per-run
//! memoization, leaf-first environment merging, and degraded-target
//! handling when a library is missing.

pub mod builder;
pub mod core;
pub mod project;
pub mod resolver;
pub mod util;

pub use crate::core::{
    environment::Environment,
    library::{Library, LibraryId, LibraryKind},
    target::{ArtifactHandle, TargetKind, TargetRecord},
};

pub use crate::builder::{cache::AvailabilityCache, probe::Prober, toolchain::Toolchain};
pub use crate::project::{
    manifest::Manifest, registry::TargetRegistry, report::RunReport, session::BuildSession,
    Executor, PlanExecutor, Project,
};
pub use crate::resolver::resolve;
