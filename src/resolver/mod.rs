//! Dependency closure resolution.

pub mod closure;
pub mod errors;

pub use closure::{closure, dedup, resolve, DependencyClosure, ResolvedLibrary};
pub use errors::CyclicDependencyError;
