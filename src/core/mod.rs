//! Core types: library descriptors, environments, targets.

pub mod environment;
pub mod library;
pub mod target;
