//! Environment construction: toolchains, probes, verification cache.

pub mod cache;
pub mod env_builder;
pub mod probe;
pub mod toolchain;
