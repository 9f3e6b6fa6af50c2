//! Ambient utilities shared by the CLI: a fixed-size thread pool for
//! dispatching whole, disjoint model-building tasks, layered CLI/env
//! configuration, and an edit-distance helper for surface-word lookups.

pub mod config;
pub mod levenshtein;
pub mod pool;

pub use config::ModelConfig;
pub use pool::ThreadPool;
