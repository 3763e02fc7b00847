//! # Engine Module
//!
//! The logic core of the staged-simulation compiler.
//!
//! - **Projection** ([`projector`]) - Rewrites one stage's per-lambda parameter
//!   files so they are consistent with a target [`crate::core::schedule::LambdaSchedule`].
//! - **Compilation** ([`compiler`]) - Emits ordered job descriptors whose
//!   restart dependencies chain each stage onto its predecessor at matching
//!   lambda and trial.
//! - **Filesystem** ([`fsutil`]) - Atomic file replacement and the filtered
//!   working-tree copy.
//! - **Errors** ([`error`]) - The engine-wide error taxonomy.
//!
//! Everything in this layer is single-threaded and deterministic: re-running
//! any operation against unchanged inputs produces byte-identical output.

pub mod compiler;
pub mod error;
pub mod fsutil;
pub mod projector;
