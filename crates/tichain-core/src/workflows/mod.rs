//! # Workflows Module
//!
//! High-level entry points that tie the engine and core layers together.
//!
//! - **Replication** ([`replicate`]) - Copy one edge's working tree from a
//!   reference lambda discretization to a new one and regenerate every
//!   schedule-dependent artifact in the target.

pub mod replicate;
