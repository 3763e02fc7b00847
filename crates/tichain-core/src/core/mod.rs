//! # Core Module
//!
//! Fundamental value types and conventions for staged free-energy pipelines.
//!
//! - **Naming** ([`naming`]) - The canonical 8-decimal lambda token and the
//!   per-lambda artifact filename scheme every component agrees on.
//! - **Schedules** ([`schedule`]) - The validated, immutable lambda
//!   discretization.
//! - **Stages** ([`stage`]) - The static, ordered definition of the simulation
//!   pipeline and its restart-dependency links.

pub mod naming;
pub mod schedule;
pub mod stage;
