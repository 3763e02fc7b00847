//! # tichain Core Library
//!
//! A library for compiling staged alchemical free-energy (TI/RBFE) simulation
//! pipelines into internally consistent parameter files and chained job
//! descriptors.
//!
//! An RBFE calculation runs a graph of pairwise perturbations ("edges"), each in
//! two environments, over a discretized coupling-parameter ("lambda") schedule
//! and several independent trials. Changing the lambda discretization invalidates
//! every per-lambda parameter file and every restart dependency between stages;
//! this crate regenerates both from first principles.
//!
//! ## Architecture
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless value types: the validated
//!   [`core::schedule::LambdaSchedule`], the static [`core::stage::StageGraph`]
//!   describing the simulation pipeline, and the canonical on-disk naming
//!   conventions shared by every component.
//!
//! - **[`engine`]: The Logic Core.** The [`engine::projector::ParameterProjector`]
//!   rewrites per-lambda parameter files against a target schedule, and the
//!   [`engine::compiler::JobChainCompiler`] emits ordered job descriptors whose
//!   restart dependencies chain each stage onto its predecessor.
//!
//! - **[`workflows`]: The Public API.** The highest-level entry points, currently
//!   [`workflows::replicate`]: copy one edge's working tree to a new
//!   discretization and regenerate all affected artifacts.

pub mod core;
pub mod engine;
pub mod workflows;
