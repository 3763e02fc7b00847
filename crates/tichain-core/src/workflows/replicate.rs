//! Edge replication: copy a working tree to a new lambda discretization.
//!
//! An edge directory holds one subdirectory per environment (`aq`, `com`), each
//! containing the topology, an `inputs/` directory of per-lambda parameter
//! files and groupfiles, and the stage output directories. Replication copies
//! everything except bulk regenerable outputs, then rebuilds `inputs/` from
//! scratch against the target schedule, leaving the target tree executable
//! independently of the source.

use crate::core::schedule::LambdaSchedule;
use crate::core::stage::StageGraph;
use crate::engine::compiler::JobChainCompiler;
use crate::engine::error::EngineError;
use crate::engine::fsutil;
use crate::engine::projector::ParameterProjector;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// The two simulation environments of a pairwise perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Ligand in water (`aq`).
    Aqueous,
    /// Ligand bound to the target (`com`).
    Complex,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Aqueous, Environment::Complex];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Environment::Aqueous => "aq",
            Environment::Complex => "com",
        }
    }
}

/// Bulk transient outputs excluded from the tree copy; both are regenerated by
/// the simulations themselves.
pub const COPY_DENY_PATTERNS: &[&str] = &["*.mdout", "*.nc"];

/// What replication did to one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub environment: Environment,
    pub files_copied: usize,
    pub parameter_files_written: usize,
    pub group_files_written: usize,
}

/// Replicates one environment subtree of the edge.
#[instrument(skip_all, fields(env = environment.dir_name()))]
pub fn replicate_environment(
    environment: Environment,
    source_edge: &Path,
    target_edge: &Path,
    graph: &StageGraph,
    schedule: &LambdaSchedule,
    trials: u32,
) -> Result<EnvironmentReport, EngineError> {
    let source_env = source_edge.join(environment.dir_name());
    let target_env = target_edge.join(environment.dir_name());
    let files_copied = fsutil::copy_tree(&source_env, &target_env, COPY_DENY_PATTERNS)?;
    info!(files_copied, "copied working tree");

    // Parameter files are regenerated wholesale, never carried over.
    let target_inputs = target_env.join("inputs");
    if target_inputs.exists() {
        fs::remove_dir_all(&target_inputs).map_err(|e| EngineError::io(&target_inputs, e))?;
    }
    fs::create_dir_all(&target_inputs).map_err(|e| EngineError::io(&target_inputs, e))?;

    let source_inputs = source_env.join("inputs");
    let projector = ParameterProjector::new(schedule);
    let mut parameter_files_written = 0;
    for stage in graph.iter() {
        parameter_files_written += projector.project_stage(&source_inputs, &target_inputs, stage)?;
    }
    info!(parameter_files_written, "projected parameter files");

    let compiler = JobChainCompiler::new(graph, schedule, trials);
    let group_files_written = compiler.write_group_files(&target_inputs)?;
    info!(group_files_written, "wrote groupfiles");

    Ok(EnvironmentReport {
        environment,
        files_copied,
        parameter_files_written,
        group_files_written,
    })
}

/// Replicates one edge (both environments) onto a new schedule.
#[instrument(skip_all, fields(edge = %source_edge.display()))]
pub fn replicate_edge(
    source_edge: &Path,
    target_edge: &Path,
    graph: &StageGraph,
    schedule: &LambdaSchedule,
    trials: u32,
) -> Result<Vec<EnvironmentReport>, EngineError> {
    let mut reports = Vec::with_capacity(Environment::ALL.len());
    for environment in Environment::ALL {
        reports.push(replicate_environment(
            environment,
            source_edge,
            target_edge,
            graph,
            schedule,
            trials,
        )?);
    }
    Ok(reports)
}
