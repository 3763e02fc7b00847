//! Compilation of the stage pipeline into chained job descriptors.
//!
//! A job descriptor records one simulation invocation: its parameter file, its
//! output paths, and the restart file of the predecessor stage it starts from.
//! Descriptors are derived state, regenerated wholesale from the stage graph,
//! the schedule, and the trial count; the external batch scheduler consuming
//! them is responsible for honoring the emitted order.

use super::error::EngineError;
use super::fsutil;
use crate::core::naming::{self, ArtifactKind, TOPOLOGY_FILE};
use crate::core::schedule::LambdaSchedule;
use crate::core::stage::{Resolution, Scope, Stage, StageGraph, StageGraphError};
use std::path::Path;
use tracing::debug;

/// One simulation invocation, fully resolved.
///
/// All paths are relative to the environment directory and use `/` separators;
/// they are scheduler-facing tokens, not host paths.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    pub stage: String,
    pub trial: u32,
    pub lambda: f64,
    pub topology: String,
    /// Predecessor restart the run starts from (`-c`).
    pub input_coordinates: String,
    /// The stage's own mdin file (`-i`).
    pub parameter_file: String,
    pub output_log: String,
    pub output_restart: String,
    pub output_trajectory: String,
    /// Predecessor restart used as the positional-restraint reference (`-ref`).
    pub reference_restart: String,
}

impl JobDescriptor {
    /// Renders the canonical single-line groupfile form.
    pub fn render(&self) -> String {
        format!(
            "-O -p {} -c {} -i {} -o {} -r {} -x {} -ref {}",
            self.topology,
            self.input_coordinates,
            self.parameter_file,
            self.output_log,
            self.output_restart,
            self.output_trajectory,
            self.reference_restart,
        )
    }
}

/// Compiles a [`StageGraph`] + [`LambdaSchedule`] + trial count into the
/// ordered descriptor sequence.
pub struct JobChainCompiler<'a> {
    graph: &'a StageGraph,
    schedule: &'a LambdaSchedule,
    trials: u32,
}

impl<'a> JobChainCompiler<'a> {
    pub fn new(graph: &'a StageGraph, schedule: &'a LambdaSchedule, trials: u32) -> Self {
        Self {
            graph,
            schedule,
            trials,
        }
    }

    /// Produces every descriptor in execution order: stage graph order, then
    /// trial order, then schedule order. The graph root emits none (it has no
    /// restart chain to encode).
    pub fn compile(&self) -> Result<Vec<JobDescriptor>, EngineError> {
        let mut descriptors = Vec::new();
        for stage in self.graph.iter() {
            let Some(predecessor) = self.resolve_predecessor(stage)? else {
                continue;
            };
            for trial in self.trial_set(stage) {
                descriptors.extend(self.stage_descriptors(stage, predecessor, trial));
            }
        }
        debug!(count = descriptors.len(), "compiled job chain");
        Ok(descriptors)
    }

    /// Writes one groupfile per (stage, trial) into `inputs_dir`, one rendered
    /// descriptor line per lambda. Returns the number of groupfiles written.
    pub fn write_group_files(&self, inputs_dir: &Path) -> Result<usize, EngineError> {
        let mut written = 0;
        for stage in self.graph.iter() {
            let Some(predecessor) = self.resolve_predecessor(stage)? else {
                continue;
            };
            for trial in self.trial_set(stage) {
                let mut text = String::new();
                for descriptor in self.stage_descriptors(stage, predecessor, trial) {
                    text.push_str(&descriptor.render());
                    text.push('\n');
                }
                let name = group_file_name(stage, trial);
                fsutil::write_atomic(&inputs_dir.join(name), &text)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Looks up the stage's predecessor, or `None` for the graph root. A
    /// dangling predecessor name would be a bug in graph validation, but is
    /// still surfaced as a configuration error rather than trusted.
    fn resolve_predecessor(&self, stage: &Stage) -> Result<Option<&Stage>, EngineError> {
        let Some(name) = stage.predecessor.as_deref() else {
            return Ok(None);
        };
        match self.graph.get(name) {
            Some(predecessor) => Ok(Some(predecessor)),
            None => Err(EngineError::Configuration(
                StageGraphError::UnknownPredecessor {
                    stage: stage.name.clone(),
                    predecessor: name.to_string(),
                },
            )),
        }
    }

    fn trial_set(&self, stage: &Stage) -> std::ops::RangeInclusive<u32> {
        match stage.scope {
            Scope::Shared => 1..=1,
            Scope::PerTrial => 1..=self.trials,
        }
    }

    fn lambda_set(&self, stage: &Stage) -> Vec<f64> {
        match stage.resolution {
            Resolution::LambdaResolved => self.schedule.values().to_vec(),
            Resolution::EndpointOnly => vec![0.0, 1.0],
        }
    }

    fn stage_descriptors(
        &self,
        stage: &Stage,
        predecessor: &Stage,
        trial: u32,
    ) -> Vec<JobDescriptor> {
        // The dependency path uses the predecessor's *own* scope: a per-trial
        // stage following a shared stage points into the shared directory.
        let own_dir = stage.scope.dir(trial);
        let prev_dir = predecessor.scope.dir(trial);
        self.lambda_set(stage)
            .into_iter()
            .map(|lambda| {
                let prev_restart = format!(
                    "{prev_dir}/{}",
                    naming::artifact_name(lambda, &predecessor.name, ArtifactKind::Restart)
                );
                JobDescriptor {
                    stage: stage.name.clone(),
                    trial,
                    lambda,
                    topology: TOPOLOGY_FILE.to_string(),
                    input_coordinates: prev_restart.clone(),
                    parameter_file: format!(
                        "inputs/{}",
                        naming::artifact_name(lambda, &stage.name, ArtifactKind::Input)
                    ),
                    output_log: format!(
                        "{own_dir}/{}",
                        naming::artifact_name(lambda, &stage.name, ArtifactKind::Log)
                    ),
                    output_restart: format!(
                        "{own_dir}/{}",
                        naming::artifact_name(lambda, &stage.name, ArtifactKind::Restart)
                    ),
                    output_trajectory: format!(
                        "{own_dir}/{}",
                        naming::artifact_name(lambda, &stage.name, ArtifactKind::Trajectory)
                    ),
                    reference_restart: prev_restart,
                }
            })
            .collect()
    }
}

/// Groupfile name for one (stage, trial): shared stages are written once with
/// no trial prefix, per-trial stages once per trial.
pub fn group_file_name(stage: &Stage, trial: u32) -> String {
    match stage.scope {
        Scope::Shared => format!("{}.groupfile", stage.name),
        Scope::PerTrial => format!("t{}_{}.groupfile", trial, stage.name),
    }
}
