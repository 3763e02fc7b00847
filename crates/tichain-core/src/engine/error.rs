use crate::core::schedule::ScheduleError;
use crate::core::stage::StageGraphError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while projecting parameter files or compiling job chains.
///
/// All of these are fatal: inputs are deterministic filesystem state, so a
/// failure means the source tree or schedule is malformed and must be fixed
/// before re-running. No retries, no partial recovery.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("stage graph configuration error: {0}")]
    Configuration(#[from] StageGraphError),

    #[error(
        "missing endpoint parameter file '{endpoint}_{stage}.mdin' in '{dir}'",
        dir = dir.display()
    )]
    MissingEndpoint {
        stage: String,
        endpoint: String,
        dir: PathBuf,
    },

    #[error(
        "no interior template parameter file for stage '{stage}' in '{dir}' \
         (schedule has {states} states)",
        dir = dir.display()
    )]
    MissingTemplate {
        stage: String,
        dir: PathBuf,
        states: usize,
    },

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
