use std::path::PathBuf;
use thiserror::Error;
use tichain::core::schedule::ScheduleError;
use tichain::core::stage::StageGraphError;
use tichain::engine::error::EngineError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    StageGraph(#[from] StageGraphError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file '{path}': {source}", path = path.display())]
    ConfigParsing {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
