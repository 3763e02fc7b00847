//! The optional TOML run configuration.
//!
//! Command-line flags always win over config-file values; the file exists so a
//! calculation campaign can pin its schedule, trial count, and parameter
//! overrides next to the data.

use crate::cli::ReplicateArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tichain::core::schedule::LambdaSchedule;
use tichain::core::stage::StageGraph;
use tracing::debug;

const DEFAULT_TRIALS: u32 = 3;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub schedule: Option<Vec<f64>>,
    pub schedule_file: Option<PathBuf>,
    pub trials: Option<u32>,
    pub stage_graph: Option<PathBuf>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| CliError::ConfigParsing {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                debug!(path = %path.display(), "loading run configuration");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// A fully resolved replication run.
pub struct ReplicationPlan {
    pub edge: PathBuf,
    pub target: PathBuf,
    pub schedule: LambdaSchedule,
    pub graph: StageGraph,
    pub trials: u32,
}

impl ReplicationPlan {
    /// Merges CLI arguments over the config file, validating as it goes.
    pub fn resolve(args: &ReplicateArgs) -> Result<Self> {
        let file = FileConfig::load_or_default(args.config.as_deref())?;

        let schedule = if let Some(lambdas) = &args.lambdas {
            LambdaSchedule::new(lambdas.clone())?
        } else if let Some(path) = &args.schedule {
            LambdaSchedule::from_file(path)?
        } else if let Some(lambdas) = &file.schedule {
            LambdaSchedule::new(lambdas.clone())?
        } else if let Some(path) = &file.schedule_file {
            LambdaSchedule::from_file(path)?
        } else {
            return Err(CliError::Config(
                "no lambda schedule given (use --schedule, --lambdas, or the config file)"
                    .to_string(),
            ));
        };

        let graph = match args.stage_graph.as_deref().or(file.stage_graph.as_deref()) {
            Some(path) => StageGraph::from_toml_file(path)?,
            None => StageGraph::amber_ti(),
        };

        let trials = args.trials.or(file.trials).unwrap_or(DEFAULT_TRIALS);
        if trials == 0 {
            return Err(CliError::Config("trials must be at least 1".to_string()));
        }

        Ok(Self {
            edge: args.edge.clone(),
            target: args.target.clone(),
            schedule,
            graph,
            trials,
        })
    }
}

/// Parses repeated `KEY=VALUE` override arguments, merged over the config
/// file's `[params]` table.
pub fn resolve_overrides(
    sets: &[String],
    file_params: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut overrides = file_params.clone();
    for entry in sets {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(CliError::Argument(format!(
                "override '{entry}' is not in KEY=VALUE form"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Argument(format!(
                "override '{entry}' has an empty key"
            )));
        }
        overrides.insert(key.to_string(), value.trim().to_string());
    }
    Ok(overrides)
}
