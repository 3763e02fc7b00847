//! The static, ordered definition of the simulation pipeline.
//!
//! A [`StageGraph`] is configuration data, not runtime state: it is authored
//! once (built-in or TOML), validated once, and shared by every edge,
//! environment, and trial. The closed [`Scope`] and [`Resolution`] enums
//! replace the original controller's free-floating stage-name dictionaries, so
//! a typo in a stage name is a construction error rather than a silent miss.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageGraphError {
    #[error("stage graph contains no stages")]
    Empty,

    #[error("duplicate stage name '{0}'")]
    DuplicateName(String),

    #[error("stage '{0}' has no predecessor, but the pipeline root is '{1}'")]
    MultipleRoots(String, String),

    #[error("the first stage '{0}' must not declare a predecessor")]
    RootHasPredecessor(String),

    #[error("stage '{stage}' references unknown predecessor '{predecessor}'")]
    UnknownPredecessor { stage: String, predecessor: String },

    #[error("stage '{stage}' must come after its predecessor '{predecessor}'")]
    PredecessorNotEarlier { stage: String, predecessor: String },

    #[error("failed to read stage graph file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse stage graph file '{path}': {source}", path = path.display())]
    ParseToml {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Whether a stage's output is common to all trials or duplicated per trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    Shared,
    PerTrial,
}

impl Scope {
    /// The output directory of a stage under this scope. Shared output lives in
    /// a single trial-independent directory; per-trial output in `t{n}/`.
    pub fn dir(&self, trial: u32) -> String {
        match self {
            Scope::Shared => "shared".to_string(),
            Scope::PerTrial => format!("t{trial}"),
        }
    }
}

/// Whether a stage runs at every schedule value or only at the two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    EndpointOnly,
    LambdaResolved,
}

/// One step of the fixed simulation pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Stage {
    pub name: String,
    pub scope: Scope,
    pub resolution: Resolution,
    pub predecessor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct StageGraphFile {
    stage: Vec<Stage>,
}

/// A validated total order of [`Stage`]s.
///
/// Validation guarantees: at least one stage, unique names, exactly one root
/// (the first stage, with no predecessor), and every predecessor resolving to
/// a strictly earlier stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageGraph {
    stages: Vec<Stage>,
}

impl StageGraph {
    pub fn new(stages: Vec<Stage>) -> Result<Self, StageGraphError> {
        let Some(root) = stages.first() else {
            return Err(StageGraphError::Empty);
        };
        if let Some(predecessor) = &root.predecessor {
            return Err(StageGraphError::RootHasPredecessor(predecessor.clone()));
        }
        let root_name = root.name.clone();
        for (index, stage) in stages.iter().enumerate() {
            if stages[..index].iter().any(|s| s.name == stage.name) {
                return Err(StageGraphError::DuplicateName(stage.name.clone()));
            }
            if index == 0 {
                continue;
            }
            let Some(predecessor) = &stage.predecessor else {
                return Err(StageGraphError::MultipleRoots(
                    stage.name.clone(),
                    root_name.clone(),
                ));
            };
            match stages.iter().position(|s| &s.name == predecessor) {
                None => {
                    return Err(StageGraphError::UnknownPredecessor {
                        stage: stage.name.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
                Some(pred_index) if pred_index >= index => {
                    return Err(StageGraphError::PredecessorNotEarlier {
                        stage: stage.name.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self { stages })
    }

    /// Loads a custom pipeline from a TOML file of `[[stage]]` tables.
    pub fn from_toml_file(path: &Path) -> Result<Self, StageGraphError> {
        let text = std::fs::read_to_string(path).map_err(|source| StageGraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: StageGraphFile =
            toml::from_str(&text).map_err(|source| StageGraphError::ParseToml {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        Self::new(file.stage)
    }

    /// The built-in AMBER TI pipeline: minimization and a shared equilibration
    /// chain down to `eqProt0`, then the per-trial TI block. Only the final
    /// equilibration and production stages are lambda-resolved; everything else
    /// runs at the two endpoints.
    pub fn amber_ti() -> Self {
        const SHARED_CHAIN: &[&str] = &[
            "init", "min1", "min2", "eqpre1P0", "eqpre2P0", "eqP0", "eqNTP4", "eqV", "eqP", "eqA",
            "eqProt2", "eqProt1", "eqProt05", "eqProt025", "eqProt01", "eqProt0",
        ];
        const TRIAL_ENDPOINT: &[&str] = &["minTI", "eqpre1P0TI", "eqpre2P0TI", "eqP0TI"];
        const TRIAL_LAMBDA: &[&str] = &["eqATI", "preTI", "ti"];

        let mut stages = Vec::new();
        let mut previous: Option<String> = None;
        let blocks = [
            (SHARED_CHAIN, Scope::Shared, Resolution::EndpointOnly),
            (TRIAL_ENDPOINT, Scope::PerTrial, Resolution::EndpointOnly),
            (TRIAL_LAMBDA, Scope::PerTrial, Resolution::LambdaResolved),
        ];
        for (names, scope, resolution) in blocks {
            for name in names {
                stages.push(Stage {
                    name: name.to_string(),
                    scope,
                    resolution,
                    predecessor: previous.take(),
                });
                previous = Some(name.to_string());
            }
        }
        // The table above is a valid graph by construction.
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn by_scope(&self, scope: Scope) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(move |s| s.scope == scope)
    }

    pub fn by_resolution(&self, resolution: Resolution) -> impl Iterator<Item = &Stage> {
        self.stages.iter().filter(move |s| s.resolution == resolution)
    }

    /// The stage `stage` chains its restart dependency onto, if any.
    pub fn predecessor_of(&self, stage: &Stage) -> Option<&Stage> {
        stage.predecessor.as_deref().and_then(|name| self.get(name))
    }
}
