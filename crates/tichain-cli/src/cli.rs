use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "tichain - staged free-energy pipeline compiler: regenerates per-lambda parameter files and chained job descriptors for RBFE/TI edges.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy one edge's working tree onto a new lambda schedule, regenerating
    /// all parameter files and groupfiles.
    Replicate(ReplicateArgs),
    /// Rewrite mdin parameter directives across an edge's input files.
    SetParams(SetParamsArgs),
    /// Print the validated stage pipeline (scope, resolution, predecessors).
    Graph(GraphArgs),
}

#[derive(Args, Debug)]
pub struct ReplicateArgs {
    /// Path to the source edge directory (containing aq/ and com/).
    #[arg(short, long, required = true, value_name = "DIR")]
    pub edge: PathBuf,

    /// Path to the target edge directory to create.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub target: PathBuf,

    /// Path to a whitespace-separated lambda schedule file.
    #[arg(short, long, value_name = "PATH", conflicts_with = "lambdas")]
    pub schedule: Option<PathBuf>,

    /// Inline lambda schedule, e.g. --lambdas 0.0,0.25,0.5,0.75,1.0
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub lambdas: Option<Vec<f64>>,

    /// Number of independent trials.
    #[arg(long, value_name = "NUM")]
    pub trials: Option<u32>,

    /// Custom stage pipeline as a TOML file of [[stage]] tables.
    #[arg(long, value_name = "PATH")]
    pub stage_graph: Option<PathBuf>,

    /// Optional run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SetParamsArgs {
    /// Path to the edge directory (containing aq/ and com/).
    #[arg(short, long, required = true, value_name = "DIR")]
    pub edge: PathBuf,

    /// A directive override in KEY=VALUE form; may be repeated.
    #[arg(short = 'D', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Restrict the rewrite to one stage's input files.
    #[arg(long, value_name = "NAME")]
    pub stage: Option<String>,

    /// Optional run configuration file providing a [params] table.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Custom stage pipeline as a TOML file of [[stage]] tables.
    #[arg(long, value_name = "PATH")]
    pub stage_graph: Option<PathBuf>,
}
