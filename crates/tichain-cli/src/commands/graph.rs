use crate::cli::GraphArgs;
use crate::error::Result;
use tichain::core::stage::{Resolution, Scope, StageGraph};

pub fn run(args: GraphArgs) -> Result<()> {
    let graph = match &args.stage_graph {
        Some(path) => StageGraph::from_toml_file(path)?,
        None => StageGraph::amber_ti(),
    };

    println!("{:<4} {:<12} {:<10} {:<16} {}", "#", "stage", "scope", "resolution", "predecessor");
    for (index, stage) in graph.iter().enumerate() {
        let scope = match stage.scope {
            Scope::Shared => "shared",
            Scope::PerTrial => "per-trial",
        };
        let resolution = match stage.resolution {
            Resolution::EndpointOnly => "endpoint-only",
            Resolution::LambdaResolved => "lambda-resolved",
        };
        println!(
            "{:<4} {:<12} {:<10} {:<16} {}",
            index,
            stage.name,
            scope,
            resolution,
            stage.predecessor.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
