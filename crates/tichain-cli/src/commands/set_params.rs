use crate::cli::SetParamsArgs;
use crate::config::{FileConfig, resolve_overrides};
use crate::error::{CliError, Result};
use tichain::engine::projector::apply_overrides;
use tichain::workflows::replicate::Environment;
use tracing::info;

pub fn run(args: SetParamsArgs) -> Result<()> {
    let file = FileConfig::load_or_default(args.config.as_deref())?;
    let overrides = resolve_overrides(&args.set, &file.params)?;
    if overrides.is_empty() {
        return Err(CliError::Argument(
            "no parameter overrides given (use --set or a [params] table)".to_string(),
        ));
    }

    let mut total = 0;
    for environment in Environment::ALL {
        let inputs = args.edge.join(environment.dir_name()).join("inputs");
        let rewritten = apply_overrides(&inputs, args.stage.as_deref(), &overrides)?;
        info!(
            env = environment.dir_name(),
            rewritten, "applied parameter overrides"
        );
        total += rewritten;
    }
    println!("Rewrote {total} parameter files.");
    Ok(())
}
