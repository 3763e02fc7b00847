use crate::cli::ReplicateArgs;
use crate::config::ReplicationPlan;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tichain::workflows::replicate::{Environment, replicate_environment};
use tracing::info;

pub fn run(args: ReplicateArgs) -> Result<()> {
    let plan = ReplicationPlan::resolve(&args)?;
    info!(
        edge = %plan.edge.display(),
        target = %plan.target.display(),
        states = plan.schedule.len(),
        trials = plan.trials,
        "replicating edge"
    );

    let bar = ProgressBar::new(Environment::ALL.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut reports = Vec::new();
    for environment in Environment::ALL {
        bar.set_message(format!("environment {}", environment.dir_name()));
        reports.push(replicate_environment(
            environment,
            &plan.edge,
            &plan.target,
            &plan.graph,
            &plan.schedule,
            plan.trials,
        )?);
        bar.inc(1);
    }
    bar.finish_and_clear();

    for report in &reports {
        println!(
            "{}: copied {} files, wrote {} parameter files and {} groupfiles",
            report.environment.dir_name(),
            report.files_copied,
            report.parameter_files_written,
            report.group_files_written,
        );
    }
    Ok(())
}
