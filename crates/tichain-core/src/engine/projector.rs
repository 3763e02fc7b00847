//! Projection of per-lambda parameter files onto a target schedule.
//!
//! An mdin parameter file declares three things the schedule controls: the
//! multistate count (`mbar_states`), the 1-based index table mapping each state
//! to its lambda value (`mbar_lambda(i)`), and the file's own coupling value
//! (`clambda`). Projection scans the file line by line and rewrites exactly
//! those directives, passing every other line through untouched.
//!
//! Endpoint files (`0.00000000`/`1.00000000`) are rewritten in place with their
//! own fixed coupling value and are never renamed. Interior files are
//! regenerated from one arbitrary existing interior file used as a structural
//! template, one output file per interior schedule value.

use super::error::EngineError;
use super::fsutil;
use crate::core::naming::{self, ArtifactKind, ENDPOINT_ONE, ENDPOINT_ZERO};
use crate::core::schedule::LambdaSchedule;
use crate::core::stage::{Resolution, Stage};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Rewrites parameter files to be consistent with one target schedule.
pub struct ParameterProjector<'a> {
    schedule: &'a LambdaSchedule,
}

impl<'a> ParameterProjector<'a> {
    pub fn new(schedule: &'a LambdaSchedule) -> Self {
        Self { schedule }
    }

    /// Projects one stage's parameter files from `src_inputs` into
    /// `dst_inputs`, returning the number of files written.
    ///
    /// The physical end states are mandatory: a source tree lacking either
    /// endpoint file is a [`EngineError::MissingEndpoint`] naming the absent
    /// one. For a lambda-resolved stage with interior schedule values, a
    /// missing interior template is a [`EngineError::MissingTemplate`].
    /// Afterwards a lambda-resolved stage has exactly `schedule.len()`
    /// parameter files in `dst_inputs`.
    pub fn project_stage(
        &self,
        src_inputs: &Path,
        dst_inputs: &Path,
        stage: &Stage,
    ) -> Result<usize, EngineError> {
        let mut written = 0;

        for token in [ENDPOINT_ZERO, ENDPOINT_ONE] {
            let name = format!("{}_{}.{}", token, stage.name, ArtifactKind::Input.extension());
            let src = src_inputs.join(&name);
            if !src.exists() {
                return Err(EngineError::MissingEndpoint {
                    stage: stage.name.clone(),
                    endpoint: token.to_string(),
                    dir: src_inputs.to_path_buf(),
                });
            }
            let content = fs::read_to_string(&src).map_err(|e| EngineError::io(&src, e))?;
            fsutil::write_atomic(&dst_inputs.join(&name), &self.rewrite(&content, token))?;
            written += 1;
        }

        if stage.resolution == Resolution::LambdaResolved && !self.schedule.interior().is_empty() {
            let template = self.find_interior_template(src_inputs, stage)?;
            for &lambda in self.schedule.interior() {
                let token = naming::lambda_token(lambda);
                let name = naming::artifact_name(lambda, &stage.name, ArtifactKind::Input);
                fsutil::write_atomic(&dst_inputs.join(name), &self.rewrite(&template, &token))?;
                written += 1;
            }
        }

        debug!(stage = %stage.name, written, "projected parameter files");
        Ok(written)
    }

    /// Reads the contents of one arbitrary interior (non-endpoint) input file
    /// for `stage`, selected deterministically by filename order.
    fn find_interior_template(
        &self,
        src_inputs: &Path,
        stage: &Stage,
    ) -> Result<String, EngineError> {
        let entries = fs::read_dir(src_inputs).map_err(|e| EngineError::io(src_inputs, e))?;
        let mut candidates: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(src_inputs, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            match naming::parse_artifact_name(name, &stage.name, ArtifactKind::Input) {
                Some(token) if !naming::is_endpoint_token(token) => {
                    candidates.push(name.to_string());
                }
                _ => {}
            }
        }
        candidates.sort();
        let Some(name) = candidates.first() else {
            return Err(EngineError::MissingTemplate {
                stage: stage.name.clone(),
                dir: src_inputs.to_path_buf(),
                states: self.schedule.len(),
            });
        };
        let path = src_inputs.join(name);
        fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))
    }

    /// The line-by-line directive rewrite.
    ///
    /// Table rows past the schedule length are dropped; the consuming engine
    /// parses the table positionally and tolerates the shorter tail. Rows the
    /// template lacks for a longer schedule are appended after the last table
    /// row, so the table always holds exactly one entry per schedule index.
    fn rewrite(&self, content: &str, clambda: &str) -> String {
        let states = self.schedule.len();
        let mut out: Vec<String> = Vec::new();
        // Insertion anchor for appended table rows, and the highest index kept.
        let mut anchor: Option<usize> = None;
        let mut max_index = 0usize;

        for line in content.lines() {
            let key = line.split('=').next().unwrap_or("").trim();
            if key == "mbar_states" {
                out.push(format!("mbar_states = {states}"));
                anchor.get_or_insert(out.len() - 1);
            } else if let Some(index) = table_index(key) {
                if index == 0 || index > states {
                    trace!(index, states, "dropping out-of-range mbar_lambda row");
                    continue;
                }
                max_index = max_index.max(index);
                out.push(table_row(index, self.schedule.values()[index - 1]));
                anchor = Some(out.len() - 1);
            } else if key == "clambda" {
                out.push(format!("clambda = {clambda}"));
            } else {
                out.push(line.to_string());
            }
        }

        if let Some(anchor) = anchor {
            for (offset, index) in (max_index + 1..=states).enumerate() {
                let row = table_row(index, self.schedule.values()[index - 1]);
                out.insert(anchor + 1 + offset, row);
            }
        }

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

/// Parses the 1-based index out of an `mbar_lambda(i)` directive key.
fn table_index(key: &str) -> Option<usize> {
    key.strip_prefix("mbar_lambda(")?
        .strip_suffix(')')?
        .trim()
        .parse()
        .ok()
}

fn table_row(index: usize, lambda: f64) -> String {
    format!("mbar_lambda({index}) = {}", naming::lambda_token(lambda))
}

/// Rewrites `key = value` directives across a selection of `*.mdin` files.
///
/// `stage` narrows the selection to one stage's files; `None` touches every
/// mdin file in the directory. Only lines whose directive key appears in
/// `overrides` change. Returns the number of files rewritten.
pub fn apply_overrides(
    inputs_dir: &Path,
    stage: Option<&str>,
    overrides: &BTreeMap<String, String>,
) -> Result<usize, EngineError> {
    if overrides.is_empty() {
        debug!("no parameter overrides supplied");
        return Ok(0);
    }
    let entries = fs::read_dir(inputs_dir).map_err(|e| EngineError::io(inputs_dir, e))?;
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(inputs_dir, e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let selected = match stage {
            Some(stage) => naming::parse_artifact_name(name, stage, ArtifactKind::Input).is_some(),
            None => name.ends_with(".mdin"),
        };
        if selected {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut rewritten = 0;
    for name in names {
        let path = inputs_dir.join(&name);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
        let mut changed = false;
        let mut out: Vec<String> = Vec::new();
        for line in content.lines() {
            let key = line.split('=').next().unwrap_or("").trim();
            match overrides.get(key) {
                Some(value) => {
                    let replacement = format!("{key} = {value}");
                    changed |= replacement != line;
                    out.push(replacement);
                }
                None => out.push(line.to_string()),
            }
        }
        if changed {
            let mut text = out.join("\n");
            text.push('\n');
            fsutil::write_atomic(&path, &text)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stage::Scope;
    use std::path::PathBuf;

    fn ti_stage() -> Stage {
        Stage {
            name: "ti".to_string(),
            scope: Scope::PerTrial,
            resolution: Resolution::LambdaResolved,
            predecessor: Some("preTI".to_string()),
        }
    }

    fn eq_stage() -> Stage {
        Stage {
            name: "eqA".to_string(),
            scope: Scope::Shared,
            resolution: Resolution::EndpointOnly,
            predecessor: Some("eqP".to_string()),
        }
    }

    fn mdin(states: usize, schedule: &[f64], clambda: &str) -> String {
        let mut lines = vec![
            "&cntrl".to_string(),
            "  nstlim = 500000".to_string(),
            format!("mbar_states = {states}"),
        ];
        for (i, v) in schedule.iter().enumerate() {
            lines.push(format!("mbar_lambda({}) = {}", i + 1, v));
        }
        lines.push(format!("clambda = {clambda}"));
        lines.push("&end".to_string());
        lines.join("\n") + "\n"
    }

    /// Writes a reference inputs/ directory for `stages` over `schedule`.
    fn write_inputs(dir: &Path, stages: &[&Stage], schedule: &[f64]) {
        for stage in stages {
            let lambdas: &[f64] = match stage.resolution {
                Resolution::LambdaResolved => schedule,
                Resolution::EndpointOnly => &[0.0, 1.0],
            };
            for &lambda in lambdas {
                let name = naming::artifact_name(lambda, &stage.name, ArtifactKind::Input);
                let content = mdin(
                    schedule.len(),
                    schedule,
                    &naming::lambda_token(lambda),
                );
                std::fs::write(dir.join(name), content).unwrap();
            }
        }
    }

    fn setup(schedule: &[f64]) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src_inputs");
        let dst = dir.path().join("dst_inputs");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        write_inputs(&src, &[&ti_stage(), &eq_stage()], schedule);
        (dir, src, dst)
    }

    fn read(dir: &Path, lambda: f64, stage: &str) -> String {
        let name = naming::artifact_name(lambda, stage, ArtifactKind::Input);
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn lambda_resolved_stage_yields_one_file_per_schedule_value() {
        let (_guard, src, dst) = setup(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();

        let written = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();

        assert_eq!(written, target.len());
        for &lambda in target.values() {
            let content = read(&dst, lambda, "ti");
            assert!(content.contains("mbar_states = 5"), "{content}");
            assert!(
                content.contains(&format!("clambda = {}", naming::lambda_token(lambda))),
                "{content}"
            );
        }
    }

    #[test]
    fn shrinking_drops_trailing_table_rows() {
        let reference: Vec<f64> = (0..11).map(|i| i as f64 / 10.0).collect();
        let (_guard, src, dst) = setup(&reference);
        let target = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();

        ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();

        let content = read(&dst, 0.25, "ti");
        assert!(content.contains("mbar_states = 5"));
        assert!(content.contains("mbar_lambda(5) = 1.00000000"));
        for index in 6..=11 {
            assert!(
                !content.contains(&format!("mbar_lambda({index})")),
                "row {index} must be dropped: {content}"
            );
        }
    }

    #[test]
    fn growing_appends_the_missing_table_rows_in_order() {
        let (_guard, src, dst) = setup(&[0.0, 0.5, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();

        ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();

        let content = read(&dst, 0.75, "ti");
        let rows: Vec<&str> = content
            .lines()
            .filter(|l| l.trim_start().starts_with("mbar_lambda("))
            .collect();
        assert_eq!(
            rows,
            vec![
                "mbar_lambda(1) = 0.00000000",
                "mbar_lambda(2) = 0.25000000",
                "mbar_lambda(3) = 0.50000000",
                "mbar_lambda(4) = 0.75000000",
                "mbar_lambda(5) = 1.00000000",
            ]
        );
    }

    #[test]
    fn endpoint_files_keep_their_own_coupling_value() {
        let (_guard, src, dst) = setup(&[0.0, 0.5, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.1, 0.9, 1.0]).unwrap();

        ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();

        assert!(read(&dst, 0.0, "ti").contains("clambda = 0.00000000"));
        assert!(read(&dst, 1.0, "ti").contains("clambda = 1.00000000"));
    }

    #[test]
    fn endpoint_only_stage_writes_exactly_two_files() {
        let (_guard, src, dst) = setup(&[0.0, 0.5, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();

        let written = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &eq_stage())
            .unwrap();

        assert_eq!(written, 2);
        assert!(read(&dst, 0.0, "eqA").contains("mbar_states = 5"));
    }

    #[test]
    fn non_directive_lines_pass_through_unchanged() {
        let (_guard, src, dst) = setup(&[0.0, 0.5, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.5, 1.0]).unwrap();

        ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();

        let content = read(&dst, 0.5, "ti");
        assert!(content.contains("&cntrl"));
        assert!(content.contains("  nstlim = 500000"));
        assert!(content.contains("&end"));
    }

    #[test]
    fn projection_is_idempotent() {
        let (_guard, src, dst) = setup(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();
        let projector = ParameterProjector::new(&target);

        projector.project_stage(&src, &dst, &ti_stage()).unwrap();
        let first: Vec<String> = target
            .values()
            .iter()
            .map(|&l| read(&dst, l, "ti"))
            .collect();

        // Re-project the projected tree onto itself.
        projector.project_stage(&dst, &dst, &ti_stage()).unwrap();
        let second: Vec<String> = target
            .values()
            .iter()
            .map(|&l| read(&dst, l, "ti"))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_restores_the_reference_table() {
        let reference = vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0];
        let (_guard, src, _) = setup(&reference);
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("forward");
        let back = dir.path().join("back");
        std::fs::create_dir_all(&forward).unwrap();
        std::fs::create_dir_all(&back).unwrap();

        let target = LambdaSchedule::new(vec![0.0, 0.5, 1.0]).unwrap();
        let original = LambdaSchedule::new(reference.clone()).unwrap();

        ParameterProjector::new(&target)
            .project_stage(&src, &forward, &ti_stage())
            .unwrap();
        ParameterProjector::new(&original)
            .project_stage(&forward, &back, &ti_stage())
            .unwrap();

        let content = read(&back, 0.4, "ti");
        for (i, &v) in reference.iter().enumerate() {
            assert!(
                content.contains(&table_row(i + 1, v)),
                "missing row {}: {content}",
                i + 1
            );
        }
        assert!(content.contains(&format!("mbar_states = {}", reference.len())));
    }

    #[test]
    fn missing_endpoints_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("0.50000000_ti.mdin"), mdin(3, &[0.0, 0.5, 1.0], "0.5")).unwrap();
        let target = LambdaSchedule::new(vec![0.0, 0.5, 1.0]).unwrap();

        let err = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingEndpoint { stage, .. } if stage == "ti"));
    }

    #[test]
    fn a_single_missing_endpoint_is_fatal_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        // Only the coupled endpoint and an interior template exist.
        std::fs::write(src.join("1.00000000_ti.mdin"), mdin(3, &[0.0, 0.5, 1.0], "1.0")).unwrap();
        std::fs::write(src.join("0.50000000_ti.mdin"), mdin(3, &[0.0, 0.5, 1.0], "0.5")).unwrap();
        let target = LambdaSchedule::new(vec![0.0, 0.5, 1.0]).unwrap();

        let err = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingEndpoint { stage, endpoint, .. }
                if stage == "ti" && endpoint == "0.00000000"
        ));
        // Nothing must have been written for the incomplete stage's endpoints.
        assert!(!dst.join("0.00000000_ti.mdin").exists());
        assert!(!dst.join("1.00000000_ti.mdin").exists());
    }

    #[test]
    fn missing_interior_template_is_fatal_for_interior_schedules() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        write_inputs(&src, &[&ti_stage()], &[0.0, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 0.5, 1.0]).unwrap();

        let err = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingTemplate { stage, .. } if stage == "ti"));
    }

    #[test]
    fn endpoint_pair_schedule_needs_no_interior_template() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        write_inputs(&src, &[&ti_stage()], &[0.0, 1.0]);
        let target = LambdaSchedule::new(vec![0.0, 1.0]).unwrap();

        let written = ParameterProjector::new(&target)
            .project_stage(&src, &dst, &ti_stage())
            .unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn apply_overrides_touches_only_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), &[&ti_stage()], &[0.0, 0.5, 1.0]);
        let overrides = BTreeMap::from([("nstlim".to_string(), "250000".to_string())]);

        let rewritten = apply_overrides(dir.path(), Some("ti"), &overrides).unwrap();

        assert_eq!(rewritten, 3);
        let content = read(dir.path(), 0.5, "ti");
        assert!(content.contains("nstlim = 250000"));
        assert!(content.contains("clambda = 0.50000000"));
        // A second application changes nothing.
        assert_eq!(apply_overrides(dir.path(), Some("ti"), &overrides).unwrap(), 0);
    }

    #[test]
    fn apply_overrides_with_no_overrides_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(apply_overrides(dir.path(), None, &BTreeMap::new()).unwrap(), 0);
    }
}
