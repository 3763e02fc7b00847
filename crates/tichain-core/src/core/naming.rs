//! Canonical on-disk naming conventions.
//!
//! Every per-lambda artifact embeds its coupling value as an 8-decimal fixed
//! token (`0.12500000`), and endpoint detection throughout the pipeline is
//! purely lexical on that token. All formatting funnels through
//! [`lambda_token`] so the token is produced identically everywhere.

/// The lexical token of the fully-decoupled physical endpoint.
pub const ENDPOINT_ZERO: &str = "0.00000000";
/// The lexical token of the fully-coupled physical endpoint.
pub const ENDPOINT_ONE: &str = "1.00000000";

/// The unified topology file referenced by every job descriptor.
pub const TOPOLOGY_FILE: &str = "unisc.parm7";

/// Formats a coupling value as the canonical 8-decimal token.
pub fn lambda_token(value: f64) -> String {
    format!("{value:.8}")
}

/// Returns true if `token` names one of the two physical endpoints.
pub fn is_endpoint_token(token: &str) -> bool {
    token == ENDPOINT_ZERO || token == ENDPOINT_ONE
}

/// The four kinds of per-lambda artifacts a simulation stage touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Parameter input (`.mdin`).
    Input,
    /// Energy/state log (`.mdout`).
    Log,
    /// Restart coordinates (`.rst7`).
    Restart,
    /// Trajectory (`.nc`).
    Trajectory,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Input => "mdin",
            ArtifactKind::Log => "mdout",
            ArtifactKind::Restart => "rst7",
            ArtifactKind::Trajectory => "nc",
        }
    }
}

/// Builds the canonical `{lambda:.8f}_{stage}.{ext}` artifact filename.
pub fn artifact_name(lambda: f64, stage: &str, kind: ArtifactKind) -> String {
    format!("{}_{}.{}", lambda_token(lambda), stage, kind.extension())
}

/// Splits an artifact filename back into its lambda token and stage name,
/// if it follows the canonical scheme for the given artifact kind.
pub fn parse_artifact_name<'a>(
    file_name: &'a str,
    stage: &str,
    kind: ArtifactKind,
) -> Option<&'a str> {
    let stem = file_name.strip_suffix(kind.extension())?.strip_suffix('.')?;
    stem.strip_suffix(stage)?.strip_suffix('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_token_is_fixed_eight_decimals() {
        assert_eq!(lambda_token(0.0), "0.00000000");
        assert_eq!(lambda_token(0.25), "0.25000000");
        assert_eq!(lambda_token(1.0), "1.00000000");
        assert_eq!(lambda_token(1.0 / 3.0), "0.33333333");
    }

    #[test]
    fn endpoint_detection_is_lexical() {
        assert!(is_endpoint_token("0.00000000"));
        assert!(is_endpoint_token("1.00000000"));
        assert!(!is_endpoint_token("0.50000000"));
        assert!(!is_endpoint_token("0.0"));
    }

    #[test]
    fn artifact_names_follow_the_canonical_scheme() {
        assert_eq!(
            artifact_name(0.5, "ti", ArtifactKind::Input),
            "0.50000000_ti.mdin"
        );
        assert_eq!(
            artifact_name(1.0, "preTI", ArtifactKind::Restart),
            "1.00000000_preTI.rst7"
        );
        assert_eq!(
            artifact_name(0.0, "eqA", ArtifactKind::Trajectory),
            "0.00000000_eqA.nc"
        );
    }

    #[test]
    fn parse_artifact_name_round_trips() {
        let name = artifact_name(0.75, "ti", ArtifactKind::Input);
        assert_eq!(
            parse_artifact_name(&name, "ti", ArtifactKind::Input),
            Some("0.75000000")
        );
    }

    #[test]
    fn parse_artifact_name_rejects_other_stages_and_kinds() {
        assert_eq!(
            parse_artifact_name("0.50000000_ti.mdin", "preTI", ArtifactKind::Input),
            None
        );
        assert_eq!(
            parse_artifact_name("0.50000000_ti.mdin", "ti", ArtifactKind::Restart),
            None
        );
    }
}
