//! Configuration types deserialized from `forgo.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use forgo_workspace::Mode;
use serde::Deserialize;

use crate::digest::ConfigurationDigest;

/// The top-level build step configuration parsed from `forgo.toml`.
#[derive(Debug, Deserialize)]
pub struct StepConfig {
    /// Step identity and state location.
    pub step: StepMeta,
    /// Step parameters, digested to detect configuration changes.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Digest settings.
    #[serde(default)]
    pub digest: DigestConfig,
}

/// Identity of a build step.
#[derive(Debug, Deserialize)]
pub struct StepMeta {
    /// The step name, used in log output.
    pub name: String,
    /// Location of the persisted build state, relative to the step directory
    /// unless absolute.
    pub state: PathBuf,
    /// Workspace mode the step runs in.
    #[serde(default)]
    pub mode: Mode,
}

/// Controls which parameters contribute to the configuration digest.
#[derive(Debug, Default, Deserialize)]
pub struct DigestConfig {
    /// Parameter keys left out of the digest.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl StepConfig {
    /// Resolves the state file location against the step directory.
    pub fn state_path(&self, step_dir: &Path) -> PathBuf {
        if self.step.state.is_absolute() {
            self.step.state.clone()
        } else {
            step_dir.join(&self.step.state)
        }
    }

    /// Builds the configuration digest for the step's parameters.
    pub fn configuration_digest(&self) -> ConfigurationDigest {
        let mut digest = self
            .digest
            .exclude
            .iter()
            .fold(ConfigurationDigest::new(), |d, key| d.exclude(key.as_str()));
        for (key, value) in &self.parameters {
            digest.insert(key.as_str(), value.clone());
        }
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> StepConfig {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn relative_state_path_resolved() {
        let config = parse(
            r#"
[step]
name = "copy"
state = "target/copy.state"
"#,
        );
        assert_eq!(
            config.state_path(Path::new("/proj")),
            PathBuf::from("/proj/target/copy.state")
        );
    }

    #[test]
    fn absolute_state_path_kept() {
        let config = parse(
            r#"
[step]
name = "copy"
state = "/var/forgo/copy.state"
"#,
        );
        assert_eq!(
            config.state_path(Path::new("/proj")),
            PathBuf::from("/var/forgo/copy.state")
        );
    }

    #[test]
    fn mode_parsed_lowercase() {
        let config = parse(
            r#"
[step]
name = "copy"
state = "s"
mode = "delta"
"#,
        );
        assert_eq!(config.step.mode, Mode::Delta);
    }

    #[test]
    fn digest_honours_exclusions() {
        let a = parse(
            r#"
[step]
name = "compile"
state = "s"

[parameters]
release = "17"
verbose = true

[digest]
exclude = ["verbose"]
"#,
        );
        let b = parse(
            r#"
[step]
name = "compile"
state = "s"

[parameters]
verbose = false
release = "17"

[digest]
exclude = ["verbose"]
"#,
        );
        assert_eq!(
            a.configuration_digest().finish(),
            b.configuration_digest().finish()
        );
    }

    #[test]
    fn digest_tracks_parameter_changes() {
        let a = parse(
            r#"
[step]
name = "compile"
state = "s"

[parameters]
release = "17"
"#,
        );
        let b = parse(
            r#"
[step]
name = "compile"
state = "s"

[parameters]
release = "21"
"#,
        );
        assert_ne!(
            a.configuration_digest().finish(),
            b.configuration_digest().finish()
        );
    }
}
