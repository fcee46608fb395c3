//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StepConfig;
use std::path::Path;

/// Loads and validates a `forgo.toml` configuration from a step directory.
///
/// Reads `<step_dir>/forgo.toml`, parses it, and validates required fields.
pub fn load_config(step_dir: &Path) -> Result<StepConfig, ConfigError> {
    let config_path = step_dir.join("forgo.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `forgo.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StepConfig, ConfigError> {
    let config: StepConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &StepConfig) -> Result<(), ConfigError> {
    if config.step.name.is_empty() {
        return Err(ConfigError::MissingField("step.name".to_string()));
    }
    if config.step.state.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("step.state".to_string()));
    }
    for key in &config.digest.exclude {
        if !config.parameters.contains_key(key) {
            return Err(ConfigError::ValidationError(format!(
                "excluded key '{key}' is not a parameter"
            )));
        }
    }
    Ok(())
}
