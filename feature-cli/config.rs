use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Settings of the `feature2d` binary that are not algorithm choices.
///
/// Every field is optional in the TOML file; command line flags override
/// whatever the file sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub log_level: String,
    /// File name written inside the output directory
    pub output_name: String,
    /// Worker threads, 0 selects one per CPU
    pub threads: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            output_name: "output.jpg".to_string(),
            threads: 0,
        }
    }
}

impl CliConfig {
    pub fn from_toml(toml_str: &str) -> PipelineResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> PipelineResult<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.output_name.trim().is_empty() {
            return Err(PipelineError::Config("output_name must not be empty".to_string()));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(PipelineError::Config(format!("unknown log level {:?}", self.log_level)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.output_name, "output.jpg");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = CliConfig::from_toml("threads = 4\n").unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.output_name, "output.jpg");
    }

    #[test]
    fn test_round_trip() {
        let config = CliConfig {
            log_level: "debug".to_string(),
            output_name: "matches.png".to_string(),
            threads: 2,
        };
        assert_eq!(CliConfig::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(CliConfig::from_toml("log_level = \"loud\""), Err(PipelineError::Config(_))));
        assert!(matches!(CliConfig::from_toml("output_name = \" \""), Err(PipelineError::Config(_))));
        assert!(matches!(CliConfig::from_toml("threads = \"many\""), Err(PipelineError::Config(_))));
    }
}
