use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths tried, in order, when no config file is named explicitly.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["fixpoint.toml", "configs/fixpoint.toml"];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("director.period must be finite and non-negative, got {0}")]
    InvalidPeriod(f64),

    #[error("director.start_time must be finite, got {0}")]
    InvalidStartTime(f64),
}

/// Settings consumed by the fixed-point director.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DirectorConfig {
    /// Number of instants to run; zero or negative runs until every
    /// component has deactivated or a stop is requested
    #[serde(default)]
    pub iterations: i64,
    /// Logical time advanced after each instant (no real-time pacing)
    #[serde(default = "default_period")]
    pub period: f64,
    /// Logical time of the first instant
    #[serde(default)]
    pub start_time: f64,
    /// Postfire anyway, with a warning, when some component's inputs are
    /// still unknown at the fixed point. Off by default: that situation is
    /// reported as a causality loop.
    #[serde(default)]
    pub allow_unknown_inputs: bool,
}

fn default_period() -> f64 {
    1.0
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            iterations: 0,
            period: default_period(),
            start_time: 0.0,
            allow_unknown_inputs: false,
        }
    }
}

impl DirectorConfig {
    /// `None` means run forever.
    pub fn iteration_limit(&self) -> Option<u64> {
        if self.iterations > 0 {
            Some(self.iterations as u64)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.period.is_finite() || self.period < 0.0 {
            return Err(ConfigError::InvalidPeriod(self.period));
        }
        if !self.start_time.is_finite() {
            return Err(ConfigError::InvalidStartTime(self.start_time));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Topological order over the port dependency graph; rejects cycles
    #[default]
    Dependency,
    /// Uniformly shuffled order; never inspects structure
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub kind: SchedulerKind,
    /// Seed for the random scheduler. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Whether the application should retry with the random scheduler
    /// when the dependency scheduler reports a cycle
    #[serde(default)]
    pub fallback_to_random: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunConfig {
    #[serde(default)]
    pub director: DirectorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Parse and validate a TOML document.
pub fn parse_config(text: &str) -> anyhow::Result<RunConfig> {
    let config: RunConfig =
        toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse run config: {e}"))?;
    config.director.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> anyhow::Result<RunConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {e}", path.display()))?;
    parse_config(&text)
}

/// Try each of [`DEFAULT_CONFIG_PATHS`] and load the first that exists.
pub fn find_config() -> anyhow::Result<(PathBuf, RunConfig)> {
    for p in DEFAULT_CONFIG_PATHS {
        let path = PathBuf::from(p);
        if path.exists() {
            let config = load_config(&path)?;
            return Ok((path, config));
        }
    }
    anyhow::bail!("Could not find a run config in {:?}", DEFAULT_CONFIG_PATHS);
}

/// JSON Schema describing the config file.
pub fn config_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(RunConfig)
}
