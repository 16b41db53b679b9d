use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compiler limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Maximum nesting of conditions, path predicates, function calls,
    /// subqueries, unions and prepared-table expansions.
    pub max_depth: usize,
    /// Maximum number of items in one `IN (...)` list.
    pub max_in_list_items: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_in_list_items: 1000,
        }
    }
}

impl CompilerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::invalid("max_depth must be > 0"));
        }
        if self.max_in_list_items == 0 {
            return Err(ConfigError::invalid("max_in_list_items must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

pub mod loader {
    use super::{CompilerConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load limits from an optional TOML file (default `aql.toml`) with
    /// `AQL__*` environment overrides, e.g. `AQL__MAX_DEPTH=32`.
    pub fn load_config(path: Option<&str>) -> Result<CompilerConfig, ConfigError> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or("aql.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        builder = builder.add_source(
            Environment::with_prefix("AQL")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: CompilerConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        tracing::debug!(
            max_depth = merged.max_depth,
            max_in_list_items = merged.max_in_list_items,
            "Loaded AQL compiler configuration"
        );
        Ok(merged)
    }
}
