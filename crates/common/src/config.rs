//! Generator configuration
//!
//! Configuration reaches the generator either as the protoc plugin parameter
//! string (`--carno_opt=paths=source_relative,reserved=Close:Start`) or, from
//! the CLI, as a YAML file. Both produce a [`GeneratorConfig`] that is loaded
//! once per run and never mutated during generation.

use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Default import path of the carno runtime
pub const DEFAULT_RUNTIME_IMPORT_PATH: &str = "github.com/ccsnake/carno";

/// How output file paths are derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathsMode {
    /// Place output under the Go import path of the file
    #[default]
    Import,
    /// Place output next to the proto file
    SourceRelative,
}

/// Identifiers that must be suffixed to stay clear of generated
/// infrastructure names
///
/// The only effect of membership is that the resolved identifier gets a
/// trailing `_`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservedNameSet(BTreeSet<String>);

impl ReservedNameSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub paths: PathsMode,
    /// Root import path of the carno runtime; `client` and `mux` live below it
    pub runtime_import_path: String,
    pub reserved: ReservedNameSet,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            paths: PathsMode::Import,
            runtime_import_path: DEFAULT_RUNTIME_IMPORT_PATH.to_string(),
            reserved: ReservedNameSet::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a protoc plugin parameter string
    ///
    /// Accepted keys: `paths=import|source_relative`, `runtime=<import path>`
    /// and `reserved=A:B:C`. Unknown keys are rejected.
    ///
    /// # Examples
    /// ```
    /// use carno_codegen_common::{GeneratorConfig, PathsMode};
    ///
    /// let config = GeneratorConfig::from_parameter("paths=source_relative").unwrap();
    /// assert_eq!(config.paths, PathsMode::SourceRelative);
    /// ```
    pub fn from_parameter(parameter: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_parameter(parameter)?;
        Ok(config)
    }

    /// Apply a parameter string on top of the current values
    pub fn apply_parameter(&mut self, parameter: &str) -> Result<()> {
        for pair in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key.trim() {
                "paths" => {
                    self.paths = match value.trim() {
                        "import" => PathsMode::Import,
                        "source_relative" => PathsMode::SourceRelative,
                        other => {
                            return Err(GeneratorError::Configuration(format!(
                                "unknown paths mode {:?}",
                                other
                            )))
                        }
                    }
                }
                "runtime" => {
                    let value = value.trim().trim_end_matches('/');
                    if value.is_empty() {
                        return Err(GeneratorError::Configuration(
                            "runtime import path must not be empty".to_string(),
                        ));
                    }
                    self.runtime_import_path = value.to_string();
                }
                "reserved" => {
                    self.reserved = ReservedNameSet::new(
                        value
                            .split(':')
                            .map(str::trim)
                            .filter(|name| !name.is_empty()),
                    );
                }
                other => {
                    return Err(GeneratorError::Configuration(format!(
                        "unknown parameter {:?}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Configuration(format!(
                "Failed to read config file {:?}: {}",
                path, e
            ))
        })?;

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Import path of the runtime's client package
    pub fn client_import_path(&self) -> String {
        format!("{}/client", self.runtime_import_path)
    }

    /// Import path of the runtime's server dispatch package
    pub fn mux_import_path(&self) -> String {
        format!("{}/mux", self.runtime_import_path)
    }
}
