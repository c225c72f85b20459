//! TOML run configuration for whole-table risk.
//!
//! ```toml
//! is_north_american = true
//! num_vars = [4, 6]
//! years = [2, 5]
//! precision = 4
//!
//! [columns]
//! age = "Age"
//! sex = "Sex"
//! egfr = "eGFR"
//! uacr = "uACR"
//! dm = "Diabetes"
//! htn = "Hypertension"
//! ```

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predictor::{ColumnMap, RiskColumnRequest};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskRunConfig {
    pub is_north_american: bool,
    pub num_vars: Vec<u32>,
    pub years: Vec<u32>,
    pub prefix: Option<String>,
    pub precision: Option<u32>,
    pub columns: ColumnMap,
}

impl Default for RiskRunConfig {
    fn default() -> Self {
        RiskRunConfig::from(&RiskColumnRequest::default())
    }
}

impl RiskRunConfig {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn to_request(&self) -> RiskColumnRequest {
        RiskColumnRequest {
            columns: self.columns.clone(),
            num_vars: self.num_vars.clone(),
            years: self.years.clone(),
            is_north_american: self.is_north_american,
            prefix: self.prefix.clone(),
            precision: self.precision,
        }
    }
}

impl From<&RiskColumnRequest> for RiskRunConfig {
    fn from(request: &RiskColumnRequest) -> Self {
        RiskRunConfig {
            is_north_american: request.is_north_american,
            num_vars: request.num_vars.clone(),
            years: request.years.clone(),
            prefix: request.prefix.clone(),
            precision: request.precision,
            columns: request.columns.clone(),
        }
    }
}
