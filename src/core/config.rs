// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Ledger daemon configuration.
//!
//! ## Format (TOML)
//! Every section and field is optional; missing values take their defaults.
//!
//! ```text
//! [node]
//! name = "staking-1"
//! data_dir = "./data"
//!
//! [params]
//! unbonding_time_secs = 1814400
//! max_validators = 100
//! max_entries = 7
//! historical_entries = 10000
//! bond_denom = "uamun"
//! min_commission_rate = "0.05"
//! power_reduction = 1000000
//! commission_cooldown_secs = 86400
//! authority = "gov"
//!
//! [work]
//! per_entry = 10
//! per_validator = 20
//! per_write = 30
//!
//! [logging]
//! json = false
//! level = "info"
//! ```

use crate::core::staking::params::{Params, WorkCosts};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cannot read the file.
    #[error("read config {0}")]
    Read(String),
    /// Cannot parse TOML.
    #[error("parse config: {0}")]
    Parse(String),
    /// Staking params out of bounds.
    #[error("invalid params: {0}")]
    Params(String),
}

/// `[node]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name used in logs.
    pub name: String,
    /// Directory holding the sled database.
    pub data_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "staking".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Filter directive (`info`, `amunchain_staking=debug`, ...).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Whole daemon configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Node identity and storage.
    pub node: NodeConfig,
    /// Genesis staking params.
    pub params: Params,
    /// Work metering costs.
    pub work: WorkCosts,
    /// Log output.
    pub logging: LoggingConfig,
}

impl LedgerConfig {
    /// Parse a TOML document and validate the params.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let cfg: LedgerConfig = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.params
            .validate()
            .map_err(|e| ConfigError::Params(e.to_string()))?;
        Ok(cfg)
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|_| ConfigError::Read(path.display().to_string()))?;
        Self::from_toml(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::Dec;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = LedgerConfig::from_toml("").unwrap();
        assert_eq!(cfg, LedgerConfig::default());
        assert_eq!(cfg.params.bond_denom, "uamun");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = LedgerConfig::from_toml(
            r#"
            [node]
            name = "val-3"

            [params]
            max_validators = 4
            min_commission_rate = "0.05"

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.node.name, "val-3");
        assert_eq!(cfg.node.data_dir, "./data");
        assert_eq!(cfg.params.max_validators, 4);
        assert_eq!(cfg.params.min_commission_rate, Dec::percent(5));
        assert_eq!(cfg.work, WorkCosts::default());
        assert!(cfg.logging.json);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn invalid_params_rejected() {
        let err = LedgerConfig::from_toml("[params]\nmax_entries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Params(_)));
        assert!(matches!(
            LedgerConfig::from_toml("[params\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stakingd.toml");
        std::fs::write(&path, "[work]\nper_entry = 1\n").unwrap();
        assert_eq!(LedgerConfig::load(&path).unwrap().work.per_entry, 1);
        assert!(matches!(
            LedgerConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read(_))
        ));
    }
}
