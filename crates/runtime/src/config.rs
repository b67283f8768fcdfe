// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! memory_budget = "64M"
//! enable_profiling = true
//! force_generic = false
//!
//! [tiling]
//! i_block = 4
//! j_block = 8
//! k_block = 8
//! narrow_j_block = 4
//! large_problem_threshold = 32
//! ```

use loop_lowering::{LoweringOptions, TilingConfig};
use memory_manager::MemoryBudget;
use std::path::Path;

use crate::RuntimeError;

/// Configuration for the lowering runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Budget for output buffers (human-readable, e.g. `"512M"`, or `"unlimited"`).
    #[serde(default = "default_budget")]
    pub memory_budget: String,
    /// Block sizes of the tiled matrix-product path.
    #[serde(default)]
    pub tiling: TilingConfig,
    /// Whether to log per-call metrics at info level.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    /// Lower plain matrix products through the generic path.
    #[serde(default)]
    pub force_generic: bool,
}

fn default_budget() -> String {
    "unlimited".to_string()
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the memory budget string into a [`MemoryBudget`].
    pub fn parse_budget(&self) -> Result<MemoryBudget, RuntimeError> {
        MemoryBudget::parse(&self.memory_budget)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid budget: {e}")))
    }

    /// Checks the budget and tiling parameters.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.parse_budget()?;
        self.tiling
            .validate()
            .map_err(|e| RuntimeError::ConfigError(format!("invalid tiling: {e}")))
    }

    /// The options handed to the lowering crate.
    pub fn lowering_options(&self) -> LoweringOptions {
        LoweringOptions {
            tiling: self.tiling.clone(),
            force_generic: self.force_generic,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_budget: default_budget(),
            tiling: TilingConfig::default(),
            enable_profiling: true,
            force_generic: false,
        }
    }
}
