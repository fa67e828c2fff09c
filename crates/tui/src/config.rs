// SDB - Subdivision Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for the SDB TUI
//!
//! Manages user preferences, currently the chart color scheme.

use eyre::{Result, WrapErr};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, str::FromStr};
use tracing::{debug, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chart color scheme
    pub colors: ColorScheme,
}

/// Color scheme for the chart, as ratatui color names or `#rrggbb` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Input polygon series color
    pub input_series: String,
    /// Intermediate subdivision series color
    pub intermediate_series: String,
    /// Converged final result color
    pub converged_series: String,
    /// Chart border and axis color
    pub border: String,
    /// Help/status line color
    pub help_text: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        // The classic rendering: red control polygon, blue converged
        // points.
        Self {
            input_series: "red".to_string(),
            intermediate_series: "cyan".to_string(),
            converged_series: "blue".to_string(),
            border: "darkgray".to_string(),
            help_text: "gray".to_string(),
        }
    }
}

impl ColorScheme {
    /// Resolves a configured color name, falling back to the given default
    /// on unknown names rather than failing the whole render.
    pub fn resolve(name: &str, fallback: Color) -> Color {
        match Color::from_str(name) {
            Ok(color) => color,
            Err(_) => {
                warn!(name, "unknown color name; using fallback");
                fallback
            }
        }
    }
}

impl Config {
    /// Path of the user configuration file
    /// (`<config dir>/sdb/config.toml`).
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sdb").join("config.toml"))
    }

    /// Loads the user configuration, falling back to defaults when the file
    /// is missing or malformed.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "malformed configuration; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persists the configuration to the user config directory.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| eyre::eyre!("no user configuration directory available"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).wrap_err_with(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
