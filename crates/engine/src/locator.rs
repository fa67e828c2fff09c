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

//! Discovery of instrumentation markers in the target's source.

use std::{fs, path::Path};

use regex::Regex;
use sdb_common::SourceLocation;
use tracing::debug;

use crate::error::ConfigurationError;

/// The marker tag the instrumented spline sources carry.
pub const DEFAULT_MARKER: &str = "SPLINE_TRACE";

/// Finds instrumentation-tagged lines in a source file.
///
/// Matching lines are returned in first-occurrence order; the first one
/// becomes the Entry breakpoint downstream, so the order is load-bearing.
#[derive(Debug, Clone)]
pub struct MarkerLocator {
    pattern: Regex,
    raw: String,
}

impl MarkerLocator {
    /// Compiles a marker pattern.
    pub fn new(pattern: &str) -> Result<Self, ConfigurationError> {
        let compiled = Regex::new(pattern).map_err(|source| {
            ConfigurationError::InvalidPattern { pattern: pattern.to_string(), source }
        })?;
        Ok(Self { pattern: compiled, raw: pattern.to_string() })
    }

    /// The pattern this locator was built from.
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// Scans `file` and returns the 1-based lines carrying the marker, in
    /// file order. Fails when the file cannot be read or no line matches;
    /// both must abort before any target execution.
    pub fn locate(&self, file: &Path) -> Result<Vec<SourceLocation>, ConfigurationError> {
        let content = fs::read_to_string(file).map_err(|source| {
            ConfigurationError::UnreadableSource { file: file.to_path_buf(), source }
        })?;

        let locations: Vec<SourceLocation> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| self.pattern.is_match(line))
            .map(|(idx, _)| SourceLocation::new(file, idx + 1))
            .collect();

        if locations.is_empty() {
            return Err(ConfigurationError::EmptyLocations {
                pattern: self.raw.clone(),
                file: file.to_path_buf(),
            });
        }

        debug!(file = %file.display(), count = locations.len(), "located markers");
        Ok(locations)
    }
}
