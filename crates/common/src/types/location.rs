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

use std::{fmt::Display, path::PathBuf, str::FromStr};

use eyre::{bail, eyre, Error, Result};
use serde::{Deserialize, Serialize};

/// A marked line in the instrumented source file.
///
/// Locations are immutable once discovered; their ordering is the order in
/// which the marker locator found them, which anchors the Entry/Step role
/// assignment downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Path to the source file containing the marker.
    pub file: PathBuf,
    /// Line number in the source file (1-based).
    pub line: usize,
}

impl SourceLocation {
    /// Creates a new source location.
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self { file: file.into(), line }
    }

    /// Formats the location the way the debug host expects it
    /// (`<file>:<line>`).
    pub fn breakpoint_spec(&self) -> String {
        format!("{}:{}", self.file.display(), self.line)
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

impl FromStr for SourceLocation {
    type Err = Error;

    /// Parses a location from a `<file>:<line>` string. The file part may
    /// itself contain colons (e.g. Windows drive prefixes), so the line
    /// number is taken from the last colon-separated field.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((file, line)) = trimmed.rsplit_once(':') else {
            bail!("Invalid location format. Expected <file>:<line>, got: {s}");
        };
        if file.is_empty() {
            bail!("Invalid location format. Empty file path in: {s}");
        }
        let line = line.parse::<usize>().map_err(|e| eyre!("Invalid line number: {e}"))?;
        if line == 0 {
            bail!("Invalid line number: line numbers are 1-based");
        }
        Ok(Self { file: PathBuf::from(file), line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_str() {
        let loc = SourceLocation::from_str("src/subdivide.hpp:42").unwrap();
        assert_eq!(loc.file, PathBuf::from("src/subdivide.hpp"));
        assert_eq!(loc.line, 42);
    }

    #[test]
    fn test_location_from_str_with_colons_in_path() {
        let loc = SourceLocation::from_str("C:/src/subdivide.hpp:7").unwrap();
        assert_eq!(loc.file, PathBuf::from("C:/src/subdivide.hpp"));
        assert_eq!(loc.line, 7);
    }

    #[test]
    fn test_location_from_str_invalid() {
        // No line number
        assert!(SourceLocation::from_str("src/subdivide.hpp").is_err());

        // Non-numeric line
        assert!(SourceLocation::from_str("src/subdivide.hpp:abc").is_err());

        // Zero line (lines are 1-based)
        assert!(SourceLocation::from_str("src/subdivide.hpp:0").is_err());

        // Empty file part
        assert!(SourceLocation::from_str(":12").is_err());
    }

    #[test]
    fn test_location_display_round_trip() {
        let loc = SourceLocation::new("include/subdivide.hpp", 57);
        assert_eq!(loc.to_string(), "include/subdivide.hpp:57");
        assert_eq!(SourceLocation::from_str(&loc.to_string()).unwrap(), loc);
        assert_eq!(loc.breakpoint_spec(), "include/subdivide.hpp:57");
    }
}
