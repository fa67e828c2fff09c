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

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::types::SourceLocation;

/// Role of an instrumented location in the capture protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BreakpointRole {
    /// The first marked location. Its first hit captures the input polygon
    /// and the subdivision parameter in addition to the shared output
    /// capture.
    Entry,
    /// Any subsequent marked location; hits capture output state only.
    Step,
}

impl Display for BreakpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Step => write!(f, "step"),
        }
    }
}

/// A breakpoint registered against the debug host.
///
/// A breakpoint keeps count of the snapshots produced over its lifetime; a
/// Step location inside the recursion fires once per recursion depth, so the
/// count is not bounded by the number of marked lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// The marked source location the breakpoint is bound to.
    pub location: SourceLocation,
    /// Entry or Step, assigned by discovery order.
    pub role: BreakpointRole,
    hits: usize,
}

impl Breakpoint {
    /// Creates an unregistered breakpoint with no recorded hits.
    pub fn new(location: SourceLocation, role: BreakpointRole) -> Self {
        Self { location, role, hits: 0 }
    }

    /// Whether this is the Entry breakpoint.
    pub fn is_entry(&self) -> bool {
        matches!(self.role, BreakpointRole::Entry)
    }

    /// Number of times this breakpoint has fired so far.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Records one hit and returns the count before this hit, so the first
    /// hit observes 0.
    pub fn record_hit(&mut self) -> usize {
        let previous = self.hits;
        self.hits += 1;
        previous
    }
}

impl Display for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{} ({})", self.location, self.role)
    }
}
