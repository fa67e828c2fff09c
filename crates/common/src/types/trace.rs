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

use eyre::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Snapshot, SourceLocation};

/// One output capture per breakpoint hit, in temporal hit order.
///
/// A hit whose extraction failed is still recorded, with `snapshot: None`,
/// so the outputs length stays equal to the total hit count even on a
/// degraded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputCapture {
    /// 0-based position of this capture in temporal hit order.
    pub hit: usize,
    /// The breakpoint location that fired.
    pub location: SourceLocation,
    /// The captured output state, or None for a capture gap.
    pub snapshot: Option<Snapshot>,
}

impl OutputCapture {
    /// Whether this capture is a gap left by a recoverable extraction
    /// failure.
    pub fn is_gap(&self) -> bool {
        self.snapshot.is_none()
    }
}

/// Append-only accumulator filled while the target runs.
///
/// The builder is owned by the driving session and passed by reference into
/// the capture path; the finalized, read-only [`SubdivisionTrace`] only
/// exists once [`TraceBuilder::finish`] consumes the builder after the
/// target has terminated. Nothing can observe a half-built trace.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    input: Option<Snapshot>,
    parameter: Option<f64>,
    outputs: Vec<OutputCapture>,
}

impl TraceBuilder {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the input polygon captured at the Entry hit. Only the first
    /// recording wins: a recursive re-entry of the Entry location must not
    /// overwrite the original input state. Returns false if an input was
    /// already present.
    pub fn record_input(&mut self, snapshot: Snapshot) -> bool {
        if self.input.is_some() {
            return false;
        }
        self.input = Some(snapshot);
        true
    }

    /// Records the subdivision parameter captured alongside the input.
    pub fn set_parameter(&mut self, t: f64) {
        self.parameter = Some(t);
    }

    /// Whether the Entry hit has already supplied the input polygon.
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Appends one output snapshot in hit order.
    pub fn record_output(&mut self, location: SourceLocation, snapshot: Snapshot) {
        let hit = self.outputs.len();
        self.outputs.push(OutputCapture { hit, location, snapshot: Some(snapshot) });
    }

    /// Appends a capture gap for a hit whose extraction failed.
    pub fn record_gap(&mut self, location: SourceLocation) {
        let hit = self.outputs.len();
        self.outputs.push(OutputCapture { hit, location, snapshot: None });
    }

    /// Total hits recorded so far, gaps included.
    pub fn hit_count(&self) -> usize {
        self.outputs.len()
    }

    /// Finalizes the accumulated state into a read-only trace. Fails when
    /// the Entry breakpoint never fired: without an input polygon there is
    /// nothing to anchor the visualization on.
    pub fn finish(self) -> Result<SubdivisionTrace> {
        let Some(input) = self.input else {
            bail!("entry breakpoint never fired; no input state was captured");
        };
        Ok(SubdivisionTrace { input, parameter: self.parameter, outputs: self.outputs })
    }
}

/// A finalized capture of one subdivision run: the input polygon, the
/// subdivision parameter, and every output capture in hit order.
///
/// The trace is immutable; re-rendering the same trace always yields the
/// same series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdivisionTrace {
    input: Snapshot,
    parameter: Option<f64>,
    outputs: Vec<OutputCapture>,
}

impl SubdivisionTrace {
    /// The input polygon captured at the Entry hit.
    pub fn input(&self) -> &Snapshot {
        &self.input
    }

    /// Number of control points in the input polygon.
    pub fn control_point_count(&self) -> usize {
        self.input.len()
    }

    /// The subdivision parameter, when the target exposed one.
    pub fn parameter(&self) -> Option<f64> {
        self.parameter
    }

    /// Every output capture, in temporal hit order.
    pub fn outputs(&self) -> &[OutputCapture] {
        &self.outputs
    }

    /// Total breakpoint hits across the run, capture gaps included.
    pub fn hit_count(&self) -> usize {
        self.outputs.len()
    }

    /// Number of hits whose extraction failed.
    pub fn gap_count(&self) -> usize {
        self.outputs.iter().filter(|c| c.is_gap()).count()
    }

    /// Convert the trace to a `serde_json::Value` for export.
    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// IntoIterator for owned trace (moves out its output captures)
impl IntoIterator for SubdivisionTrace {
    type Item = OutputCapture;
    type IntoIter = std::vec::IntoIter<OutputCapture>;
    fn into_iter(self) -> Self::IntoIter {
        self.outputs.into_iter()
    }
}

// IntoIterator for &trace (shared iteration over output captures)
impl<'a> IntoIterator for &'a SubdivisionTrace {
    type Item = &'a OutputCapture;
    type IntoIter = std::slice::Iter<'a, OutputCapture>;
    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}
