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

//! Materializes snapshots from the paused target's live memory.
//!
//! A range is described by two frame expressions (its endpoints) and an end
//! bound. The instrumented algorithm's argument convention differs between
//! its ranges: the input range `[first, last)` excludes its end, the output
//! range `[d_first, d_last]` includes it. The asymmetry is carried in
//! [`RangeSpec::bound`] and preserved exactly.
//!
//! The subdivision loop advances its output iterators while it narrows the
//! valid window, so endpoint expressions are resolved exactly once — in the
//! Entry frame — into pinned references ([`StateExtractor::pin_range`]).
//! Every later capture iterates the pinned, full-width range; the
//! visualizer's trim window is what accounts for the narrowing.

use sdb_common::{Point2, Snapshot};
use tracing::{debug, trace};

use crate::{
    error::{ExtractionError, HostError},
    host::DebugHost,
};

/// Whether a range's end names one-past-the-last element or the last
/// element itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBound {
    /// `end` is one past the last element; extent = end − start.
    Exclusive,
    /// `end` is the last element; extent = end − start + 1.
    Inclusive,
}

/// Two frame expressions naming the endpoints of a live memory range.
#[derive(Debug, Clone)]
pub struct RangeSpec {
    /// Expression for the first element's address.
    pub start: String,
    /// Expression for the end of the range, per `bound`.
    pub end: String,
    /// End convention of this range.
    pub bound: EndBound,
}

impl RangeSpec {
    /// An end-exclusive range (the algorithm's input convention).
    pub fn exclusive(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into(), bound: EndBound::Exclusive }
    }

    /// An end-inclusive range (the algorithm's output convention).
    pub fn inclusive(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into(), bound: EndBound::Inclusive }
    }
}

/// A range whose endpoints have been resolved into opaque references into
/// live process memory, valid for the rest of the run.
#[derive(Debug, Clone)]
pub struct PinnedRange {
    /// Pinned reference to the first element.
    pub start: String,
    /// Pinned reference to the end, per `bound`.
    pub end: String,
    /// End convention, inherited from the spec the range was pinned from.
    pub bound: EndBound,
}

/// Structural field path from one range element to its two floating-point
/// components.
#[derive(Debug, Clone)]
pub struct PointLayout {
    /// Member path of the horizontal component, e.g. `data[0]`.
    pub x: String,
    /// Member path of the vertical component, e.g. `data[1]`.
    pub y: String,
}

impl Default for PointLayout {
    fn default() -> Self {
        Self { x: "data[0]".to_string(), y: "data[1]".to_string() }
    }
}

/// Reads point ranges out of the paused target, one host evaluation per
/// component.
///
/// NaN payloads are expected in partially-initialized recursive buffers and
/// pass through untouched; dropping them is the visualizer's decision.
#[derive(Debug, Clone)]
pub struct StateExtractor {
    layout: PointLayout,
}

impl StateExtractor {
    /// Creates an extractor for elements with the given component layout.
    pub fn new(layout: PointLayout) -> Self {
        Self { layout }
    }

    /// Resolves a range's endpoint expressions in the current frame into
    /// pinned references named `<slot_prefix>_first`/`<slot_prefix>_last`.
    pub fn pin_range<H: DebugHost + ?Sized>(
        &self,
        host: &mut H,
        range: &RangeSpec,
        slot_prefix: &str,
    ) -> Result<PinnedRange, ExtractionError> {
        let start = host
            .pin(&format!("{slot_prefix}_first"), &range.start)
            .map_err(|err| demote(range.start.clone(), err))?;
        let end = host
            .pin(&format!("{slot_prefix}_last"), &range.end)
            .map_err(|err| demote(range.end.clone(), err))?;
        debug!(%start, %end, "pinned range endpoints");
        Ok(PinnedRange { start, end, bound: range.bound })
    }

    /// Captures the pinned range as a snapshot. Iterates from start to end,
    /// dereferencing each element and coercing both components to double
    /// precision; iteration stops at the bound-adjusted end.
    pub fn capture<H: DebugHost + ?Sized>(
        &self,
        host: &mut H,
        range: &PinnedRange,
    ) -> Result<Snapshot, ExtractionError> {
        let len = self.extent(host, range)?;
        let mut points = Vec::with_capacity(len);
        for index in 0..len {
            let x = self.component(host, range, index, &self.layout.x)?;
            let y = self.component(host, range, index, &self.layout.y)?;
            points.push(Point2::new(x, y));
        }
        trace!(start = %range.start, len, "captured range");
        Ok(Snapshot::new(points))
    }

    /// Reads a scalar (e.g. the subdivision parameter) from the current
    /// frame.
    pub fn read_scalar<H: DebugHost + ?Sized>(
        &self,
        host: &mut H,
        expression: &str,
    ) -> Result<f64, ExtractionError> {
        match host.evaluate(expression) {
            Ok(value) => Ok(value.as_f64()),
            Err(err) => Err(demote(expression.to_string(), err)),
        }
    }

    /// Element count of the range: the host evaluates the pointer
    /// difference of the endpoints, then the end bound adjusts it.
    fn extent<H: DebugHost + ?Sized>(
        &self,
        host: &mut H,
        range: &PinnedRange,
    ) -> Result<usize, ExtractionError> {
        let expression = format!("({}) - ({})", range.end, range.start);
        let value = host.evaluate(&expression).map_err(|err| demote(expression.clone(), err))?;
        let Some(extent) = value.as_count() else {
            return Err(ExtractionError::NegativeExtent {
                start: range.start.clone(),
                end: range.end.clone(),
            });
        };
        Ok(match range.bound {
            EndBound::Exclusive => extent,
            EndBound::Inclusive => extent + 1,
        })
    }

    fn component<H: DebugHost + ?Sized>(
        &self,
        host: &mut H,
        range: &PinnedRange,
        index: usize,
        path: &str,
    ) -> Result<f64, ExtractionError> {
        let expression = format!("(({}))[{}].{}", range.start, index, path);
        match host.evaluate(&expression) {
            Ok(value) => Ok(value.as_f64()),
            Err(err) => Err(demote(expression, err)),
        }
    }
}

/// A rejected evaluation (optimized-out variable, wrong frame) degrades to
/// a recoverable extraction error; a broken transport stays fatal.
fn demote(expression: String, err: HostError) -> ExtractionError {
    match err {
        HostError::CommandFailed { message, .. } => {
            ExtractionError::Evaluation { expression, reason: message }
        }
        other => ExtractionError::Host(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LocationResolutionError,
        host::{HostValue, StopEvent},
    };
    use sdb_common::SourceLocation;
    use std::collections::HashMap;

    /// Evaluates expressions from a fixed table; anything else is rejected
    /// the way GDB rejects an unknown symbol. Pinning records the slot and
    /// hands back a `$slot` reference, like the real adapter.
    #[derive(Default)]
    struct TableHost {
        values: HashMap<String, HostValue>,
        pinned: HashMap<String, String>,
        disconnected: bool,
    }

    impl DebugHost for TableHost {
        fn insert_breakpoint(
            &mut self,
            _location: &SourceLocation,
        ) -> Result<(), LocationResolutionError> {
            unimplemented!("extraction tests never register breakpoints")
        }

        fn launch(&mut self) -> Result<StopEvent, HostError> {
            unimplemented!()
        }

        fn resume(&mut self) -> Result<StopEvent, HostError> {
            unimplemented!()
        }

        fn evaluate(&mut self, expression: &str) -> Result<HostValue, HostError> {
            if self.disconnected {
                return Err(HostError::Disconnected);
            }
            self.values.get(expression).copied().ok_or_else(|| HostError::CommandFailed {
                command: expression.to_string(),
                message: format!("No symbol in current context: {expression}"),
            })
        }

        fn pin(&mut self, slot: &str, expression: &str) -> Result<String, HostError> {
            if self.disconnected {
                return Err(HostError::Disconnected);
            }
            self.pinned.insert(slot.to_string(), expression.to_string());
            Ok(format!("${slot}"))
        }

        fn terminate(&mut self) -> Result<(), HostError> {
            Ok(())
        }
    }

    /// Fills the table with everything a pinned `$<prefix>_first`..
    /// `$<prefix>_last` range over `points` resolves to, with the given
    /// pointer difference.
    fn host_with_range(prefix: &str, extent: i64, points: &[(f64, f64)]) -> TableHost {
        let start = format!("${prefix}_first");
        let end = format!("${prefix}_last");
        let mut values = HashMap::new();
        values.insert(format!("({end}) - ({start})"), HostValue::Integer(extent));
        for (i, &(x, y)) in points.iter().enumerate() {
            values.insert(format!("(({start}))[{i}].data[0]"), HostValue::Float(x));
            values.insert(format!("(({start}))[{i}].data[1]"), HostValue::Float(y));
        }
        TableHost { values, ..Default::default() }
    }

    fn pin(host: &mut TableHost, spec: &RangeSpec, prefix: &str) -> PinnedRange {
        StateExtractor::new(PointLayout::default()).pin_range(host, spec, prefix).unwrap()
    }

    #[test]
    fn test_pin_resolves_endpoint_expressions() {
        let mut host = host_with_range("in", 0, &[]);
        let range = pin(&mut host, &RangeSpec::exclusive("&(*first)", "&(*last)"), "in");
        assert_eq!(range.start, "$in_first");
        assert_eq!(range.end, "$in_last");
        assert_eq!(host.pinned.get("in_first").unwrap(), "&(*first)");
        assert_eq!(host.pinned.get("in_last").unwrap(), "&(*last)");
    }

    #[test]
    fn test_exclusive_range_length_is_difference() {
        // Pointer difference 2 under the exclusive convention reads only
        // the first two elements.
        let mut host = host_with_range("in", 2, &[(0.0, 0.0), (1.0, 2.0), (9.0, 9.0)]);
        let range = pin(&mut host, &RangeSpec::exclusive("&(*first)", "&(*last)"), "in");
        let extractor = StateExtractor::new(PointLayout::default());
        let snap = extractor.capture(&mut host, &range).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.points()[1], Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_inclusive_range_length_is_difference_plus_one() {
        let mut host = host_with_range("out", 2, &[(0.0, 0.0), (1.0, 2.0), (3.0, 4.0)]);
        let range = pin(&mut host, &RangeSpec::inclusive("&(*d_first)", "&(*d_last)"), "out");
        let extractor = StateExtractor::new(PointLayout::default());
        let snap = extractor.capture(&mut host, &range).unwrap();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.points()[2], Point2::new(3.0, 4.0));
    }

    #[test]
    fn test_nan_payloads_pass_through() {
        let mut host = host_with_range("out", 2, &[(0.0, 0.0), (f64::NAN, f64::NAN), (1.0, 1.0)]);
        let range = pin(&mut host, &RangeSpec::inclusive("s", "e"), "out");
        let extractor = StateExtractor::new(PointLayout::default());
        let snap = extractor.capture(&mut host, &range).unwrap();
        assert_eq!(snap.len(), 3);
        assert!(snap.points()[1].has_nan());
    }

    #[test]
    fn test_rejected_evaluation_is_recoverable() {
        // The table knows the extent but none of the elements.
        let mut host = host_with_range("out", 2, &[]);
        let range = pin(&mut host, &RangeSpec::inclusive("s", "e"), "out");
        let extractor = StateExtractor::new(PointLayout::default());
        let err = extractor.capture(&mut host, &range).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, ExtractionError::Evaluation { .. }));
    }

    #[test]
    fn test_negative_extent() {
        let mut host = host_with_range("out", -4, &[]);
        let range = pin(&mut host, &RangeSpec::exclusive("s", "e"), "out");
        let extractor = StateExtractor::new(PointLayout::default());
        let err = extractor.capture(&mut host, &range).unwrap_err();
        assert!(matches!(err, ExtractionError::NegativeExtent { .. }));
    }

    #[test]
    fn test_transport_failure_is_fatal() {
        let mut host = TableHost { disconnected: true, ..Default::default() };
        let extractor = StateExtractor::new(PointLayout::default());
        let err = extractor
            .pin_range(&mut host, &RangeSpec::exclusive("s", "e"), "in")
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_read_scalar() {
        let mut host = TableHost::default();
        host.values.insert("t".to_string(), HostValue::Float(0.5));
        let extractor = StateExtractor::new(PointLayout::default());
        assert_eq!(extractor.read_scalar(&mut host, "t").unwrap(), 0.5);
        assert!(extractor.read_scalar(&mut host, "u").unwrap_err().is_recoverable());
    }
}
