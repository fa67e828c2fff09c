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

//! Breakpoint lifecycle and the per-hit capture protocol.

use std::path::Path;

use sdb_common::{Breakpoint, BreakpointRole, SourceLocation, TraceBuilder};
use tracing::{debug, info, warn};

use crate::{
    error::{ExtractionError, HostError, LocationResolutionError},
    extract::{PinnedRange, RangeSpec, StateExtractor},
    host::DebugHost,
    session::CaptureSpec,
};

/// Registers one breakpoint per located marker and runs the capture
/// protocol at every hit.
///
/// The first located line becomes the Entry breakpoint. Its first hit
/// resolves the range endpoints into pinned references — the subdivision
/// loop moves its iterators afterwards — and captures the input polygon and
/// the subdivision parameter. Every hit, Entry or Step, captures one output
/// snapshot over the pinned output range and appends it (or a gap) in hit
/// order; the session then resumes the target, so breakpoints impose no
/// behavioral change on the traced algorithm beyond the pause.
#[derive(Debug)]
pub struct BreakpointController {
    breakpoints: Vec<Breakpoint>,
    extractor: StateExtractor,
    input_spec: RangeSpec,
    output_spec: RangeSpec,
    parameter: Option<String>,
    pinned_input: Option<PinnedRange>,
    pinned_output: Option<PinnedRange>,
}

impl BreakpointController {
    /// Binds every located marker against the host, Entry first, Steps in
    /// discovery order. Any location the host cannot bind aborts with
    /// [`LocationResolutionError`] before the target runs: an incomplete
    /// breakpoint set would corrupt the whole downstream trace.
    pub fn register<H: DebugHost + ?Sized>(
        host: &mut H,
        locations: &[SourceLocation],
        spec: &CaptureSpec,
    ) -> Result<Self, LocationResolutionError> {
        let mut breakpoints = Vec::with_capacity(locations.len());
        for (index, location) in locations.iter().enumerate() {
            let role = if index == 0 { BreakpointRole::Entry } else { BreakpointRole::Step };
            host.insert_breakpoint(location)?;
            debug!(%location, %role, "registered breakpoint");
            breakpoints.push(Breakpoint::new(location.clone(), role));
        }
        info!(count = breakpoints.len(), "all trace points bound");
        Ok(Self {
            breakpoints,
            extractor: StateExtractor::new(spec.layout.clone()),
            input_spec: spec.input_range.clone(),
            output_spec: spec.output_range.clone(),
            parameter: spec.parameter.clone(),
            pinned_input: None,
            pinned_output: None,
        })
    }

    /// The registered breakpoints, in discovery order.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Runs the hit protocol for a stop at `stop`. The target stays paused
    /// for the duration; extraction reads live memory only. Recoverable
    /// extraction failures degrade into capture gaps; transport failures
    /// abort.
    pub fn handle_hit<H: DebugHost + ?Sized>(
        &mut self,
        host: &mut H,
        stop: &SourceLocation,
        builder: &mut TraceBuilder,
    ) -> Result<(), HostError> {
        let Some(index) = self.resolve(stop) else {
            warn!(%stop, "stop at unregistered location; resuming without capture");
            return Ok(());
        };

        let previous_hits = self.breakpoints[index].record_hit();
        let is_entry = self.breakpoints[index].is_entry();
        debug!(breakpoint = %self.breakpoints[index], hit = previous_hits + 1, "breakpoint hit");

        if is_entry {
            self.on_entry_hit(host, builder)?;
        }

        // Shared output capture, on every hit.
        let location = self.breakpoints[index].location.clone();
        let Some(output_range) = self.pinned_output.clone() else {
            warn!(%stop, "output range not resolved yet; recording gap");
            builder.record_gap(location);
            return Ok(());
        };
        match self.extractor.capture(host, &output_range) {
            Ok(snapshot) => builder.record_output(location, snapshot),
            Err(ExtractionError::Host(err)) => return Err(err),
            Err(err) => {
                warn!(%err, %stop, "output capture failed; recording gap");
                builder.record_gap(location);
            }
        }
        Ok(())
    }

    /// Entry-specific half of the protocol: resolve the opaque range
    /// references once, then capture the input polygon and the subdivision
    /// parameter. Capture-once: a recursive re-entry never replaces the
    /// original input, but a previously failed step is retried so the trace
    /// stays best-effort.
    fn on_entry_hit<H: DebugHost + ?Sized>(
        &mut self,
        host: &mut H,
        builder: &mut TraceBuilder,
    ) -> Result<(), HostError> {
        if self.pinned_input.is_none() || self.pinned_output.is_none() {
            match self.pin_ranges(host) {
                Ok(()) => {}
                Err(ExtractionError::Host(err)) => return Err(err),
                Err(err) => {
                    warn!(%err, "range resolution failed; will retry on next entry hit");
                    return Ok(());
                }
            }
        }

        if builder.has_input() {
            return Ok(());
        }
        let Some(input_range) = self.pinned_input.clone() else {
            return Ok(());
        };
        match self.extractor.capture(host, &input_range) {
            Ok(snapshot) => {
                debug!(points = snapshot.len(), "captured input polygon");
                builder.record_input(snapshot);
                if let Some(expr) = &self.parameter {
                    match self.extractor.read_scalar(host, expr) {
                        Ok(t) => builder.set_parameter(t),
                        Err(ExtractionError::Host(err)) => return Err(err),
                        Err(err) => warn!(%err, "subdivision parameter unavailable"),
                    }
                }
            }
            Err(ExtractionError::Host(err)) => return Err(err),
            Err(err) => {
                warn!(%err, "input capture failed; will retry on next entry hit")
            }
        }
        Ok(())
    }

    fn pin_ranges<H: DebugHost + ?Sized>(&mut self, host: &mut H) -> Result<(), ExtractionError> {
        if self.pinned_input.is_none() {
            self.pinned_input = Some(self.extractor.pin_range(host, &self.input_spec, "sdb_in")?);
        }
        if self.pinned_output.is_none() {
            self.pinned_output =
                Some(self.extractor.pin_range(host, &self.output_spec, "sdb_out")?);
        }
        Ok(())
    }

    /// Matches a host-reported stop against a registered breakpoint. Hosts
    /// report absolute paths while markers are registered with the path
    /// the user gave, so matching falls back to the file name.
    fn resolve(&self, stop: &SourceLocation) -> Option<usize> {
        self.breakpoints
            .iter()
            .position(|bp| bp.location.line == stop.line && same_source(&bp.location.file, &stop.file))
    }
}

fn same_source(registered: &Path, reported: &Path) -> bool {
    registered == reported
        || match (registered.file_name(), reported.file_name()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostValue, StopEvent};

    /// Records registration order; refuses lines past `bindable_below`.
    struct RecordingHost {
        registered: Vec<SourceLocation>,
        bindable_below: usize,
    }

    impl DebugHost for RecordingHost {
        fn insert_breakpoint(
            &mut self,
            location: &SourceLocation,
        ) -> Result<(), LocationResolutionError> {
            if location.line >= self.bindable_below {
                return Err(LocationResolutionError {
                    location: location.clone(),
                    reason: "no code at this line".to_string(),
                });
            }
            self.registered.push(location.clone());
            Ok(())
        }

        fn launch(&mut self) -> Result<StopEvent, HostError> {
            Ok(StopEvent::Exited { code: Some(0) })
        }

        fn resume(&mut self) -> Result<StopEvent, HostError> {
            Ok(StopEvent::Exited { code: Some(0) })
        }

        fn evaluate(&mut self, expression: &str) -> Result<HostValue, HostError> {
            Err(HostError::CommandFailed {
                command: expression.to_string(),
                message: "no frame".to_string(),
            })
        }

        fn pin(&mut self, _slot: &str, expression: &str) -> Result<String, HostError> {
            Err(HostError::CommandFailed {
                command: expression.to_string(),
                message: "no frame".to_string(),
            })
        }

        fn terminate(&mut self) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn spec() -> CaptureSpec {
        CaptureSpec::for_source("subdivide.hpp")
    }

    fn locations(lines: &[usize]) -> Vec<SourceLocation> {
        lines.iter().map(|&l| SourceLocation::new("subdivide.hpp", l)).collect()
    }

    #[test]
    fn test_one_breakpoint_per_marker_in_order() {
        let mut host = RecordingHost { registered: Vec::new(), bindable_below: usize::MAX };
        let locs = locations(&[40, 57, 64]);
        let controller = BreakpointController::register(&mut host, &locs, &spec()).unwrap();

        assert_eq!(host.registered, locs);
        assert_eq!(controller.breakpoints().len(), 3);
        assert!(controller.breakpoints()[0].is_entry());
        assert!(controller.breakpoints()[1..].iter().all(|bp| !bp.is_entry()));
    }

    #[test]
    fn test_unbindable_location_aborts_registration() {
        let mut host = RecordingHost { registered: Vec::new(), bindable_below: 60 };
        let err =
            BreakpointController::register(&mut host, &locations(&[40, 57, 64]), &spec())
                .unwrap_err();
        assert_eq!(err.location.line, 64);
    }

    #[test]
    fn test_resolve_matches_absolute_paths_by_file_name() {
        let mut host = RecordingHost { registered: Vec::new(), bindable_below: usize::MAX };
        let controller =
            BreakpointController::register(&mut host, &locations(&[40, 57]), &spec()).unwrap();

        // GDB reports the fullname; the marker was registered relative.
        let stop = SourceLocation::new("/home/user/work/subdivide.hpp", 57);
        assert_eq!(controller.resolve(&stop), Some(1));

        let elsewhere = SourceLocation::new("/home/user/work/other.hpp", 57);
        assert_eq!(controller.resolve(&elsewhere), None);
    }

    #[test]
    fn test_unregistered_stop_is_skipped() {
        let mut host = RecordingHost { registered: Vec::new(), bindable_below: usize::MAX };
        let mut controller =
            BreakpointController::register(&mut host, &locations(&[40]), &spec()).unwrap();

        let mut builder = TraceBuilder::new();
        let stray = SourceLocation::new("subdivide.hpp", 999);
        controller.handle_hit(&mut host, &stray, &mut builder).unwrap();
        assert_eq!(builder.hit_count(), 0);
    }

    #[test]
    fn test_hit_before_ranges_resolve_records_gap() {
        // A Step firing while range resolution keeps failing must still
        // keep the hit count accurate.
        let mut host = RecordingHost { registered: Vec::new(), bindable_below: usize::MAX };
        let mut controller =
            BreakpointController::register(&mut host, &locations(&[40, 57]), &spec()).unwrap();

        let mut builder = TraceBuilder::new();
        let step = SourceLocation::new("subdivide.hpp", 57);
        controller.handle_hit(&mut host, &step, &mut builder).unwrap();
        assert_eq!(builder.hit_count(), 1);
        assert!(!builder.has_input());
    }
}
