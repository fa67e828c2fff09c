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

//! The driving session: locate markers, register breakpoints, run the
//! target under the pause/extract/resume protocol, finalize the trace.

use std::path::PathBuf;

use eyre::Result;
use sdb_common::{SubdivisionTrace, TraceBuilder};
use tracing::{info, warn};

use crate::{
    controller::BreakpointController,
    extract::{PointLayout, RangeSpec},
    host::{DebugHost, StopEvent},
    locator::{MarkerLocator, DEFAULT_MARKER},
};

/// Everything needed to instrument one run of the target.
///
/// The defaults mirror the instrumented spline sources: the algorithm's
/// input iterators are `first`/`last` (end-exclusive), its output iterators
/// `d_first`/`d_last` (end-inclusive), each element is a `Point2d` with a
/// two-element `data` array, and the subdivision parameter is `t`. The
/// `&(*it)` spelling collapses an iterator to the address of its referent,
/// so plain pointers and class-type iterators both evaluate.
#[derive(Debug, Clone)]
pub struct CaptureSpec {
    /// The instrumented source file scanned for markers.
    pub source: PathBuf,
    /// Marker pattern (a regex) identifying trace lines.
    pub marker: String,
    /// The algorithm's input range.
    pub input_range: RangeSpec,
    /// The algorithm's output range.
    pub output_range: RangeSpec,
    /// Field path from a range element to its components.
    pub layout: PointLayout,
    /// Frame expression for the subdivision parameter, if the target
    /// exposes one.
    pub parameter: Option<String>,
}

impl CaptureSpec {
    /// A spec for the given instrumented source with the conventional
    /// variable names.
    pub fn for_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            marker: DEFAULT_MARKER.to_string(),
            input_range: RangeSpec::exclusive("&(*first)", "&(*last)"),
            output_range: RangeSpec::inclusive("&(*d_first)", "&(*d_last)"),
            layout: PointLayout::default(),
            parameter: Some("t".to_string()),
        }
    }
}

/// One capture run against one target process.
///
/// Owns the trace accumulator and the host for the whole run; nothing else
/// can observe the trace until the target has terminated and
/// [`CaptureSession::run`] hands out the finalized result.
#[derive(Debug)]
pub struct CaptureSession<H: DebugHost> {
    host: H,
    spec: CaptureSpec,
}

impl<H: DebugHost> CaptureSession<H> {
    /// Pairs a debug host with a capture spec.
    pub fn new(host: H, spec: CaptureSpec) -> Self {
        Self { host, spec }
    }

    /// Runs the whole pipeline and returns the finalized trace.
    ///
    /// Configuration and resolution failures abort before the target ever
    /// executes. Once the target runs, extraction failures only degrade
    /// the trace; the session aborts mid-run solely on host transport
    /// failures.
    pub fn run(mut self) -> Result<SubdivisionTrace> {
        let locator = MarkerLocator::new(&self.spec.marker)?;
        let locations = locator.locate(&self.spec.source)?;
        info!(
            source = %self.spec.source.display(),
            markers = locations.len(),
            "discovered instrumentation markers"
        );

        let mut controller =
            BreakpointController::register(&mut self.host, &locations, &self.spec)?;

        let mut builder = TraceBuilder::new();
        let mut event = self.host.launch()?;
        loop {
            match event {
                StopEvent::BreakpointHit(stop) => {
                    controller.handle_hit(&mut self.host, &stop, &mut builder)?;
                    event = self.host.resume()?;
                }
                StopEvent::Exited { code } => {
                    info!(?code, hits = builder.hit_count(), "target exited");
                    break;
                }
            }
        }

        if let Err(err) = self.host.terminate() {
            warn!(%err, "debug host teardown failed");
        }

        let trace = builder.finish()?;
        if trace.gap_count() > 0 {
            warn!(
                gaps = trace.gap_count(),
                hits = trace.hit_count(),
                "trace has capture gaps; result is best-effort partial"
            );
        }
        Ok(trace)
    }
}
