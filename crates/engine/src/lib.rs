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

// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! SDB Engine - the capture pipeline
//!
//! Instruments one run of a recursive point-subdivision algorithm without
//! modifying it: markers are located in the instrumented source, one
//! breakpoint is registered per marker (the first is the Entry), the target
//! runs under a debugging host, and every hit synchronously extracts point
//! ranges from the paused process's live memory into an append-only trace.
//! The trace is finalized only after the target terminates.

/// Breakpoint registration and the per-hit capture protocol
pub mod controller;
/// Typed errors of the capture pipeline
pub mod error;
/// Snapshot extraction from the paused target's live memory
pub mod extract;
/// GDB/MI adapter for the debug-host capability trait
pub mod gdb;
/// The debug-host capability seam
pub mod host;
/// Instrumentation-marker discovery
pub mod locator;
/// Session orchestration from marker discovery to finalized trace
pub mod session;

pub use controller::BreakpointController;
pub use error::{ConfigurationError, ExtractionError, HostError, LocationResolutionError};
pub use extract::{EndBound, PointLayout, RangeSpec, StateExtractor};
pub use gdb::GdbMiHost;
pub use host::{DebugHost, HostValue, StopEvent};
pub use locator::{MarkerLocator, DEFAULT_MARKER};
pub use session::{CaptureSession, CaptureSpec};
