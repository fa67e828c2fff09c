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

//! Shared data model for the capture pipeline and the visualizer.

mod breakpoint;
mod location;
mod point;
mod snapshot;
mod trace;

pub use breakpoint::{Breakpoint, BreakpointRole};
pub use location::SourceLocation;
pub use point::Point2;
pub use snapshot::Snapshot;
pub use trace::{OutputCapture, SubdivisionTrace, TraceBuilder};
