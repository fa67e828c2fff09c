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

//! The debug-host capability seam.
//!
//! The capture pipeline never talks to a concrete debugger; it requires
//! exactly the capabilities below: set a breakpoint at a source location,
//! run/resume until the next stop, evaluate an expression in the stopped
//! frame, and terminate. [`crate::GdbMiHost`] adapts GDB's MI protocol to
//! this trait; tests drive the pipeline with scripted hosts.

use std::{fmt::Display, str::FromStr};

use eyre::{bail, Error, Result};
use sdb_common::SourceLocation;

use crate::error::{HostError, LocationResolutionError};

/// Where the target stopped after a launch or resume.
///
/// Control transfers back to the session synchronously: the host blocks
/// until one of these happens, and the target stays paused until the next
/// `resume`. There are no callbacks and no implicit continuations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopEvent {
    /// Paused at a registered breakpoint location.
    BreakpointHit(SourceLocation),
    /// The target process is gone.
    Exited {
        /// Exit code when the target exited normally, None when it was
        /// killed by a signal.
        code: Option<i32>,
    },
}

/// A value obtained by evaluating an expression in the stopped frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostValue {
    /// A floating-point number; NaN is a legal payload.
    Float(f64),
    /// A signed integer, e.g. a pointer difference.
    Integer(i64),
    /// A machine address.
    Address(u64),
}

impl HostValue {
    /// Coerces the value to double precision.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Float(f) => *f,
            Self::Integer(i) => *i as f64,
            Self::Address(a) => *a as f64,
        }
    }

    /// The value as a non-negative element count, if it is one.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Self::Integer(i) if *i >= 0 => Some(*i as usize),
            Self::Address(a) => usize::try_from(*a).ok(),
            _ => None,
        }
    }
}

impl Display for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Address(v) => write!(f, "{v:#x}"),
        }
    }
}

impl FromStr for HostValue {
    type Err = Error;

    /// Parses the textual value a debugger prints for a scalar evaluation.
    ///
    /// Handles hex addresses (with an optional trailing symbol, e.g.
    /// `0x404050 <output>`), signed integers, and floats including the
    /// `nan(0x...)`/`-nan`/`inf` spellings GDB uses for non-finite doubles.
    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().split_whitespace().next().unwrap_or("");
        if token.is_empty() {
            bail!("empty value");
        }

        if let Some(hex) = token.strip_prefix("0x") {
            if let Ok(addr) = u64::from_str_radix(hex, 16) {
                return Ok(Self::Address(addr));
            }
        }
        if let Ok(int) = token.parse::<i64>() {
            return Ok(Self::Integer(int));
        }

        let lower = token.to_ascii_lowercase();
        if lower.contains("nan") {
            return Ok(Self::Float(f64::NAN));
        }
        if lower == "inf" || lower == "-inf" {
            return Ok(Self::Float(if lower.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }));
        }
        if let Ok(float) = token.parse::<f64>() {
            return Ok(Self::Float(float));
        }

        bail!("cannot interpret `{s}` as a numeric value");
    }
}

/// Required capability set of the debugging host.
///
/// One target execution thread is assumed; a hit pauses the target and the
/// extractor runs to completion before `resume` is issued, so concurrent
/// hits cannot occur. All access to target memory happens through
/// [`DebugHost::evaluate`] and is read-only.
#[auto_impl::auto_impl(&mut, Box)]
pub trait DebugHost {
    /// Binds a breakpoint at the given source location. Fails with
    /// [`LocationResolutionError`] when the location has no executable
    /// address in the target binary.
    fn insert_breakpoint(&mut self, location: &SourceLocation)
        -> Result<(), LocationResolutionError>;

    /// Starts the target and blocks until the first stop.
    fn launch(&mut self) -> Result<StopEvent, HostError>;

    /// Resumes the paused target transparently and blocks until the next
    /// stop.
    fn resume(&mut self) -> Result<StopEvent, HostError>;

    /// Evaluates a named expression in the current (stopped) frame and
    /// returns its value.
    fn evaluate(&mut self, expression: &str) -> Result<HostValue, HostError>;

    /// Evaluates `expression` in the current frame and pins its value (and
    /// type) under `slot`, surviving frame changes. Returns the spelling
    /// under which later [`DebugHost::evaluate`] calls can reference the
    /// pinned value. The subdivision loop moves its iterators, so range
    /// endpoints must be pinned at the Entry hit to keep every capture
    /// spanning the full output buffer.
    fn pin(&mut self, slot: &str, expression: &str) -> Result<String, HostError>;

    /// Tears the host session down.
    fn terminate(&mut self) -> Result<(), HostError>;
}
