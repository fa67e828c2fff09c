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

//! Typed errors of the capture pipeline.
//!
//! Configuration and resolution errors are fatal and must surface before the
//! target ever runs; extraction errors are recoverable mid-run and degrade
//! the trace into a partial one instead of aborting the session.

use std::path::PathBuf;

use sdb_common::SourceLocation;
use thiserror::Error;

/// Fatal setup problems detected before any target execution.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The marker pattern matched no line; there is nothing to anchor
    /// breakpoints on.
    #[error("no `{pattern}` markers found in {}", file.display())]
    EmptyLocations {
        /// The marker pattern that was searched for.
        pattern: String,
        /// The instrumented source file that was scanned.
        file: PathBuf,
    },
    /// The instrumented source file could not be read.
    #[error("cannot read instrumented source {}: {source}", file.display())]
    UnreadableSource {
        /// The file that failed to open.
        file: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The marker pattern is not a valid regular expression.
    #[error("invalid marker pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// A marked location the debug host could not bind to an executable
/// address. Fatal: a missing trace point corrupts the whole downstream
/// trace.
#[derive(Debug, Error)]
#[error("cannot bind breakpoint at {location}: {reason}")]
pub struct LocationResolutionError {
    /// The location that failed to bind.
    pub location: SourceLocation,
    /// The host's explanation.
    pub reason: String,
}

/// Transport or protocol failure while talking to the debug host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host process could not be started.
    #[error("failed to spawn debug host `{command}`: {source}")]
    Spawn {
        /// The command that failed to spawn.
        command: String,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// The host closed its command stream.
    #[error("debug host closed its command stream")]
    Disconnected,
    /// The host rejected a command.
    #[error("debug host rejected `{command}`: {message}")]
    CommandFailed {
        /// The rejected command.
        command: String,
        /// The host's error message.
        message: String,
    },
    /// The host produced a reply this adapter cannot interpret.
    #[error("unexpected debug host reply to `{command}`: {reply}")]
    UnexpectedReply {
        /// The command that was sent.
        command: String,
        /// The uninterpretable reply.
        reply: String,
    },
    /// IO failure on the host's pipes.
    #[error("io error talking to debug host: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to materialize a snapshot from live memory.
///
/// Evaluation failures (an optimized-out variable, a frame without the
/// expected locals) are recoverable: the hit is recorded as a capture gap
/// and the session continues. A broken host transport is not.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The host could not evaluate an expression in the current frame.
    #[error("evaluation of `{expression}` failed: {reason}")]
    Evaluation {
        /// The expression that failed.
        expression: String,
        /// The host's explanation.
        reason: String,
    },
    /// An expression evaluated to something that is not a number.
    #[error("`{expression}` evaluated to non-numeric value `{value}`")]
    NotNumeric {
        /// The expression that was evaluated.
        expression: String,
        /// The value the host returned.
        value: String,
    },
    /// The range endpoints are ordered backwards in memory.
    #[error("range `{start}`..`{end}` has negative extent")]
    NegativeExtent {
        /// Expression naming the range start.
        start: String,
        /// Expression naming the range end.
        end: String,
    },
    /// The host transport itself failed; not recoverable.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl ExtractionError {
    /// Whether the session may continue with a capture gap, or must abort.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Host(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_recoverability() {
        let eval = ExtractionError::Evaluation {
            expression: "t".to_string(),
            reason: "optimized out".to_string(),
        };
        assert!(eval.is_recoverable());

        let host = ExtractionError::Host(HostError::Disconnected);
        assert!(!host.is_recoverable());
    }

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = ConfigurationError::EmptyLocations {
            pattern: "SPLINE_TRACE".to_string(),
            file: PathBuf::from("subdivide.hpp"),
        };
        let msg = err.to_string();
        assert!(msg.contains("SPLINE_TRACE"));
        assert!(msg.contains("subdivide.hpp"));

        let err = LocationResolutionError {
            location: SourceLocation::new("subdivide.hpp", 57),
            reason: "no debug info".to_string(),
        };
        assert!(err.to_string().contains("subdivide.hpp:57"));
    }
}
