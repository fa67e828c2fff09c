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

//! GDB/MI adapter for the [`DebugHost`] capability trait.
//!
//! Drives a `gdb --interpreter=mi2` child over its pipes. Only the handful
//! of MI commands the capture protocol needs are spoken: `-break-insert`,
//! `-exec-run`, `-exec-continue`, `-data-evaluate-expression`, `-gdb-exit`.
//! Replies are parsed line-by-line; everything that is not a result or
//! `*stopped` record (console streams, async notifications, the `(gdb)`
//! prompt) is skipped.

use std::{
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    str::FromStr,
};

use sdb_common::SourceLocation;
use tracing::{debug, trace, warn};

use crate::{
    error::{HostError, LocationResolutionError},
    host::{DebugHost, HostValue, StopEvent},
};

/// A [`DebugHost`] implemented over GDB's machine interface.
pub struct GdbMiHost {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl std::fmt::Debug for GdbMiHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GdbMiHost").field("pid", &self.child.id()).finish()
    }
}

impl GdbMiHost {
    /// Spawns GDB on the given target binary. The target does not run yet;
    /// it starts on [`DebugHost::launch`], after breakpoints are in place.
    pub fn launch_target(
        gdb: &Path,
        target: &Path,
        target_args: &[String],
    ) -> Result<Self, HostError> {
        let mut command = Command::new(gdb);
        command
            .arg("--interpreter=mi2")
            .arg("--nx")
            .arg("--quiet")
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|source| HostError::Spawn {
            command: gdb.display().to_string(),
            source,
        })?;

        // Both pipes were requested above, so they are present.
        let stdin = child.stdin.take().ok_or(HostError::Disconnected)?;
        let stdout = child.stdout.take().map(BufReader::new).ok_or(HostError::Disconnected)?;

        let mut host = Self { child, stdin, stdout };
        host.drain_to_prompt()?;
        host.command("-gdb-set confirm off")?;
        if !target_args.is_empty() {
            host.command(&format!("-exec-arguments {}", target_args.join(" ")))?;
        }
        debug!(gdb = %gdb.display(), target = %target.display(), "debug host ready");
        Ok(host)
    }

    fn send(&mut self, line: &str) -> Result<(), HostError> {
        trace!(command = line, "-> gdb");
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, HostError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(HostError::Disconnected);
        }
        let line = line.trim_end().to_string();
        trace!(reply = %line, "<- gdb");
        Ok(line)
    }

    /// Consumes output up to the next `(gdb)` prompt.
    fn drain_to_prompt(&mut self) -> Result<(), HostError> {
        loop {
            if self.read_line()?.starts_with("(gdb)") {
                return Ok(());
            }
        }
    }

    /// Sends one MI command and returns its result record, skipping stream
    /// and async output. `^running` is treated like `^done`: the caller
    /// then waits for the corresponding `*stopped` record.
    fn command(&mut self, command: &str) -> Result<String, HostError> {
        self.send(command)?;
        loop {
            let line = self.read_line()?;
            if line.starts_with("^done") || line.starts_with("^running") {
                return Ok(line);
            }
            if line.starts_with("^exit") {
                return Ok(line);
            }
            if line.starts_with("^error") {
                let message = mi_field(&line, "msg")
                    .unwrap_or_else(|| "unspecified MI error".to_string());
                return Err(HostError::CommandFailed { command: command.to_string(), message });
            }
            // ~console, &log, =notify, *running, (gdb) prompt: skip.
        }
    }

    /// Blocks until the target reports a stop or exit.
    fn wait_for_stop(&mut self) -> Result<StopEvent, HostError> {
        loop {
            let line = self.read_line()?;
            if !line.starts_with("*stopped") {
                continue;
            }
            return parse_stopped(&line).ok_or_else(|| HostError::UnexpectedReply {
                command: "<wait for stop>".to_string(),
                reply: line,
            });
        }
    }
}

impl DebugHost for GdbMiHost {
    fn insert_breakpoint(
        &mut self,
        location: &SourceLocation,
    ) -> Result<(), LocationResolutionError> {
        let spec = location.breakpoint_spec();
        let reply = self.command(&format!("-break-insert {spec}")).map_err(|err| {
            let reason = match err {
                HostError::CommandFailed { message, .. } => message,
                other => other.to_string(),
            };
            LocationResolutionError { location: location.clone(), reason }
        })?;

        // GDB accepts unresolvable locations as pending breakpoints; for
        // this protocol a trace point that never binds is fatal.
        if mi_field(&reply, "addr").as_deref() == Some("<PENDING>") {
            return Err(LocationResolutionError {
                location: location.clone(),
                reason: "location has no executable address in the target binary".to_string(),
            });
        }
        debug!(%location, "breakpoint bound");
        Ok(())
    }

    fn launch(&mut self) -> Result<StopEvent, HostError> {
        self.command("-exec-run")?;
        self.wait_for_stop()
    }

    fn resume(&mut self) -> Result<StopEvent, HostError> {
        self.command("-exec-continue")?;
        self.wait_for_stop()
    }

    fn evaluate(&mut self, expression: &str) -> Result<HostValue, HostError> {
        let command = format!("-data-evaluate-expression \"{}\"", escape_mi(expression));
        let reply = self.command(&command)?;
        let value = mi_field(&reply, "value")
            .ok_or_else(|| HostError::UnexpectedReply { command: command.clone(), reply })?;
        HostValue::from_str(&value)
            .map_err(|_| HostError::UnexpectedReply { command, reply: value })
    }

    fn pin(&mut self, slot: &str, expression: &str) -> Result<String, HostError> {
        // Assignment to a convenience variable keeps both value and type
        // available after the frame is gone.
        let reference = format!("${slot}");
        self.evaluate(&format!("{reference} = ({expression})"))?;
        Ok(reference)
    }

    fn terminate(&mut self) -> Result<(), HostError> {
        self.send("-gdb-exit")?;
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for GdbMiHost {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            warn!("debug host still running on drop; killing it");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Extracts the value of `key="..."` from an MI record, undoing MI's
/// backslash escapes.
fn mi_field(record: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    let start = record.find(&needle)? + needle.len();
    let mut value = String::new();
    let mut chars = record[start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(value),
            '\\' => match chars.next()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                escaped => value.push(escaped),
            },
            _ => value.push(c),
        }
    }
    None
}

/// Escapes a C expression for embedding in a quoted MI argument.
fn escape_mi(expression: &str) -> String {
    expression.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Interprets a `*stopped` record. Returns None for stop reasons this
/// protocol cannot continue from (watchpoints, random signals).
fn parse_stopped(record: &str) -> Option<StopEvent> {
    match mi_field(record, "reason")?.as_str() {
        "breakpoint-hit" => {
            let line = mi_field(record, "line")?.parse::<usize>().ok()?;
            let file = mi_field(record, "fullname").or_else(|| mi_field(record, "file"))?;
            Some(StopEvent::BreakpointHit(SourceLocation::new(PathBuf::from(file), line)))
        }
        "exited-normally" => Some(StopEvent::Exited { code: Some(0) }),
        // MI prints the exit code in octal.
        "exited" => {
            let code = mi_field(record, "exit-code")
                .and_then(|oct| i32::from_str_radix(&oct, 8).ok());
            Some(StopEvent::Exited { code })
        }
        "exited-signalled" => Some(StopEvent::Exited { code: None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mi_field_extraction() {
        let record = r#"^done,bkpt={number="1",type="breakpoint",addr="0x0000000000401150",file="de_casteljau.c",fullname="/work/demos/de_casteljau.c",line="57"}"#;
        assert_eq!(mi_field(record, "addr").unwrap(), "0x0000000000401150");
        assert_eq!(mi_field(record, "line").unwrap(), "57");
        assert_eq!(mi_field(record, "file").unwrap(), "de_casteljau.c");
        // `file=` must not be confused with `fullname=`.
        assert_eq!(mi_field(record, "fullname").unwrap(), "/work/demos/de_casteljau.c");
        assert!(mi_field(record, "missing").is_none());
    }

    #[test]
    fn test_mi_field_unescapes() {
        let record = r#"^error,msg="No symbol \"t\" in current context.""#;
        assert_eq!(mi_field(record, "msg").unwrap(), r#"No symbol "t" in current context."#);
    }

    #[test]
    fn test_parse_breakpoint_stop() {
        let record = r#"*stopped,reason="breakpoint-hit",disp="keep",bkptno="2",frame={addr="0x0000000000401187",func="subdivide",args=[],file="de_casteljau.c",fullname="/work/demos/de_casteljau.c",line="64"},thread-id="1",stopped-threads="all""#;
        assert_eq!(
            parse_stopped(record),
            Some(StopEvent::BreakpointHit(SourceLocation::new("/work/demos/de_casteljau.c", 64)))
        );
    }

    #[test]
    fn test_parse_exits() {
        assert_eq!(
            parse_stopped(r#"*stopped,reason="exited-normally""#),
            Some(StopEvent::Exited { code: Some(0) })
        );
        // Exit codes arrive in octal: "011" is decimal 9.
        assert_eq!(
            parse_stopped(r#"*stopped,reason="exited",exit-code="011""#),
            Some(StopEvent::Exited { code: Some(9) })
        );
        assert_eq!(
            parse_stopped(r#"*stopped,reason="exited-signalled",signal-name="SIGSEGV""#),
            Some(StopEvent::Exited { code: None })
        );
    }

    #[test]
    fn test_parse_unsupported_stop_reason() {
        assert_eq!(parse_stopped(r#"*stopped,reason="signal-received",signal-name="SIGINT""#), None);
    }

    #[test]
    fn test_escape_mi() {
        assert_eq!(escape_mi(r#"(&(*first))[0].data[0]"#), r#"(&(*first))[0].data[0]"#);
        assert_eq!(escape_mi(r#"strcmp(s, "x")"#), r#"strcmp(s, \"x\")"#);
    }
}
