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

//! SDB - Subdivision Debugger
//!
//! Instruments a running recursive point-subdivision algorithm through GDB
//! and renders the progressive subdivision as an interactive terminal plot.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use sdb_common::{logging, SubdivisionTrace};
use sdb_engine::{
    CaptureSession, CaptureSpec, GdbMiHost, PointLayout, RangeSpec, DEFAULT_MARKER,
};
use sdb_tui::{Tui, TuiConfig};
use tracing::info;

/// Command-line interface for SDB
#[derive(Debug, Parser)]
#[command(name = "sdb")]
#[command(about = "Subdivision Debugger - traces and visualizes recursive curve subdivision")]
#[command(version)]
pub struct Cli {
    /// GDB binary used to drive the target
    #[arg(long, env = "SDB_GDB", default_value = "gdb")]
    pub gdb: PathBuf,

    /// Disable file logging
    #[arg(long)]
    pub no_log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a target under the debugger and capture its subdivision
    Trace {
        /// Compiled target binary, built with debug info
        target: PathBuf,

        /// Instrumented source file scanned for markers
        #[arg(long)]
        source: PathBuf,

        /// Marker pattern (a regex) identifying trace lines
        #[arg(long, default_value = DEFAULT_MARKER)]
        marker: String,

        /// Frame expression for the input range start
        #[arg(long, default_value = "&(*first)")]
        input_start: String,

        /// Frame expression for the input range end (exclusive)
        #[arg(long, default_value = "&(*last)")]
        input_end: String,

        /// Frame expression for the output range start
        #[arg(long, default_value = "&(*d_first)")]
        output_start: String,

        /// Frame expression for the output range end (inclusive)
        #[arg(long, default_value = "&(*d_last)")]
        output_end: String,

        /// Member path of a point's horizontal component
        #[arg(long, default_value = "data[0]")]
        component_x: String,

        /// Member path of a point's vertical component
        #[arg(long, default_value = "data[1]")]
        component_y: String,

        /// Frame expression for the subdivision parameter; empty disables
        /// its capture
        #[arg(long, default_value = "t")]
        parameter: String,

        /// Write the finalized trace to this file as JSON
        #[arg(long)]
        export: Option<PathBuf>,

        /// Capture only; skip the interactive chart
        #[arg(long)]
        headless: bool,

        /// Arguments passed through to the target
        #[arg(trailing_var_arg = true)]
        target_args: Vec<String>,
    },
    /// Visualize a previously exported trace
    View {
        /// Trace JSON produced by `sdb trace --export`
        trace: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging("sdb", !cli.no_log_file)?;

    match cli.command {
        Commands::Trace {
            target,
            source,
            marker,
            input_start,
            input_end,
            output_start,
            output_end,
            component_x,
            component_y,
            parameter,
            export,
            headless,
            target_args,
        } => {
            let spec = CaptureSpec {
                source,
                marker,
                input_range: RangeSpec::exclusive(input_start, input_end),
                output_range: RangeSpec::inclusive(output_start, output_end),
                layout: PointLayout { x: component_x, y: component_y },
                parameter: (!parameter.is_empty()).then_some(parameter),
            };

            let host = GdbMiHost::launch_target(&cli.gdb, &target, &target_args)?;
            let trace = CaptureSession::new(host, spec).run()?;
            info!(
                hits = trace.hit_count(),
                gaps = trace.gap_count(),
                "capture finished"
            );

            if let Some(path) = export {
                export_trace(&trace, &path)?;
            }
            if !headless {
                Tui::new(&trace, TuiConfig::default())?.run()?;
            }
            Ok(())
        }
        Commands::View { trace } => {
            let content = fs::read_to_string(&trace)
                .wrap_err_with(|| format!("reading trace file {}", trace.display()))?;
            let trace: SubdivisionTrace = serde_json::from_str(&content)
                .wrap_err("trace file is not a valid subdivision trace")?;
            Tui::new(&trace, TuiConfig::default())?.run()
        }
    }
}

fn export_trace(trace: &SubdivisionTrace, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(trace)?;
    fs::write(path, json).wrap_err_with(|| format!("writing trace to {}", path.display()))?;
    info!(path = %path.display(), "trace exported");
    Ok(())
}
