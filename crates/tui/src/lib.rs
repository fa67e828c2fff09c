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
//! Terminal visualizer for SDB
//!
//! Renders a finalized subdivision trace as an interactive 2D chart: the
//! input control polygon as a connected series, every intermediate
//! subdivision state as a line, and the converged result as distinguished
//! points. The visualizer only ever consumes a finalized trace; re-running
//! it on the same trace draws the same series.

mod app;
/// Pure series construction (trim window, NaN filter, style selection)
pub mod chart;
mod config;

pub use app::App;
pub use chart::{build_series, PlotSeries, SeriesStyle};
pub use config::{ColorScheme, Config};

use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use sdb_common::SubdivisionTrace;
use tracing::info;

/// Configuration for the TUI event loop
#[derive(Debug, Clone)]
pub struct TuiConfig {
    /// How long to wait for input between redraws
    pub tick_rate: Duration,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { tick_rate: Duration::from_millis(100) }
    }
}

/// Main TUI runner: owns the terminal and drives the draw/input loop.
pub struct Tui {
    app: App,
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    config: TuiConfig,
}

impl Tui {
    /// Sets up the terminal and builds the view over a finalized trace.
    pub fn new(trace: &SubdivisionTrace, config: TuiConfig) -> Result<Self> {
        let app = App::new(trace, Config::load());

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self { app, terminal, config })
    }

    /// Runs the event loop until the user quits.
    pub fn run(mut self) -> Result<()> {
        info!("starting visualizer");
        loop {
            self.terminal.draw(|frame| self.app.draw(frame))?;
            if event::poll(self.config.tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.app.handle_key(key)
                    }
                    // Resize redraws on the next loop turn.
                    _ => {}
                }
            }
            if self.app.should_quit() {
                break;
            }
        }
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Leave the user's terminal usable even on a panic inside draw.
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}
