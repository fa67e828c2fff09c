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

//! Application state and rendering for the subdivision chart.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Block, Chart, Dataset, GraphType},
    Frame,
};
use sdb_common::SubdivisionTrace;

use crate::{
    chart::{self, PlotSeries, SeriesStyle},
    config::{ColorScheme, Config},
};

/// View state over one finalized trace.
///
/// The series are built once up front; stepping through subdivision depth
/// only changes how many of them are drawn, so re-rendering is
/// deterministic.
pub struct App {
    series: Vec<PlotSeries>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    title: String,
    colors: ColorScheme,
    /// Number of output series currently drawn (the input polygon is
    /// always drawn).
    visible: usize,
    should_quit: bool,
}

impl App {
    /// Builds the view over a finalized trace.
    pub fn new(trace: &SubdivisionTrace, config: Config) -> Self {
        let series = chart::build_series(trace);
        let (x_bounds, y_bounds) = chart::bounds(&series);

        let mut title = format!(
            "subdivision — {} control points, {} hits",
            trace.control_point_count(),
            trace.hit_count()
        );
        if let Some(t) = trace.parameter() {
            title.push_str(&format!(", t = {t}"));
        }
        if trace.gap_count() > 0 {
            title.push_str(&format!(" ({} capture gaps)", trace.gap_count()));
        }

        let visible = series.len().saturating_sub(1);
        Self { series, x_bounds, y_bounds, title, colors: config.colors, visible, should_quit: false }
    }

    /// Whether the user asked to leave.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Number of drawable output series.
    fn step_count(&self) -> usize {
        self.series.len().saturating_sub(1)
    }

    /// Handles one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left => self.visible = self.visible.saturating_sub(1),
            KeyCode::Right => self.visible = (self.visible + 1).min(self.step_count()),
            KeyCode::Home => self.visible = 0,
            KeyCode::Char('a') | KeyCode::End => self.visible = self.step_count(),
            _ => {}
        }
    }

    /// Renders the chart and the status line.
    pub fn draw(&self, frame: &mut Frame<'_>) {
        let [chart_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

        let border = ColorScheme::resolve(&self.colors.border, Color::DarkGray);
        let datasets: Vec<Dataset<'_>> = self
            .series
            .iter()
            .take(1 + self.visible)
            .map(|series| self.dataset(series))
            .collect();

        let chart = Chart::new(datasets)
            .block(
                Block::bordered()
                    .title(self.title.as_str())
                    .border_style(Style::default().fg(border)),
            )
            .x_axis(self.axis(self.x_bounds, border))
            .y_axis(self.axis(self.y_bounds, border));
        frame.render_widget(chart, chart_area);

        let help = ColorScheme::resolve(&self.colors.help_text, Color::Gray);
        let status = Line::styled(
            format!(
                " q quit │ ←/→ step depth │ a all │ showing {}/{} series",
                self.visible,
                self.step_count()
            ),
            Style::default().fg(help),
        );
        frame.render_widget(status, status_area);
    }

    fn dataset<'a>(&self, series: &'a PlotSeries) -> Dataset<'a> {
        let (color, graph_type) = match series.style {
            SeriesStyle::InputPolygon => {
                (ColorScheme::resolve(&self.colors.input_series, Color::Red), GraphType::Line)
            }
            SeriesStyle::Intermediate => (
                ColorScheme::resolve(&self.colors.intermediate_series, Color::Cyan),
                GraphType::Line,
            ),
            SeriesStyle::Converged => (
                ColorScheme::resolve(&self.colors.converged_series, Color::Blue),
                GraphType::Scatter,
            ),
        };
        Dataset::default()
            .name(series.label.as_str())
            .marker(Marker::Braille)
            .graph_type(graph_type)
            .style(Style::default().fg(color))
            .data(&series.points)
    }

    fn axis(&self, bounds: [f64; 2], color: Color) -> Axis<'_> {
        let mid = (bounds[0] + bounds[1]) / 2.0;
        Axis::default()
            .style(Style::default().fg(color))
            .bounds(bounds)
            .labels([
                format!("{:.2}", bounds[0]),
                format!("{mid:.2}"),
                format!("{:.2}", bounds[1]),
            ])
    }
}
