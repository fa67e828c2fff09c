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

//! Series construction from a finalized trace.
//!
//! Pure data transformation, separated from terminal rendering so the same
//! trace always yields the same series. The trim window mirrors the
//! recursion: each subdivision step narrows the valid output window by one
//! element per end, so the capture at position i keeps its interior after
//! trimming i+1 elements from each end; NaN padding is dropped afterwards.

use sdb_common::{Snapshot, SubdivisionTrace};
use tracing::debug;

/// Rendering style of one plotted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    /// The control polygon: a connected point series with point markers.
    InputPolygon,
    /// An intermediate subdivision state: a connected line.
    Intermediate,
    /// The converged final result: distinguished points, no connecting
    /// line.
    Converged,
}

/// One renderable point series.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    /// Label shown in the chart legend.
    pub label: String,
    /// Finite points only, in capture order.
    pub points: Vec<(f64, f64)>,
    /// How to draw this series.
    pub style: SeriesStyle,
}

/// Builds the renderable series for a finalized trace: the input polygon
/// first, then one series per plottable output capture.
///
/// The leading output capture is skipped when it mirrors the input (the
/// Entry hit fires before the algorithm has produced anything new). Capture
/// gaps and series left empty after trimming and NaN filtering are omitted;
/// an omitted series never fails the render. The converged style is
/// selected for position N−2, where N is the control point count — the
/// depth at which the recursion has reduced the polygon to the single curve
/// point.
pub fn build_series(trace: &SubdivisionTrace) -> Vec<PlotSeries> {
    let input = trace.input();
    let n = input.len();

    let mut series = vec![PlotSeries {
        label: "input".to_string(),
        points: finite_tuples(input),
        style: SeriesStyle::InputPolygon,
    }];

    let captures = trace.outputs();
    let mirrors_input = captures
        .first()
        .and_then(|c| c.snapshot.as_ref())
        .is_some_and(|s| s.starts_with(input.points()));
    let plotted = if mirrors_input { &captures[1..] } else { captures };

    for (i, capture) in plotted.iter().enumerate() {
        let style = if n >= 2 && i == n - 2 {
            SeriesStyle::Converged
        } else {
            SeriesStyle::Intermediate
        };
        // Gaps keep their position (the trim depth tracks recursion depth,
        // not the number of renderable captures) but are not drawn.
        let Some(snapshot) = &capture.snapshot else {
            debug!(position = i, "omitting capture gap");
            continue;
        };
        let points = finite_tuples(&snapshot.trimmed(i + 1));
        if points.is_empty() {
            debug!(position = i, ?style, "series empty after trim and filter; omitting");
            continue;
        }
        series.push(PlotSeries { label: format!("step {i}"), points, style });
    }
    series
}

fn finite_tuples(snapshot: &Snapshot) -> Vec<(f64, f64)> {
    snapshot.finite_points().iter().map(|p| (p.x, p.y)).collect()
}

/// Axis bounds enclosing every plotted point, padded so border points stay
/// visible. Degenerate extents (a single point, or no points at all) get a
/// unit window.
pub fn bounds(series: &[PlotSeries]) -> ([f64; 2], [f64; 2]) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for s in series {
        for &(px, py) in &s.points {
            x = (x.0.min(px), x.1.max(px));
            y = (y.0.min(py), y.1.max(py));
        }
    }
    (pad(x), pad(y))
}

fn pad((min, max): (f64, f64)) -> [f64; 2] {
    if min > max {
        return [0.0, 1.0];
    }
    let margin = if max > min { (max - min) * 0.05 } else { 0.5 };
    [min - margin, max + margin]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdb_common::{Point2, Snapshot, SourceLocation, TraceBuilder};

    fn snapshot_of(coords: &[(f64, f64)]) -> Snapshot {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    fn loc() -> SourceLocation {
        SourceLocation::new("subdivide.hpp", 57)
    }

    /// The scenario from the capture protocol: N=4 input, three output
    /// snapshots of sizes 6, 4 and 2.
    fn scenario_trace() -> SubdivisionTrace {
        let mut builder = TraceBuilder::new();
        builder.record_input(snapshot_of(&[(0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0)]));
        builder.record_output(
            loc(),
            snapshot_of(&[(0.0, 0.1), (1.0, 1.0), (2.0, 2.0), (3.0, 2.0), (4.0, 1.0), (5.0, 0.0)]),
        );
        builder.record_output(
            loc(),
            snapshot_of(&[(0.5, 0.5), (1.5, 1.5), (2.5, 1.5), (3.5, 0.5)]),
        );
        builder.record_output(loc(), snapshot_of(&[(1.0, 1.0), (2.0, 1.0)]));
        builder.finish().unwrap()
    }

    #[test]
    fn test_scenario_trims_and_styles() {
        let series = build_series(&scenario_trace());

        // Input polygon plus the captures that survive their trim: the
        // size-6 snapshot keeps 4 interior points, the size-4 keeps 0 (it
        // is omitted), the size-2 at position 2 == N-2 keeps 0 with the
        // converged style selected (and is omitted). No panic either way.
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].style, SeriesStyle::InputPolygon);
        assert_eq!(series[0].points.len(), 4);

        assert_eq!(series[1].style, SeriesStyle::Intermediate);
        assert_eq!(
            series[1].points,
            vec![(1.0, 1.0), (2.0, 2.0), (3.0, 2.0), (4.0, 1.0)]
        );
    }

    #[test]
    fn test_entry_mirror_is_skipped() {
        let input = [(0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0)];
        let mut builder = TraceBuilder::new();
        builder.record_input(snapshot_of(&input));
        // Entry capture: input copied into the buffer, rest NaN-padded.
        let mut mirror = input.to_vec();
        mirror.extend([(f64::NAN, f64::NAN); 2]);
        mirror.push(input[3]);
        builder.record_output(loc(), snapshot_of(&mirror));
        // First real step: full-width buffer, interior already reduced.
        builder.record_output(
            loc(),
            snapshot_of(&[
                (0.0, 0.0),
                (0.5, 1.0),
                (2.0, 2.0),
                (3.5, 1.0),
                (f64::NAN, f64::NAN),
                (3.5, 1.0),
                (4.0, 0.0),
            ]),
        );
        let trace = builder.finish().unwrap();

        let series = build_series(&trace);
        // The mirror is dropped, so the step capture is position 0 and is
        // trimmed by one element per end.
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].points, vec![(0.5, 1.0), (2.0, 2.0), (3.5, 1.0), (3.5, 1.0)]);
    }

    #[test]
    fn test_all_nan_snapshot_renders_as_omitted() {
        let mut builder = TraceBuilder::new();
        builder.record_input(snapshot_of(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]));
        builder.record_output(loc(), Snapshot::new(vec![Point2::nan(); 6]));
        let trace = builder.finish().unwrap();

        let series = build_series(&trace);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].style, SeriesStyle::InputPolygon);
    }

    #[test]
    fn test_gaps_keep_trim_positions() {
        let wide: Vec<(f64, f64)> = (0..8).map(|i| (i as f64, 0.0)).collect();
        let mut builder = TraceBuilder::new();
        builder.record_input(snapshot_of(&[(0.0, 0.0), (1.0, 1.0), (7.0, 0.0)]));
        builder.record_output(loc(), snapshot_of(&wide));
        builder.record_gap(loc());
        builder.record_output(loc(), snapshot_of(&wide));
        let trace = builder.finish().unwrap();

        let series = build_series(&trace);
        // Positions 0 and 2 survive; position 2 was trimmed by 3 per end
        // even though position 1 was a gap.
        assert_eq!(series.len(), 3);
        assert_eq!(series[1].points.len(), 6);
        assert_eq!(series[2].points.len(), 2);
    }

    #[test]
    fn test_converged_style_at_n_minus_2() {
        let wide: Vec<(f64, f64)> = (0..12).map(|i| (i as f64, 1.0)).collect();
        let mut builder = TraceBuilder::new();
        builder.record_input(snapshot_of(&[(0.0, 0.0), (1.0, 1.0), (2.0, 1.0), (3.0, 0.0)]));
        for _ in 0..3 {
            builder.record_output(loc(), snapshot_of(&wide));
        }
        let trace = builder.finish().unwrap();

        let series = build_series(&trace);
        assert_eq!(series.len(), 4);
        assert_eq!(series[1].style, SeriesStyle::Intermediate);
        assert_eq!(series[2].style, SeriesStyle::Intermediate);
        // Position N-2 == 2 is the converged result.
        assert_eq!(series[3].style, SeriesStyle::Converged);
    }

    #[test]
    fn test_build_series_is_deterministic() {
        let trace = scenario_trace();
        assert_eq!(build_series(&trace), build_series(&trace));
    }

    #[test]
    fn test_bounds_enclose_all_series() {
        let series = vec![
            PlotSeries {
                label: "a".to_string(),
                points: vec![(0.0, -1.0), (4.0, 3.0)],
                style: SeriesStyle::InputPolygon,
            },
            PlotSeries {
                label: "b".to_string(),
                points: vec![(-2.0, 0.0)],
                style: SeriesStyle::Intermediate,
            },
        ];
        let ([x_min, x_max], [y_min, y_max]) = bounds(&series);
        assert!(x_min < -2.0 && x_max > 4.0);
        assert!(y_min < -1.0 && y_max > 3.0);
    }

    #[test]
    fn test_bounds_of_nothing_are_unit() {
        assert_eq!(bounds(&[]), ([0.0, 1.0], [0.0, 1.0]));
    }
}
