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

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::types::Point2;

/// One captured set of 2D points at a single breakpoint hit.
///
/// Element order is the live-memory iteration order at capture time; it is
/// never sorted. A snapshot is immutable once captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    points: Vec<Point2>,
}

impl Deref for Snapshot {
    type Target = [Point2];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl Snapshot {
    /// Wraps an ordered point sequence into an immutable snapshot.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// The captured points, in memory iteration order.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Number of captured points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the snapshot holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the interior of the snapshot with `margin` elements removed
    /// from each end. A margin covering the whole snapshot yields an empty
    /// snapshot rather than panicking; NaN padding elements count toward the
    /// margin like any other element.
    pub fn trimmed(&self, margin: usize) -> Self {
        if margin.saturating_mul(2) >= self.points.len() {
            return Self::default();
        }
        Self { points: self.points[margin..self.points.len() - margin].to_vec() }
    }

    /// The points whose components are both actual numbers.
    pub fn finite_points(&self) -> Vec<Point2> {
        self.points.iter().copied().filter(|p| !p.has_nan()).collect()
    }

    /// Whether the leading points of this snapshot reproduce `prefix`
    /// exactly. Used to recognize the Entry hit's output capture mirroring
    /// the input polygon.
    pub fn starts_with(&self, prefix: &[Point2]) -> bool {
        self.points.len() >= prefix.len()
            && self.points.iter().zip(prefix).all(|(a, b)| a.x == b.x && a.y == b.y)
    }
}

impl FromIterator<Point2> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Point2>>(iter: I) -> Self {
        Self { points: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Point2;
    type IntoIter = std::slice::Iter<'a, Point2>;
    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
