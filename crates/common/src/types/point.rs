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

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A point in the plane with double-precision components.
///
/// Components extracted from a partially-initialized target buffer may be
/// NaN. Such points are carried through capture and trace assembly verbatim;
/// dropping them is a rendering decision, not a data-model one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Horizontal component.
    #[serde(with = "nan_as_null")]
    pub x: f64,
    /// Vertical component.
    #[serde(with = "nan_as_null")]
    pub y: f64,
}

impl Point2 {
    /// Creates a point from its two components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// A point whose components are both NaN, matching the fill value the
    /// instrumented algorithm uses for not-yet-written buffer slots.
    pub const fn nan() -> Self {
        Self { x: f64::NAN, y: f64::NAN }
    }

    /// Returns true if both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns true if either component is NaN.
    pub fn has_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }
}

impl Display for Point2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for (f64, f64) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

/// JSON has no NaN literal, so non-finite components are serialized as null
/// and read back as NaN. Without this an exported trace of a recursive run
/// would fail to round-trip.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            serializer.serialize_some(v)
        } else {
            serializer.serialize_none()
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_and_nan_classification() {
        assert!(Point2::new(1.0, -2.5).is_finite());
        assert!(!Point2::new(1.0, -2.5).has_nan());

        let half_nan = Point2::new(f64::NAN, 0.0);
        assert!(!half_nan.is_finite());
        assert!(half_nan.has_nan());

        assert!(Point2::nan().has_nan());
        assert!(!Point2::new(f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_json_round_trip_preserves_nan() {
        let p = Point2::new(f64::NAN, 2.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"x":null,"y":2.0}"#);

        let back: Point2 = serde_json::from_str(&json).unwrap();
        assert!(back.x.is_nan());
        assert_eq!(back.y, 2.0);
    }

    #[test]
    fn test_tuple_conversions() {
        let p: Point2 = (3.0, 4.0).into();
        assert_eq!(p, Point2::new(3.0, 4.0));
        let t: (f64, f64) = p.into();
        assert_eq!(t, (3.0, 4.0));
    }
}
