//! Axis-aligned bounds of a point set.

use crate::foundation::core::{Point, Rect, point_pair};

/// Extents and midpoint of a polygon's coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(with = "point_pair")]
    pub center: Point,
}

impl BoundingBox {
    /// Bounds of `points`, or `None` when there are no points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let rect = rest
            .iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
        Some(Self::from_rect(rect))
    }

    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            center: rect.center(),
        }
    }
}
