//! Per-sprite polygon records and the batch report document.

use std::collections::BTreeMap;

use crate::{
    bounds::BoundingBox,
    foundation::core::{Point, point_pairs},
};

/// Closed outline in traversal order; the closing edge back to the first vertex is implicit.
pub type Polygon = Vec<Point>;

/// File name → record, serialized as one JSON object.
pub type PolygonReport = BTreeMap<String, SpriteRecord>;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpriteRecord {
    #[serde(with = "point_pairs")]
    pub polygon: Polygon,
    pub bounds: Option<BoundingBox>,
    pub point_count: usize,
}

impl SpriteRecord {
    pub fn from_polygon(polygon: Polygon) -> Self {
        let bounds = BoundingBox::from_points(&polygon);
        Self {
            point_count: polygon.len(),
            bounds,
            polygon,
        }
    }
}

/// Drop the repeated closing vertex of a traced ring.
pub fn open_ring(mut ring: Vec<Point>) -> Polygon {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}
