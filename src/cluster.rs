//! Gap-based clustering of occupied pixels, used to split paired limbs baked into one image.
//!
//! Occupied coordinates are projected onto one axis, sorted, and cut wherever two consecutive
//! projected values differ by more than the gap threshold. This is interval clustering, not
//! connectivity analysis: it separates regions only when their projections do not overlap.

use crate::mask::AlphaMask;

/// Default minimum positional jump, in pixels, that starts a new cluster.
pub const DEFAULT_GAP_THRESHOLD: u32 = 20;

/// Projection used to order and separate regions.
///
/// `Horizontal` is the source asset convention: the back limb is drawn left of the front one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Horizontal,
    Vertical,
}

impl Axis {
    fn project(self, (x, y): (u32, u32)) -> u32 {
        match self {
            Self::Horizontal => x,
            Self::Vertical => y,
        }
    }
}

/// Half-open integer box `[x1, x2) x [y1, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RegionBox {
    pub fn width(self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// Occupied pixels believed to form one physical part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelCluster {
    pixels: Vec<(u32, u32)>,
    bbox: RegionBox,
}

impl PixelCluster {
    /// Build a cluster from its pixels; `None` when `pixels` is empty.
    pub fn from_pixels(pixels: Vec<(u32, u32)>) -> Option<Self> {
        let (&(x0, y0), rest) = pixels.split_first()?;
        let (mut x1, mut y1, mut x2, mut y2) = (x0, y0, x0, y0);
        for &(x, y) in rest {
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x);
            y2 = y2.max(y);
        }
        Some(Self {
            pixels,
            bbox: RegionBox {
                x1,
                y1,
                x2: x2 + 1,
                y2: y2 + 1,
            },
        })
    }

    pub fn pixels(&self) -> &[(u32, u32)] {
        &self.pixels
    }

    pub fn bbox(&self) -> RegionBox {
        self.bbox
    }

    fn min_along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.bbox.x1,
            Axis::Vertical => self.bbox.y1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionClusterer {
    pub gap_threshold: u32,
    pub axis: Axis,
}

impl Default for RegionClusterer {
    fn default() -> Self {
        Self {
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            axis: Axis::Horizontal,
        }
    }
}

impl RegionClusterer {
    /// Partition the occupied pixels of `mask`, ordered ascending by their minimum along the
    /// clustering axis. An empty mask yields no clusters.
    pub fn cluster(&self, mask: &AlphaMask) -> Vec<PixelCluster> {
        let mut coords: Vec<(u32, u32)> = mask.occupied().collect();
        coords.sort_by_key(|&c| self.axis.project(c));

        let mut groups: Vec<Vec<(u32, u32)>> = Vec::new();
        let mut prev: Option<u32> = None;
        for c in coords {
            let v = self.axis.project(c);
            match (prev, groups.last_mut()) {
                (Some(p), Some(group)) if v - p <= self.gap_threshold => group.push(c),
                _ => groups.push(vec![c]),
            }
            prev = Some(v);
        }

        let mut clusters: Vec<PixelCluster> = groups
            .into_iter()
            .filter_map(PixelCluster::from_pixels)
            .collect();
        clusters.sort_by_key(|c| c.min_along(self.axis));
        clusters
    }
}

/// How a cluster count compares with the expected limb pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segmentation {
    Empty,
    Under(usize),
    Exact,
    Over(usize),
}

impl Segmentation {
    pub fn classify(clusters: usize) -> Self {
        match clusters {
            0 => Self::Empty,
            1 => Self::Under(1),
            2 => Self::Exact,
            n => Self::Over(n),
        }
    }
}

/// Which limb of a pair a cluster represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimbRole {
    Back,
    Front,
}

impl LimbRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::Back => "back",
            Self::Front => "front",
        }
    }
}

/// Label axis-ordered clusters: the first is `Back`, the second `Front`, the rest are dropped.
pub fn label_limbs(clusters: Vec<PixelCluster>) -> Vec<(LimbRole, PixelCluster)> {
    [LimbRole::Back, LimbRole::Front]
        .into_iter()
        .zip(clusters)
        .collect()
}
