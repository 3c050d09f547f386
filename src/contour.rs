//! Boundary tracing at the 0.5 iso-level of an occupancy mask (marching squares).
//!
//! Each 2x2 cell of pixel centers contributes directed segments between edge midpoints.
//! Segments run from the edge where an occupied run starts to the edge where it ends, walking
//! the cell corners clockwise, so every midpoint has exactly one outgoing and one incoming
//! segment and chaining always closes into rings. Saddle cells keep diagonal occupied pixels
//! apart. Pixels outside the mask read as unoccupied, so regions touching the border still
//! produce closed rings.

use std::collections::{HashMap, HashSet};

use crate::{foundation::core::Point, mask::AlphaMask};

/// Closed boundary ring; the first point is repeated at the end.
pub type Contour = Vec<Point>;

/// Edge midpoint in doubled pixel coordinates, keeping half-pixel positions exact.
type MidKey = (i64, i64);

/// Trace every boundary ring of `mask`, in raster order of their first segment.
pub fn find_contours(mask: &AlphaMask) -> Vec<Contour> {
    let (starts, next) = collect_segments(mask);

    let mut visited = HashSet::with_capacity(next.len());
    let mut rings = Vec::new();
    for &start in &starts {
        if visited.contains(&start) {
            continue;
        }

        let mut ring = Vec::new();
        let mut key = start;
        loop {
            visited.insert(key);
            ring.push(mid_point(key));
            match next.get(&key) {
                Some(&n) if n != start => key = n,
                _ => break,
            }
        }
        ring.push(mid_point(start));
        rings.push(ring);
    }
    rings
}

/// The ring with the most points; ties go to the first one traced.
///
/// Secondary fragments are discarded. Returns an empty contour for an empty mask.
pub fn longest_contour(mask: &AlphaMask) -> Contour {
    let mut best: Contour = Vec::new();
    for ring in find_contours(mask) {
        if ring.len() > best.len() {
            best = ring;
        }
    }
    best
}

fn collect_segments(mask: &AlphaMask) -> (Vec<MidKey>, HashMap<MidKey, MidKey>) {
    let w = i64::from(mask.width());
    let h = i64::from(mask.height());

    let mut starts = Vec::new();
    let mut next = HashMap::new();
    for cy in -1..h {
        for cx in -1..w {
            // Clockwise corners: TL, TR, BR, BL.
            let c = [
                mask.get_signed(cx, cy),
                mask.get_signed(cx + 1, cy),
                mask.get_signed(cx + 1, cy + 1),
                mask.get_signed(cx, cy + 1),
            ];
            if c.iter().all(|&v| v) || !c.iter().any(|&v| v) {
                continue;
            }

            for enter in 0..4 {
                if c[enter] || !c[(enter + 1) % 4] {
                    continue;
                }
                let Some(leave) = (1..=4)
                    .map(|k| (enter + k) % 4)
                    .find(|&j| c[j] && !c[(j + 1) % 4])
                else {
                    continue;
                };
                let from = edge_mid(cx, cy, enter);
                let to = edge_mid(cx, cy, leave);
                starts.push(from);
                next.insert(from, to);
            }
        }
    }
    (starts, next)
}

/// Midpoint of cell edge `edge` (0 = top, 1 = right, 2 = bottom, 3 = left).
fn edge_mid(cx: i64, cy: i64, edge: usize) -> MidKey {
    let (x2, y2) = (2 * cx, 2 * cy);
    match edge {
        0 => (x2 + 1, y2),
        1 => (x2 + 2, y2 + 1),
        2 => (x2 + 1, y2 + 2),
        _ => (x2, y2 + 1),
    }
}

fn mid_point((x2, y2): MidKey) -> Point {
    Point::new(x2 as f64 / 2.0, y2 as f64 / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(w: u32, h: u32, x0: u32, y0: u32, bw: u32, bh: u32) -> AlphaMask {
        AlphaMask::from_fn(w, h, |x, y| {
            x >= x0 && x < x0 + bw && y >= y0 && y < y0 + bh
        })
    }

    #[test]
    fn empty_mask_has_no_contours() {
        let mask = AlphaMask::from_fn(8, 8, |_, _| false);
        assert!(find_contours(&mask).is_empty());
        assert!(longest_contour(&mask).is_empty());
    }

    #[test]
    fn single_pixel_is_a_closed_diamond() {
        let mask = block(6, 6, 2, 3, 1, 1);
        let rings = find_contours(&mask);
        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        for p in &ring[..4] {
            let d = (p.x - 2.0).abs() + (p.y - 3.0).abs();
            assert!((d - 0.5).abs() < 1e-12, "unexpected point {p:?}");
        }
    }

    #[test]
    fn block_ring_visits_every_boundary_crossing_once() {
        let mask = block(20, 20, 4, 5, 10, 6);
        let ring = longest_contour(&mask);
        assert_eq!(ring.len(), 2 * (10 + 6) + 1);

        let unique: HashSet<(i64, i64)> = ring[..ring.len() - 1]
            .iter()
            .map(|p| ((p.x * 2.0) as i64, (p.y * 2.0) as i64))
            .collect();
        assert_eq!(unique.len(), ring.len() - 1);

        for p in &ring {
            assert!(p.x >= 3.5 && p.x <= 13.5);
            assert!(p.y >= 4.5 && p.y <= 10.5);
        }
    }

    #[test]
    fn border_touching_region_closes_outside_the_image() {
        let mask = AlphaMask::from_fn(4, 3, |_, _| true);
        let ring = longest_contour(&mask);
        assert_eq!(ring.first(), ring.last());
        assert!(ring.iter().any(|p| p.x == -0.5));
        assert!(ring.iter().any(|p| p.y == 2.5));
    }

    #[test]
    fn diagonal_neighbours_stay_separate() {
        let mask = AlphaMask::from_fn(4, 4, |x, y| (x, y) == (1, 1) || (x, y) == (2, 2));
        assert_eq!(find_contours(&mask).len(), 2);
    }

    #[test]
    fn longest_ring_wins_over_fragments() {
        let mask = AlphaMask::from_fn(40, 20, |x, y| {
            let big = (5..25).contains(&x) && (5..15).contains(&y);
            let speck = x == 35 && y == 2;
            big || speck
        });
        assert_eq!(find_contours(&mask).len(), 2);
        let ring = longest_contour(&mask);
        assert_eq!(ring.len(), 2 * (20 + 10) + 1);
    }

    #[test]
    fn hole_produces_inner_ring() {
        let mask = AlphaMask::from_fn(12, 12, |x, y| {
            let outer = (1..11).contains(&x) && (1..11).contains(&y);
            let hole = (4..8).contains(&x) && (4..8).contains(&y);
            outer && !hole
        });
        let rings = find_contours(&mask);
        assert_eq!(rings.len(), 2);
        assert_eq!(longest_contour(&mask).len(), 2 * (10 + 10) + 1);
    }
}
