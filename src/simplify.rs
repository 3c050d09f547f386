//! Douglas-Peucker polyline simplification.

use crate::foundation::core::Point;

/// Default maximum deviation, in pixels.
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Reduce `points` so that no dropped point lies farther than `tolerance` from the chord
/// that replaces it. Both endpoints are always kept; inputs with fewer than three points
/// pass through unchanged.
///
/// A closed ring (first point repeated at the end) is handled naturally: the degenerate
/// first chord falls back to point distance, which splits the ring at its farthest vertex.
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((first, end)) = stack.pop() {
        if end <= first + 1 {
            continue;
        }

        let mut max_dist = 0.0f64;
        let mut max_idx = first;
        for (i, p) in points.iter().enumerate().take(end).skip(first + 1) {
            let dist = point_line_distance(*p, points[first], points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_idx = i;
            }
        }

        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((first, max_idx));
            stack.push((max_idx, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
fn point_line_distance(p: Point, a: Point, b: Point) -> f64 {
    let d = b - a;
    let len = d.hypot();
    if len < 1e-12 {
        return (p - a).hypot();
    }
    (p - a).cross(d).abs() / len
}
