//! Containment, distance, area and centroid primitives over coordinate rings.

use crate::types::Coord;

/// Drops the closing duplicate of a closed sequence so each corner appears once.
pub fn ring(coords: &[Coord]) -> &[Coord] {
    match coords {
        [first, .., last] if first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(coords: &[Coord]) -> f64 {
    let r = ring(coords);
    if r.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..r.len() {
        let a = r[i];
        let b = r[(i + 1) % r.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

pub fn polygon_area(coords: &[Coord]) -> f64 {
    signed_area(coords).abs()
}

/// Even-odd ray casting. Open sequences are treated as implicitly closed.
pub fn point_in_polygon(point: &Coord, coords: &[Coord]) -> bool {
    let r = ring(coords);
    if r.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = r.len() - 1;
    for i in 0..r.len() {
        let a = r[i];
        let b = r[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub fn distance_point_to_segment(point: &Coord, a: &Coord, b: &Coord) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return point.distance_to(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    point.distance_to(&Coord::new(a.x + t * dx, a.y + t * dy))
}

/// Shortest distance from `point` to the consecutive segments of `coords`.
///
/// A single coordinate measures to that coordinate; an empty slice is
/// infinitely far away.
pub fn distance_point_to_polyline(point: &Coord, coords: &[Coord]) -> f64 {
    match coords {
        [] => f64::INFINITY,
        [only] => point.distance_to(only),
        _ => coords
            .windows(2)
            .map(|w| distance_point_to_segment(point, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Area-weighted centroid of the ring; degenerate rings fall back to the
/// average of their corners.
pub fn centroid(coords: &[Coord]) -> Option<Coord> {
    let r = ring(coords);
    if r.is_empty() {
        return None;
    }
    let area = signed_area(r);
    if area.abs() <= f64::EPSILON {
        let n = r.len() as f64;
        let (sx, sy) = r.iter().fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
        return Some(Coord::new(sx / n, sy / n));
    }
    // Shift to the first corner to keep products small for projected coordinates.
    let o = r[0];
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..r.len() {
        let a = Coord::new(r[i].x - o.x, r[i].y - o.y);
        let next = r[(i + 1) % r.len()];
        let b = Coord::new(next.x - o.x, next.y - o.y);
        let f = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * f;
        cy += (a.y + b.y) * f;
    }
    let k = 6.0 * area;
    Some(Coord::new(o.x + cx / k, o.y + cy / k))
}
