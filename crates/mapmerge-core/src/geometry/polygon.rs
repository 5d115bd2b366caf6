//! Planar polygon intersection.
//!
//! The overlap region is the boolean AND of both rings as computed by
//! `cavalier_contours`; its area is exact for simple polygons, convex or not.

use super::bbox::BBox;
use super::measure::{polygon_area, ring, signed_area};
use crate::types::Coord;
use cavalier_contours::polyline::{BooleanOp, PlineSource, PlineSourceMut, PlineVertex, Polyline};
use serde::{Deserialize, Serialize};

/// Default area tolerance for intersection classification.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// How two polygons relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonIntersection {
    /// No overlapping area (within tolerance)
    Outside,
    /// The first polygon lies inside the second
    FirstInsideSecond,
    /// The second polygon lies inside the first
    SecondInsideFirst,
    /// Partial overlap
    Crossing,
}

/// Classification plus the geometry of the overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionResult {
    pub kind: PolygonIntersection,
    /// Exact overlap area; `0.0` exactly when `kind` is `Outside`.
    pub area: f64,
    /// Extent of the overlap region, `None` when `Outside`.
    pub bounds: Option<BBox>,
}

impl IntersectionResult {
    fn outside() -> Self {
        Self {
            kind: PolygonIntersection::Outside,
            area: 0.0,
            bounds: None,
        }
    }

    pub fn is_outside(&self) -> bool {
        self.kind == PolygonIntersection::Outside
    }

    /// Area of the overlap's bounding extent, an upper bound of `area`.
    pub fn bounds_area(&self) -> f64 {
        self.bounds.map_or(0.0, |b| b.area())
    }
}

/// Classifies the overlap of two rings.
///
/// `tolerance` is an area epsilon: overlaps no larger than it count as
/// `Outside`, and an overlap within it of a ring's own area counts as
/// containment.
pub fn polygon_intersection(a: &[Coord], b: &[Coord], tolerance: f64) -> IntersectionResult {
    let ra = ring(a);
    let rb = ring(b);
    if ra.len() < 3 || rb.len() < 3 {
        return IntersectionResult::outside();
    }
    let (Some(box_a), Some(box_b)) = (BBox::from_coords(ra), BBox::from_coords(rb)) else {
        return IntersectionResult::outside();
    };
    if !box_a.intersects(&box_b) {
        return IntersectionResult::outside();
    }

    let (area, bounds) = overlap(ra, rb);
    if area <= tolerance {
        return IntersectionResult::outside();
    }

    let kind = if (area - polygon_area(ra)).abs() <= tolerance {
        PolygonIntersection::FirstInsideSecond
    } else if (area - polygon_area(rb)).abs() <= tolerance {
        PolygonIntersection::SecondInsideFirst
    } else {
        PolygonIntersection::Crossing
    };

    IntersectionResult {
        kind,
        area,
        bounds: bounds.or_else(|| Some(clip_box(&box_a, &box_b))),
    }
}

/// Overlap area of two rings; `0.0` iff they are classified `Outside`.
pub fn intersection_area(a: &[Coord], b: &[Coord], tolerance: f64) -> f64 {
    polygon_intersection(a, b, tolerance).area
}

fn clip_box(a: &BBox, b: &BBox) -> BBox {
    BBox::new(
        a.min_x.max(b.min_x),
        a.min_y.max(b.min_y),
        a.max_x.min(b.max_x),
        a.max_y.min(b.max_y),
    )
}

/// Builds a closed counter-clockwise polyline relative to `origin`.
fn to_pline(coords: &[Coord], origin: Coord) -> Polyline<f64> {
    let mut pline = Polyline::new();
    let mut points: Vec<Coord> = coords.to_vec();
    if signed_area(&points) < 0.0 {
        points.reverse();
    }
    for c in points {
        pline.add_vertex(PlineVertex::new(c.x - origin.x, c.y - origin.y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Area and extent of the overlap of two rings, computed with a boolean AND.
fn overlap(ra: &[Coord], rb: &[Coord]) -> (f64, Option<BBox>) {
    // Work near the origin; projected coordinates lose precision otherwise.
    let origin = ra[0];
    let pa = to_pline(ra, origin);
    let pb = to_pline(rb, origin);
    let result = pa.boolean(&pb, BooleanOp::And);

    let filled: f64 = result.pos_plines.iter().map(|r| r.pline.area().abs()).sum();
    let holes: f64 = result.neg_plines.iter().map(|r| r.pline.area().abs()).sum();

    let mut bounds: Option<BBox> = None;
    for r in &result.pos_plines {
        if let Some(e) = r.pline.extents() {
            let b = BBox::new(
                e.min_x + origin.x,
                e.min_y + origin.y,
                e.max_x + origin.x,
                e.max_y + origin.y,
            );
            bounds = Some(bounds.map_or(b, |acc| acc.union(&b)));
        }
    }
    ((filled - holes).max(0.0), bounds)
}
