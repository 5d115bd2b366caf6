//! Geometry kernel.
//!
//! Pure functions over coordinate sequences. A closed sequence repeats its
//! first coordinate at the end, the same way a closed polyline repeats its
//! first vertex; every function here accepts both closed and open input.

pub mod bbox;
pub mod measure;
pub mod polygon;

pub use bbox::{bounding_boxes_intersect, BBox};
pub use measure::{
    centroid, distance_point_to_polyline, distance_point_to_segment, point_in_polygon,
    polygon_area, ring, signed_area,
};
pub use polygon::{
    intersection_area, polygon_intersection, IntersectionResult, PolygonIntersection,
    DEFAULT_TOLERANCE,
};
