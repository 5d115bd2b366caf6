//! Axis-aligned bounding boxes.

use crate::types::Coord;
use serde::{Deserialize, Serialize};

/// Axis-aligned extent of a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Extent of `coords`, or `None` when the slice is empty.
    pub fn from_coords(coords: &[Coord]) -> Option<Self> {
        let first = coords.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for c in &coords[1..] {
            bbox.extend(c);
        }
        Some(bbox)
    }

    /// Grows the box so it contains `c`.
    pub fn extend(&mut self, c: &Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Inclusive overlap test: boxes sharing only an edge still intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, c: &Coord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Cheap pre-filter used before any precise polygon test.
pub fn bounding_boxes_intersect(a: &[Coord], b: &[Coord]) -> bool {
    match (BBox::from_coords(a), BBox::from_coords(b)) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}
