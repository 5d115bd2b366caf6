//! # MapMerge Core
//!
//! Core types and the geometry kernel for MapMerge.
//! Provides entity identifiers, coordinates, tag maps, the planar geometry
//! primitives used by spatial association, and the error taxonomy shared by
//! every crate of the workspace.

pub mod error;
pub mod geometry;
pub mod types;

pub use error::{
    Error, GraphError, GraphResult, OperationError, QueryError, QueryResult, Result,
};
pub use geometry::{BBox, IntersectionResult, PolygonIntersection};
pub use types::{Coord, EntityId, EntityKind, EntityRef, LayerId, TagMap};
