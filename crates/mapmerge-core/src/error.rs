//! Error handling for MapMerge
//!
//! Provides error types for every layer of the edit engine:
//! - Graph errors (topology and membership invariants)
//! - Query errors (malformed predicate strings)
//! - Operation errors (input the conflation scripts refuse to handle)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::types::{EntityRef, LayerId};
use thiserror::Error;

/// Graph error type
///
/// Raised by the feature graph when a mutation would break one of its
/// invariants. Commands surface these unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The referenced entity is not part of the graph
    #[error("Entity not found: {entity}")]
    EntityNotFound {
        /// The missing entity.
        entity: EntityRef,
    },

    /// An entity with the same identifier already exists
    #[error("Entity already present: {entity}")]
    DuplicateEntity {
        /// The conflicting entity.
        entity: EntityRef,
    },

    /// A polyline references a vertex the graph does not hold
    #[error("Polyline {polyline} references missing vertex {vertex}")]
    MissingVertex {
        /// The polyline being inserted.
        polyline: EntityRef,
        /// The vertex it refers to.
        vertex: EntityRef,
    },

    /// A group references a member the graph does not hold
    #[error("Group {group} references missing member {member}")]
    MissingMember {
        /// The group being inserted.
        group: EntityRef,
        /// The member it refers to.
        member: EntityRef,
    },

    /// A polyline must reference at least one vertex
    #[error("Polyline {polyline} has no vertices")]
    EmptyPolyline {
        /// The offending polyline.
        polyline: EntityRef,
    },

    /// The entity is still referenced and cannot be removed
    #[error("Cannot remove {entity}: still referenced by {referrer}")]
    EntityInUse {
        /// The entity that was to be removed.
        entity: EntityRef,
        /// One of the entities still referring to it.
        referrer: EntityRef,
    },

    /// The workspace has no layer with this identifier
    #[error("Layer not found: {layer}")]
    LayerNotFound {
        /// The missing layer.
        layer: LayerId,
    },
}

/// Query error type
///
/// Raised when a query string cannot be compiled into a predicate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed query string
    #[error("Query syntax error in '{query}' at {position}: {reason}")]
    Syntax {
        /// The full query text.
        query: String,
        /// Byte offset of the offending term.
        position: usize,
        /// What was wrong.
        reason: String,
    },
}

impl QueryError {
    pub fn syntax(query: &str, position: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            query: query.to_string(),
            position,
            reason: reason.into(),
        }
    }
}

/// Operation error type
///
/// Raised while building the commands of a user-facing operation, before
/// anything is applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    /// A group was given where only points and polylines are accepted
    #[error("Unsupported entity {entity}: groups cannot be transferred or merged")]
    UnsupportedEntity {
        /// The rejected entity.
        entity: EntityRef,
    },

    /// No layer matches the requested name or origin
    #[error("No layer matches '{query}'")]
    LayerUnavailable {
        /// The name or origin prefix that was looked up.
        query: String,
    },

    /// An entity cannot absorb itself
    #[error("Cannot merge {entity} into itself")]
    SelfMerge {
        /// The entity given as both source and destination.
        entity: EntityRef,
    },

    /// Source and destination of a transfer are the same layer
    #[error("Source and destination layer are identical: {layer}")]
    SameLayer {
        /// The layer given twice.
        layer: LayerId,
    },
}

/// Main error type for MapMerge
#[derive(Error, Debug)]
pub enum Error {
    /// Graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Query error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Operation error
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl Error {
    /// Check if this is a query syntax error
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::Query(_))
    }

    /// Check if this error rejects a group entity
    pub fn is_unsupported_entity(&self) -> bool {
        matches!(
            self,
            Error::Operation(OperationError::UnsupportedEntity { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for graph mutations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Result type alias for query compilation.
pub type QueryResult<T> = std::result::Result<T, QueryError>;
