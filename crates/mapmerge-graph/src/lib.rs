//! # MapMerge Graph
//!
//! The mutable feature graph and the transactional edit engine built on it.
//!
//! ## Core Components
//!
//! - **Graph**: vertices, polylines and groups in id-keyed arenas, with
//!   shared-vertex topology and the current selection
//! - **Workspace**: named layers, each owning one graph, plus the active layer
//! - **Commands**: reversible add, delete, change-tags and select steps,
//!   combined into composite commands that apply as one unit
//! - **History**: linear undo/redo over composite commands
//! - **Query**: predicate evaluation over the graph or the selection, and a
//!   term-based query compiler
//!
//! ## Architecture
//!
//! ```text
//! Workspace
//!   └── Layer (LayerId, name)
//!         └── Graph (vertices, polylines, groups, selection)
//!
//! CompositeCommand ──apply/undo──> Workspace
//!   └── History (undo/redo stacks)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mapmerge_graph::{ChangeTags, CompositeCommand, Graph, History, Workspace};
//!
//! let mut ws = Workspace::new();
//! let layer = ws.add_layer("import", Graph::new());
//! let mut history = History::new();
//! history.push(CompositeCommand::new("Retag", vec![/* ... */]), &mut ws)?;
//! history.undo(&mut ws)?;
//! ```

pub mod commands;
pub mod entity;
pub mod graph;
pub mod history;
pub mod query;
pub mod workspace;

pub use commands::{
    AddEntities, ChangeTags, CompositeCommand, DeleteEntities, GraphCommand, SelectEntities,
};
pub use entity::{tags, EntitySnapshot, Group, Polyline, Vertex};
pub use graph::Graph;
pub use history::{History, HistoryEntry};
pub use query::{
    evaluate, search, search_selected, Predicate, QueryCompiler, TermQueryCompiler, WorkingSet,
};
pub use workspace::{Layer, Workspace};
