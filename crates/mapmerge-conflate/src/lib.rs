//! # MapMerge Conflate
//!
//! Spatial association, tag merging and the conflation scripts that bring
//! imported buildings and addresses into an upstream map layer.
//!
//! ## Scripts
//!
//! - **Transfer buildings**: move selected buildings that overlap nothing in
//!   the destination layer
//! - **Transfer addresses**: move selected address points the destination
//!   does not already have
//! - **Merge addresses**: fold each address point into the one building it
//!   belongs to
//! - **Convert buildings**: replace buildings by points at their centroid
//!
//! Every script produces a single undoable command.

pub mod association;
pub mod conflator;
pub mod operations;
pub mod tags;

pub use association::{any_intersects, associate, Association, MatchKind};
pub use conflator::{Conflator, OperationOutcome};
pub use operations::{build_convert, build_delete, build_merge, build_select, build_transfer};
pub use tags::{addresses_match, merge_tags, union_tokens};
