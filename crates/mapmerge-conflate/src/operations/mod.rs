//! Command builders behind the conflation scripts.
//!
//! Builders only read the graph. Each returns a command (or `None` when there
//! is nothing to do) that the caller applies through the history, so every
//! validation failure surfaces before the graph is touched.

mod convert;
mod delete;
mod merge;
mod transfer;

pub use convert::build_convert;
pub use delete::build_delete;
pub use merge::build_merge;
pub use transfer::build_transfer;

use mapmerge_core::{EntityRef, LayerId, OperationError, Result};
use mapmerge_graph::{GraphCommand, SelectEntities};
use std::collections::BTreeSet;

/// Replaces the selection of `layer`.
pub fn build_select<I>(layer: LayerId, entities: I) -> GraphCommand
where
    I: IntoIterator<Item = EntityRef>,
{
    SelectEntities::new(layer, entities.into_iter().collect()).into()
}

fn reject_groups(entities: &BTreeSet<EntityRef>) -> Result<()> {
    match entities.iter().find(|e| matches!(e, EntityRef::Group(_))) {
        Some(group) => Err(OperationError::UnsupportedEntity { entity: *group }.into()),
        None => Ok(()),
    }
}
