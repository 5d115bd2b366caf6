//! Reversible graph mutations.
//!
//! Each command knows how to apply itself to a [`Workspace`] and how to take
//! itself back. Commands capture whatever they destroy while applying
//! (removed entities, replaced tags, the previous selection), so undo needs
//! nothing but the command itself.

use crate::entity::EntitySnapshot;
use crate::workspace::Workspace;
use mapmerge_core::{EntityKind, EntityRef, GraphResult, LayerId, TagMap};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum GraphCommand {
    AddEntities(AddEntities),
    DeleteEntities(DeleteEntities),
    ChangeTags(ChangeTags),
    SelectEntities(SelectEntities),
    CompositeCommand(CompositeCommand),
}

/// Ordered batch applied and undone as one unit.
#[derive(Debug, Clone)]
pub struct CompositeCommand {
    pub name: String,
    pub commands: Vec<GraphCommand>,
}

/// Inserts snapshots in order. Vertices must precede the polylines that
/// reference them.
#[derive(Debug, Clone)]
pub struct AddEntities {
    pub layer: LayerId,
    pub snapshots: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone)]
pub struct DeleteEntities {
    pub layer: LayerId,
    pub entities: Vec<EntityRef>,
    removed: Vec<EntitySnapshot>,  // filled while applied
    deselected: Vec<EntityRef>,    // selected members at apply time
}

#[derive(Debug, Clone)]
pub struct ChangeTags {
    pub layer: LayerId,
    pub entity: EntityRef,
    pub tags: TagMap,
    previous: Option<TagMap>,
}

#[derive(Debug, Clone)]
pub struct SelectEntities {
    pub layer: LayerId,
    pub selection: Vec<EntityRef>,
    previous: Option<BTreeSet<EntityRef>>,
}

impl CompositeCommand {
    pub fn new(name: impl Into<String>, commands: Vec<GraphCommand>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Applies every constituent in order. If one fails, the ones already
    /// applied are undone before the error is returned.
    pub fn apply(&mut self, ws: &mut Workspace) -> GraphResult<()> {
        for i in 0..self.commands.len() {
            if let Err(err) = self.commands[i].apply(ws) {
                warn!(command = %self.name, step = i, error = %err, "rolling back partially applied command");
                for done in self.commands[..i].iter_mut().rev() {
                    if let Err(undo_err) = done.undo(ws) {
                        warn!(error = %undo_err, "rollback step failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Undoes every constituent in reverse order, re-applying on failure.
    pub fn undo(&mut self, ws: &mut Workspace) -> GraphResult<()> {
        for i in (0..self.commands.len()).rev() {
            if let Err(err) = self.commands[i].undo(ws) {
                warn!(command = %self.name, step = i, error = %err, "undo failed, restoring");
                for done in self.commands[i + 1..].iter_mut() {
                    if let Err(redo_err) = done.apply(ws) {
                        warn!(error = %redo_err, "restore step failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl AddEntities {
    pub fn new(layer: LayerId, snapshots: Vec<EntitySnapshot>) -> Self {
        Self { layer, snapshots }
    }
}

impl DeleteEntities {
    /// Groups go first, then polylines, then vertices, so nothing is removed
    /// while something else in the batch still refers to it.
    pub fn new(layer: LayerId, mut entities: Vec<EntityRef>) -> Self {
        entities.sort_by_key(|e| match e.kind() {
            EntityKind::Group => 0,
            EntityKind::Polyline => 1,
            EntityKind::Vertex => 2,
        });
        Self {
            layer,
            entities,
            removed: Vec::new(),
            deselected: Vec::new(),
        }
    }
}

impl ChangeTags {
    pub fn new(layer: LayerId, entity: EntityRef, tags: TagMap) -> Self {
        Self {
            layer,
            entity,
            tags,
            previous: None,
        }
    }
}

impl SelectEntities {
    pub fn new(layer: LayerId, selection: Vec<EntityRef>) -> Self {
        Self {
            layer,
            selection,
            previous: None,
        }
    }
}

impl GraphCommand {
    pub fn name(&self) -> &str {
        match self {
            GraphCommand::AddEntities(_) => "Add",
            GraphCommand::DeleteEntities(_) => "Delete",
            GraphCommand::ChangeTags(_) => "Change tags",
            GraphCommand::SelectEntities(_) => "Select",
            GraphCommand::CompositeCommand(cmd) => &cmd.name,
        }
    }

    pub fn apply(&mut self, ws: &mut Workspace) -> GraphResult<()> {
        match self {
            GraphCommand::AddEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                for (i, snapshot) in cmd.snapshots.iter().enumerate() {
                    if let Err(err) = graph.insert(snapshot.clone()) {
                        for added in cmd.snapshots[..i].iter().rev() {
                            let _ = graph.remove(added.entity_ref());
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
            GraphCommand::DeleteEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                cmd.deselected = cmd
                    .entities
                    .iter()
                    .copied()
                    .filter(|e| graph.is_selected(*e))
                    .collect();
                cmd.removed.clear();
                for entity in &cmd.entities {
                    match graph.remove(*entity) {
                        Ok(snapshot) => cmd.removed.push(snapshot),
                        Err(err) => {
                            for snapshot in cmd.removed.drain(..).rev() {
                                let _ = graph.insert(snapshot);
                            }
                            restore_selection(graph, &cmd.deselected);
                            return Err(err);
                        }
                    }
                }
                Ok(())
            }
            GraphCommand::ChangeTags(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                cmd.previous = Some(graph.replace_tags(cmd.entity, cmd.tags.clone())?);
                Ok(())
            }
            GraphCommand::SelectEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                cmd.previous = Some(graph.set_selection(cmd.selection.iter().copied())?);
                Ok(())
            }
            GraphCommand::CompositeCommand(cmd) => cmd.apply(ws),
        }
    }

    pub fn undo(&mut self, ws: &mut Workspace) -> GraphResult<()> {
        match self {
            GraphCommand::AddEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                for (i, snapshot) in cmd.snapshots.iter().enumerate().rev() {
                    if let Err(err) = graph.remove(snapshot.entity_ref()) {
                        for removed in &cmd.snapshots[i + 1..] {
                            let _ = graph.insert(removed.clone());
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
            GraphCommand::DeleteEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                while let Some(snapshot) = cmd.removed.pop() {
                    if let Err(err) = graph.insert(snapshot.clone()) {
                        cmd.removed.push(snapshot);
                        return Err(err);
                    }
                }
                restore_selection(graph, &cmd.deselected);
                Ok(())
            }
            GraphCommand::ChangeTags(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                if let Some(previous) = cmd.previous.take() {
                    if let Err(err) = graph.replace_tags(cmd.entity, previous.clone()) {
                        cmd.previous = Some(previous);
                        return Err(err);
                    }
                }
                Ok(())
            }
            GraphCommand::SelectEntities(cmd) => {
                let graph = ws.graph_mut(cmd.layer)?;
                if let Some(previous) = cmd.previous.take() {
                    if let Err(err) = graph.set_selection(previous.iter().copied()) {
                        cmd.previous = Some(previous);
                        return Err(err);
                    }
                }
                Ok(())
            }
            GraphCommand::CompositeCommand(cmd) => cmd.undo(ws),
        }
    }
}

fn restore_selection(graph: &mut crate::graph::Graph, entities: &[EntityRef]) {
    if entities.is_empty() {
        return;
    }
    let mut selection = graph.selection().clone();
    selection.extend(entities.iter().copied().filter(|e| graph.contains(*e)));
    // Every member was just checked for presence.
    let _ = graph.set_selection(selection);
}

impl From<AddEntities> for GraphCommand {
    fn from(cmd: AddEntities) -> Self {
        GraphCommand::AddEntities(cmd)
    }
}

impl From<DeleteEntities> for GraphCommand {
    fn from(cmd: DeleteEntities) -> Self {
        GraphCommand::DeleteEntities(cmd)
    }
}

impl From<ChangeTags> for GraphCommand {
    fn from(cmd: ChangeTags) -> Self {
        GraphCommand::ChangeTags(cmd)
    }
}

impl From<SelectEntities> for GraphCommand {
    fn from(cmd: SelectEntities) -> Self {
        GraphCommand::SelectEntities(cmd)
    }
}

impl From<CompositeCommand> for GraphCommand {
    fn from(cmd: CompositeCommand) -> Self {
        GraphCommand::CompositeCommand(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{tags, Vertex};
    use crate::graph::Graph;
    use mapmerge_core::{Coord, GraphError};

    fn setup() -> (Workspace, LayerId, EntityRef, EntityRef) {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Coord::new(0.0, 0.0), TagMap::new());
        let b = graph.add_vertex(Coord::new(1.0, 0.0), TagMap::new());
        let line = graph
            .add_polyline(vec![a.id(), b.id()], tags([("highway", "service")]))
            .unwrap();
        let mut ws = Workspace::new();
        let layer = ws.add_layer("data", graph);
        (ws, layer, a, line)
    }

    #[test]
    fn test_delete_orders_polylines_before_vertices() {
        let (mut ws, layer, a, line) = setup();
        let mut cmd = GraphCommand::from(DeleteEntities::new(layer, vec![a, line]));
        cmd.apply(&mut ws).unwrap();
        let graph = ws.graph(layer).unwrap();
        assert!(!graph.contains(a));
        assert!(!graph.contains(line));

        cmd.undo(&mut ws).unwrap();
        let graph = ws.graph(layer).unwrap();
        assert!(graph.contains(a));
        assert!(graph.contains(line));
    }

    #[test]
    fn test_delete_restores_selection_on_undo() {
        let (mut ws, layer, _, line) = setup();
        ws.graph_mut(layer).unwrap().set_selection([line]).unwrap();
        let mut cmd = GraphCommand::from(DeleteEntities::new(layer, vec![line]));
        cmd.apply(&mut ws).unwrap();
        assert!(ws.graph(layer).unwrap().selection().is_empty());
        cmd.undo(&mut ws).unwrap();
        assert!(ws.graph(layer).unwrap().is_selected(line));
    }

    #[test]
    fn test_failed_delete_leaves_graph_untouched() {
        let (mut ws, layer, a, line) = setup();
        // Deleting only the vertex is refused because the line still uses it
        let mut cmd = GraphCommand::from(DeleteEntities::new(layer, vec![a]));
        let err = cmd.apply(&mut ws).unwrap_err();
        assert_eq!(err, GraphError::EntityInUse { entity: a, referrer: line });
        assert!(ws.graph(layer).unwrap().contains(a));
    }

    #[test]
    fn test_change_tags_round_trip() {
        let (mut ws, layer, _, line) = setup();
        let mut cmd = GraphCommand::from(ChangeTags::new(layer, line, tags([("highway", "residential")])));
        cmd.apply(&mut ws).unwrap();
        assert_eq!(
            ws.graph(layer).unwrap().tags(line).unwrap().get("highway").unwrap(),
            "residential"
        );
        cmd.undo(&mut ws).unwrap();
        assert_eq!(
            ws.graph(layer).unwrap().tags(line).unwrap().get("highway").unwrap(),
            "service"
        );
    }

    #[test]
    fn test_composite_rolls_back_on_failure() {
        let (mut ws, layer, a, line) = setup();
        let fresh = Vertex::new(Coord::new(5.0, 5.0), TagMap::new());
        let fresh_ref = EntityRef::Vertex(fresh.id);
        let mut cmd = CompositeCommand::new(
            "broken",
            vec![
                AddEntities::new(layer, vec![fresh.into()]).into(),
                ChangeTags::new(layer, line, TagMap::new()).into(),
                // Fails: vertex `a` is still part of the line
                DeleteEntities::new(layer, vec![a]).into(),
            ],
        );
        assert!(cmd.apply(&mut ws).is_err());
        let graph = ws.graph(layer).unwrap();
        assert!(!graph.contains(fresh_ref));
        assert_eq!(graph.tags(line).unwrap().get("highway").unwrap(), "service");
    }

    #[test]
    fn test_select_round_trip() {
        let (mut ws, layer, a, line) = setup();
        ws.graph_mut(layer).unwrap().set_selection([a]).unwrap();
        let mut cmd = GraphCommand::from(SelectEntities::new(layer, vec![line]));
        cmd.apply(&mut ws).unwrap();
        assert!(ws.graph(layer).unwrap().is_selected(line));
        assert!(!ws.graph(layer).unwrap().is_selected(a));
        cmd.undo(&mut ws).unwrap();
        assert!(ws.graph(layer).unwrap().is_selected(a));
    }
}
