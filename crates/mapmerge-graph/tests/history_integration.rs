//! Integration tests for commands and history across layers

use mapmerge_core::{Coord, EntityId, EntityRef, LayerId, TagMap};
use mapmerge_graph::{
    tags, AddEntities, ChangeTags, CompositeCommand, DeleteEntities, EntitySnapshot, Graph,
    History, SelectEntities, Workspace,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

type Fingerprint = (Vec<EntitySnapshot>, BTreeSet<EntityRef>);

fn fingerprint(ws: &Workspace, layer: LayerId) -> Fingerprint {
    let graph = ws.graph(layer).unwrap();
    let entities = graph.entities().filter_map(|e| graph.snapshot(e)).collect();
    (entities, graph.selection().clone())
}

fn square(graph: &mut Graph, x0: f64, size: f64) -> (EntityRef, Vec<EntityId>) {
    let corners = [(x0, 0.0), (x0 + size, 0.0), (x0 + size, size), (x0, size)];
    let ids: Vec<EntityId> = corners
        .iter()
        .map(|(x, y)| graph.add_vertex(Coord::new(*x, *y), TagMap::new()).id())
        .collect();
    let mut refs = ids.clone();
    refs.push(ids[0]);
    let way = graph.add_polyline(refs, tags([("building", "yes")])).unwrap();
    (way, ids)
}

#[test]
fn test_move_polyline_between_layers_and_back() {
    let mut source = Graph::new();
    let (way, ids) = square(&mut source, 0.0, 10.0);
    source.set_selection([way]).unwrap();

    let mut ws = Workspace::new();
    let src = ws.add_layer("import", source);
    let dst = ws.add_layer("osm", Graph::with_origin("openstreetmap-cgimap 2.0.1"));
    let before_src = fingerprint(&ws, src);
    let before_dst = fingerprint(&ws, dst);

    let graph = ws.graph(src).unwrap();
    let vertex_snapshots: Vec<EntitySnapshot> = ids
        .iter()
        .filter_map(|id| graph.snapshot(EntityRef::Vertex(*id)))
        .collect();
    let way_snapshot = graph.snapshot(way).unwrap();

    let mut vertices: Vec<EntityRef> = ids.iter().map(|id| EntityRef::Vertex(*id)).collect();
    vertices.push(way);
    let command = CompositeCommand::new(
        "Transfer",
        vec![
            DeleteEntities::new(src, vertices).into(),
            AddEntities::new(dst, vertex_snapshots).into(),
            AddEntities::new(dst, vec![way_snapshot]).into(),
        ],
    );

    let mut history = History::new();
    assert!(history.push(command, &mut ws).unwrap());
    assert!(ws.graph(src).unwrap().is_empty());
    let dest = ws.graph(dst).unwrap();
    assert_eq!(dest.len(), 5);
    assert!(dest.contains(way));
    assert!(dest.is_closed(way.id()));

    assert_eq!(history.undo(&mut ws).unwrap().as_deref(), Some("Transfer"));
    assert_eq!(fingerprint(&ws, src), before_src);
    assert_eq!(fingerprint(&ws, dst), before_dst);

    history.redo(&mut ws).unwrap();
    assert!(ws.graph(src).unwrap().is_empty());
    assert_eq!(ws.graph(dst).unwrap().len(), 5);
}

#[test]
fn test_nested_composite_undo_restores_selection() {
    let mut graph = Graph::new();
    let (way, _) = square(&mut graph, 0.0, 5.0);
    let point = graph.add_vertex(Coord::new(2.0, 2.0), tags([("addr:housenumber", "7")]));
    graph.set_selection([point]).unwrap();
    let mut ws = Workspace::new();
    let layer = ws.add_layer("data", graph);
    let before = fingerprint(&ws, layer);

    let inner = CompositeCommand::new(
        "Merge",
        vec![
            ChangeTags::new(
                layer,
                way,
                tags([("building", "yes"), ("addr:housenumber", "7")]),
            )
            .into(),
            DeleteEntities::new(layer, vec![point]).into(),
        ],
    );
    let command = CompositeCommand::new(
        "Merge and select",
        vec![inner.into(), SelectEntities::new(layer, vec![way]).into()],
    );

    let mut history = History::new();
    history.push(command, &mut ws).unwrap();
    let graph = ws.graph(layer).unwrap();
    assert!(!graph.contains(point));
    assert_eq!(graph.selection().iter().copied().collect::<Vec<_>>(), vec![way]);

    history.undo(&mut ws).unwrap();
    assert_eq!(fingerprint(&ws, layer), before);
}

#[test]
fn test_global_history_is_shared() {
    let mut graph = Graph::new();
    let v = graph.add_vertex(Coord::new(0.0, 0.0), TagMap::new());
    let mut ws = Workspace::new();
    let layer = ws.add_layer("data", graph);

    let mut history = History::global().lock();
    let depth = history.undo_count();
    let cmd = CompositeCommand::new("Tag", vec![ChangeTags::new(layer, v, tags([("a", "b")])).into()]);
    history.push(cmd, &mut ws).unwrap();
    assert_eq!(history.undo_count(), depth + 1);
    history.undo(&mut ws).unwrap();
    assert!(ws.graph(layer).unwrap().tags(v).unwrap().is_empty());
}

fn edit_strategy() -> impl Strategy<Value = (usize, Vec<(usize, String)>, Vec<usize>)> {
    (3usize..12).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, "[a-z]{1,6}"), 0..8),
            prop::collection::vec(0..n, 0..4),
        )
    })
}

proptest! {
    #[test]
    fn prop_undo_restores_and_redo_reapplies((n, retags, deletes) in edit_strategy()) {
        let mut graph = Graph::new();
        let vertices: Vec<EntityRef> = (0..n)
            .map(|i| graph.add_vertex(Coord::new(i as f64, 0.0), tags([("name", format!("v{i}"))])))
            .collect();
        graph.set_selection(vertices.iter().copied().step_by(2)).unwrap();
        let mut ws = Workspace::new();
        let layer = ws.add_layer("data", graph);

        let deleted: BTreeSet<usize> = deletes.into_iter().collect();
        let mut commands: Vec<mapmerge_graph::GraphCommand> = retags
            .into_iter()
            .filter(|(i, _)| !deleted.contains(i))
            .map(|(i, value)| ChangeTags::new(layer, vertices[i], tags([("name", value)])).into())
            .collect();
        if !deleted.is_empty() {
            let doomed = deleted.iter().map(|i| vertices[*i]).collect();
            commands.push(DeleteEntities::new(layer, doomed).into());
        }

        let before = fingerprint(&ws, layer);
        let mut history = History::new();
        let recorded = history.push(CompositeCommand::new("Edit", commands), &mut ws).unwrap();
        let after = fingerprint(&ws, layer);

        if recorded {
            history.undo(&mut ws).unwrap();
            prop_assert_eq!(fingerprint(&ws, layer), before);
            history.redo(&mut ws).unwrap();
            prop_assert_eq!(fingerprint(&ws, layer), after);
        } else {
            prop_assert_eq!(after, before);
            prop_assert!(!history.can_undo());
        }
    }
}
