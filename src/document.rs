//! JSON workspace documents.
//!
//! A document lists layers, each with its nodes, ways, relations and
//! selection. Identifiers in a file only link entities of the same layer:
//! loading allocates fresh identifiers, saving writes the current ones.
//!
//! ```json
//! {
//!   "layers": [{
//!     "name": "import",
//!     "origin": "microsoft/BuildingFootprints",
//!     "active": true,
//!     "nodes": [{ "id": -1, "x": 0.0, "y": 0.0, "tags": {} }],
//!     "ways": [{ "id": -10, "nodes": [-1, -2, -3, -1], "tags": { "building": "yes" } }],
//!     "relations": [],
//!     "selected": [{ "type": "way", "ref": -10 }]
//!   }]
//! }
//! ```

use mapmerge_core::{Coord, EntityId, EntityRef, GraphError, TagMap};
use mapmerge_graph::{Graph, Workspace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or writing workspace documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A way, relation or selection names an id the layer does not define
    #[error("Layer '{layer}': unknown {kind} {id}")]
    UnknownReference {
        layer: String,
        kind: MemberType,
        id: i64,
    },

    /// Two entities of one kind share an id
    #[error("Layer '{layer}': duplicate {kind} {id}")]
    DuplicateId {
        layer: String,
        kind: MemberType,
        id: i64,
    },

    #[error("Layer '{layer}': {source}")]
    Graph {
        layer: String,
        #[source]
        source: GraphError,
    },
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for MemberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDocument {
    #[serde(rename = "type")]
    pub kind: MemberType,
    #[serde(rename = "ref")]
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub tags: TagMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WayDocument {
    pub id: i64,
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: TagMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDocument {
    pub id: i64,
    pub members: Vec<MemberDocument>,
    #[serde(default)]
    pub tags: TagMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub ways: Vec<WayDocument>,
    #[serde(default)]
    pub relations: Vec<RelationDocument>,
    #[serde(default)]
    pub selected: Vec<MemberDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub layers: Vec<LayerDocument>,
}

/// File id to graph entity, per layer.
#[derive(Default)]
struct IdMap {
    ids: HashMap<(MemberType, i64), EntityRef>,
}

impl IdMap {
    fn bind(&mut self, layer: &str, kind: MemberType, id: i64, entity: EntityRef) -> DocumentResult<()> {
        if self.ids.insert((kind, id), entity).is_some() {
            return Err(DocumentError::DuplicateId {
                layer: layer.to_string(),
                kind,
                id,
            });
        }
        Ok(())
    }

    fn get(&self, kind: MemberType, id: i64) -> Option<EntityRef> {
        self.ids.get(&(kind, id)).copied()
    }

    fn resolve(&self, layer: &str, kind: MemberType, id: i64) -> DocumentResult<EntityRef> {
        self.get(kind, id).ok_or_else(|| DocumentError::UnknownReference {
            layer: layer.to_string(),
            kind,
            id,
        })
    }
}

impl WorkspaceDocument {
    /// Builds a workspace. The layer flagged `active` (or the first one)
    /// becomes the active layer.
    pub fn into_workspace(self) -> DocumentResult<Workspace> {
        let mut ws = Workspace::new();
        let mut active = None;
        for layer in self.layers {
            let name = layer.name.clone();
            let is_active = layer.active;
            let graph = layer.into_graph()?;
            debug!(layer = %name, entities = graph.len(), "layer loaded");
            let id = ws.add_layer(name, graph);
            if is_active && active.is_none() {
                active = Some(id);
            }
        }
        if let Some(id) = active {
            ws.set_active_layer(id).map_err(|source| DocumentError::Graph {
                layer: id.to_string(),
                source,
            })?;
        }
        Ok(ws)
    }

    pub fn from_workspace(ws: &Workspace) -> Self {
        let active = ws.active_layer();
        let layers = ws
            .layers()
            .map(|layer| {
                let graph = layer.graph();
                LayerDocument {
                    name: layer.name().to_string(),
                    origin: graph.origin().map(str::to_string),
                    active: Some(layer.id()) == active,
                    nodes: graph
                        .vertices()
                        .map(|v| NodeDocument {
                            id: file_id(v.id),
                            x: v.coord.x,
                            y: v.coord.y,
                            tags: v.tags.clone(),
                        })
                        .collect(),
                    ways: graph
                        .polylines()
                        .map(|p| WayDocument {
                            id: file_id(p.id),
                            nodes: p.vertices.iter().map(|v| file_id(*v)).collect(),
                            tags: p.tags.clone(),
                        })
                        .collect(),
                    relations: graph
                        .groups()
                        .map(|g| RelationDocument {
                            id: file_id(g.id),
                            members: g.members.iter().map(|m| member(*m)).collect(),
                            tags: g.tags.clone(),
                        })
                        .collect(),
                    selected: graph.selection().iter().map(|e| member(*e)).collect(),
                }
            })
            .collect();
        Self { layers }
    }
}

impl LayerDocument {
    fn into_graph(self) -> DocumentResult<Graph> {
        let name = self.name;
        let graph_err = |source: GraphError| DocumentError::Graph {
            layer: name.clone(),
            source,
        };
        let mut graph = match self.origin {
            Some(origin) => Graph::with_origin(origin),
            None => Graph::new(),
        };
        let mut ids = IdMap::default();

        for node in self.nodes {
            let entity = graph.add_vertex(Coord::new(node.x, node.y), node.tags);
            ids.bind(&name, MemberType::Node, node.id, entity)?;
        }

        for way in self.ways {
            let vertices = way
                .nodes
                .iter()
                .map(|id| ids.resolve(&name, MemberType::Node, *id).map(EntityRef::id))
                .collect::<DocumentResult<Vec<EntityId>>>()?;
            let entity = graph.add_polyline(vertices, way.tags).map_err(graph_err)?;
            ids.bind(&name, MemberType::Way, way.id, entity)?;
        }

        // Relations may refer to relations listed after them
        let mut pending = self.relations;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for relation in pending {
                let members: Option<Vec<EntityRef>> =
                    relation.members.iter().map(|m| ids.get(m.kind, m.id)).collect();
                match members {
                    Some(members) => {
                        let entity = graph.add_group(members, relation.tags).map_err(graph_err)?;
                        ids.bind(&name, MemberType::Relation, relation.id, entity)?;
                    }
                    None => deferred.push(relation),
                }
            }
            if deferred.len() == before {
                let (kind, id) = deferred
                    .iter()
                    .flat_map(|r| r.members.iter())
                    .find(|m| ids.get(m.kind, m.id).is_none())
                    .map_or((MemberType::Relation, deferred[0].id), |m| (m.kind, m.id));
                return Err(DocumentError::UnknownReference {
                    layer: name.clone(),
                    kind,
                    id,
                });
            }
            pending = deferred;
        }

        let selection = self
            .selected
            .iter()
            .map(|m| ids.resolve(&name, m.kind, m.id))
            .collect::<DocumentResult<Vec<EntityRef>>>()?;
        graph.set_selection(selection).map_err(graph_err)?;
        Ok(graph)
    }
}

fn file_id(id: EntityId) -> i64 {
    i64::try_from(id.get()).unwrap_or(i64::MAX)
}

fn member(entity: EntityRef) -> MemberDocument {
    let kind = match entity {
        EntityRef::Vertex(_) => MemberType::Node,
        EntityRef::Polyline(_) => MemberType::Way,
        EntityRef::Group(_) => MemberType::Relation,
    };
    MemberDocument {
        kind,
        id: file_id(entity.id()),
    }
}

/// Reads a workspace from a JSON document.
pub fn load_workspace(path: &Path) -> DocumentResult<Workspace> {
    let content = std::fs::read_to_string(path)?;
    let document: WorkspaceDocument = serde_json::from_str(&content)?;
    document.into_workspace()
}

/// Serializes a workspace as pretty JSON.
pub fn workspace_to_json(ws: &Workspace) -> DocumentResult<String> {
    Ok(serde_json::to_string_pretty(&WorkspaceDocument::from_workspace(ws))?)
}

pub fn save_workspace(ws: &Workspace, path: &Path) -> DocumentResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, workspace_to_json(ws)?)?;
    Ok(())
}
