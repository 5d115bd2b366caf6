//! Named layers, each owning one feature graph, plus the active layer.

use crate::graph::Graph;
use mapmerge_core::{GraphError, GraphResult, LayerId};

#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    name: String,
    graph: Graph,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// The set of open layers.
///
/// Commands address graphs through a `LayerId`, which lets a single
/// composite command move entities from one layer to another.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    layers: Vec<Layer>,
    active: Option<LayerId>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer. The first layer added becomes the active one.
    pub fn add_layer(&mut self, name: impl Into<String>, graph: Graph) -> LayerId {
        let id = LayerId::new();
        self.layers.push(Layer {
            id,
            name: name.into(),
            graph,
        });
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn layer(&self, id: LayerId) -> GraphResult<&Layer> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .ok_or(GraphError::LayerNotFound { layer: id })
    }

    pub fn graph(&self, id: LayerId) -> GraphResult<&Graph> {
        self.layer(id).map(|l| &l.graph)
    }

    pub fn graph_mut(&mut self, id: LayerId) -> GraphResult<&mut Graph> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .map(|l| &mut l.graph)
            .ok_or(GraphError::LayerNotFound { layer: id })
    }

    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().find(|l| l.name == name).map(|l| l.id)
    }

    /// First layer whose graph origin starts with `prefix`.
    pub fn find_by_origin_prefix(&self, prefix: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .find(|l| l.graph.origin().is_some_and(|o| o.starts_with(prefix)))
            .map(|l| l.id)
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        self.active
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> GraphResult<()> {
        self.layer(id)?;
        self.active = Some(id);
        Ok(())
    }
}
