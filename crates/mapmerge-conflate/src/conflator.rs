//! User-facing conflation scripts.
//!
//! Each script reads the workspace, builds one composite command and pushes
//! it onto the history. Nothing is pushed when there is nothing to do.

use crate::association::{any_intersects, associate};
use crate::operations::{build_convert, build_merge, build_select, build_transfer};
use crate::tags::addresses_match;
use mapmerge_core::{EntityRef, LayerId, OperationError, Result};
use mapmerge_graph::{
    evaluate, CompositeCommand, GraphCommand, History, Predicate, QueryCompiler,
    TermQueryCompiler, WorkingSet, Workspace,
};
use mapmerge_settings::{Config, ConflationSettings, QuerySettings};
use std::collections::BTreeSet;
use tracing::info;

/// What a script did.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Nothing qualified; workspace and history untouched
    Noop,
    /// One command was pushed onto the history
    Applied {
        /// Name of the pushed command
        name: String,
        /// Number of features moved, merged or converted
        affected: usize,
    },
}

impl OperationOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

/// Runs the conflation scripts with an injected query compiler.
pub struct Conflator {
    compiler: Box<dyn QueryCompiler>,
    settings: ConflationSettings,
    queries: QuerySettings,
}

impl Default for Conflator {
    fn default() -> Self {
        Self::new(Box::new(TermQueryCompiler), &Config::default())
    }
}

impl Conflator {
    pub fn new(compiler: Box<dyn QueryCompiler>, config: &Config) -> Self {
        Self {
            compiler,
            settings: config.conflation.clone(),
            queries: config.queries.clone(),
        }
    }

    pub fn settings(&self) -> &ConflationSettings {
        &self.settings
    }

    pub fn queries(&self) -> &QuerySettings {
        &self.queries
    }

    /// Layer backed by the upstream data source.
    pub fn upstream_layer(&self, ws: &Workspace) -> Result<LayerId> {
        let prefix = &self.settings.upstream_origin_prefix;
        ws.find_by_origin_prefix(prefix).ok_or_else(|| {
            OperationError::LayerUnavailable {
                query: prefix.clone(),
            }
            .into()
        })
    }

    fn compile(&self, query: &str) -> Result<Box<dyn Predicate>> {
        Ok(self.compiler.compile(query)?)
    }

    /// Moves the selected buildings of `source` that overlap no building of
    /// `dest`, then makes `dest` the active layer.
    pub fn transfer_selected_nonintersecting_buildings(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        source: LayerId,
        dest: LayerId,
    ) -> Result<OperationOutcome> {
        if source == dest {
            return Err(OperationError::SameLayer { layer: source }.into());
        }
        let buildings = self.compile(&self.queries.buildings)?;
        let src = ws.graph(source)?;
        let dst = ws.graph(dest)?;

        let candidates = evaluate(src, buildings.as_ref(), WorkingSet::Selection);
        let existing = evaluate(dst, buildings.as_ref(), WorkingSet::All);
        let accepted: BTreeSet<EntityRef> = candidates
            .into_iter()
            .filter(|c| {
                !any_intersects(src, *c, dst, &existing, self.settings.intersection_tolerance)
            })
            .collect();

        self.transfer(ws, history, source, dest, &accepted)
    }

    /// Moves the selected address points of `source` that have no matching
    /// address in `dest`, then makes `dest` the active layer.
    pub fn transfer_selected_nonduplicate_addresses(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        source: LayerId,
        dest: LayerId,
    ) -> Result<OperationOutcome> {
        if source == dest {
            return Err(OperationError::SameLayer { layer: source }.into());
        }
        let points = self.compile(&self.queries.address_points)?;
        let addressed = self.compile(&self.queries.addressed_entities)?;
        let src = ws.graph(source)?;
        let dst = ws.graph(dest)?;

        let candidates = evaluate(src, points.as_ref(), WorkingSet::Selection);
        let existing = evaluate(dst, addressed.as_ref(), WorkingSet::All);
        let keys = &self.settings.address;
        let accepted: BTreeSet<EntityRef> = candidates
            .into_iter()
            .filter(|c| {
                let Some(tags) = src.tags(*c) else {
                    return false;
                };
                !existing
                    .iter()
                    .filter_map(|e| dst.tags(*e))
                    .any(|other| addresses_match(tags, other, keys))
            })
            .collect();

        self.transfer(ws, history, source, dest, &accepted)
    }

    fn transfer(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        source: LayerId,
        dest: LayerId,
        accepted: &BTreeSet<EntityRef>,
    ) -> Result<OperationOutcome> {
        let Some(command) = build_transfer(ws, source, dest, accepted)? else {
            info!("nothing to transfer");
            return Ok(OperationOutcome::Noop);
        };
        self.push(ws, history, command, accepted.len())?;
        ws.set_active_layer(dest)?;
        Ok(OperationOutcome::Applied {
            name: "Transfer".to_string(),
            affected: accepted.len(),
        })
    }

    /// Merges each selected address point into the address-less building
    /// it was associated with, when that building received no other point.
    /// The merged buildings become the selection.
    pub fn merge_selected_addresses_to_buildings(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        layer: LayerId,
    ) -> Result<OperationOutcome> {
        let points = self.compile(&self.queries.address_points)?;
        let buildings = self.compile(&self.queries.unaddressed_buildings)?;
        let graph = ws.graph(layer)?;

        let points = evaluate(graph, points.as_ref(), WorkingSet::Selection);
        let buildings = evaluate(graph, buildings.as_ref(), WorkingSet::All);
        let association = associate(graph, &points, &buildings, self.settings.merge_distance);

        let mut commands: Vec<GraphCommand> = Vec::new();
        let mut merged: Vec<EntityRef> = Vec::new();
        for (point, building) in association.eligible() {
            let merge = build_merge(graph, layer, point, building, &self.settings.mergeable_keys)?;
            commands.push(merge.into());
            merged.push(building);
        }
        if merged.is_empty() {
            info!(
                points = points.len(),
                unassociated = association.unassociated.len(),
                "no building received exactly one address"
            );
            return Ok(OperationOutcome::Noop);
        }

        let affected = merged.len();
        commands.push(build_select(layer, merged));
        let name = "Merge selected addresses to buildings";
        self.push(ws, history, CompositeCommand::new(name, commands), affected)?;
        Ok(OperationOutcome::Applied {
            name: name.to_string(),
            affected,
        })
    }

    /// Replaces each selected building by a point at its centroid.
    pub fn convert_selected_buildings_to_points(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        layer: LayerId,
    ) -> Result<OperationOutcome> {
        let buildings = self.compile(&self.queries.buildings)?;
        let graph = ws.graph(layer)?;
        let selected = evaluate(graph, buildings.as_ref(), WorkingSet::Selection);
        let Some((command, created)) =
            build_convert(graph, layer, &selected, &self.settings.kind_key)?
        else {
            info!("no selected buildings to convert");
            return Ok(OperationOutcome::Noop);
        };

        let name = command.name.clone();
        self.push(ws, history, command, created.len())?;
        Ok(OperationOutcome::Applied {
            name,
            affected: created.len(),
        })
    }

    fn push(
        &self,
        ws: &mut Workspace,
        history: &mut History,
        command: CompositeCommand,
        affected: usize,
    ) -> Result<()> {
        let name = command.name.clone();
        if history.push(command, ws)? {
            info!(command = %name, affected, "operation applied");
        }
        Ok(())
    }
}
