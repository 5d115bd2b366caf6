//! Query facade.
//!
//! Query strings are compiled by an injected [`QueryCompiler`] into an
//! opaque [`Predicate`]; this module only runs predicates against a working
//! set. [`TermQueryCompiler`] is a small compiler for the usual
//! `type:way closed building=*` style of query.

mod terms;

pub use terms::TermQueryCompiler;

use crate::graph::Graph;
use mapmerge_core::{EntityRef, QueryResult};
use std::collections::BTreeSet;

/// A compiled query.
pub trait Predicate {
    fn matches(&self, graph: &Graph, entity: EntityRef) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Graph, EntityRef) -> bool,
{
    fn matches(&self, graph: &Graph, entity: EntityRef) -> bool {
        self(graph, entity)
    }
}

/// Turns query text into a predicate.
pub trait QueryCompiler {
    fn compile(&self, query: &str) -> QueryResult<Box<dyn Predicate>>;
}

/// Entities a predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingSet {
    /// Every entity in the graph
    All,
    /// The current selection only
    Selection,
}

/// Entities of `set` that satisfy `predicate`.
pub fn evaluate(graph: &Graph, predicate: &dyn Predicate, set: WorkingSet) -> BTreeSet<EntityRef> {
    match set {
        WorkingSet::All => graph
            .entities()
            .filter(|e| predicate.matches(graph, *e))
            .collect(),
        WorkingSet::Selection => graph
            .selection()
            .iter()
            .copied()
            .filter(|e| predicate.matches(graph, *e))
            .collect(),
    }
}

/// Compiles `query` and evaluates it over the whole graph.
pub fn search(
    graph: &Graph,
    compiler: &dyn QueryCompiler,
    query: &str,
) -> QueryResult<BTreeSet<EntityRef>> {
    let predicate = compiler.compile(query)?;
    Ok(evaluate(graph, predicate.as_ref(), WorkingSet::All))
}

/// Compiles `query` and evaluates it over the selection.
pub fn search_selected(
    graph: &Graph,
    compiler: &dyn QueryCompiler,
    query: &str,
) -> QueryResult<BTreeSet<EntityRef>> {
    let predicate = compiler.compile(query)?;
    Ok(evaluate(graph, predicate.as_ref(), WorkingSet::Selection))
}
