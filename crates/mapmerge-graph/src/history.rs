//! Linear undo/redo history of applied composite commands.

use crate::commands::CompositeCommand;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use mapmerge_core::GraphResult;
use parking_lot::Mutex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// One applied composite command.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    command: CompositeCommand,
    applied_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn name(&self) -> &str {
        &self.command.name
    }

    pub fn command(&self) -> &CompositeCommand {
        &self.command
    }

    /// When the command was first applied.
    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }
}

/// Undo and redo stacks.
///
/// `push` applies a command and records it; a command that fails to apply
/// has already rolled itself back and leaves no entry.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_depth: Option<usize>,
}

static GLOBAL_HISTORY: OnceLock<Mutex<History>> = OnceLock::new();

impl History {
    /// Creates an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an optional maximum undo depth
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Changes the depth limit. Excess oldest entries are dropped right away.
    pub fn set_max_depth(&mut self, max_depth: Option<usize>) {
        self.max_depth = max_depth;
        self.trim();
    }

    fn trim(&mut self) {
        if let Some(max) = self.max_depth {
            if self.undo_stack.len() > max {
                let excess = self.undo_stack.len() - max;
                self.undo_stack.drain(..excess);
            }
        }
    }

    /// Process-wide default history for callers at the orchestration
    /// boundary that do not manage their own.
    pub fn global() -> &'static Mutex<History> {
        GLOBAL_HISTORY.get_or_init(|| Mutex::new(History::new()))
    }

    /// Applies `command` and records it.
    ///
    /// Returns `Ok(false)` without touching anything when the command is
    /// empty.
    pub fn push(&mut self, mut command: CompositeCommand, ws: &mut Workspace) -> GraphResult<bool> {
        if command.is_empty() {
            debug!(command = %command.name, "empty command, nothing recorded");
            return Ok(false);
        }
        command.apply(ws)?;
        info!(command = %command.name, steps = command.len(), "command applied");
        self.undo_stack.push(HistoryEntry {
            command,
            applied_at: Utc::now(),
        });
        self.redo_stack.clear();
        self.trim();
        Ok(true)
    }

    /// Undo last command. Returns its name, or `None` when there is nothing
    /// to undo.
    pub fn undo(&mut self, ws: &mut Workspace) -> GraphResult<Option<String>> {
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = entry.command.undo(ws) {
            self.undo_stack.push(entry);
            return Err(err);
        }
        let name = entry.command.name.clone();
        info!(command = %name, "command undone");
        self.redo_stack.push(entry);
        Ok(Some(name))
    }

    /// Redo last undone command.
    pub fn redo(&mut self, ws: &mut Workspace) -> GraphResult<Option<String>> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = entry.command.apply(ws) {
            self.redo_stack.push(entry);
            return Err(err);
        }
        let name = entry.command.name.clone();
        info!(command = %name, "command redone");
        self.undo_stack.push(entry);
        Ok(Some(name))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Most recently applied entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }

    /// Applied entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter()
    }
}
