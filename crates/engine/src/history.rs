//! Undo/redo history for cell edits.
//!
//! Every accepted edit is an `EditCommand` holding the grid coordinate and
//! both values. Undo re-applies the old value, redo the new one; a command
//! always moves between the two stacks whole, so the stacks stay a strict
//! LIFO inverse pair.
//!
//! Replaying against a coordinate that no longer exists (row deleted since
//! the edit) is logged and reported as `Replay::Stale`; the stacks move
//! exactly as for a successful replay.

use crate::error::GridError;
use crate::grid::Grid;
use crate::layout::GridCoord;

/// One recorded cell mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditCommand {
    pub coord: GridCoord,
    pub old_value: String,
    pub new_value: String,
}

/// Stack depths, sent to the listener after every mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub undo_depth: usize,
    pub redo_depth: usize,
}

impl HistoryState {
    pub fn can_undo(&self) -> bool {
        self.undo_depth > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_depth > 0
    }
}

/// Callback for history state changes (e.g. enabling undo/redo buttons).
pub type HistoryListener = Box<dyn FnMut(HistoryState)>;

/// Outcome of an undo or redo.
#[derive(Clone, Debug, PartialEq)]
pub enum Replay {
    /// Value written to the grid
    Applied(EditCommand),
    /// Target cell was gone; grid untouched
    Stale(EditCommand, GridError),
}

impl Replay {
    pub fn command(&self) -> &EditCommand {
        match self {
            Replay::Applied(cmd) | Replay::Stale(cmd, _) => cmd,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Replay::Stale(..))
    }
}

#[derive(Default)]
pub struct EditLog {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    listener: Option<HistoryListener>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the state-change listener (replaces any previous one).
    pub fn set_listener(&mut self, listener: HistoryListener) {
        self.listener = Some(listener);
        self.notify();
    }

    /// Record an edit. No-op when the value did not change.
    ///
    /// Returns true when a command was pushed. A new command invalidates
    /// everything on the redo stack.
    pub fn record(&mut self, coord: GridCoord, old_value: String, new_value: String) -> bool {
        if old_value == new_value {
            return false;
        }
        self.undo_stack.push(EditCommand { coord, old_value, new_value });
        self.redo_stack.clear();
        self.notify();
        true
    }

    /// Undo the most recent command by writing its old value back.
    pub fn undo<G: Grid + ?Sized>(&mut self, grid: &mut G) -> Option<Replay> {
        let cmd = self.undo_stack.pop()?;
        let replay = apply(grid, cmd.clone(), &cmd.old_value);
        self.redo_stack.push(cmd);
        self.notify();
        Some(replay)
    }

    /// Redo the most recently undone command by writing its new value.
    pub fn redo<G: Grid + ?Sized>(&mut self, grid: &mut G) -> Option<Replay> {
        let cmd = self.redo_stack.pop()?;
        let replay = apply(grid, cmd.clone(), &cmd.new_value);
        self.undo_stack.push(cmd);
        self.notify();
        Some(replay)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
        }
    }

    /// Commands on the undo stack, oldest first
    pub fn undo_commands(&self) -> &[EditCommand] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify();
    }

    fn notify(&mut self) {
        let state = self.state();
        if let Some(listener) = self.listener.as_mut() {
            listener(state);
        }
    }
}

fn apply<G: Grid + ?Sized>(grid: &mut G, cmd: EditCommand, value: &str) -> Replay {
    match grid.set_cell(cmd.coord, value) {
        Ok(()) => Replay::Applied(cmd),
        Err(e) => {
            log::warn!(
                "edit replay skipped at ({}, {}): {} (row may have changed)",
                cmd.coord.row,
                cmd.coord.col,
                e
            );
            Replay::Stale(cmd, e)
        }
    }
}
