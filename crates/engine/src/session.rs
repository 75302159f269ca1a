//! Edit session state machine.
//!
//! ```text
//!   Idle ──begin──▶ Editing ──submit──▶ Saving
//!    ▲               │   ▲                │
//!    └─cancel(ok)────┘   └──failure───────┤
//!    ▲                                    │
//!    └──────────────success───────────────┘
//! ```
//!
//! The session owns the edit history, the unsaved-changes flag and the
//! snapshot taken when editing began. Only one session is active at a time;
//! callers hold it and pass it to whatever handles user input.
//!
//! Any replay (undo or redo) dirties the session, even when it lands back on
//! the original value.

use crate::error::EngineError;
use crate::extract::extract;
use crate::grid::{self, DeleteOutcome, Grid};
use crate::history::{EditLog, HistoryListener, Replay};
use crate::layout::{decorate_row, GridCoord, GridLayout};
use crate::save::{Persistence, SaveReceipt, SaveRequest, SaveResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Editing,
    Saving,
}

#[derive(Default)]
pub struct EditSession {
    state: SessionState,
    log: EditLog,
    unsaved: bool,
    original: Vec<Vec<String>>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == SessionState::Editing
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn history(&self) -> &EditLog {
        &self.log
    }

    pub fn set_history_listener(&mut self, listener: HistoryListener) {
        self.log.set_listener(listener);
    }

    /// Grid rows captured when editing began (or at the last successful save)
    pub fn original_snapshot(&self) -> &[Vec<String>] {
        &self.original
    }

    /// Enter edit mode.
    ///
    /// If a session with unsaved changes is already active, `confirm` decides
    /// whether to discard it (the grid is restored first). Returns false when
    /// the user declined.
    pub fn begin<G, C>(&mut self, grid: &mut G, confirm: C) -> Result<bool, EngineError>
    where
        G: Grid + ?Sized,
        C: FnOnce() -> bool,
    {
        match self.state {
            SessionState::Saving => return Err(EngineError::SaveInFlight),
            SessionState::Editing if self.unsaved => {
                if !confirm() {
                    return Ok(false);
                }
                self.restore_original(grid)?;
            }
            _ => {}
        }

        self.original = grid.snapshot()?;
        self.log.clear();
        self.unsaved = false;
        self.state = SessionState::Editing;
        log::debug!("edit session started ({} rows)", self.original.len());
        Ok(true)
    }

    /// Commit a user edit to one cell.
    ///
    /// Returns false when the value is unchanged (nothing recorded).
    pub fn edit<G>(&mut self, grid: &mut G, coord: GridCoord, value: &str) -> Result<bool, EngineError>
    where
        G: Grid + ?Sized,
    {
        self.require_editing()?;

        let layout = GridLayout::new(grid.header());
        layout.require_data_cell(coord)?;
        let row = grid.row(coord.row).map_err(|_| EngineError::StaleCoordinate(coord))?;
        layout.check_row(coord.row, row.len())?;

        let old = row[coord.col].clone();
        if old == value {
            return Ok(false);
        }

        grid.set_cell(coord, value)?;
        self.log.record(coord, old, value.to_string());
        self.unsaved = true;
        Ok(true)
    }

    pub fn undo<G: Grid + ?Sized>(&mut self, grid: &mut G) -> Result<Option<Replay>, EngineError> {
        self.require_editing()?;
        let replay = self.log.undo(grid);
        if replay.is_some() {
            self.unsaved = true;
        }
        Ok(replay)
    }

    pub fn redo<G: Grid + ?Sized>(&mut self, grid: &mut G) -> Result<Option<Replay>, EngineError> {
        self.require_editing()?;
        let replay = self.log.redo(grid);
        if replay.is_some() {
            self.unsaved = true;
        }
        Ok(replay)
    }

    /// Delete rows after confirmation. Dirties an active session.
    pub fn delete_rows<G, C>(&mut self, grid: &mut G, rows: &[usize], confirm: C) -> Result<DeleteOutcome, EngineError>
    where
        G: Grid + ?Sized,
        C: FnOnce(usize) -> bool,
    {
        if self.state == SessionState::Saving {
            return Err(EngineError::SaveInFlight);
        }
        let outcome = grid::delete_rows(grid, rows, confirm)?;
        if let DeleteOutcome::Deleted { count, .. } = outcome {
            if count > 0 && self.state == SessionState::Editing {
                self.unsaved = true;
            }
        }
        Ok(outcome)
    }

    /// Leave edit mode, restoring the grid to the snapshot.
    ///
    /// With unsaved changes `confirm` must agree; returns false (grid
    /// untouched) when it does not.
    pub fn cancel<G, C>(&mut self, grid: &mut G, confirm: C) -> Result<bool, EngineError>
    where
        G: Grid + ?Sized,
        C: FnOnce() -> bool,
    {
        match self.state {
            SessionState::Saving => return Err(EngineError::SaveInFlight),
            SessionState::Idle => return Ok(true),
            SessionState::Editing => {}
        }
        if self.unsaved && !confirm() {
            return Ok(false);
        }

        self.restore_original(grid)?;
        self.log.clear();
        self.unsaved = false;
        self.state = SessionState::Idle;
        log::debug!("edit session cancelled");
        Ok(true)
    }

    /// Extract and validate the grid, then move to `Saving`.
    ///
    /// On any error the session stays in `Editing` and nothing is sent.
    pub fn submit<G: Grid + ?Sized>(&mut self, grid: &mut G) -> Result<SaveRequest, EngineError> {
        self.require_editing()?;
        let request = SaveRequest::from_extraction(extract(grid)?)?;
        self.state = SessionState::Saving;
        Ok(request)
    }

    /// Apply the persistence outcome of a submitted request.
    ///
    /// Success resets history and re-bases the snapshot on the saved data.
    /// Failure returns to `Editing` with all edits intact.
    pub fn complete(
        &mut self,
        request: &SaveRequest,
        response: Result<SaveResponse, String>,
    ) -> Result<SaveReceipt, EngineError> {
        if self.state != SessionState::Saving {
            return Err(EngineError::NotEditing);
        }

        let response = match response {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                self.state = SessionState::Editing;
                log::warn!("save rejected by server: {}", r.message);
                return Err(EngineError::PersistenceFailure(r.message));
            }
            Err(msg) => {
                self.state = SessionState::Editing;
                log::warn!("save failed: {}", msg);
                return Err(EngineError::PersistenceFailure(msg));
            }
        };

        let rows = request.data.len();
        self.original = request.data.iter().map(|r| decorate_row(r)).collect();
        self.log.clear();
        self.unsaved = false;
        self.state = SessionState::Idle;

        let message = if response.message.is_empty() {
            format!("Table saved successfully! {} rows saved.", rows)
        } else {
            response.message
        };
        log::info!("saved {} rows ({})", rows, request.debug_info.extraction_method);

        Ok(SaveReceipt {
            rows,
            method: request.debug_info.extraction_method.clone(),
            message,
        })
    }

    /// Submit and complete in one call.
    pub fn save<G, P>(&mut self, grid: &mut G, persistence: &P) -> Result<SaveReceipt, EngineError>
    where
        G: Grid + ?Sized,
        P: Persistence + ?Sized,
    {
        let request = self.submit(grid)?;
        let response = persistence.save_table(&request).map_err(|e| e.to_string());
        self.complete(&request, response)
    }

    fn require_editing(&self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Editing => Ok(()),
            SessionState::Saving => Err(EngineError::SaveInFlight),
            SessionState::Idle => Err(EngineError::NotEditing),
        }
    }

    fn restore_original<G: Grid + ?Sized>(&self, grid: &mut G) -> Result<(), EngineError> {
        grid.clear()?;
        grid.add_rows(self.original.clone())?;
        Ok(())
    }
}
