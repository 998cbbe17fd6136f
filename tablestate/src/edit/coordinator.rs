//! Edit coordinator.

use std::sync::{Arc, RwLock};

use crate::config::{EditMode, TableConfig};
use crate::error::{TableError, TableResult};
use crate::handler::TableHandler;
use crate::key::RowKey;
use crate::record::{Record, Value};
use crate::state::Rows;

use super::engines::{
    ActiveEdit, CellEdit, EditEngine, EditSession, ModalEdit, RowEdit, SessionKind,
};

#[derive(Debug, Default)]
struct EditInner {
    /// The active session and its id.
    active: Option<(u64, ActiveEdit)>,
    /// Id handed to the next session.
    next_id: u64,
}

/// Drives whichever edit engine the configured [`EditMode`] selects.
///
/// Starting a session while another one is active is refused; the caller
/// saves or cancels first.
#[derive(Clone)]
pub struct EditCoordinator {
    inner: Arc<RwLock<EditInner>>,
    rows: Rows,
    config: Arc<TableConfig>,
    handler: Arc<dyn TableHandler>,
}

impl EditCoordinator {
    /// Create a coordinator over the host rows.
    pub fn new(rows: Rows, config: Arc<TableConfig>, handler: Arc<dyn TableHandler>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(EditInner::default())),
            rows,
            config,
            handler,
        }
    }

    fn find_row(&self, key: &RowKey) -> Option<(usize, Record)> {
        self.rows.with(|rows| {
            let index = self.config.row_key.position(rows, key)?;
            Some((index, rows[index].clone()))
        })
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Start editing a row, or one of its cells.
    ///
    /// Refused when editing is disabled, when a cell edit has no column, when
    /// the row does not exist, or when another session is active. Starting
    /// the session that is already active is a no-op.
    pub fn start(&self, key: &RowKey, column: Option<&str>) -> TableResult {
        if !self.config.editable {
            return Err(log_ignored("editing is disabled"));
        }

        let kind = match (self.config.edit_mode, column) {
            (EditMode::None, _) => return Err(log_ignored("edit mode is none")),
            (EditMode::Cell, None) => return Err(log_ignored("cell edit needs a column")),
            (EditMode::Cell, Some(_)) | (EditMode::Both, Some(_)) => SessionKind::Cell,
            (EditMode::Row, _) | (EditMode::Both, None) => SessionKind::Row,
            (EditMode::Modal, _) => SessionKind::Modal,
        };

        let Some((_, row)) = self.find_row(key) else {
            log::debug!("edit start: row {} not found", key);
            return Err(TableError::row_not_found(key));
        };

        let Ok(mut guard) = self.inner.write() else {
            return Err(TableError::ignored("edit state unavailable"));
        };

        if let Some((_, active)) = &guard.active {
            let engine = active.engine();
            let same = engine.kind() == kind
                && engine.key() == key
                && (kind != SessionKind::Cell || engine.column() == column);
            if same {
                return Ok(());
            }
            log::debug!(
                "edit start for {} refused: {:?} session on {} is active",
                key,
                engine.kind(),
                engine.key()
            );
            return Err(TableError::ignored(format!(
                "an edit session on row {} is already active",
                engine.key()
            )));
        }

        let active = match (kind, column) {
            (SessionKind::Cell, Some(column)) => {
                ActiveEdit::Cell(CellEdit::start(key.clone(), column, &row))
            }
            (SessionKind::Modal, _) => ActiveEdit::Modal(ModalEdit::start(key.clone(), &row)),
            _ => ActiveEdit::Row(RowEdit::start(key.clone(), &row)),
        };

        guard.next_id += 1;
        let id = guard.next_id;
        guard.active = Some((id, active));
        log::debug!("edit session {} started: {:?} on {}", id, kind, key);
        Ok(())
    }

    /// Discard the active session.
    ///
    /// The live row was never modified, so the original snapshot stands.
    /// Emits `cancel` when the row still exists.
    pub fn cancel(&self) -> TableResult {
        let taken = self
            .inner
            .write()
            .ok()
            .and_then(|mut guard| guard.active.take());

        let Some((id, active)) = taken else {
            log::debug!("edit cancel: no active session");
            return Err(TableError::not_found("active edit session"));
        };

        log::debug!("edit session {} cancelled", id);
        if let Some((index, row)) = self.find_row(active.engine().key()) {
            self.handler.on_cancel(&row, index);
        }
        Ok(())
    }

    /// Commit the active session.
    ///
    /// The host `on_save` callback sees the merged row first. If it rejects,
    /// the session stays active for a retry or an explicit cancel. If it
    /// accepts, the row is written back with a whole-sequence replacement and
    /// the session ends, unless the draft changed while `on_save` was pending.
    /// Then the session stays active with the newer draft.
    pub async fn save(&self) -> TableResult {
        let Some((id, active)) = self
            .inner
            .read()
            .ok()
            .and_then(|guard| guard.active.clone())
        else {
            log::debug!("edit save: no active session");
            return Err(TableError::not_found("active edit session"));
        };

        let key = active.engine().key().clone();
        let column = active.engine().column().map(str::to_string);
        let Some((index, live)) = self.find_row(&key) else {
            log::warn!("edit save: row {} disappeared, session kept", key);
            return Err(TableError::row_not_found(&key));
        };

        let merged = active.engine().commit(&live);
        if let Err(e) = self
            .handler
            .on_save(&merged, index, column.as_deref())
            .await
        {
            log::warn!("save of row {} rejected: {}", key, e);
            return Err(TableError::ValidationRejected {
                key,
                reason: e.message,
            });
        }

        // The rows may have changed while the host was saving.
        let mut rows = self.rows.to_vec();
        let Some(index) = self.config.row_key.position(&rows, &key) else {
            log::warn!("edit save: row {} deleted during save, result dropped", key);
            self.end_session(id, None);
            return Err(TableError::row_not_found(&key));
        };
        rows[index] = active.engine().commit(&rows[index]);
        self.rows.replace(rows);
        self.handler.on_row_change(&self.rows.snapshot());

        if self.end_session(id, Some(&active)) {
            log::debug!("edit session {} saved", id);
        } else {
            log::debug!("edit session {} saved; draft changed during save, session kept", id);
        }
        Ok(())
    }

    /// End session `id` if it is still active. With `saved` given, the
    /// session only ends if its draft still equals the saved one.
    /// Returns `false` if a newer draft kept the session open.
    fn end_session(&self, id: u64, saved: Option<&ActiveEdit>) -> bool {
        let Ok(mut guard) = self.inner.write() else {
            return true;
        };
        match &guard.active {
            Some((active_id, active)) if *active_id == id => {
                if saved.is_some_and(|saved| saved != active) {
                    return false;
                }
                guard.active = None;
                true
            }
            _ => true,
        }
    }

    // -------------------------------------------------------------------------
    // Draft access
    // -------------------------------------------------------------------------

    /// Change one field of the active draft.
    pub fn update_draft(&self, field: &str, value: Value) -> TableResult {
        let Ok(mut guard) = self.inner.write() else {
            return Err(TableError::ignored("edit state unavailable"));
        };
        match guard.active.as_mut() {
            Some((_, active)) => active.engine_mut().update(field, value),
            None => Err(TableError::not_found("active edit session")),
        }
    }

    /// Replace the active draft (e.g. a submitted modal form).
    pub fn set_draft(&self, draft: Record) -> TableResult {
        let Ok(mut guard) = self.inner.write() else {
            return Err(TableError::ignored("edit state unavailable"));
        };
        match guard.active.as_mut() {
            Some((_, active)) => active.engine_mut().replace_draft(draft),
            None => Err(TableError::not_found("active edit session")),
        }
    }

    /// The live draft for preview rendering.
    ///
    /// Cell drafts are shown over the current live row.
    pub fn editing_data(&self) -> Option<Record> {
        let active = self.inner.read().ok()?.active.clone()?.1;
        match &active {
            ActiveEdit::Cell(cell) => {
                let (_, live) = self.find_row(cell.key())?;
                Some(active.engine().commit(&live))
            }
            other => Some(other.engine().current_draft()),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether a row (or one of its cells) is being edited.
    ///
    /// Row and modal sessions cover every column of their row; a cell session
    /// covers only its exact cell.
    pub fn is_editing(&self, key: &RowKey, column: Option<&str>) -> bool {
        self.inner
            .read()
            .map(|g| {
                g.active
                    .as_ref()
                    .is_some_and(|(_, active)| active.engine().is_editing(key, column))
            })
            .unwrap_or(false)
    }

    /// Whether any session is active.
    pub fn is_active(&self) -> bool {
        self.inner
            .read()
            .map(|g| g.active.is_some())
            .unwrap_or(false)
    }

    /// Whether the modal form is open.
    pub fn is_modal_visible(&self) -> bool {
        self.inner
            .read()
            .map(|g| matches!(g.active, Some((_, ActiveEdit::Modal(_)))))
            .unwrap_or(false)
    }

    /// Copy of the active session.
    pub fn session(&self) -> Option<EditSession> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.active.as_ref().map(|(id, active)| active.to_session(*id)))
    }
}

impl std::fmt::Debug for EditCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditCoordinator")
            .field("session", &self.session())
            .finish_non_exhaustive()
    }
}

fn log_ignored(reason: &str) -> TableError {
    log::debug!("edit start ignored: {}", reason);
    TableError::ignored(reason)
}
