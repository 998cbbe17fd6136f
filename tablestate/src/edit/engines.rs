//! The three edit engines.

use crate::error::{TableError, TableResult};
use crate::key::RowKey;
use crate::record::{Record, Value};

/// Kind of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// One cell of a row.
    Cell,
    /// A whole row, inline.
    Row,
    /// A whole row, in a modal form.
    Modal,
}

/// Read-only view of the active edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    /// Session identifier, unique for the lifetime of the coordinator.
    pub id: u64,
    /// Which engine owns the session.
    pub kind: SessionKind,
    /// Edited row.
    pub key: RowKey,
    /// Edited column (cell sessions only).
    pub column: Option<String>,
    /// Current draft.
    pub draft: Record,
    /// Row as it was when the session started.
    pub original: Record,
}

/// Contract shared by the cell, row and modal engines.
///
/// Engines only hold the draft. The live row is never touched until the
/// coordinator commits a save, so cancelling simply drops the engine.
pub trait EditEngine {
    /// Which kind of session this engine runs.
    fn kind(&self) -> SessionKind;

    /// Key of the edited row.
    fn key(&self) -> &RowKey;

    /// Edited column, if the session is cell-scoped.
    fn column(&self) -> Option<&str> {
        None
    }

    /// Snapshot of the row taken when the session started.
    fn original(&self) -> &Record;

    /// Whether this session covers the given row (and column).
    fn is_editing(&self, key: &RowKey, column: Option<&str>) -> bool;

    /// The draft as a partial record.
    fn current_draft(&self) -> Record;

    /// Change one field of the draft.
    fn update(&mut self, field: &str, value: Value) -> TableResult;

    /// Replace the whole draft.
    fn replace_draft(&mut self, draft: Record) -> TableResult;

    /// The live row with the draft written over it.
    fn commit(&self, live: &Record) -> Record {
        live.merged(&self.current_draft())
    }
}

/// Single-cell edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    key: RowKey,
    column: String,
    value: Value,
    original: Record,
}

impl CellEdit {
    /// Start editing `column` of `row`.
    pub fn start(key: RowKey, column: impl Into<String>, row: &Record) -> Self {
        let column = column.into();
        let value = row.get(&column).cloned().unwrap_or(Value::Null);
        Self {
            key,
            column,
            value,
            original: row.clone(),
        }
    }

    /// Current value of the edited cell.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl EditEngine for CellEdit {
    fn kind(&self) -> SessionKind {
        SessionKind::Cell
    }

    fn key(&self) -> &RowKey {
        &self.key
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn original(&self) -> &Record {
        &self.original
    }

    fn is_editing(&self, key: &RowKey, column: Option<&str>) -> bool {
        &self.key == key && column == Some(self.column.as_str())
    }

    fn current_draft(&self) -> Record {
        Record::new().set(self.column.clone(), self.value.clone())
    }

    fn update(&mut self, field: &str, value: Value) -> TableResult {
        if field != self.column {
            return Err(TableError::ignored(format!(
                "cell session edits '{}', not '{}'",
                self.column, field
            )));
        }
        self.value = value;
        Ok(())
    }

    fn replace_draft(&mut self, mut draft: Record) -> TableResult {
        match draft.remove(&self.column) {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(TableError::ignored(format!(
                "cell draft has no value for '{}'",
                self.column
            ))),
        }
    }
}

/// Whole-row inline edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    key: RowKey,
    draft: Record,
    original: Record,
}

impl RowEdit {
    /// Start editing `row`.
    pub fn start(key: RowKey, row: &Record) -> Self {
        Self {
            key,
            draft: row.clone(),
            original: row.clone(),
        }
    }
}

impl EditEngine for RowEdit {
    fn kind(&self) -> SessionKind {
        SessionKind::Row
    }

    fn key(&self) -> &RowKey {
        &self.key
    }

    fn original(&self) -> &Record {
        &self.original
    }

    fn is_editing(&self, key: &RowKey, _column: Option<&str>) -> bool {
        &self.key == key
    }

    fn current_draft(&self) -> Record {
        self.draft.clone()
    }

    fn update(&mut self, field: &str, value: Value) -> TableResult {
        self.draft.insert(field, value);
        Ok(())
    }

    fn replace_draft(&mut self, draft: Record) -> TableResult {
        self.draft = draft;
        Ok(())
    }
}

/// Whole-row edit session shown in a modal form.
///
/// Behaves like [`RowEdit`] but the column is always ignored, and the form
/// usually submits the whole draft at once through
/// [`replace_draft`](EditEngine::replace_draft).
#[derive(Debug, Clone, PartialEq)]
pub struct ModalEdit {
    key: RowKey,
    draft: Record,
    original: Record,
}

impl ModalEdit {
    /// Open the modal for `row`.
    pub fn start(key: RowKey, row: &Record) -> Self {
        Self {
            key,
            draft: row.clone(),
            original: row.clone(),
        }
    }
}

impl EditEngine for ModalEdit {
    fn kind(&self) -> SessionKind {
        SessionKind::Modal
    }

    fn key(&self) -> &RowKey {
        &self.key
    }

    fn original(&self) -> &Record {
        &self.original
    }

    fn is_editing(&self, key: &RowKey, _column: Option<&str>) -> bool {
        &self.key == key
    }

    fn current_draft(&self) -> Record {
        self.draft.clone()
    }

    fn update(&mut self, field: &str, value: Value) -> TableResult {
        self.draft.insert(field, value);
        Ok(())
    }

    fn replace_draft(&mut self, draft: Record) -> TableResult {
        self.draft = draft;
        Ok(())
    }
}

/// The one active session, whichever engine owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveEdit {
    Cell(CellEdit),
    Row(RowEdit),
    Modal(ModalEdit),
}

impl ActiveEdit {
    /// The engine behind this session.
    pub fn engine(&self) -> &dyn EditEngine {
        match self {
            Self::Cell(e) => e,
            Self::Row(e) => e,
            Self::Modal(e) => e,
        }
    }

    /// The engine behind this session, mutably.
    pub fn engine_mut(&mut self) -> &mut dyn EditEngine {
        match self {
            Self::Cell(e) => e,
            Self::Row(e) => e,
            Self::Modal(e) => e,
        }
    }

    pub(crate) fn to_session(&self, id: u64) -> EditSession {
        let engine = self.engine();
        EditSession {
            id,
            kind: engine.kind(),
            key: engine.key().clone(),
            column: engine.column().map(str::to_string),
            draft: engine.current_draft(),
            original: engine.original().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row() -> Record {
        Record::new().set("id", 1).set("name", "a").set("age", 30)
    }

    #[test]
    fn test_cell_commit_touches_only_its_column() {
        let mut cell = CellEdit::start(RowKey::from(1), "name", &row());
        cell.update("name", json!("b")).unwrap();

        let live = row().set("age", 31);
        let committed = cell.commit(&live);
        assert_eq!(committed.get_str("name"), Some("b"));
        assert_eq!(committed.get("age"), Some(&json!(31)));
    }

    #[test]
    fn test_cell_rejects_other_columns() {
        let mut cell = CellEdit::start(RowKey::from(1), "name", &row());
        assert!(cell.update("age", json!(1)).is_err());
        assert!(!cell.is_editing(&RowKey::from(1), None));
        assert!(cell.is_editing(&RowKey::from(1), Some("name")));
    }

    #[test]
    fn test_modal_ignores_column() {
        let modal = ModalEdit::start(RowKey::from(1), &row());
        assert!(modal.is_editing(&RowKey::from(1), Some("anything")));
        assert!(!modal.is_editing(&RowKey::from(2), None));
    }
}
