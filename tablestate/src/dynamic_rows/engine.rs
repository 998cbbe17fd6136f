//! Structural row operations around a cursor.

use std::sync::{Arc, RwLock};

use crate::error::{TableError, TableResult};
use crate::handler::TableHandler;
use crate::key::{RowKey, RowKeyResolver};
use crate::pagination::Pagination;
use crate::record::Record;
use crate::state::Rows;

use super::config::DynamicRowsConfig;
use super::export::{DEFAULT_DOWNLOAD_NAME, ExportTarget, PrintOptions, resolve_print_options};

#[derive(Debug, Default)]
struct CursorState {
    cursor: Option<RowKey>,
    pending_delete: bool,
}

/// Add, insert, delete, copy and move rows relative to a cursor.
///
/// Every mutation builds a new sequence and hands it to [`Rows::replace`].
/// Events follow in a fixed order: `row_change`, then the operation's own
/// event, then `row_selection_change` if the cursor moved to another row.
///
/// Misuse (no cursor, a move past either end, a disabled operation) is a
/// logged no-op returning an error; nothing panics.
///
/// With a [`Pagination`] attached, a delete that empties the last page
/// pulls the page back into range after the other events.
#[derive(Clone)]
pub struct DynamicRowEngine {
    state: Arc<RwLock<CursorState>>,
    rows: Rows,
    row_key: RowKeyResolver,
    config: DynamicRowsConfig,
    handler: Arc<dyn TableHandler>,
    pagination: Option<Pagination>,
}

impl DynamicRowEngine {
    /// Create an engine over the host rows.
    pub fn new(
        rows: Rows,
        row_key: RowKeyResolver,
        config: DynamicRowsConfig,
        handler: Arc<dyn TableHandler>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(CursorState::default())),
            rows,
            row_key,
            config,
            handler,
            pagination: None,
        }
    }

    /// Keep `pagination` in range when rows are deleted.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// The configuration in effect.
    pub fn config(&self) -> &DynamicRowsConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    /// Key of the cursor row.
    pub fn cursor(&self) -> Option<RowKey> {
        self.state.read().ok().and_then(|s| s.cursor.clone())
    }

    /// Position of the cursor row, if it still exists.
    pub fn cursor_index(&self) -> Option<usize> {
        let cursor = self.cursor()?;
        self.rows.with(|rows| self.row_key.position(rows, &cursor))
    }

    /// The cursor row, if it still exists.
    pub fn cursor_row(&self) -> Option<Record> {
        let cursor = self.cursor()?;
        self.rows.with(|rows| {
            self.row_key
                .position(rows, &cursor)
                .map(|index| rows[index].clone())
        })
    }

    /// Whether the cursor row has a row above it.
    pub fn can_move_up(&self) -> bool {
        self.cursor_index().is_some_and(|index| index > 0)
    }

    /// Whether the cursor row has a row below it.
    pub fn can_move_down(&self) -> bool {
        self.cursor_index()
            .is_some_and(|index| index + 1 < self.rows.len())
    }

    /// Whether a delete is waiting for confirmation.
    pub fn is_delete_pending(&self) -> bool {
        self.state.read().map(|s| s.pending_delete).unwrap_or(false)
    }

    /// Put the cursor on a row.
    pub fn select(&self, key: &RowKey) -> TableResult {
        let Some(row) = self.find_row(key) else {
            log::debug!("cursor: row {} not found", key);
            return Err(TableError::row_not_found(key));
        };
        if self.set_cursor(Some(key.clone())) {
            self.handler.on_row_selection_change(Some(key), Some(&row));
        }
        Ok(())
    }

    /// Remove the cursor.
    pub fn clear_cursor(&self) -> TableResult {
        if self.set_cursor(None) {
            self.handler.on_row_selection_change(None, None);
        }
        Ok(())
    }

    /// Move the cursor, disarming any pending delete. Returns `true` if it changed.
    fn set_cursor(&self, cursor: Option<RowKey>) -> bool {
        if let Ok(mut state) = self.state.write() {
            state.pending_delete = false;
            if state.cursor != cursor {
                state.cursor = cursor;
                return true;
            }
        }
        false
    }

    fn find_row(&self, key: &RowKey) -> Option<Record> {
        self.rows.with(|rows| {
            self.row_key
                .position(rows, key)
                .map(|index| rows[index].clone())
        })
    }

    /// Index and row under the cursor, or `NotFound`.
    fn require_cursor(&self, operation: &str) -> TableResult<(usize, Record)> {
        let Some(cursor) = self.cursor() else {
            log::debug!("{} ignored: no cursor", operation);
            return Err(TableError::not_found("cursor row"));
        };
        self.rows
            .with(|rows| {
                self.row_key
                    .position(rows, &cursor)
                    .map(|index| (index, rows[index].clone()))
            })
            .ok_or_else(|| {
                log::debug!("{} ignored: cursor row {} is gone", operation, cursor);
                TableError::row_not_found(&cursor)
            })
    }

    fn require_enabled(&self, enabled: bool, operation: &str) -> TableResult {
        if enabled {
            Ok(())
        } else {
            log::debug!("{} ignored: disabled", operation);
            Err(TableError::ignored(format!("{operation} is disabled")))
        }
    }

    fn new_row(&self) -> TableResult<(RowKey, Record)> {
        let mut row = self
            .config
            .default_row
            .as_ref()
            .map(|factory| factory())
            .unwrap_or_default();
        let key = RowKeyResolver::fresh_key();
        self.row_key.assign(&mut row, &key)?;
        Ok((key, row))
    }

    fn commit(&self, rows: Vec<Record>) {
        self.rows.replace(rows);
        self.handler.on_row_change(&self.rows.snapshot());
    }

    fn move_cursor_to(&self, key: Option<RowKey>, row: Option<&Record>) {
        if self.set_cursor(key.clone()) {
            self.handler.on_row_selection_change(key.as_ref(), row);
        }
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Append a new row and put the cursor on it.
    pub fn add(&self) -> TableResult<RowKey> {
        self.require_enabled(self.config.enable_add, "add")?;
        let (key, row) = self.new_row()?;

        let mut rows = self.rows.to_vec();
        rows.push(row.clone());
        self.commit(rows);
        self.handler.on_row_add(&row);
        self.move_cursor_to(Some(key.clone()), Some(&row));

        log::debug!("row {} added", key);
        Ok(key)
    }

    /// Insert a new row after the cursor (at the top without one) and put
    /// the cursor on it.
    pub fn insert(&self) -> TableResult<RowKey> {
        self.require_enabled(self.config.enable_insert, "insert")?;
        let (key, row) = self.new_row()?;

        let mut rows = self.rows.to_vec();
        let at = self.cursor_index().map(|index| index + 1).unwrap_or(0);
        rows.insert(at, row.clone());
        self.commit(rows);
        self.handler.on_row_add(&row);
        self.move_cursor_to(Some(key.clone()), Some(&row));

        log::debug!("row {} inserted at {}", key, at);
        Ok(key)
    }

    /// Delete the cursor row.
    ///
    /// With `confirm_delete` set this only arms the confirmation; see
    /// [`confirm_delete`](Self::confirm_delete).
    pub fn delete(&self) -> TableResult {
        self.require_enabled(self.config.enable_delete, "delete")?;
        let (index, row) = self.require_cursor("delete")?;

        if self.config.confirm_delete {
            if let Ok(mut state) = self.state.write() {
                state.pending_delete = true;
            }
            log::debug!("delete of row {} awaiting confirmation", index);
            return Ok(());
        }
        self.delete_at(index, &row);
        Ok(())
    }

    /// Carry out an armed delete.
    pub fn confirm_delete(&self) -> TableResult {
        let armed = self
            .state
            .write()
            .map(|mut s| std::mem::take(&mut s.pending_delete))
            .unwrap_or(false);
        if !armed {
            log::debug!("confirm delete ignored: nothing pending");
            return Err(TableError::not_found("pending delete"));
        }
        let (index, row) = self.require_cursor("delete")?;
        self.delete_at(index, &row);
        Ok(())
    }

    /// Disarm a pending delete.
    pub fn dismiss_delete(&self) {
        if let Ok(mut state) = self.state.write() {
            state.pending_delete = false;
        }
    }

    fn delete_at(&self, index: usize, row: &Record) {
        let mut rows = self.rows.to_vec();
        rows.remove(index);

        // The follower slides into `index`; otherwise fall back to the new last row.
        let next = rows.get(index).or_else(|| rows.last()).cloned();
        let next_key = next.as_ref().map(|r| self.row_key.resolve(r));

        self.commit(rows);
        self.handler.on_row_delete(row, index);
        self.move_cursor_to(next_key, next.as_ref());

        if let Some(pagination) = self.pagination.as_ref().filter(|p| p.is_enabled())
            && let Err(e) = pagination.clamp()
        {
            log::warn!("page clamp after delete failed: {}", e);
        }
        log::debug!("row at {} deleted", index);
    }

    /// Copy the cursor row under a fresh key, right after the original, and
    /// put the cursor on the copy.
    pub fn copy(&self) -> TableResult<RowKey> {
        self.require_enabled(self.config.enable_copy, "copy")?;
        let (index, original) = self.require_cursor("copy")?;

        let key = RowKeyResolver::fresh_key();
        let mut copy = original.clone();
        self.row_key.assign(&mut copy, &key)?;

        let mut rows = self.rows.to_vec();
        rows.insert(index + 1, copy.clone());
        self.commit(rows);
        self.handler.on_row_copy(&original, &copy);
        self.move_cursor_to(Some(key.clone()), Some(&copy));

        log::debug!("row at {} copied as {}", index, key);
        Ok(key)
    }

    /// Swap the cursor row with the one above it.
    pub fn move_up(&self) -> TableResult {
        self.require_enabled(self.config.enable_move, "move")?;
        let (index, row) = self.require_cursor("move up")?;
        if index == 0 {
            log::debug!("move up ignored: already first");
            return Ok(());
        }
        self.swap(&row, index, index - 1);
        Ok(())
    }

    /// Swap the cursor row with the one below it.
    pub fn move_down(&self) -> TableResult {
        self.require_enabled(self.config.enable_move, "move")?;
        let (index, row) = self.require_cursor("move down")?;
        if index + 1 >= self.rows.len() {
            log::debug!("move down ignored: already last");
            return Ok(());
        }
        self.swap(&row, index, index + 1);
        Ok(())
    }

    fn swap(&self, row: &Record, from: usize, to: usize) {
        let mut rows = self.rows.to_vec();
        rows.swap(from, to);
        self.commit(rows);
        self.handler.on_row_move(row, from, to);
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Options an export would use.
    pub fn print_options(&self) -> PrintOptions {
        resolve_print_options(
            self.config.print_options.as_ref(),
            self.config.print_preset,
            self.config.print_watermark_text.as_deref(),
        )
    }

    /// Print the rendered region through the exporter.
    pub async fn print(&self, target: &ExportTarget) -> TableResult {
        self.require_enabled(self.config.enable_print, "print")?;
        let Some(exporter) = self.config.exporter.clone() else {
            log::warn!("print unavailable: no exporter configured");
            return Err(TableError::unavailable("print", "no exporter configured"));
        };

        let options = self.print_options();
        exporter.print(target, &options).await.map_err(|e| {
            log::warn!("print of {} failed: {}", target.as_str(), e);
            TableError::unavailable("print", e.to_string())
        })
    }

    /// Save a capture of the rendered region, as `table.png` by default.
    pub async fn download(&self, target: &ExportTarget, filename: Option<&str>) -> TableResult {
        self.require_enabled(self.config.enable_print, "download")?;
        let Some(exporter) = self.config.exporter.clone() else {
            log::warn!("download unavailable: no exporter configured");
            return Err(TableError::unavailable("download", "no exporter configured"));
        };

        let filename = filename.unwrap_or(DEFAULT_DOWNLOAD_NAME);
        let options = self.print_options();
        exporter
            .download(target, filename, &options)
            .await
            .map_err(|e| {
                log::warn!("download of {} failed: {}", target.as_str(), e);
                TableError::unavailable("download", e.to_string())
            })
    }
}

impl std::fmt::Debug for DynamicRowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicRowEngine")
            .field("cursor", &self.cursor())
            .field("pending_delete", &self.is_delete_pending())
            .finish_non_exhaustive()
    }
}
