//! Host collaborator interfaces.
//!
//! The table never persists or renders anything itself. Everything that
//! leaves the state coordinator goes through one of these traits:
//!
//! - [`TableHandler`] receives one callback per event kind.
//! - [`ExpandLoader`] lazily loads the children of a row.
//! - [`Exporter`] prints or downloads the rendered table.

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::dynamic_rows::{ExportTarget, PrintOptions};
use crate::error::{ExportError, HandlerError, LoadError};
use crate::key::{ChildKey, RowKey};
use crate::record::Record;

/// Receives every event the table emits.
///
/// All methods default to no-ops, so hosts only override what they observe.
/// `on_save` is the only callback that can push back: returning an error
/// rejects the save and keeps the edit session alive.
#[async_trait]
pub trait TableHandler: Send + Sync {
    /// An edit is being committed. `row` is the live row with the draft merged in.
    async fn on_save(
        &self,
        _row: &Record,
        _index: usize,
        _column: Option<&str>,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// An edit session was cancelled. `row` is the untouched live row.
    fn on_cancel(&self, _row: &Record, _index: usize) {}

    /// The expanded key set changed. `row`/`expanded` are set for single-row changes.
    fn on_expand_change(&self, _keys: &[RowKey], _row: Option<&Record>, _expanded: Option<bool>) {}

    /// The top-level selection changed.
    fn on_selection_change(
        &self,
        _checked_keys: &[RowKey],
        _checked_rows: &[Record],
        _child_selections: &BTreeMap<RowKey, Vec<ChildKey>>,
    ) {
    }

    /// The child selection of one parent changed.
    fn on_child_selection_change(
        &self,
        _parent: &RowKey,
        _child_keys: &[ChildKey],
        _child_rows: &[Record],
    ) {
    }

    /// The row sequence was replaced.
    fn on_row_change(&self, _rows: &[Record]) {}

    /// The dynamic-row cursor moved.
    fn on_row_selection_change(&self, _key: Option<&RowKey>, _row: Option<&Record>) {}

    /// A row was added or inserted.
    fn on_row_add(&self, _row: &Record) {}

    /// A row was deleted from `index`.
    fn on_row_delete(&self, _row: &Record, _index: usize) {}

    /// A row was copied.
    fn on_row_copy(&self, _original: &Record, _copy: &Record) {}

    /// A row moved between positions.
    fn on_row_move(&self, _row: &Record, _from: usize, _to: usize) {}

    /// The current page or page size changed.
    fn on_pagination_change(&self, _page: usize, _page_size: usize) {}
}

/// Handler that ignores every event and accepts every save.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl TableHandler for NoopHandler {}

/// Loads the children of a row on first expansion.
#[async_trait]
pub trait ExpandLoader: Send + Sync {
    /// Load the child rows of `row`.
    async fn load(&self, row: &Record) -> Result<Vec<Record>, LoadError>;
}

/// [`ExpandLoader`] over a synchronous closure.
pub struct FnLoader<F>(F);

impl<F> FnLoader<F>
where
    F: Fn(&Record) -> Result<Vec<Record>, LoadError> + Send + Sync + 'static,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ExpandLoader for FnLoader<F>
where
    F: Fn(&Record) -> Result<Vec<Record>, LoadError> + Send + Sync + 'static,
{
    async fn load(&self, row: &Record) -> Result<Vec<Record>, LoadError> {
        (self.0)(row)
    }
}

/// [`ExpandLoader`] over a closure returning a future.
pub struct AsyncFnLoader<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnLoader<F, Fut>
where
    F: Fn(Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Record>, LoadError>> + Send + 'static,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _fut: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> ExpandLoader for AsyncFnLoader<F, Fut>
where
    F: Fn(Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Record>, LoadError>> + Send + 'static,
{
    async fn load(&self, row: &Record) -> Result<Vec<Record>, LoadError> {
        (self.f)(row.clone()).await
    }
}

/// Print/export backend for the rendered table region.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Print `target` with the resolved options.
    async fn print(&self, target: &ExportTarget, options: &PrintOptions) -> Result<(), ExportError>;

    /// Save a capture of `target` under `filename`.
    async fn download(
        &self,
        target: &ExportTarget,
        filename: &str,
        options: &PrintOptions,
    ) -> Result<(), ExportError>;
}
