//! Table manager.
//!
//! [`TableManager`] is the one object a host holds. It builds the engines
//! the [`TableConfig`] asks for and exposes them in namespaced groups:
//!
//! ```ignore
//! manager.edit().start(&key, Some("name"))?;
//! manager.expand()?.expand(&key).await?;
//! manager.selection()?.select(&key)?;
//! manager.child_selection()?.select(&key, &child)?;
//! manager.dynamic_rows()?.copy()?;
//! ```
//!
//! A group whose engine is not configured returns
//! [`TableError::ConfigurationIgnored`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::TableConfig;
use crate::dynamic_rows::DynamicRowEngine;
use crate::edit::EditCoordinator;
use crate::error::{TableError, TableResult};
use crate::expand::{ExpandAllReport, ExpansionSelectionEngine, LoadState};
use crate::handler::TableHandler;
use crate::key::{ChildKey, RowKey};
use crate::pagination::Pagination;
use crate::record::Record;
use crate::state::Rows;

/// Composes the table engines over one host row sequence.
#[derive(Clone)]
pub struct TableManager {
    rows: Rows,
    config: Arc<TableConfig>,
    edit: EditCoordinator,
    expansion: Option<ExpansionSelectionEngine>,
    dynamic_rows: Option<DynamicRowEngine>,
    pagination: Pagination,
}

impl TableManager {
    /// Create a manager over `rows`, sending every event to `handler`.
    pub fn new(rows: Rows, config: TableConfig, handler: Arc<dyn TableHandler>) -> Self {
        let config = Arc::new(config);

        let edit = EditCoordinator::new(rows.clone(), config.clone(), handler.clone());
        let expansion = config.needs_expansion_engine().then(|| {
            ExpansionSelectionEngine::new(rows.clone(), config.clone(), handler.clone())
        });
        let pagination = Pagination::new(rows.clone(), config.pagination, handler.clone());
        let dynamic_rows = config.dynamic_rows.clone().map(|dynamic| {
            DynamicRowEngine::new(rows.clone(), config.row_key.clone(), dynamic, handler)
                .with_pagination(pagination.clone())
        });

        log::debug!(
            "table manager ready: {} rows, expansion {}, dynamic rows {}",
            rows.len(),
            expansion.is_some(),
            dynamic_rows.is_some()
        );

        Self {
            rows,
            config,
            edit,
            expansion,
            dynamic_rows,
            pagination,
        }
    }

    /// The row sequence handle.
    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Edit sessions.
    pub fn edit(&self) -> &EditCoordinator {
        &self.edit
    }

    fn expansion_engine(&self) -> TableResult<&ExpansionSelectionEngine> {
        self.expansion.as_ref().ok_or_else(|| {
            log::debug!("expansion/selection engine not configured");
            TableError::ignored("expansion and selection are not configured")
        })
    }

    /// Row expansion.
    pub fn expand(&self) -> TableResult<ExpandApi<'_>> {
        self.expansion_engine().map(ExpandApi)
    }

    /// Top-level selection.
    pub fn selection(&self) -> TableResult<SelectionApi<'_>> {
        self.expansion_engine().map(SelectionApi)
    }

    /// Child selection.
    pub fn child_selection(&self) -> TableResult<ChildSelectionApi<'_>> {
        self.expansion_engine().map(ChildSelectionApi)
    }

    /// Structural row operations.
    pub fn dynamic_rows(&self) -> TableResult<&DynamicRowEngine> {
        self.dynamic_rows.as_ref().ok_or_else(|| {
            log::debug!("dynamic rows not configured");
            TableError::ignored("dynamic rows are not configured")
        })
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Expanded keys (empty without an expansion engine).
    pub fn expanded_keys(&self) -> Vec<RowKey> {
        self.expansion
            .as_ref()
            .map(ExpansionSelectionEngine::expanded_keys)
            .unwrap_or_default()
    }

    /// Selected keys (empty without a selection engine).
    pub fn checked_keys(&self) -> Vec<RowKey> {
        self.expansion
            .as_ref()
            .map(ExpansionSelectionEngine::checked_keys)
            .unwrap_or_default()
    }

    /// Clear top-level and child selections with a single event.
    pub fn clear_all_selections(&self) -> TableResult {
        self.expansion_engine()?.clear_all_selections()
    }
}

impl std::fmt::Debug for TableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableManager")
            .field("rows", &self.rows.len())
            .field("edit", &self.edit)
            .field("expansion", &self.expansion)
            .field("dynamic_rows", &self.dynamic_rows)
            .field("pagination", &self.pagination)
            .finish()
    }
}

/// Expansion group of a [`TableManager`].
#[derive(Debug, Clone, Copy)]
pub struct ExpandApi<'a>(&'a ExpansionSelectionEngine);

impl ExpandApi<'_> {
    pub async fn expand(&self, key: &RowKey) -> TableResult {
        self.0.expand(key).await
    }

    pub fn collapse(&self, key: &RowKey) -> TableResult {
        self.0.collapse(key)
    }

    pub async fn toggle(&self, key: &RowKey) -> TableResult {
        self.0.toggle(key).await
    }

    pub async fn expand_all(&self) -> TableResult<ExpandAllReport> {
        self.0.expand_all().await
    }

    pub fn collapse_all(&self) -> TableResult {
        self.0.collapse_all()
    }

    pub async fn refresh(&self, key: &RowKey) -> TableResult {
        self.0.refresh(key).await
    }

    pub fn clear_cache(&self, key: Option<&RowKey>) -> TableResult {
        self.0.clear_cache(key)
    }

    pub fn is_expanded(&self, key: &RowKey) -> bool {
        self.0.is_expanded(key)
    }

    pub fn is_loading(&self, key: &RowKey) -> bool {
        self.0.is_loading(key)
    }

    pub fn load_state(&self, key: &RowKey) -> LoadState {
        self.0.load_state(key)
    }

    pub fn children(&self, key: &RowKey) -> Vec<Record> {
        self.0.children(key)
    }

    pub fn expanded_keys(&self) -> Vec<RowKey> {
        self.0.expanded_keys()
    }
}

/// Top-level selection group of a [`TableManager`].
#[derive(Debug, Clone, Copy)]
pub struct SelectionApi<'a>(&'a ExpansionSelectionEngine);

impl SelectionApi<'_> {
    pub fn select(&self, key: &RowKey) -> TableResult {
        self.0.select(key)
    }

    pub fn unselect(&self, key: &RowKey) -> TableResult {
        self.0.unselect(key)
    }

    pub fn select_rows(&self, keys: &[RowKey]) -> TableResult {
        self.0.select_rows(keys)
    }

    pub fn unselect_rows(&self, keys: &[RowKey]) -> TableResult {
        self.0.unselect_rows(keys)
    }

    pub fn select_all(&self) -> TableResult {
        self.0.select_all()
    }

    pub fn invert(&self) -> TableResult {
        self.0.invert_selection()
    }

    pub fn clear(&self) -> TableResult {
        self.0.clear_selection()
    }

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.0.is_selected(key)
    }

    pub fn is_all_selected(&self) -> bool {
        self.0.is_all_selected()
    }

    pub fn is_indeterminate(&self) -> bool {
        self.0.is_indeterminate()
    }

    /// Selected rows, read from the live rows.
    pub fn selected(&self) -> Vec<Record> {
        self.0.selected()
    }

    pub fn checked_keys(&self) -> Vec<RowKey> {
        self.0.checked_keys()
    }
}

/// Child selection group of a [`TableManager`].
#[derive(Debug, Clone, Copy)]
pub struct ChildSelectionApi<'a>(&'a ExpansionSelectionEngine);

impl ChildSelectionApi<'_> {
    pub fn select(&self, parent: &RowKey, child: &ChildKey) -> TableResult {
        self.0.child_select(parent, child)
    }

    pub fn unselect(&self, parent: &RowKey, child: &ChildKey) -> TableResult {
        self.0.child_unselect(parent, child)
    }

    pub fn select_all(&self, parent: &RowKey) -> TableResult {
        self.0.child_select_all(parent)
    }

    pub fn clear(&self, parent: &RowKey) -> TableResult {
        self.0.child_clear(parent)
    }

    pub fn is_selected(&self, parent: &RowKey, child: &ChildKey) -> bool {
        self.0.is_child_selected(parent, child)
    }

    pub fn is_all_selected(&self, parent: &RowKey) -> bool {
        self.0.is_all_children_selected(parent)
    }

    /// Selected children of `parent`, read from the cached children.
    pub fn selected(&self, parent: &RowKey) -> Vec<Record> {
        self.0.child_selected(parent)
    }

    pub fn keys(&self, parent: &RowKey) -> Vec<ChildKey> {
        self.0.child_keys(parent)
    }

    /// Selected child keys of every parent.
    pub fn all(&self) -> BTreeMap<RowKey, Vec<ChildKey>> {
        self.0.child_selections()
    }
}
