//! Table configuration types.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::dynamic_rows::DynamicRowsConfig;
use crate::handler::ExpandLoader;
use crate::key::{RowKey, RowKeyResolver};
use crate::pagination::PaginationConfig;
use crate::record::Record;

/// Predicate over a top-level row.
pub type RowPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// Predicate over a child row and its parent.
pub type ChildPredicate = Arc<dyn Fn(&Record, &Record) -> bool + Send + Sync>;

/// Which edit engine `edit.start` drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Editing disabled.
    #[default]
    None,
    /// Single cells (row + column).
    Cell,
    /// Whole rows inline.
    Row,
    /// Whole rows in a modal form.
    Modal,
    /// Cells when a column is given, whole rows otherwise.
    Both,
}

/// Cascade rule between top-level and child selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkagePolicy {
    /// Parent and child selections evolve independently.
    #[default]
    None,
    /// (De)selecting a parent (de)selects its loaded, checkable children.
    ParentToChild,
    /// A parent is selected iff all its loaded, checkable children are.
    ChildToParent,
    /// Parent-to-child first, then one child-to-parent pass.
    Bidirectional,
}

impl LinkagePolicy {
    /// Parent changes cascade down.
    pub fn cascades_down(self) -> bool {
        matches!(self, Self::ParentToChild | Self::Bidirectional)
    }

    /// Child changes re-derive the parent.
    pub fn derives_parent(self) -> bool {
        matches!(self, Self::ChildToParent | Self::Bidirectional)
    }
}

/// Construction parameters of a [`TableManager`](crate::manager::TableManager).
///
/// # Example
///
/// ```
/// use tablestate::config::{EditMode, LinkagePolicy, TableConfig};
///
/// let config = TableConfig::new()
///     .with_edit_mode(EditMode::Row)
///     .with_selection()
///     .with_max_selection(10)
///     .with_linkage(LinkagePolicy::Bidirectional);
/// ```
#[derive(Clone)]
pub struct TableConfig {
    /// Resolves the key of top-level rows. Default: field `id`.
    pub row_key: RowKeyResolver,
    /// Resolves the key of child rows. Default: field `id`, then `key`.
    pub child_row_key: RowKeyResolver,

    /// Enables editing.
    pub editable: bool,
    /// Edit engine selection.
    pub edit_mode: EditMode,

    /// Enables row expansion.
    pub expandable: bool,
    /// Lazy child loader, invoked on first expansion of a row.
    pub on_load_expand_data: Option<Arc<dyn ExpandLoader>>,
    /// Rows that may be expanded (all when `None`).
    pub row_expandable: Option<RowPredicate>,
    /// Keys expanded at construction.
    pub default_expanded_keys: Vec<RowKey>,

    /// Enables top-level selection.
    pub enable_selection: bool,
    /// Rows that may be selected (all when `None`).
    pub row_checkable: Option<RowPredicate>,
    /// Maximum number of selected rows (unlimited when `None`).
    pub max_selection: Option<usize>,
    /// Keys selected at construction.
    pub default_checked_keys: Vec<RowKey>,

    /// Enables child selection.
    pub enable_child_selection: bool,
    /// Children that may be selected (all when `None`).
    pub child_row_checkable: Option<ChildPredicate>,

    /// Enables parent/child linkage.
    pub enable_parent_child_link: bool,
    /// Linkage rule, effective only with `enable_parent_child_link`.
    pub parent_child_link_mode: LinkagePolicy,

    /// Enables structural row operations.
    pub dynamic_rows: Option<DynamicRowsConfig>,
    /// Enables client-side pagination.
    pub pagination: Option<PaginationConfig>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_key: RowKeyResolver::default(),
            child_row_key: RowKeyResolver::child_default(),
            editable: false,
            edit_mode: EditMode::None,
            expandable: false,
            on_load_expand_data: None,
            row_expandable: None,
            default_expanded_keys: Vec::new(),
            enable_selection: false,
            row_checkable: None,
            max_selection: None,
            default_checked_keys: Vec::new(),
            enable_child_selection: false,
            child_row_checkable: None,
            enable_parent_child_link: false,
            parent_child_link_mode: LinkagePolicy::None,
            dynamic_rows: None,
            pagination: None,
        }
    }
}

impl TableConfig {
    /// Create a config with everything disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row key resolver.
    pub fn with_row_key(mut self, resolver: RowKeyResolver) -> Self {
        self.row_key = resolver;
        self
    }

    /// Set the child row key resolver.
    pub fn with_child_row_key(mut self, resolver: RowKeyResolver) -> Self {
        self.child_row_key = resolver;
        self
    }

    /// Enable editing with the given mode.
    pub fn with_edit_mode(mut self, mode: EditMode) -> Self {
        self.editable = mode != EditMode::None;
        self.edit_mode = mode;
        self
    }

    /// Enable expansion with a lazy loader.
    pub fn with_expand_loader(mut self, loader: impl ExpandLoader + 'static) -> Self {
        self.expandable = true;
        self.on_load_expand_data = Some(Arc::new(loader));
        self
    }

    /// Restrict which rows may expand.
    pub fn with_row_expandable<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.row_expandable = Some(Arc::new(f));
        self
    }

    /// Rows expanded at construction.
    pub fn with_default_expanded_keys(mut self, keys: Vec<RowKey>) -> Self {
        self.expandable = true;
        self.default_expanded_keys = keys;
        self
    }

    /// Enable top-level selection.
    pub fn with_selection(mut self) -> Self {
        self.enable_selection = true;
        self
    }

    /// Restrict which rows may be selected.
    pub fn with_row_checkable<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.row_checkable = Some(Arc::new(f));
        self
    }

    /// Cap the number of selected rows.
    pub fn with_max_selection(mut self, max: usize) -> Self {
        self.max_selection = Some(max);
        self
    }

    /// Rows selected at construction.
    pub fn with_default_checked_keys(mut self, keys: Vec<RowKey>) -> Self {
        self.default_checked_keys = keys;
        self
    }

    /// Enable child selection.
    pub fn with_child_selection(mut self) -> Self {
        self.enable_child_selection = true;
        self
    }

    /// Restrict which children may be selected.
    pub fn with_child_row_checkable<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record, &Record) -> bool + Send + Sync + 'static,
    {
        self.child_row_checkable = Some(Arc::new(f));
        self
    }

    /// Enable parent/child linkage with the given policy.
    pub fn with_linkage(mut self, policy: LinkagePolicy) -> Self {
        self.enable_parent_child_link = policy != LinkagePolicy::None;
        self.parent_child_link_mode = policy;
        self
    }

    /// Enable structural row operations.
    pub fn with_dynamic_rows(mut self, config: DynamicRowsConfig) -> Self {
        self.dynamic_rows = Some(config);
        self
    }

    /// Enable pagination.
    pub fn with_pagination(mut self, config: PaginationConfig) -> Self {
        self.pagination = Some(config);
        self
    }

    /// Linkage policy in effect.
    pub fn linkage(&self) -> LinkagePolicy {
        if self.enable_parent_child_link {
            self.parent_child_link_mode
        } else {
            LinkagePolicy::None
        }
    }

    /// Whether the expansion/selection engine is needed at all.
    pub fn needs_expansion_engine(&self) -> bool {
        self.expandable || self.enable_selection || self.enable_child_selection
    }

    pub(crate) fn is_row_expandable(&self, row: &Record) -> bool {
        self.row_expandable.as_ref().is_none_or(|f| f(row))
    }

    pub(crate) fn is_row_checkable(&self, row: &Record) -> bool {
        self.row_checkable.as_ref().is_none_or(|f| f(row))
    }

    pub(crate) fn is_child_checkable(&self, child: &Record, parent: &Record) -> bool {
        self.child_row_checkable
            .as_ref()
            .is_none_or(|f| f(child, parent))
    }
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("row_key", &self.row_key)
            .field("child_row_key", &self.child_row_key)
            .field("editable", &self.editable)
            .field("edit_mode", &self.edit_mode)
            .field("expandable", &self.expandable)
            .field("has_loader", &self.on_load_expand_data.is_some())
            .field("default_expanded_keys", &self.default_expanded_keys)
            .field("enable_selection", &self.enable_selection)
            .field("max_selection", &self.max_selection)
            .field("default_checked_keys", &self.default_checked_keys)
            .field("enable_child_selection", &self.enable_child_selection)
            .field("linkage", &self.linkage())
            .field("dynamic_rows", &self.dynamic_rows)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_requires_enable_flag() {
        let mut config = TableConfig::new().with_linkage(LinkagePolicy::ChildToParent);
        assert_eq!(config.linkage(), LinkagePolicy::ChildToParent);

        config.enable_parent_child_link = false;
        assert_eq!(config.linkage(), LinkagePolicy::None);
    }

    #[test]
    fn test_policy_deserializes_from_camel_case() {
        let policy: LinkagePolicy = serde_json::from_str("\"parentToChild\"").unwrap();
        assert_eq!(policy, LinkagePolicy::ParentToChild);
        let mode: EditMode = serde_json::from_str("\"modal\"").unwrap();
        assert_eq!(mode, EditMode::Modal);
    }
}
