//! Expansion and selection engine.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use futures::future::join_all;

use crate::config::{LinkagePolicy, TableConfig};
use crate::error::{TableError, TableResult};
use crate::handler::TableHandler;
use crate::key::{ChildKey, RowKey};
use crate::record::Record;
use crate::state::Rows;

use super::load::{ExpandAllReport, LoadState};
use super::selection::Selection;

/// Internal state for the expansion/selection engine.
#[derive(Debug, Default)]
struct ExpandInner {
    /// Expanded keys, in expansion order.
    expanded: Vec<RowKey>,
    /// Cached children per parent (kept across collapse).
    children: HashMap<RowKey, Vec<Record>>,
    /// Load state per parent.
    load_states: HashMap<RowKey, LoadState>,
    /// Ticket of the in-flight load per parent.
    pending: HashMap<RowKey, u64>,
    /// Pending loads whose row should expand once loaded.
    expand_intent: BTreeSet<RowKey>,
    /// Next load ticket.
    next_ticket: u64,
    /// Top-level selection.
    selection: Selection,
    /// Child selection per parent.
    child_selection: BTreeMap<RowKey, Selection>,
    /// Row revision the keys above were last pruned against.
    seen_revision: u64,
}

impl ExpandInner {
    fn is_expanded(&self, key: &RowKey) -> bool {
        self.expanded.contains(key)
    }

    fn child_selection_map(&self) -> BTreeMap<RowKey, Vec<ChildKey>> {
        self.child_selection
            .iter()
            .filter(|(_, sel)| !sel.is_empty())
            .map(|(parent, sel)| (parent.clone(), sel.keys().to_vec()))
            .collect()
    }
}

/// What a call changed, collected under the lock and emitted after it.
#[derive(Debug, Default)]
struct Changes {
    selection: bool,
    child_parents: BTreeSet<RowKey>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        !self.selection && self.child_parents.is_empty()
    }
}

/// How a load request was resolved before any loader ran.
enum Begin {
    /// Children are already cached (or there is no loader).
    Ready,
    /// A load for this key is already in flight.
    Pending,
    /// A new load started with this ticket.
    Started(u64),
}

/// How a load settled.
enum Settled {
    /// Children cached; `expanded` if the row was expanded as a result.
    Loaded { expanded: bool },
    /// The result was dropped because the load was superseded.
    Stale,
    /// The row was deleted while loading.
    RowGone,
    /// The loader failed.
    Failed(String),
}

/// Expand/collapse with lazy child loading, plus parent/child selection.
///
/// All state lives behind one lock that is never held across an `.await`
/// or a host callback. Loads for different keys may be in flight at the
/// same time; a second request for a key whose load is pending is a no-op.
///
/// # Example
///
/// ```ignore
/// let engine = ExpansionSelectionEngine::new(rows.clone(), config, handler);
///
/// engine.expand(&RowKey::from(5)).await?;
/// engine.child_select_all(&RowKey::from(5))?;
/// assert!(engine.is_selected(&RowKey::from(5)));
/// ```
#[derive(Clone)]
pub struct ExpansionSelectionEngine {
    inner: Arc<RwLock<ExpandInner>>,
    rows: Rows,
    config: Arc<TableConfig>,
    handler: Arc<dyn TableHandler>,
}

impl ExpansionSelectionEngine {
    /// Create an engine over the host rows, applying the configured defaults.
    pub fn new(rows: Rows, config: Arc<TableConfig>, handler: Arc<dyn TableHandler>) -> Self {
        let mut inner = ExpandInner {
            seen_revision: rows.revision(),
            ..ExpandInner::default()
        };
        for key in &config.default_expanded_keys {
            if !inner.expanded.contains(key) {
                inner.expanded.push(key.clone());
            }
        }
        if config.enable_selection {
            let cap = config.max_selection.unwrap_or(usize::MAX);
            inner.selection =
                Selection::from_keys(config.default_checked_keys.iter().take(cap).cloned());
        }
        Self {
            inner: Arc::new(RwLock::new(inner)),
            rows,
            config,
            handler,
        }
    }

    fn write(&self) -> TableResult<RwLockWriteGuard<'_, ExpandInner>> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| TableError::ignored("expansion state unavailable"))?;
        self.prune(&mut guard);
        Ok(guard)
    }

    fn read<R>(&self, f: impl FnOnce(&ExpandInner) -> R) -> Option<R> {
        let stale = self
            .inner
            .read()
            .is_ok_and(|guard| guard.seen_revision != self.rows.revision());
        if stale && let Ok(mut guard) = self.inner.write() {
            self.prune(&mut guard);
        }
        self.inner.read().ok().map(|guard| f(&*guard))
    }

    /// Forget every key whose row left the host rows since the last call.
    ///
    /// In-flight loads are left alone; they settle as `RowGone`.
    fn prune(&self, inner: &mut ExpandInner) {
        let revision = self.rows.revision();
        if inner.seen_revision == revision {
            return;
        }
        inner.seen_revision = revision;

        let live: HashSet<RowKey> = self.rows.with(|rows| {
            rows.iter()
                .map(|row| self.config.row_key.resolve(row))
                .collect()
        });
        let dropped = inner.selection.retain(|k| live.contains(k));
        inner.expanded.retain(|k| live.contains(k));
        inner.child_selection.retain(|k, _| live.contains(k));
        inner.children.retain(|k, _| live.contains(k));
        inner.load_states.retain(|k, _| live.contains(k));
        if !dropped.is_empty() {
            log::debug!("pruned {} selected keys of removed rows", dropped.len());
        }
    }

    fn find_row(&self, key: &RowKey) -> Option<Record> {
        self.rows.with(|rows| {
            self.config
                .row_key
                .position(rows, key)
                .map(|index| rows[index].clone())
        })
    }

    fn policy(&self) -> LinkagePolicy {
        self.config.linkage()
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    fn begin_load(&self, inner: &mut ExpandInner, key: &RowKey, expand_after: bool) -> Begin {
        if inner.pending.contains_key(key) {
            if expand_after {
                inner.expand_intent.insert(key.clone());
            }
            return Begin::Pending;
        }
        if inner.children.contains_key(key) || self.config.on_load_expand_data.is_none() {
            return Begin::Ready;
        }

        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.pending.insert(key.clone(), ticket);
        inner.load_states.insert(key.clone(), LoadState::Loading);
        if expand_after {
            inner.expand_intent.insert(key.clone());
        }
        Begin::Started(ticket)
    }

    async fn run_load(&self, key: &RowKey, row: &Record, ticket: u64) -> Settled {
        let Some(loader) = self.config.on_load_expand_data.clone() else {
            return Settled::Stale;
        };

        log::debug!("loading children of row {}", key);
        let result = loader.load(row).await;

        let row_exists = self.find_row(key).is_some();
        let Ok(mut inner) = self.inner.write() else {
            return Settled::Stale;
        };

        if inner.pending.get(key) != Some(&ticket) {
            log::debug!("load of row {} superseded, result dropped", key);
            return Settled::Stale;
        }
        inner.pending.remove(key);
        let expand_after = inner.expand_intent.remove(key);

        if !row_exists {
            log::debug!("row {} deleted while loading, result dropped", key);
            inner.load_states.remove(key);
            return Settled::RowGone;
        }

        match result {
            Ok(children) => {
                log::debug!("row {} loaded {} children", key, children.len());
                inner.children.insert(key.clone(), children);
                inner.load_states.insert(key.clone(), LoadState::Ready);
                if self.config.enable_child_selection {
                    inner.child_selection.entry(key.clone()).or_default();
                }
                let expanded = expand_after && !inner.is_expanded(key);
                if expanded {
                    inner.expanded.push(key.clone());
                }
                Settled::Loaded { expanded }
            }
            Err(e) => {
                log::warn!("loading children of row {} failed: {}", key, e);
                inner
                    .load_states
                    .insert(key.clone(), LoadState::Failed(e.message.clone()));
                Settled::Failed(e.message)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expand/Collapse
    // -------------------------------------------------------------------------

    /// Expand a row, loading its children on first expansion.
    ///
    /// Idempotent: expanding an expanded row, or a row whose load is already
    /// in flight, does nothing. A failed load leaves the row collapsed and
    /// returns [`TableError::LoadFailed`].
    pub async fn expand(&self, key: &RowKey) -> TableResult {
        if !self.config.expandable {
            log::debug!("expand of {} ignored: expansion disabled", key);
            return Err(TableError::ignored("expansion is disabled"));
        }
        let Some(row) = self.find_row(key) else {
            log::debug!("expand: row {} not found", key);
            return Err(TableError::row_not_found(key));
        };
        if !self.config.is_row_expandable(&row) {
            log::debug!("expand of {} ignored: row not expandable", key);
            return Err(TableError::ignored(format!("row {key} is not expandable")));
        }

        let begin = {
            let mut inner = self.write()?;
            if inner.is_expanded(key) {
                return Ok(());
            }
            let begin = self.begin_load(&mut inner, key, true);
            if let Begin::Ready = begin {
                inner.expand_intent.remove(key);
                inner.expanded.push(key.clone());
            }
            begin
        };

        match begin {
            Begin::Pending => {
                log::debug!("expand of {} deduplicated: load in flight", key);
                Ok(())
            }
            Begin::Ready => {
                self.emit_expand_change(Some(&row), Some(true));
                Ok(())
            }
            Begin::Started(ticket) => match self.run_load(key, &row, ticket).await {
                Settled::Loaded { expanded } => {
                    if expanded {
                        self.emit_expand_change(Some(&row), Some(true));
                    }
                    Ok(())
                }
                Settled::Stale => Ok(()),
                Settled::RowGone => Err(TableError::row_not_found(key)),
                Settled::Failed(reason) => Err(TableError::LoadFailed {
                    key: key.clone(),
                    reason,
                }),
            },
        }
    }

    /// Collapse a row. Its cached children are kept.
    ///
    /// Collapsing a row whose load is in flight cancels the pending expand;
    /// the children are still cached when they arrive.
    pub fn collapse(&self, key: &RowKey) -> TableResult {
        let collapsed = {
            let mut inner = self.write()?;
            inner.expand_intent.remove(key);
            let before = inner.expanded.len();
            inner.expanded.retain(|k| k != key);
            inner.expanded.len() != before
        };
        if collapsed {
            let row = self.find_row(key);
            self.emit_expand_change(row.as_ref(), Some(false));
        } else {
            log::debug!("collapse: row {} was not expanded", key);
        }
        Ok(())
    }

    /// Expand a collapsed row, or collapse an expanded one.
    pub async fn toggle(&self, key: &RowKey) -> TableResult {
        if self.is_expanded(key) {
            self.collapse(key)
        } else {
            self.expand(key).await
        }
    }

    /// Expand every expandable row.
    ///
    /// Loaders for rows without cached children run concurrently and fail
    /// independently. Rows whose loader fails stay collapsed and are listed
    /// in the report.
    pub async fn expand_all(&self) -> TableResult<ExpandAllReport> {
        if !self.config.expandable {
            return Err(TableError::ignored("expansion is disabled"));
        }

        let rows: Vec<(RowKey, Record)> = self.rows.with(|rows| {
            rows.iter()
                .filter(|row| self.config.is_row_expandable(row))
                .map(|row| (self.config.row_key.resolve(row), row.clone()))
                .collect()
        });

        let mut report = ExpandAllReport::default();
        let mut loads = Vec::new();
        {
            let mut inner = self.write()?;
            for (key, row) in &rows {
                if inner.is_expanded(key) {
                    continue;
                }
                match self.begin_load(&mut inner, key, true) {
                    Begin::Ready => {
                        inner.expand_intent.remove(key);
                        inner.expanded.push(key.clone());
                        report.expanded.push(key.clone());
                    }
                    Begin::Pending => {}
                    Begin::Started(ticket) => loads.push((key.clone(), row.clone(), ticket)),
                }
            }
        }

        let settled = join_all(
            loads
                .iter()
                .map(|(key, row, ticket)| self.run_load(key, row, *ticket)),
        )
        .await;

        for ((key, _, _), outcome) in loads.into_iter().zip(settled) {
            match outcome {
                Settled::Loaded { expanded: true } => report.expanded.push(key),
                Settled::Failed(reason) => report.failed.push((key, reason)),
                _ => {}
            }
        }

        // Report in row order.
        let order: HashMap<&RowKey, usize> =
            rows.iter().enumerate().map(|(i, (k, _))| (k, i)).collect();
        report
            .expanded
            .sort_by_key(|k| order.get(k).copied().unwrap_or(usize::MAX));
        report
            .failed
            .sort_by_key(|(k, _)| order.get(k).copied().unwrap_or(usize::MAX));

        if !report.expanded.is_empty() {
            self.emit_expand_change(None, None);
        }
        if !report.is_complete() {
            log::warn!(
                "expand all: {} of {} rows failed to load",
                report.failed.len(),
                rows.len()
            );
        }
        Ok(report)
    }

    /// Collapse every row. Cached children are kept.
    pub fn collapse_all(&self) -> TableResult {
        let changed = {
            let mut inner = self.write()?;
            inner.expand_intent.clear();
            let changed = !inner.expanded.is_empty();
            inner.expanded.clear();
            changed
        };
        if changed {
            self.emit_expand_change(None, None);
        }
        Ok(())
    }

    /// Drop the cached children of a row and load them again.
    ///
    /// The row's expanded state is left as it is.
    pub async fn refresh(&self, key: &RowKey) -> TableResult {
        let Some(row) = self.find_row(key) else {
            return Err(TableError::row_not_found(key));
        };

        let begin = {
            let mut inner = self.write()?;
            inner.children.remove(key);
            inner.load_states.remove(key);
            // Supersede any in-flight load.
            inner.pending.remove(key);
            self.begin_load(&mut inner, key, false)
        };

        match begin {
            Begin::Started(ticket) => match self.run_load(key, &row, ticket).await {
                Settled::Failed(reason) => Err(TableError::LoadFailed {
                    key: key.clone(),
                    reason,
                }),
                Settled::RowGone => Err(TableError::row_not_found(key)),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Evict cached children of one row, or of every row.
    ///
    /// In-flight loads for evicted rows are superseded and their results
    /// dropped.
    pub fn clear_cache(&self, key: Option<&RowKey>) -> TableResult {
        let mut inner = self.write()?;
        match key {
            Some(key) => {
                inner.children.remove(key);
                inner.load_states.remove(key);
                inner.pending.remove(key);
                inner.expand_intent.remove(key);
            }
            None => {
                inner.children.clear();
                inner.load_states.clear();
                inner.pending.clear();
                inner.expand_intent.clear();
            }
        }
        Ok(())
    }

    /// Check if a row is expanded.
    pub fn is_expanded(&self, key: &RowKey) -> bool {
        self.read(|g| g.is_expanded(key)).unwrap_or(false)
    }

    /// Expanded keys, in expansion order.
    pub fn expanded_keys(&self) -> Vec<RowKey> {
        self.read(|g| g.expanded.clone()).unwrap_or_default()
    }

    /// Load state of a row's children.
    pub fn load_state(&self, key: &RowKey) -> LoadState {
        self.read(|g| g.load_states.get(key).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Check if a row's children are loading.
    pub fn is_loading(&self, key: &RowKey) -> bool {
        self.read(|g| g.pending.contains_key(key)).unwrap_or(false)
    }

    /// Cached children of a row (empty if not loaded).
    pub fn children(&self, key: &RowKey) -> Vec<Record> {
        self.read(|g| g.children.get(key).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Linkage
    // -------------------------------------------------------------------------

    /// Loaded children of `parent` that may be selected, with their keys.
    fn checkable_children(
        &self,
        inner: &ExpandInner,
        parent_key: &RowKey,
        parent: &Record,
    ) -> Vec<(ChildKey, Record)> {
        inner
            .children
            .get(parent_key)
            .map(|children| {
                children
                    .iter()
                    .filter(|child| self.config.is_child_checkable(child, parent))
                    .map(|child| (self.config.child_row_key.resolve(child), child.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent-to-child pass: mirror the parent's state onto its children.
    fn cascade_down(&self, inner: &mut ExpandInner, key: &RowKey, selected: bool, changes: &mut Changes) {
        if !self.config.enable_child_selection || !self.policy().cascades_down() {
            return;
        }
        let Some(parent) = self.find_row(key) else {
            return;
        };
        let children = self.checkable_children(inner, key, &parent);
        let child_sel = inner.child_selection.entry(key.clone()).or_default();
        let mut changed = false;
        for (child_key, _) in children {
            changed |= if selected {
                child_sel.insert(child_key)
            } else {
                child_sel.remove(&child_key)
            };
        }
        if changed {
            changes.child_parents.insert(key.clone());
        }
    }

    /// Child-to-parent pass: select the parent iff all its checkable
    /// children are selected. Never cascades back down.
    fn derive_up(&self, inner: &mut ExpandInner, key: &RowKey, changes: &mut Changes) {
        if !self.config.enable_selection
            || !self.config.enable_child_selection
            || !self.policy().derives_parent()
        {
            return;
        }
        let Some(parent) = self.find_row(key) else {
            return;
        };
        let children = self.checkable_children(inner, key, &parent);
        if children.is_empty() {
            return;
        }

        let all_selected = inner
            .child_selection
            .get(key)
            .is_some_and(|sel| children.iter().all(|(child_key, _)| sel.contains(child_key)));
        let parent_selected = inner.selection.contains(key);

        if all_selected && !parent_selected {
            if !self.config.is_row_checkable(&parent) {
                log::debug!("linkage: parent {} is not checkable", key);
                return;
            }
            if self
                .config
                .max_selection
                .is_some_and(|max| inner.selection.len() >= max)
            {
                log::info!("linkage: selecting parent {} would exceed max selection", key);
                return;
            }
            inner.selection.insert(key.clone());
            changes.selection = true;
        } else if !all_selected && parent_selected {
            inner.selection.remove(key);
            changes.selection = true;
        }
    }

    /// Set a parent's selected state and run the linkage passes.
    fn apply_parent(
        &self,
        inner: &mut ExpandInner,
        key: &RowKey,
        selected: bool,
        changes: &mut Changes,
    ) -> TableResult {
        if selected {
            if inner.selection.contains(key) {
                return Ok(());
            }
            if let Some(max) = self.config.max_selection
                && inner.selection.len() >= max
            {
                log::info!("select of {} ignored: max selection {} reached", key, max);
                return Err(TableError::ignored(format!(
                    "max selection of {max} reached"
                )));
            }
            inner.selection.insert(key.clone());
        } else if !inner.selection.remove(key) {
            return Ok(());
        }
        changes.selection = true;

        self.cascade_down(inner, key, selected, changes);
        if self.policy() == LinkagePolicy::Bidirectional {
            self.derive_up(inner, key, changes);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    fn check_selectable(&self, key: &RowKey) -> TableResult<Record> {
        if !self.config.enable_selection {
            log::debug!("select of {} ignored: selection disabled", key);
            return Err(TableError::ignored("selection is disabled"));
        }
        let Some(row) = self.find_row(key) else {
            log::debug!("select: row {} not found", key);
            return Err(TableError::row_not_found(key));
        };
        if !self.config.is_row_checkable(&row) {
            log::debug!("select of {} ignored: row not checkable", key);
            return Err(TableError::ignored(format!("row {key} is not checkable")));
        }
        Ok(row)
    }

    /// Select a row.
    ///
    /// Refused for rows that are not checkable and when `max_selection` is
    /// reached.
    pub fn select(&self, key: &RowKey) -> TableResult {
        self.check_selectable(key)?;
        let mut changes = Changes::default();
        let result = {
            let mut inner = self.write()?;
            self.apply_parent(&mut inner, key, true, &mut changes)
        };
        self.emit(changes);
        result
    }

    /// Deselect a row.
    pub fn unselect(&self, key: &RowKey) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            self.apply_parent(&mut inner, key, false, &mut changes)?;
        }
        self.emit(changes);
        Ok(())
    }

    /// Select several rows, in order, until `max_selection` is reached.
    ///
    /// Rows that are missing or not checkable are skipped.
    pub fn select_rows(&self, keys: &[RowKey]) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        let mut changes = Changes::default();
        let mut capped = false;
        {
            let mut inner = self.write()?;
            for key in keys {
                let Some(row) = self.find_row(key) else {
                    continue;
                };
                if !self.config.is_row_checkable(&row) {
                    continue;
                }
                if self.apply_parent(&mut inner, key, true, &mut changes).is_err() {
                    capped = true;
                    break;
                }
            }
        }
        self.emit(changes);
        if capped {
            return Err(TableError::ignored("max selection reached"));
        }
        Ok(())
    }

    /// Deselect several rows.
    pub fn unselect_rows(&self, keys: &[RowKey]) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            for key in keys {
                self.apply_parent(&mut inner, key, false, &mut changes)?;
            }
        }
        self.emit(changes);
        Ok(())
    }

    fn replace_selection(&self, keys: Vec<RowKey>) -> TableResult {
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            let (added, removed) = inner.selection.replace(keys);
            if !added.is_empty() || !removed.is_empty() {
                changes.selection = true;
            }
            for key in &removed {
                self.cascade_down(&mut inner, key, false, &mut changes);
            }
            for key in &added {
                self.cascade_down(&mut inner, key, true, &mut changes);
            }
            if self.policy() == LinkagePolicy::Bidirectional {
                for key in removed.iter().chain(&added) {
                    self.derive_up(&mut inner, key, &mut changes);
                }
            }
        }
        self.emit(changes);
        Ok(())
    }

    fn checkable_keys(&self) -> Vec<RowKey> {
        self.rows.with(|rows| {
            rows.iter()
                .filter(|row| self.config.is_row_checkable(row))
                .map(|row| self.config.row_key.resolve(row))
                .collect()
        })
    }

    /// Select every checkable row.
    ///
    /// With `max_selection` set, only the first `max_selection` checkable
    /// rows in row order are selected.
    pub fn select_all(&self) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        let mut keys = self.checkable_keys();
        if let Some(max) = self.config.max_selection
            && keys.len() > max
        {
            log::info!("select all capped at {} of {} rows", max, keys.len());
            keys.truncate(max);
        }
        self.replace_selection(keys)
    }

    /// Select exactly the checkable rows that are not selected now (capped).
    pub fn invert_selection(&self) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        let current = self.checked_keys();
        let mut keys: Vec<RowKey> = self
            .checkable_keys()
            .into_iter()
            .filter(|k| !current.contains(k))
            .collect();
        if let Some(max) = self.config.max_selection {
            keys.truncate(max);
        }
        self.replace_selection(keys)
    }

    /// Deselect every row.
    pub fn clear_selection(&self) -> TableResult {
        if !self.config.enable_selection {
            return Err(TableError::ignored("selection is disabled"));
        }
        self.replace_selection(Vec::new())
    }

    /// Clear top-level and all child selections with a single event.
    pub fn clear_all_selections(&self) -> TableResult {
        let changed = {
            let mut inner = self.write()?;
            let had_children = inner.child_selection.values().any(|sel| !sel.is_empty());
            let had_parents = !inner.selection.clear().is_empty();
            for sel in inner.child_selection.values_mut() {
                sel.clear();
            }
            had_children || had_parents
        };
        if changed {
            self.emit(Changes {
                selection: true,
                child_parents: BTreeSet::new(),
            });
        }
        Ok(())
    }

    /// Check if a row is selected.
    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.read(|g| g.selection.contains(key)).unwrap_or(false)
    }

    /// Selected keys, in selection order.
    pub fn checked_keys(&self) -> Vec<RowKey> {
        self.read(|g| g.selection.keys().to_vec()).unwrap_or_default()
    }

    /// Selected rows, derived from the live rows (in row order).
    pub fn selected(&self) -> Vec<Record> {
        let keys = self.checked_keys();
        self.rows_for(&keys)
    }

    fn rows_for(&self, keys: &[RowKey]) -> Vec<Record> {
        self.rows.with(|rows| {
            rows.iter()
                .filter(|row| keys.contains(&self.config.row_key.resolve(row)))
                .cloned()
                .collect()
        })
    }

    /// Check if every checkable row is selected.
    pub fn is_all_selected(&self) -> bool {
        let keys = self.checkable_keys();
        !keys.is_empty() && self.read(|g| keys.iter().all(|k| g.selection.contains(k))).unwrap_or(false)
    }

    /// Check if some, but not all, checkable rows are selected.
    pub fn is_indeterminate(&self) -> bool {
        let total = self.checkable_keys().len();
        let checked = self.read(|g| g.selection.len()).unwrap_or(0);
        checked > 0 && checked < total
    }

    // -------------------------------------------------------------------------
    // Child selection
    // -------------------------------------------------------------------------

    fn check_child_parent(&self, parent: &RowKey) -> TableResult<Record> {
        if !self.config.enable_child_selection {
            log::debug!("child selection of {} ignored: disabled", parent);
            return Err(TableError::ignored("child selection is disabled"));
        }
        self.find_row(parent).ok_or_else(|| {
            log::debug!("child selection: parent {} not found", parent);
            TableError::row_not_found(parent)
        })
    }

    fn find_child(&self, inner: &ExpandInner, parent: &RowKey, child: &ChildKey) -> Option<Record> {
        inner.children.get(parent).and_then(|children| {
            children
                .iter()
                .find(|c| &self.config.child_row_key.resolve(c) == child)
                .cloned()
        })
    }

    /// Select one child of a parent.
    pub fn child_select(&self, parent: &RowKey, child: &ChildKey) -> TableResult {
        let parent_row = self.check_child_parent(parent)?;
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            let Some(child_row) = self.find_child(&inner, parent, child) else {
                log::debug!("child {} of {} not loaded", child, parent);
                return Err(TableError::not_found(format!("child {child} of row {parent}")));
            };
            if !self.config.is_child_checkable(&child_row, &parent_row) {
                return Err(TableError::ignored(format!("child {child} is not checkable")));
            }
            if inner
                .child_selection
                .entry(parent.clone())
                .or_default()
                .insert(child.clone())
            {
                changes.child_parents.insert(parent.clone());
                self.derive_up(&mut inner, parent, &mut changes);
            }
        }
        self.emit(changes);
        Ok(())
    }

    /// Deselect one child of a parent.
    pub fn child_unselect(&self, parent: &RowKey, child: &ChildKey) -> TableResult {
        self.check_child_parent(parent)?;
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            let removed = inner
                .child_selection
                .get_mut(parent)
                .is_some_and(|sel| sel.remove(child));
            if removed {
                changes.child_parents.insert(parent.clone());
                self.derive_up(&mut inner, parent, &mut changes);
            }
        }
        self.emit(changes);
        Ok(())
    }

    /// Select every loaded, checkable child of a parent.
    pub fn child_select_all(&self, parent: &RowKey) -> TableResult {
        let parent_row = self.check_child_parent(parent)?;
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            let keys: Vec<ChildKey> = self
                .checkable_children(&inner, parent, &parent_row)
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            let (added, removed) = inner
                .child_selection
                .entry(parent.clone())
                .or_default()
                .replace(keys);
            if !added.is_empty() || !removed.is_empty() {
                changes.child_parents.insert(parent.clone());
            }
            self.derive_up(&mut inner, parent, &mut changes);
        }
        self.emit(changes);
        Ok(())
    }

    /// Deselect every child of a parent.
    pub fn child_clear(&self, parent: &RowKey) -> TableResult {
        self.check_child_parent(parent)?;
        let mut changes = Changes::default();
        {
            let mut inner = self.write()?;
            let cleared = inner
                .child_selection
                .get_mut(parent)
                .is_some_and(|sel| !sel.clear().is_empty());
            if cleared {
                changes.child_parents.insert(parent.clone());
            }
            self.derive_up(&mut inner, parent, &mut changes);
        }
        self.emit(changes);
        Ok(())
    }

    /// Selected child keys of a parent.
    pub fn child_keys(&self, parent: &RowKey) -> Vec<ChildKey> {
        self.read(|g| {
            g.child_selection
                .get(parent)
                .map(|sel| sel.keys().to_vec())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Check if a child is selected.
    pub fn is_child_selected(&self, parent: &RowKey, child: &ChildKey) -> bool {
        self.read(|g| {
            g.child_selection
                .get(parent)
                .is_some_and(|sel| sel.contains(child))
        })
        .unwrap_or(false)
    }

    /// Selected children of a parent, derived from the cached children.
    pub fn child_selected(&self, parent: &RowKey) -> Vec<Record> {
        self.read(|g| self.selected_children(g, parent))
            .unwrap_or_default()
    }

    fn selected_children(&self, inner: &ExpandInner, parent: &RowKey) -> Vec<Record> {
        let Some(sel) = inner.child_selection.get(parent) else {
            return Vec::new();
        };
        inner
            .children
            .get(parent)
            .map(|children| {
                children
                    .iter()
                    .filter(|c| sel.contains(&self.config.child_row_key.resolve(c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check if every loaded, checkable child of a parent is selected.
    pub fn is_all_children_selected(&self, parent: &RowKey) -> bool {
        let Some(parent_row) = self.find_row(parent) else {
            return false;
        };
        self.read(|g| {
            let children = self.checkable_children(g, parent, &parent_row);
            !children.is_empty()
                && g.child_selection
                    .get(parent)
                    .is_some_and(|sel| children.iter().all(|(k, _)| sel.contains(k)))
        })
        .unwrap_or(false)
    }

    /// Selected children of every parent, keyed by parent.
    pub fn child_selections(&self) -> BTreeMap<RowKey, Vec<ChildKey>> {
        self.read(|g| g.child_selection_map()).unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    fn emit_expand_change(&self, row: Option<&Record>, expanded: Option<bool>) {
        let keys = self.expanded_keys();
        self.handler.on_expand_change(&keys, row, expanded);
    }

    fn emit(&self, changes: Changes) {
        if changes.is_empty() {
            return;
        }

        let Some((checked, child_map, child_payloads)) = self.read(|g| {
            let payloads: Vec<(RowKey, Vec<ChildKey>, Vec<Record>)> = changes
                .child_parents
                .iter()
                .map(|parent| {
                    let keys = g
                        .child_selection
                        .get(parent)
                        .map(|sel| sel.keys().to_vec())
                        .unwrap_or_default();
                    (parent.clone(), keys, self.selected_children(g, parent))
                })
                .collect();
            (g.selection.keys().to_vec(), g.child_selection_map(), payloads)
        }) else {
            return;
        };

        for (parent, keys, rows) in &child_payloads {
            self.handler.on_child_selection_change(parent, keys, rows);
        }
        if changes.selection {
            let rows = self.rows_for(&checked);
            self.handler.on_selection_change(&checked, &rows, &child_map);
        }
    }
}

impl std::fmt::Debug for ExpansionSelectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionSelectionEngine")
            .field("expanded", &self.expanded_keys())
            .field("checked", &self.checked_keys())
            .finish_non_exhaustive()
    }
}
