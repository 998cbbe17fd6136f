//! Shared test fixtures.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tablestate::prelude::*;

/// One recorded handler call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Save(Record, usize, Option<String>),
    Cancel(Record, usize),
    ExpandChange(Vec<RowKey>, Option<bool>),
    SelectionChange(Vec<RowKey>, BTreeMap<RowKey, Vec<ChildKey>>),
    ChildSelectionChange(RowKey, Vec<ChildKey>),
    RowChange(usize),
    RowSelectionChange(Option<RowKey>),
    RowAdd(Record),
    RowDelete(Record, usize),
    RowCopy(Record, Record),
    RowMove(Record, usize, usize),
    PaginationChange(usize, usize),
}

/// Handler that records every event and can reject saves.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    reject_saves: AtomicBool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl TableHandler for Recorder {
    async fn on_save(&self, row: &Record, index: usize, column: Option<&str>) -> Result<(), HandlerError> {
        self.push(Event::Save(row.clone(), index, column.map(str::to_string)));
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(HandlerError::new("name is required"));
        }
        Ok(())
    }

    fn on_cancel(&self, row: &Record, index: usize) {
        self.push(Event::Cancel(row.clone(), index));
    }

    fn on_expand_change(&self, keys: &[RowKey], _row: Option<&Record>, expanded: Option<bool>) {
        self.push(Event::ExpandChange(keys.to_vec(), expanded));
    }

    fn on_selection_change(
        &self,
        checked_keys: &[RowKey],
        _checked_rows: &[Record],
        child_selections: &BTreeMap<RowKey, Vec<ChildKey>>,
    ) {
        self.push(Event::SelectionChange(checked_keys.to_vec(), child_selections.clone()));
    }

    fn on_child_selection_change(&self, parent: &RowKey, child_keys: &[ChildKey], _child_rows: &[Record]) {
        self.push(Event::ChildSelectionChange(parent.clone(), child_keys.to_vec()));
    }

    fn on_row_change(&self, rows: &[Record]) {
        self.push(Event::RowChange(rows.len()));
    }

    fn on_row_selection_change(&self, key: Option<&RowKey>, _row: Option<&Record>) {
        self.push(Event::RowSelectionChange(key.cloned()));
    }

    fn on_row_add(&self, row: &Record) {
        self.push(Event::RowAdd(row.clone()));
    }

    fn on_row_delete(&self, row: &Record, index: usize) {
        self.push(Event::RowDelete(row.clone(), index));
    }

    fn on_row_copy(&self, original: &Record, copy: &Record) {
        self.push(Event::RowCopy(original.clone(), copy.clone()));
    }

    fn on_row_move(&self, row: &Record, from: usize, to: usize) {
        self.push(Event::RowMove(row.clone(), from, to));
    }

    fn on_pagination_change(&self, page: usize, page_size: usize) {
        self.push(Event::PaginationChange(page, page_size));
    }
}

/// Rows `{id, name}` for each id.
pub fn people(ids: &[i64]) -> Rows {
    Rows::new(
        ids.iter()
            .map(|id| Record::new().set("id", *id).set("name", format!("person {id}")))
            .collect(),
    )
}

pub fn key(id: impl Into<RowKey>) -> RowKey {
    id.into()
}

/// Keys of the current rows, in order.
pub fn keys(rows: &Rows) -> Vec<RowKey> {
    rows.with(|rows| rows.iter().map(|r| RowKeyResolver::default().resolve(r)).collect())
}

/// Loader returning `<parent>a`, `<parent>b` for every parent.
pub fn two_children() -> FnLoader<impl Fn(&Record) -> Result<Vec<Record>, LoadError> + Send + Sync + 'static> {
    FnLoader::new(|row: &Record| {
        let parent = RowKeyResolver::default().resolve(row);
        Ok(vec![
            Record::new().set("id", format!("{parent}a")),
            Record::new().set("id", format!("{parent}b")),
        ])
    })
}
