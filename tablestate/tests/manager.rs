//! Tests for the table manager and pagination.

mod common;

use tablestate::prelude::*;

use common::{Event, Recorder, key, people, two_children};

#[test]
fn test_absent_engines_are_ignored() {
    let rows = people(&[1]);
    let table = TableManager::new(rows, TableConfig::new(), std::sync::Arc::new(NoopHandler));

    assert!(matches!(table.expand(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(matches!(table.selection(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(matches!(table.child_selection(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(matches!(table.dynamic_rows(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(table.clear_all_selections().is_err());
    assert!(table.expanded_keys().is_empty());
    assert!(!table.pagination().is_enabled());
}

#[tokio::test]
async fn test_engines_share_rows() {
    let rows = people(&[1, 2, 3]);
    let recorder = Recorder::new();
    let config = TableConfig::new()
        .with_edit_mode(EditMode::Row)
        .with_expand_loader(two_children())
        .with_selection()
        .with_dynamic_rows(DynamicRowsConfig::new());
    let table = TableManager::new(rows.clone(), config, recorder.clone());

    table.selection().unwrap().select(&key(2)).unwrap();
    table.expand().unwrap().expand(&key(2)).await.unwrap();

    let dynamic = table.dynamic_rows().unwrap();
    dynamic.select(&key(2)).unwrap();
    dynamic.copy().unwrap();
    assert_eq!(rows.len(), 4);

    // Deleting the selected, expanded row drops its key everywhere.
    dynamic.select(&key(2)).unwrap();
    dynamic.delete().unwrap();
    assert!(table.checked_keys().is_empty());
    assert!(table.expanded_keys().is_empty());
    assert!(table.selection().unwrap().selected().is_empty());

    // An edit started on a row deleted before save reports it.
    table.edit().start(&key(3), None).unwrap();
    dynamic.select(&key(3)).unwrap();
    dynamic.delete().unwrap();
    assert!(matches!(table.edit().save().await, Err(TableError::NotFound { .. })));
    table.edit().cancel().unwrap();
    assert!(!table.edit().is_active());
}

#[test]
fn test_pagination() {
    let rows = people(&(1..=25).collect::<Vec<i64>>());
    let recorder = Recorder::new();
    let config = TableConfig::new()
        .with_pagination(PaginationConfig::new(10))
        .with_dynamic_rows(DynamicRowsConfig::new());
    let table = TableManager::new(rows.clone(), config, recorder.clone());
    let pagination = table.pagination();

    assert_eq!(pagination.total_pages(), 3);
    pagination.set_page(3).unwrap();
    assert_eq!(pagination.page_rows()[0].get("id"), Some(&serde_json::json!(21)));

    // Page size changes go back to the first page.
    pagination.set_page_size(20).unwrap();
    assert_eq!(pagination.page(), 1);
    pagination.set_page(2).unwrap();

    // Deleting down to 15 rows pulls the page back without a manual clamp.
    let dynamic = table.dynamic_rows().unwrap();
    for id in 16..=25 {
        dynamic.select(&key(id)).unwrap();
        dynamic.delete().unwrap();
    }
    assert_eq!(rows.len(), 15);
    assert_eq!(pagination.page(), 1);
    assert_eq!(pagination.page_rows().len(), 15);
    pagination.clamp().unwrap();

    let pages: Vec<Event> = recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::PaginationChange(..)))
        .collect();
    assert_eq!(
        pages,
        vec![
            Event::PaginationChange(3, 10),
            Event::PaginationChange(1, 20),
            Event::PaginationChange(2, 20),
            Event::PaginationChange(1, 20),
        ]
    );
}
