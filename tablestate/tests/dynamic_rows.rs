//! Tests for structural row operations.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tablestate::prelude::*;

use common::{Event, Recorder, key, keys, people};

fn table(rows: &Rows, config: DynamicRowsConfig, recorder: &Arc<Recorder>) -> TableManager {
    TableManager::new(
        rows.clone(),
        TableConfig::new().with_dynamic_rows(config),
        recorder.clone(),
    )
}

#[test]
fn test_copy_move_delete_scenario() {
    let rows = people(&[1, 2, 3]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    dynamic.select(&key(2)).unwrap();
    let copy = dynamic.copy().unwrap();
    assert_eq!(keys(&rows), vec![key(1), key(2), copy.clone(), key(3)]);
    assert_eq!(dynamic.cursor(), Some(copy.clone()));
    assert_eq!(rows.snapshot()[2].get_str("name"), Some("person 2"));

    dynamic.move_up().unwrap();
    assert_eq!(keys(&rows), vec![key(1), copy.clone(), key(2), key(3)]);
    assert_eq!(dynamic.cursor(), Some(copy));

    dynamic.delete().unwrap();
    assert_eq!(keys(&rows), vec![key(1), key(2), key(3)]);
    assert_eq!(dynamic.cursor(), Some(key(2)));
}

#[test]
fn test_copy_then_delete_round_trip() {
    let rows = people(&[1, 2, 3]);
    let before = rows.to_vec();
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    dynamic.select(&key(3)).unwrap();
    dynamic.copy().unwrap();
    dynamic.delete().unwrap();

    assert_eq!(rows.to_vec(), before);
    // The copy was last, so the cursor falls back to the new last row.
    assert_eq!(dynamic.cursor(), Some(key(3)));
}

#[test]
fn test_copy_with_custom_resolver() {
    let rows = Rows::new(vec![Record::new().set("code", "a"), Record::new().set("code", "b")]);
    let read = |r: &Record| RowKey::new(r.get_str("code").unwrap_or_default());
    let recorder = Recorder::new();

    // The resolver never sees `id`, so a fresh key cannot be stored.
    let config = TableConfig::new()
        .with_row_key(RowKeyResolver::custom(read))
        .with_dynamic_rows(DynamicRowsConfig::new());
    let table = TableManager::new(rows.clone(), config, recorder.clone());
    let dynamic = table.dynamic_rows().unwrap();
    dynamic.select(&RowKey::from("a")).unwrap();
    assert!(matches!(dynamic.copy(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(matches!(dynamic.add(), Err(TableError::ConfigurationIgnored { .. })));
    assert_eq!(rows.len(), 2);

    // With a writer the copy gets its own key and round-trips through delete.
    let resolver = RowKeyResolver::custom(read).with_writer(|r, k| r.insert("code", k.to_value()));
    let config = TableConfig::new()
        .with_row_key(resolver.clone())
        .with_dynamic_rows(DynamicRowsConfig::new());
    let table = TableManager::new(rows.clone(), config, recorder.clone());
    let dynamic = table.dynamic_rows().unwrap();
    dynamic.select(&RowKey::from("a")).unwrap();
    let copy = dynamic.copy().unwrap();

    let resolved: Vec<RowKey> = rows.to_vec().iter().map(|r| resolver.resolve(r)).collect();
    assert_eq!(resolved, vec![RowKey::from("a"), copy.clone(), RowKey::from("b")]);
    assert!(dynamic.cursor_row().is_some());

    dynamic.delete().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(dynamic.cursor(), Some(RowKey::from("b")));
}

#[test]
fn test_delete_sole_row() {
    let rows = people(&[1]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    dynamic.select(&key(1)).unwrap();
    recorder.take();
    dynamic.delete().unwrap();

    assert!(rows.is_empty());
    assert_eq!(dynamic.cursor(), None);
    assert!(matches!(
        &recorder.take()[..],
        [Event::RowChange(0), Event::RowDelete(_, 0), Event::RowSelectionChange(None)]
    ));
}

#[test]
fn test_add_and_insert() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let config = DynamicRowsConfig::new().with_default_row(|| Record::new().set("name", "new"));
    let table = table(&rows, config, &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    // No cursor: insert prepends.
    let first = dynamic.insert().unwrap();
    assert_eq!(keys(&rows)[0], first);
    assert_eq!(rows.snapshot()[0].get_str("name"), Some("new"));
    assert!(first.as_str().starts_with("row_"));

    dynamic.select(&key(1)).unwrap();
    let inserted = dynamic.insert().unwrap();
    assert_eq!(keys(&rows), vec![first, key(1), inserted.clone(), key(2)]);
    assert_eq!(dynamic.cursor(), Some(inserted));

    let added = dynamic.add().unwrap();
    assert_eq!(keys(&rows).last(), Some(&added));
    assert_eq!(dynamic.cursor_index(), Some(4));
    assert!(!dynamic.can_move_down());
    assert!(dynamic.can_move_up());
}

#[test]
fn test_event_order() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    dynamic.select(&key(1)).unwrap();
    dynamic.move_down().unwrap();
    let events = recorder.take();
    assert_eq!(events[0], Event::RowSelectionChange(Some(key(1))));
    assert_eq!(events[1], Event::RowChange(2));
    assert!(matches!(&events[2], Event::RowMove(_, 0, 1)));
    assert_eq!(events.len(), 3);

    let added = dynamic.add().unwrap();
    let events = recorder.take();
    assert_eq!(events[0], Event::RowChange(3));
    assert!(matches!(&events[1], Event::RowAdd(_)));
    assert_eq!(events[2], Event::RowSelectionChange(Some(added)));
}

#[test]
fn test_moves_at_boundaries_are_noops() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    assert!(matches!(dynamic.move_up(), Err(TableError::NotFound { .. })));

    dynamic.select(&key(1)).unwrap();
    let revision = rows.revision();
    dynamic.move_up().unwrap();
    assert_eq!(rows.revision(), revision);

    dynamic.select(&key(2)).unwrap();
    dynamic.move_down().unwrap();
    assert_eq!(rows.revision(), revision);
    assert_eq!(keys(&rows), vec![key(1), key(2)]);
}

#[test]
fn test_confirm_delete() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new().with_confirm_delete(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    dynamic.select(&key(1)).unwrap();
    dynamic.delete().unwrap();
    assert!(dynamic.is_delete_pending());
    assert_eq!(rows.len(), 2);

    dynamic.dismiss_delete();
    assert!(dynamic.confirm_delete().is_err());
    assert_eq!(rows.len(), 2);

    dynamic.delete().unwrap();
    dynamic.confirm_delete().unwrap();
    assert_eq!(keys(&rows), vec![key(2)]);
    assert!(!dynamic.is_delete_pending());
}

#[test]
fn test_disabled_operations() {
    let rows = people(&[1]);
    let recorder = Recorder::new();
    let config = DynamicRowsConfig::new().without_copy().without_move();
    let table = table(&rows, config, &recorder);
    let dynamic = table.dynamic_rows().unwrap();
    dynamic.select(&key(1)).unwrap();

    assert!(matches!(dynamic.copy(), Err(TableError::ConfigurationIgnored { .. })));
    assert!(matches!(dynamic.move_down(), Err(TableError::ConfigurationIgnored { .. })));
    assert_eq!(rows.len(), 1);

    let plain = TableManager::new(rows, TableConfig::new(), recorder.clone());
    assert!(plain.dynamic_rows().is_err());
}

#[test]
fn test_cursor_is_explicit() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    assert!(matches!(dynamic.select(&key(9)), Err(TableError::NotFound { .. })));
    dynamic.select(&key(2)).unwrap();
    assert_eq!(dynamic.cursor_row().unwrap().get_str("name"), Some("person 2"));

    dynamic.clear_cursor().unwrap();
    assert_eq!(dynamic.cursor(), None);
    assert_eq!(
        recorder.events(),
        vec![
            Event::RowSelectionChange(Some(key(2))),
            Event::RowSelectionChange(None)
        ]
    );
}

/// Exporter that records calls and fails prints.
#[derive(Default)]
struct TestExporter {
    downloads: Arc<Mutex<Vec<(String, PrintOptions)>>>,
}

#[async_trait]
impl Exporter for TestExporter {
    async fn print(&self, _target: &ExportTarget, _options: &PrintOptions) -> Result<(), ExportError> {
        Err(ExportError::Unsupported("no printer".to_string()))
    }

    async fn download(
        &self,
        _target: &ExportTarget,
        filename: &str,
        options: &PrintOptions,
    ) -> Result<(), ExportError> {
        self.downloads
            .lock()
            .unwrap()
            .push((filename.to_string(), options.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_export() {
    let rows = people(&[1]);
    let recorder = Recorder::new();
    let exporter = TestExporter::default();
    let downloads = exporter.downloads.clone();
    let config = DynamicRowsConfig::new()
        .with_exporter(exporter)
        .with_print_preset(PrintPreset::Report)
        .with_watermark_text("Internal");
    let table = table(&rows, config, &recorder);
    let dynamic = table.dynamic_rows().unwrap();
    let target = ExportTarget::from("orders");

    let err = dynamic.print(&target).await.unwrap_err();
    assert!(matches!(err, TableError::CapabilityUnavailable { capability: "print", .. }));

    dynamic.download(&target, None).await.unwrap();
    dynamic.download(&target, Some("orders.png")).await.unwrap();
    let downloads = downloads.lock().unwrap().clone();
    assert_eq!(downloads[0].0, "table.png");
    assert_eq!(downloads[1].0, "orders.png");
    assert_eq!(downloads[0].1.watermark.as_ref().unwrap().text, "Internal");
    assert_eq!(downloads[0].1.quality, Some(0.95));
}

#[tokio::test]
async fn test_export_without_exporter() {
    let rows = people(&[1]);
    let recorder = Recorder::new();
    let table = table(&rows, DynamicRowsConfig::new(), &recorder);
    let dynamic = table.dynamic_rows().unwrap();

    let err = dynamic.download(&ExportTarget::from("t"), None).await.unwrap_err();
    assert!(matches!(err, TableError::CapabilityUnavailable { capability: "download", .. }));
}
