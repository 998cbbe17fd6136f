//! Tests for row expansion and lazy child loading.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tablestate::prelude::*;

use common::{Event, Recorder, key, people, two_children};

/// Loader that sleeps, counts calls and fails for row 3.
fn slow_loader(
    calls: Arc<AtomicUsize>,
) -> impl ExpandLoader + 'static {
    AsyncFnLoader::new(move |row: Record| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let parent = RowKeyResolver::default().resolve(&row);
            if parent == RowKey::from(3) {
                return Err(LoadError::new("backend unavailable"));
            }
            Ok(vec![
                Record::new().set("id", format!("{parent}a")),
                Record::new().set("id", format!("{parent}b")),
            ])
        }
    })
}

fn table(rows: &Rows, loader: impl ExpandLoader + 'static, recorder: &Arc<Recorder>) -> TableManager {
    TableManager::new(
        rows.clone(),
        TableConfig::new().with_expand_loader(loader),
        recorder.clone(),
    )
}

#[tokio::test]
async fn test_concurrent_expand_loads_once() {
    let rows = people(&[4, 5, 6]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    let five = key(5);
    let (first, second) = tokio::join!(expand.expand(&five), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(expand.is_loading(&five));
        expand.expand(&five).await
    });
    first.unwrap();
    second.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(table.expanded_keys(), vec![key(5)]);
    let children = expand.children(&key(5));
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].get_str("id"), Some("5a"));
    assert!(expand.load_state(&key(5)).is_ready());
}

#[tokio::test]
async fn test_collapse_keeps_cache() {
    let rows = people(&[1, 2]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    expand.expand(&key(1)).await.unwrap();
    expand.collapse(&key(1)).unwrap();
    assert!(!expand.is_expanded(&key(1)));
    assert_eq!(expand.children(&key(1)).len(), 2);

    expand.expand(&key(1)).await.unwrap();
    assert!(expand.is_expanded(&key(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let expanded: Vec<Option<bool>> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::ExpandChange(_, expanded) => Some(expanded),
            _ => None,
        })
        .collect();
    assert_eq!(expanded, vec![Some(true), Some(false), Some(true)]);
}

#[tokio::test]
async fn test_failed_load_stays_collapsed() {
    let rows = people(&[3]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    let err = expand.expand(&key(3)).await.unwrap_err();
    assert!(matches!(err, TableError::LoadFailed { ref key, .. } if *key == RowKey::from(3)));
    assert!(!expand.is_expanded(&key(3)));
    assert_eq!(expand.load_state(&key(3)).error(), Some("backend unavailable"));
    assert!(recorder.events().is_empty());

    // The next expand retries.
    assert!(expand.expand(&key(3)).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_expand_all_reports_failures() {
    let rows = people(&[1, 2, 3, 4]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    let report = expand.expand_all().await.unwrap();
    assert_eq!(report.expanded, vec![key(1), key(2), key(4)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, key(3));
    assert!(!report.is_complete());

    assert!(!expand.is_expanded(&key(3)));
    assert!(expand.load_state(&key(3)).is_failed());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        recorder.count(|e| matches!(e, Event::ExpandChange(..))),
        1
    );

    expand.collapse_all().unwrap();
    assert!(table.expanded_keys().is_empty());
    assert_eq!(expand.children(&key(2)).len(), 2);
}

#[tokio::test]
async fn test_row_expandable_predicate() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let config = TableConfig::new()
        .with_expand_loader(two_children())
        .with_row_expandable(|row| row.get("id") != Some(&serde_json::json!(2)));
    let table = TableManager::new(rows.clone(), config, recorder.clone());
    let expand = table.expand().unwrap();

    assert!(matches!(
        expand.expand(&key(2)).await,
        Err(TableError::ConfigurationIgnored { .. })
    ));
    assert!(matches!(
        expand.expand(&key(9)).await,
        Err(TableError::NotFound { .. })
    ));

    let report = expand.expand_all().await.unwrap();
    assert_eq!(report.expanded, vec![key(1)]);
}

#[tokio::test]
async fn test_refresh_and_clear_cache() {
    let rows = people(&[1]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    expand.toggle(&key(1)).await.unwrap();
    assert!(expand.is_expanded(&key(1)));

    expand.refresh(&key(1)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(expand.is_expanded(&key(1)));

    expand.clear_cache(None).unwrap();
    assert!(expand.children(&key(1)).is_empty());
    assert!(expand.load_state(&key(1)).is_idle());

    expand.toggle(&key(1)).await.unwrap();
    assert!(!expand.is_expanded(&key(1)));
}

#[tokio::test]
async fn test_load_result_dropped_when_row_deleted() {
    let rows = people(&[1, 2]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    let two = key(2);
    let (result, _) = tokio::join!(expand.expand(&two), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        rows.replace(rows.snapshot()[..1].to_vec());
    });

    assert!(matches!(result, Err(TableError::NotFound { .. })));
    assert!(expand.children(&key(2)).is_empty());
    assert!(!expand.is_expanded(&key(2)));
}

#[tokio::test]
async fn test_collapse_while_loading_cancels_expand() {
    let rows = people(&[1]);
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    let table = table(&rows, slow_loader(calls.clone()), &recorder);
    let expand = table.expand().unwrap();

    let one = key(1);
    let (result, _) = tokio::join!(expand.expand(&one), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        expand.collapse(&key(1)).unwrap();
    });

    result.unwrap();
    assert!(!expand.is_expanded(&key(1)));
    assert_eq!(expand.children(&key(1)).len(), 2);
}

#[tokio::test]
async fn test_default_expanded_keys() {
    let rows = people(&[1, 2]);
    let recorder = Recorder::new();
    let config = TableConfig::new()
        .with_expand_loader(two_children())
        .with_default_expanded_keys(vec![key(2)]);
    let table = TableManager::new(rows, config, recorder.clone());

    assert_eq!(table.expanded_keys(), vec![key(2)]);
    assert!(table.expand().unwrap().is_expanded(&key(2)));
}
