use std::collections::BTreeMap;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use simplelog::{Config, LevelFilter, WriteLogger};
use tablestate::prelude::*;

/// Prints every event to stdout and refuses empty names.
struct Printer;

#[async_trait]
impl TableHandler for Printer {
    async fn on_save(&self, row: &Record, index: usize, _column: Option<&str>) -> Result<(), HandlerError> {
        if row.get_str("name").is_none_or(str::is_empty) {
            return Err(HandlerError::new("name must not be empty"));
        }
        println!("save    row {index}: {}", json!(row));
        Ok(())
    }

    fn on_expand_change(&self, keys: &[RowKey], _row: Option<&Record>, _expanded: Option<bool>) {
        println!("expand  {keys:?}");
    }

    fn on_selection_change(
        &self,
        checked_keys: &[RowKey],
        _checked_rows: &[Record],
        child_selections: &BTreeMap<RowKey, Vec<ChildKey>>,
    ) {
        println!("select  {checked_keys:?} children {child_selections:?}");
    }

    fn on_row_change(&self, rows: &[Record]) {
        println!("rows    {} rows", rows.len());
    }

    fn on_row_selection_change(&self, key: Option<&RowKey>, _row: Option<&Record>) {
        println!("cursor  {key:?}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = File::create("walkthrough.log")?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)?;

    let rows = Rows::new(
        ["Ann", "Bob", "Cid"]
            .iter()
            .enumerate()
            .map(|(i, name)| Record::new().set("id", i + 1).set("name", *name))
            .collect(),
    );

    let loader = AsyncFnLoader::new(|row: Record| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let parent = RowKeyResolver::default().resolve(&row);
        Ok::<_, LoadError>(vec![
            Record::new().set("id", format!("{parent}a")),
            Record::new().set("id", format!("{parent}b")),
        ])
    });

    let config = TableConfig::new()
        .with_edit_mode(EditMode::Both)
        .with_expand_loader(loader)
        .with_selection()
        .with_child_selection()
        .with_linkage(LinkagePolicy::Bidirectional)
        .with_dynamic_rows(DynamicRowsConfig::new());
    let table = TableManager::new(rows.clone(), config, Arc::new(Printer));

    // Edit a cell; the first save is refused and the draft survives.
    let bob = RowKey::from(2);
    table.edit().start(&bob, Some("name"))?;
    table.edit().update_draft("name", json!(""))?;
    if let Err(e) = table.edit().save().await {
        println!("refused {e}");
    }
    table.edit().update_draft("name", json!("Bobby"))?;
    table.edit().save().await?;

    // Expand and select through the children.
    table.expand()?.expand(&bob).await?;
    table.child_selection()?.select_all(&bob)?;
    println!("checked {:?}", table.checked_keys());

    // Copy Bob, move the copy up, then delete it.
    let dynamic = table.dynamic_rows()?;
    dynamic.select(&bob)?;
    dynamic.copy()?;
    dynamic.move_up()?;
    dynamic.delete()?;

    let report = table.expand()?.expand_all().await?;
    println!("expanded {:?}, failed {:?}", report.expanded, report.failed);

    table.clear_all_selections()?;
    println!("final   {}", json!(rows.to_vec()));
    Ok(())
}
