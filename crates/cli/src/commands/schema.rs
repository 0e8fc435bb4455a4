//! `quarry schema`: print the layout of the loaded table.

use super::setup;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    table: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = setup::load_config(config_path)?;
    let store = setup::open_dataset(&config).await?;
    let table = table.unwrap_or_else(|| config.dataset.table_name.clone());

    let schema = store.describe(&table).await?;
    if schema.is_empty() {
        let known = store.table_names().await?.join(", ");
        return Err(format!("Table '{table}' not found. Known tables: {known}").into());
    }
    let rows = store.row_count(&table).await?;
    println!("Table '{table}' ({rows} rows):\n{}", schema.to_markdown());
    Ok(())
}
