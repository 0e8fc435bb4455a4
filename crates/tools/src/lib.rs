//! Built-in tools for Quarry.
//!
//! Both tools read from the shared dataset store: `describe_table` reports a
//! table's layout and `sql_query` runs arbitrary SQL against it.

pub mod describe_table;
pub mod sql_query;

pub use describe_table::DescribeTableTool;
pub use sql_query::SqlQueryTool;

use quarry_config::PromptConfig;
use quarry_core::error::ToolError;
use quarry_core::tool::ToolRegistry;
use quarry_store::SqliteStore;
use std::sync::Arc;

/// Create the default registry over `store`.
///
/// Tool descriptions come from the prompt settings so they can be tuned
/// without a rebuild.
pub fn default_registry(
    store: Arc<SqliteStore>,
    prompts: &PromptConfig,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SqlQueryTool::new(
        Arc::clone(&store),
        prompts.sql_query_description.clone(),
    )))?;
    registry.register(Box::new(DescribeTableTool::new(
        store,
        prompts.describe_table_description.clone(),
    )))?;
    Ok(registry)
}

#[cfg(test)]
pub(crate) async fn test_store() -> Arc<SqliteStore> {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        b"call_id,caller,duration_seconds,call_time\n\
          1,alice,120,2024-01-05 09:00:00\n\
          2,bob,45,2024-01-05 10:30:00\n\
          3,alice,300,2024-01-06 08:15:00\n",
    )
    .unwrap();
    let store = SqliteStore::open(":memory:").await.unwrap();
    store
        .load_csv(file.path(), "call_records", &["call_time".into()])
        .await
        .unwrap();
    Arc::new(store)
}
