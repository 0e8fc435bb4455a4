//! Table description tool: column names, types, nullability and primary-key
//! flags of one table.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{ArgKind, ArgumentContract, Tool, ToolOutput};
use quarry_core::Table;
use quarry_store::SqliteStore;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const NAME: &str = "describe_table";

pub struct DescribeTableTool {
    store: Arc<SqliteStore>,
    description: String,
}

impl DescribeTableTool {
    pub fn new(store: Arc<SqliteStore>, description: impl Into<String>) -> Self {
        Self {
            store,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Tool for DescribeTableTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn contract(&self) -> ArgumentContract {
        ArgumentContract::new().required(
            "table_name",
            ArgKind::String,
            "The name of the table to describe.",
        )
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let table_name = arguments
            .get("table_name")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match self.store.describe(table_name).await {
            // unknown table: nothing to describe
            Ok(schema) if schema.is_empty() => Ok(ToolOutput::Table(Table::default())),
            Ok(schema) => Ok(ToolOutput::Table(schema)),
            Err(e) => Ok(ToolOutput::Table(Table::error_row(e.to_string()))),
        }
    }
}
