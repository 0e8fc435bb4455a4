//! SQL query tool: runs one statement against the dataset store.
//!
//! A query SQLite rejects is not a tool failure. The error text comes back
//! as a one-cell `error` table so the model can read it and try again.

use async_trait::async_trait;
use quarry_core::error::{StoreError, ToolError};
use quarry_core::tool::{ArgKind, ArgumentContract, Tool, ToolOutput};
use quarry_core::Table;
use quarry_store::SqliteStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "sql_query";

pub struct SqlQueryTool {
    store: Arc<SqliteStore>,
    description: String,
}

impl SqlQueryTool {
    pub fn new(store: Arc<SqliteStore>, description: impl Into<String>) -> Self {
        Self {
            store,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn contract(&self) -> ArgumentContract {
        ArgumentContract::new().required("query", ArgKind::String, "The SQL query to execute.")
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!(query, "Executing SQL");

        match self.store.query(query).await {
            Ok(table) => Ok(ToolOutput::Table(table)),
            Err(StoreError::QueryFailed(message)) => {
                warn!(%message, "SQL rejected");
                Ok(ToolOutput::Table(Table::error_row(message)))
            }
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            }),
        }
    }
}
