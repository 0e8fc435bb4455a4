//! Shared test helpers for agent tests.

use async_trait::async_trait;
use quarry_core::error::{ProviderError, ToolError};
use quarry_core::message::{Message, MessageToolCall};
use quarry_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use quarry_core::tool::{ArgKind, ArgumentContract, Tool, ToolOutput, ToolRegistry};
use quarry_core::Table;
use serde_json::{Map, Value};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next entry and records the request.
/// Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers with the given texts in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let count = requests.len();

        if count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                responses.len()
            );
        }

        requests.push(request);
        responses[count].clone()
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(thought, calls),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A tool call with a fixed, readable id.
pub fn make_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Stand-in for `describe_table` over a fixed `call_records` layout.
pub struct FakeDescribeTool;

#[async_trait]
impl Tool for FakeDescribeTool {
    fn name(&self) -> &str {
        "describe_table"
    }

    fn description(&self) -> &str {
        "Returns the schema of a table."
    }

    fn contract(&self) -> ArgumentContract {
        ArgumentContract::new().required("table_name", ArgKind::String, "Table to describe.")
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError> {
        if arguments.get("table_name").and_then(Value::as_str) != Some("call_records") {
            return Ok(ToolOutput::Table(Table::default()));
        }
        Ok(ToolOutput::Table(Table::new(
            vec!["Column Name".into(), "Data Type".into()],
            vec![
                vec![Value::from("caller"), Value::from("TEXT")],
                vec![Value::from("duration_seconds"), Value::from("INTEGER")],
            ],
        )))
    }
}

/// Stand-in for `sql_query`.
///
/// `FAIL` in the query makes execution fail; `BIG` returns a table too long
/// to show in full; anything else returns a one-cell count.
pub struct FakeQueryTool;

#[async_trait]
impl Tool for FakeQueryTool {
    fn name(&self) -> &str {
        "sql_query"
    }

    fn description(&self) -> &str {
        "Executes a SQL query."
    }

    fn contract(&self) -> ArgumentContract {
        ArgumentContract::new().required("query", ArgKind::String, "The SQL query.")
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if query.contains("FAIL") {
            return Err(ToolError::ExecutionFailed {
                tool_name: "sql_query".into(),
                reason: "database is locked".into(),
            });
        }
        if query.contains("BIG") {
            return Ok(ToolOutput::Table(Table::new(
                vec!["id".into(), "note".into()],
                (0..200)
                    .map(|i| vec![Value::from(i), Value::from("y".repeat(30))])
                    .collect(),
            )));
        }
        Ok(ToolOutput::Table(Table::new(
            vec!["n".into()],
            vec![vec![Value::from(3)]],
        )))
    }
}

/// Registry with both fake tools, query tool first.
pub fn fake_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(FakeQueryTool)).unwrap();
    registry.register(Box::new(FakeDescribeTool)).unwrap();
    registry
}
