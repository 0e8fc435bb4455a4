//! Tool trait and registry.
//!
//! A tool is a named capability with a human-readable description and an
//! argument contract. Contracts are plain data: the registry derives the
//! capability list sent to the model from them and validates call arguments
//! against them before a tool ever runs.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::table::Table;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The JSON type an argument must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ArgKind {
    fn schema_type(self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Integer => "integer",
            ArgKind::Number => "number",
            ArgKind::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ArgKind::String => value.is_string(),
            ArgKind::Integer => value.is_i64() || value.is_u64(),
            ArgKind::Number => value.is_number(),
            ArgKind::Boolean => value.is_boolean(),
        }
    }
}

/// One named argument in a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentField {
    pub name: String,
    pub kind: ArgKind,
    pub description: String,
    pub required: bool,
}

/// The argument contract of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentContract {
    pub fields: Vec<ArgumentField>,
}

impl ArgumentContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required argument.
    pub fn required(mut self, name: &str, kind: ArgKind, description: &str) -> Self {
        self.fields.push(ArgumentField {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        });
        self
    }

    /// Add an optional argument.
    pub fn optional(mut self, name: &str, kind: ArgKind, description: &str) -> Self {
        self.fields.push(ArgumentField {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        });
        self
    }

    /// JSON Schema for the capability list.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                serde_json::json!({
                    "type": field.kind.schema_type(),
                    "description": field.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `args` against the contract.
    ///
    /// Returns the declared fields only; undeclared keys are dropped.
    /// The error string names the first offending field.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, String> {
        let obj = args
            .as_object()
            .ok_or_else(|| format!("arguments must be a JSON object, got {args}"))?;

        let mut validated = Map::new();
        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(format!("missing required field '{}'", field.name));
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.kind.accepts(value) => {
                    return Err(format!(
                        "field '{}' must be of type {}, got {}",
                        field.name,
                        field.kind.schema_type(),
                        value
                    ));
                }
                Some(value) => {
                    validated.insert(field.name.clone(), value.clone());
                }
            }
        }
        Ok(validated)
    }
}

/// What a tool hands back: a result set or a plain value.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Table(Table),
    Text(String),
}

impl From<Table> for ToolOutput {
    fn from(table: Table) -> Self {
        ToolOutput::Table(table)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

/// The core Tool trait.
///
/// `execute` only ever receives arguments that passed the contract.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "sql_query").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The argument contract.
    fn contract(&self) -> ArgumentContract;

    /// Execute the tool with validated arguments.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a capability-list entry.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.contract().to_json_schema(),
        }
    }
}

/// A registry of available tools, kept in registration order.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up, validate and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        if self.contains(tool.name()) {
            return Err(ToolError::DuplicateName(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Result<&dyn Tool, ToolError> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    /// All tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.list().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `args` against the tool's contract, then execute it.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let tool = self.get(name)?;
        let validated =
            tool.contract()
                .validate(&args)
                .map_err(|reason| ToolError::InvalidArguments {
                    tool_name: name.to_string(),
                    reason,
                })?;
        tool.execute(validated).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
