//! The agent reasoning loop implementation.

use crate::interpreter::{Interpretation, ModelOutput, interpret};
use crate::observation::ObservationFormatter;
use chrono::Utc;
use quarry_config::{AppConfig, DB_INFO_PLACEHOLDER, TOOL_DESCRIPTIONS_PLACEHOLDER};
use quarry_core::event::{DomainEvent, EventBus};
use quarry_core::message::{MessageToolCall, Transcript};
use quarry_core::provider::{Provider, ProviderRequest};
use quarry_core::tool::{ToolOutput, ToolRegistry};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer returned when the step budget runs out.
pub const MAX_STEPS_MESSAGE: &str = "Max steps reached without providing a final answer.";

/// Everything a run needs besides the provider and the tools.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Provider round trips allowed per run
    pub max_steps: u32,
    pub observation_limit: usize,
    pub preview_rows: usize,
    /// Must contain the tool-description and schema placeholders
    pub system_template: String,
    /// Tool invoked once before the first model call
    pub schema_tool: String,
    pub table_name: String,
    pub schema_discovery_query: String,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            max_steps: config.agent.max_steps,
            observation_limit: config.agent.observation_limit,
            preview_rows: config.agent.preview_rows,
            system_template: config.prompts.system_template.clone(),
            schema_tool: "describe_table".into(),
            table_name: config.dataset.table_name.clone(),
            schema_discovery_query: config.prompts.schema_discovery_query.clone(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    SchemaDiscovery,
    AwaitingModel,
    DispatchingTools,
    TerminalSuccess,
    TerminalBudgetExceeded,
    TerminalError,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SchemaDiscovery => "schema_discovery",
            Self::AwaitingModel => "awaiting_model",
            Self::DispatchingTools => "dispatching_tools",
            Self::TerminalSuccess => "terminal_success",
            Self::TerminalBudgetExceeded => "terminal_budget_exceeded",
            Self::TerminalError => "terminal_error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::TerminalSuccess | Self::TerminalBudgetExceeded | Self::TerminalError
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state of one run. Lives only as long as `run`.
#[derive(Debug, Clone)]
pub struct RunState {
    pub step: u32,
    pub max_steps: u32,
    pub phase: RunPhase,
    pub final_answer: Option<String>,
}

impl RunState {
    fn new(max_steps: u32) -> Self {
        Self {
            step: 0,
            max_steps,
            phase: RunPhase::Init,
            final_answer: None,
        }
    }

    fn budget_spent(&self) -> bool {
        self.step >= self.max_steps
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final answer, or the message for the terminal condition
    pub answer: String,
    pub state: RunPhase,
    /// Provider round trips made
    pub steps: u32,
    /// Tool calls dispatched, including failed ones
    pub tool_calls: u32,
    pub transcript: Transcript,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == RunPhase::TerminalSuccess
    }
}

/// The core agent loop that mediates between the provider and the tools.
///
/// One `AgentLoop` can serve many runs. Runs share the provider and the tool
/// registry; each starts a fresh transcript.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
    formatter: ObservationFormatter,
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        let formatter = ObservationFormatter::new(settings.observation_limit, settings.preview_rows);
        Self {
            provider,
            tools,
            settings,
            formatter,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Publish domain events to `bus` instead of a private one.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    /// Override the step budget.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.settings.max_steps = max;
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Ask the schema tool for the primary table's layout.
    ///
    /// Never fails: every outcome becomes text for the system prompt.
    pub async fn discover_schema(&self) -> String {
        let tool = &self.settings.schema_tool;
        let table = &self.settings.table_name;

        if !self.tools.contains(tool) {
            warn!(tool = %tool, "Schema tool not registered; the model must discover the schema itself");
            return format!(
                "Table '{table}' is the primary table. Its schema is unknown; LLM should use `{tool}` tool to find it."
            );
        }

        info!(
            tool = %tool,
            table = %table,
            query = %self.settings.schema_discovery_query,
            "Discovering schema"
        );
        let args = serde_json::json!({ "table_name": table });
        let info = match self.tools.invoke(tool, args).await {
            Ok(ToolOutput::Table(schema)) if !schema.is_empty() && schema.error_message().is_none() => {
                format!("Table '{table}' schema:\n{}", schema.to_markdown())
            }
            Ok(ToolOutput::Table(schema)) => {
                let detail = match schema.error_message() {
                    Some(message) => message.to_string(),
                    None => schema.to_markdown(),
                };
                format!("Could not retrieve schema for '{table}': {detail}")
            }
            Ok(ToolOutput::Text(text)) => format!("Could not retrieve schema for '{table}': {text}"),
            Err(e) => format!("Error executing {tool} during init: {e}"),
        };
        debug!(schema = %info, "Schema discovery finished");
        info
    }

    /// Fill the system template with the tool list and the schema text.
    pub fn build_system_prompt(&self, db_info: &str) -> String {
        let tool_descriptions = self
            .tools
            .list()
            .map(|t| format!("  - {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        self.settings
            .system_template
            .replace(TOOL_DESCRIPTIONS_PLACEHOLDER, &tool_descriptions)
            .replace(DB_INFO_PLACEHOLDER, db_info)
            .trim()
            .to_string()
    }

    /// Run one task to a terminal state.
    ///
    /// Always returns an outcome; failures end up in `answer`.
    pub async fn run(&self, task: &str) -> RunOutcome {
        let mut state = RunState::new(self.settings.max_steps);
        self.event_bus.publish(DomainEvent::RunStarted {
            task_preview: task.chars().take(80).collect(),
            max_steps: state.max_steps,
            timestamp: Utc::now(),
        });
        info!(max_steps = state.max_steps, "Starting run: {task}");

        state.phase = RunPhase::SchemaDiscovery;
        let db_info = self.discover_schema().await;
        let mut transcript = Transcript::new(self.build_system_prompt(&db_info));
        transcript.push_user(task);

        let definitions = self.tools.definitions();
        let mut tool_calls = 0u32;
        let mut unrecognized_streak = 0u32;

        let answer = loop {
            if state.budget_spent() {
                state.phase = RunPhase::TerminalBudgetExceeded;
                warn!(steps = state.step, "Max steps reached without a final answer");
                break MAX_STEPS_MESSAGE.to_string();
            }
            state.step += 1;
            state.phase = RunPhase::AwaitingModel;
            debug!(step = state.step, messages = transcript.len(), "Agent loop iteration");

            let request = ProviderRequest {
                model: self.settings.model.clone(),
                messages: transcript.messages().to_vec(),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                tools: definitions.clone(),
            };
            let result = self.provider.complete(request).await;

            if let Ok(response) = &result {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    step: state.step,
                    model: response.model.clone(),
                    tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                    timestamp: Utc::now(),
                });
            }

            match ModelOutput::from_result(result) {
                ModelOutput::Error(message) => {
                    state.phase = RunPhase::TerminalError;
                    warn!(%message, "LLM communication error");
                    break format!("Agent terminated due to LLM communication error: {message}");
                }
                ModelOutput::ToolCalls { content, calls } => {
                    unrecognized_streak = 0;
                    state.phase = RunPhase::DispatchingTools;
                    debug!(count = calls.len(), "Executing tool calls");
                    transcript.push_tool_calls(content, calls.clone());
                    for call in &calls {
                        let observation = self.dispatch(call).await;
                        tool_calls += 1;
                        transcript.push_tool_result(call.id.clone(), observation);
                    }
                }
                ModelOutput::Text(text) => match interpret(&text) {
                    Interpretation::FinalAnswer(answer) => {
                        transcript.push_assistant(text);
                        state.phase = RunPhase::TerminalSuccess;
                        state.final_answer = Some(answer.clone());
                        break answer;
                    }
                    Interpretation::ThoughtStep(thought) => {
                        unrecognized_streak = 0;
                        debug!(%thought, "Thought");
                        transcript.push_assistant(text);
                    }
                    Interpretation::ActionCall { tool, args } => {
                        unrecognized_streak = 0;
                        state.phase = RunPhase::DispatchingTools;
                        let call = MessageToolCall::new(tool, Value::Object(args).to_string());
                        debug!(tool = %call.name, "Executing text action");
                        transcript.push_tool_calls(text, vec![call.clone()]);
                        let observation = self.dispatch(&call).await;
                        tool_calls += 1;
                        transcript.push_tool_result(call.id, observation);
                    }
                    Interpretation::Unrecognized(_) => {
                        unrecognized_streak += 1;
                        warn!(
                            streak = unrecognized_streak,
                            "Response did not follow the Thought/Action/Final Answer format"
                        );
                        transcript.push_assistant(text);
                    }
                },
            }
        };

        self.event_bus.publish(DomainEvent::RunFinished {
            state: state.phase.to_string(),
            steps: state.step,
            timestamp: Utc::now(),
        });
        info!(state = %state.phase, steps = state.step, tool_calls, "Run finished");

        RunOutcome {
            answer,
            state: state.phase,
            steps: state.step,
            tool_calls,
            transcript,
        }
    }

    /// Resolve, parse, validate and execute one call. Always yields an
    /// observation.
    async fn dispatch(&self, call: &MessageToolCall) -> String {
        if !self.tools.contains(&call.name) {
            warn!(tool = %call.name, "Unknown tool requested");
            self.publish_tool_event(&call.name, false, 0);
            return format!("Error: Tool '{}' not found.", call.name);
        }

        let raw = call.arguments.trim();
        let args: Value = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(raw) {
                Ok(args) => args,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Malformed tool arguments");
                    self.publish_tool_event(&call.name, false, 0);
                    return format!(
                        "Error parsing tool arguments for {}: {e}. Raw arguments: {}",
                        call.name, call.arguments
                    );
                }
            }
        };

        debug!(tool = %call.name, args = %args, "Action");
        let start = Instant::now();
        let result = self.tools.invoke(&call.name, args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                let success = !matches!(&output, ToolOutput::Table(t) if t.error_message().is_some());
                self.publish_tool_event(&call.name, success, duration_ms);
                let observation = self.formatter.format(&output);
                debug!(tool = %call.name, chars = observation.len(), "Observation");
                observation
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                self.publish_tool_event(&call.name, false, duration_ms);
                ObservationFormatter::format_error(&e)
            }
        }
    }

    fn publish_tool_event(&self, tool_name: &str, success: bool, duration_ms: u64) {
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: tool_name.to_string(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use quarry_core::error::ProviderError;
    use quarry_core::message::Role;
    use quarry_core::tool::ToolRegistry;

    fn agent(provider: Arc<SequentialMockProvider>) -> AgentLoop {
        AgentLoop::new(provider, Arc::new(fake_registry()), AgentSettings::default())
    }

    fn tool_turns(outcome: &RunOutcome) -> Vec<(String, String)> {
        outcome
            .transcript
            .with_role(&Role::Tool)
            .map(|m| (m.tool_call_id.clone().unwrap_or_default(), m.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn final_answer_on_first_step() {
        let provider = Arc::new(SequentialMockProvider::texts(&["Final Answer: 42"]));
        let outcome = agent(provider.clone()).run("How many calls?").await;

        assert_eq!(outcome.answer, "42");
        assert_eq!(outcome.state, RunPhase::TerminalSuccess);
        assert!(outcome.succeeded());
        assert_eq!(outcome.steps, 1);
        assert_eq!(provider.call_count(), 1);
        // system + user + assistant
        assert_eq!(outcome.transcript.len(), 3);
        assert_eq!(outcome.transcript.messages()[1].content, "How many calls?");
    }

    #[tokio::test]
    async fn system_prompt_lists_tools_and_schema() {
        let provider = Arc::new(SequentialMockProvider::texts(&["Final Answer: ok"]));
        let outcome = agent(provider).run("q").await;

        let system = &outcome.transcript.system().content;
        assert!(system.contains("  - sql_query: Executes a SQL query."));
        assert!(system.contains("  - describe_table: Returns the schema of a table."));
        assert!(system.contains("Table 'call_records' schema:\n| Column Name"));
        assert!(!system.contains(TOOL_DESCRIPTIONS_PLACEHOLDER));
        assert!(!system.contains(DB_INFO_PLACEHOLDER));
    }

    #[tokio::test]
    async fn missing_schema_tool_uses_placeholder_notice() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeQueryTool)).unwrap();
        let provider = Arc::new(SequentialMockProvider::texts(&["Final Answer: ok"]));
        let agent = AgentLoop::new(provider, Arc::new(registry), AgentSettings::default());

        let info = agent.discover_schema().await;
        assert_eq!(
            info,
            "Table 'call_records' is the primary table. Its schema is unknown; LLM should use `describe_table` tool to find it."
        );
    }

    #[tokio::test]
    async fn empty_schema_is_reported() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let settings = AgentSettings {
            table_name: "missing".into(),
            ..AgentSettings::default()
        };
        let agent = AgentLoop::new(provider, Arc::new(fake_registry()), settings);
        let info = agent.discover_schema().await;
        assert!(info.starts_with("Could not retrieve schema for 'missing': "));
    }

    #[tokio::test]
    async fn batch_yields_one_tool_turn_per_call_in_order() {
        let calls = vec![
            make_tool_call("call_a", "sql_query", r#"{"query": "SELECT COUNT(*) FROM call_records"}"#),
            make_tool_call("call_b", "foo_tool", "{}"),
            make_tool_call("call_c", "sql_query", "{not json"),
            make_tool_call("call_d", "sql_query", "{}"),
            make_tool_call("call_e", "sql_query", r#"{"query": "FAIL"}"#),
        ];
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(calls, "Thought: gather data")),
            Ok(make_text_response("Final Answer: 3")),
        ]));
        let outcome = agent(provider.clone()).run("count").await;

        assert_eq!(outcome.answer, "3");
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.tool_calls, 5);

        let turns = tool_turns(&outcome);
        let ids: Vec<&str> = turns.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["call_a", "call_b", "call_c", "call_d", "call_e"]);

        assert!(turns[0].1.contains("| n "));
        assert_eq!(turns[1].1, "Error: Tool 'foo_tool' not found.");
        assert!(turns[2].1.starts_with("Error parsing tool arguments for sql_query: "));
        assert!(turns[2].1.ends_with("Raw arguments: {not json"));
        assert_eq!(
            turns[3].1,
            "Tool execution failed: Tool 'sql_query' argument validation failed: missing required field 'query'"
        );
        assert_eq!(
            turns[4].1,
            "Tool execution failed: Tool 'sql_query' failed: database is locked"
        );

        // the assistant turn with the batch precedes every tool turn
        let messages = outcome.transcript.messages();
        let batch_idx = messages.iter().position(|m| m.tool_calls.len() == 5).unwrap();
        let first_tool_idx = messages.iter().position(|m| m.role == Role::Tool).unwrap();
        assert_eq!(first_tool_idx, batch_idx + 1);

        // the second request saw all five results
        let second = &provider.requests()[1];
        assert_eq!(second.messages.iter().filter(|m| m.role == Role::Tool).count(), 5);
    }

    #[tokio::test]
    async fn budget_exhaustion_stops_after_max_steps() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Thought: one",
            "Thought: two",
            "Thought: three",
        ]));
        let outcome = agent(provider.clone()).with_max_steps(3).run("loop").await;

        assert_eq!(outcome.answer, MAX_STEPS_MESSAGE);
        assert_eq!(outcome.state, RunPhase::TerminalBudgetExceeded);
        assert_eq!(outcome.steps, 3);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn connection_failure_terminates_without_retry() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::Connection("connection refused".into()),
        )]));
        let outcome = agent(provider.clone()).run("q").await;

        assert_eq!(outcome.state, RunPhase::TerminalError);
        assert!(outcome.answer.starts_with("Agent terminated due to LLM communication error: "));
        assert!(outcome.answer.contains("Connection Error"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_response_is_a_communication_error() {
        let provider = Arc::new(SequentialMockProvider::texts(&[""]));
        let outcome = agent(provider).run("q").await;
        assert_eq!(outcome.state, RunPhase::TerminalError);
        assert_eq!(
            outcome.answer,
            "Agent terminated due to LLM communication error: empty response"
        );
    }

    #[tokio::test]
    async fn text_action_is_dispatched() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Action: sql_query(query='SELECT COUNT(*) FROM call_records')",
            "Final Answer: 3",
        ]));
        let outcome = agent(provider).run("count").await;

        assert_eq!(outcome.answer, "3");
        assert_eq!(outcome.tool_calls, 1);
        let messages = outcome.transcript.messages();
        let action = &messages[2];
        assert_eq!(action.role, Role::Assistant);
        assert_eq!(action.tool_calls.len(), 1);
        assert_eq!(action.tool_calls[0].name, "sql_query");
        assert!(action.content.starts_with("Action:"));
        let result = &messages[3];
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some(action.tool_calls[0].id.as_str()));
        assert!(result.content.contains("| n "));
    }

    #[tokio::test]
    async fn unrecognized_text_continues() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "I will look at the table now.",
            "Action: do it",
            "Final Answer: fine",
        ]));
        let outcome = agent(provider).run("q").await;
        assert_eq!(outcome.answer, "fine");
        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.tool_calls, 0);
    }

    #[tokio::test]
    async fn unknown_text_action_reports_not_found() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Action: foo_tool(x=1)",
            "Final Answer: gave up",
        ]));
        let outcome = agent(provider).run("q").await;
        let turns = tool_turns(&outcome);
        assert_eq!(turns.len(), 1);
        assert!(turns[0].1.contains("not found"));
        assert_eq!(outcome.state, RunPhase::TerminalSuccess);
    }

    #[tokio::test]
    async fn large_table_observation_is_truncated() {
        let calls = vec![make_tool_call("call_big", "sql_query", r#"{"query": "BIG"}"#)];
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(calls, "")),
            Ok(make_text_response("Final Answer: big")),
        ]));
        let outcome = agent(provider).run("q").await;
        let turns = tool_turns(&outcome);
        assert!(turns[0]
            .1
            .ends_with("\n... (results truncated due to length, showing first 5 rows)"));
        assert!(turns[0].1.contains("| 4 "));
        assert!(!turns[0].1.contains("| 5 "));
    }

    #[tokio::test]
    async fn requests_carry_settings_and_capabilities() {
        let provider = Arc::new(SequentialMockProvider::texts(&["Final Answer: x"]));
        agent(provider.clone()).run("q").await;

        let request = &provider.requests()[0];
        assert_eq!(request.model, AgentSettings::default().model);
        assert_eq!(request.max_tokens, Some(1024));
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["sql_query", "describe_table"]);
        assert_eq!(request.messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn runs_share_tools_but_not_transcripts() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Final Answer: first",
            "Final Answer: second",
        ]));
        let agent = agent(provider.clone());
        let first = agent.run("one").await;
        let second = agent.run("two").await;

        assert_eq!(first.answer, "first");
        assert_eq!(second.answer, "second");
        assert_eq!(second.transcript.len(), 3);
        assert_eq!(provider.requests()[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn events_cover_the_run() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let calls = vec![make_tool_call("c1", "sql_query", r#"{"query": "SELECT 1"}"#)];
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(calls, "")),
            Ok(make_text_response("Final Answer: 1")),
        ]));
        agent(provider).with_event_bus(bus.clone()).run("q").await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first().map(|e| e.as_ref()), Some(DomainEvent::RunStarted { .. })));
        assert!(events.iter().any(|e| matches!(
            e.as_ref(),
            DomainEvent::ToolExecuted { tool_name, success: true, .. } if tool_name == "sql_query"
        )));
        match events.last().map(|e| e.as_ref()) {
            Some(DomainEvent::RunFinished { state, steps, .. }) => {
                assert_eq!(state, "terminal_success");
                assert_eq!(*steps, 2);
            }
            other => panic!("expected RunFinished, got {other:?}"),
        }
    }

    #[test]
    fn phases_report_terminal_states() {
        assert!(RunPhase::TerminalError.is_terminal());
        assert!(!RunPhase::AwaitingModel.is_terminal());
        assert_eq!(RunPhase::TerminalBudgetExceeded.to_string(), "terminal_budget_exceeded");
    }
}
