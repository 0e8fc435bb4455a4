//! Response interpretation.
//!
//! A provider result is first folded into a [`ModelOutput`]: structured tool
//! calls, free text, or a communication error. Free text then goes through
//! [`interpret`], a pure prefix classifier for the Thought / Action /
//! Final Answer convention the system prompt asks for.

use quarry_core::error::ProviderError;
use quarry_core::message::MessageToolCall;
use quarry_core::provider::ProviderResponse;
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const THOUGHT_PREFIX: &str = "thought:";
const ACTION_PREFIX: &str = "action:";
const FINAL_ANSWER_PREFIX: &str = "final answer:";

static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^action:\s*(\w+)\s*\(").expect("valid action pattern"));

/// What one provider round trip produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Structured tool-call requests, with any text the model sent alongside.
    ToolCalls {
        content: String,
        calls: Vec<MessageToolCall>,
    },
    /// Plain text, to be classified by [`interpret`].
    Text(String),
    /// The round trip failed. The message leads with the error class.
    Error(String),
}

impl ModelOutput {
    pub fn from_result(result: Result<ProviderResponse, ProviderError>) -> Self {
        match result {
            Ok(response) => Self::from_response(response),
            Err(e) => Self::Error(e.to_string()),
        }
    }

    pub fn from_response(response: ProviderResponse) -> Self {
        let message = response.message;
        if !message.tool_calls.is_empty() {
            Self::ToolCalls {
                content: message.content,
                calls: message.tool_calls,
            }
        } else if message.content.trim().is_empty() {
            Self::Error("empty response".into())
        } else {
            Self::Text(message.content)
        }
    }
}

/// Classification of a free-text response.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    ThoughtStep(String),
    ActionCall {
        tool: String,
        args: Map<String, Value>,
    },
    FinalAnswer(String),
    Unrecognized(String),
}

/// Classify free text by its leading marker, case-insensitively.
pub fn interpret(text: &str) -> Interpretation {
    let trimmed = text.trim();

    if let Some(rest) = strip_prefix_ignore_case(trimmed, THOUGHT_PREFIX) {
        return Interpretation::ThoughtStep(rest.trim().to_string());
    }
    if strip_prefix_ignore_case(trimmed, ACTION_PREFIX).is_some() {
        return match parse_action_call(trimmed) {
            Some((tool, args)) => Interpretation::ActionCall { tool, args },
            None => Interpretation::Unrecognized(trimmed.to_string()),
        };
    }
    if let Some(rest) = strip_prefix_ignore_case(trimmed, FINAL_ANSWER_PREFIX) {
        return Interpretation::FinalAnswer(rest.trim().to_string());
    }
    Interpretation::Unrecognized(trimmed.to_string())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

// `Action: name(...)`, with the arguments ending at the paren that closes
// the call. Anything after it is ignored.
fn parse_action_call(text: &str) -> Option<(String, Map<String, Value>)> {
    let caps = ACTION_RE.captures(text)?;
    let body = &text[caps.get(0)?.end()..];
    let (close, _, _) = unquoted_chars(body).find(|&(_, c, depth)| c == ')' && depth == 0)?;
    Some((caps[1].to_string(), parse_action_args(&body[..close])))
}

/// Parse the inside of `name(...)` into keyword arguments.
///
/// Accepts a JSON object, the bare inside of one (`"query": "..."`), or
/// `key=value` pairs. Pair values are read as JSON literals where possible
/// and otherwise kept as trimmed, unquoted strings.
pub fn parse_action_args(raw: &str) -> Map<String, Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Map::new();
    }

    let candidate = if raw.starts_with('{') {
        raw.to_string()
    } else {
        format!("{{{raw}}}")
    };
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&candidate) {
        return map;
    }

    let mut args = Map::new();
    for pair in split_top_level(raw, ',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let parsed = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.trim_matches(['\'', '"']).to_string()));
        args.insert(key.to_string(), parsed);
    }
    args
}

// Split on `sep` outside quotes and brackets.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c, depth) in unquoted_chars(input) {
        if c == sep && depth == 0 {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

// Characters outside quoted strings, each with the bracket depth in effect
// before it.
fn unquoted_chars(input: &str) -> impl Iterator<Item = (usize, char, usize)> + '_ {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    input.char_indices().filter_map(move |(i, c)| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            return None;
        }
        let before = depth;
        match c {
            '\'' | '"' => {
                quote = Some(c);
                return None;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        Some((i, c, before))
    })
}
