//! OpenAI-compatible provider implementation.
//!
//! Works with SiliconFlow, OpenAI, OpenRouter, Ollama, vLLM and any other
//! endpoint exposing `/chat/completions` with function calling.

use async_trait::async_trait;
use quarry_core::error::ProviderError;
use quarry_core::message::{Message, MessageToolCall, Role};
use quarry_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: if m.content.is_empty() && !m.tool_calls.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                },
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    /// Turn the first choice of a decoded response into our message type.
    fn into_provider_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let tool_calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let mut call = MessageToolCall::new(tc.function.name, tc.function.arguments);
                if !tc.id.is_empty() {
                    call.id = tc.id;
                }
                call
            })
            .collect();

        let message =
            Message::assistant_tool_calls(choice.message.content.unwrap_or_default(), tool_calls);

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }
}

/// Classify a transport failure.
fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Connection(e.to_string())
    }
}

#[async_trait]
impl quarry_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let text = response.text().await.map_err(transport_error)?;
        let api_response: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("{e} - Response: {text}")))?;

        Self::into_provider_response(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "default_call_type")]
    r#type: String,
    function: ApiFunction,
}

fn default_call_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::Provider;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request_with_tools() -> ProviderRequest {
        ProviderRequest {
            model: "mock-model".into(),
            messages: vec![Message::system("sys"), Message::user("How many calls?")],
            temperature: 0.7,
            max_tokens: Some(1024),
            tools: vec![ToolDefinition {
                name: "sql_query".into(),
                description: "Run SQL".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        }
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            // read headers and the declared body before answering
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider =
            OpenAiCompatProvider::new("x", "http://host/v1/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, "http://host/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::assistant_tool_calls(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "sql_query".into(),
                arguments: r#"{"query":"SELECT 1"}"#.into(),
            }],
        );
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert!(api_msgs[0].content.is_none());
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc[0].function.name, "sql_query");
        assert_eq!(tc[0].id, "call_1");
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = Message::tool_result("call_1", "| 1 |");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn body_offers_tools_with_auto_choice() {
        let body = OpenAiCompatProvider::request_body(&request_with_tools());
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "sql_query");
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn body_without_tools_omits_choice() {
        let mut req = request_with_tools();
        req.tools.clear();
        let body = OpenAiCompatProvider::request_body(&req);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let data = r#"{
            "model": "m",
            "choices": [{"message": {"role": "assistant", "content": null,
                "tool_calls": [{"id": "call_abc", "type": "function",
                    "function": {"name": "sql_query", "arguments": "{\"query\":\"SELECT 1\"}"}}]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let resp = OpenAiCompatProvider::into_provider_response(parsed).unwrap();
        assert_eq!(resp.message.content, "");
        assert_eq!(resp.message.tool_calls.len(), 1);
        assert_eq!(resp.message.tool_calls[0].id, "call_abc");
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn missing_call_id_is_generated() {
        let data = r#"{"choices": [{"message": {"role": "assistant",
            "tool_calls": [{"function": {"name": "describe_table", "arguments": "{}"}}]}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let resp = OpenAiCompatProvider::into_provider_response(parsed).unwrap();
        assert!(resp.message.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    fn empty_choices_is_malformed() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = OpenAiCompatProvider::into_provider_response(parsed).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn complete_against_local_server() {
        let body = r#"{"model":"served","choices":[{"message":{"role":"assistant","content":"Final Answer: 42"}}]}"#;
        let base = serve_once("200 OK", body.to_string()).await;
        let provider =
            OpenAiCompatProvider::new("local", base, "k", Duration::from_secs(5)).unwrap();

        let resp = provider.complete(request_with_tools()).await.unwrap();
        assert_eq!(resp.message.content, "Final Answer: 42");
        assert_eq!(resp.model, "served");
    }

    #[tokio::test]
    async fn server_error_maps_to_http_error() {
        let base = serve_once("500 Internal Server Error", "boom".to_string()).await;
        let provider =
            OpenAiCompatProvider::new("local", base, "k", Duration::from_secs(5)).unwrap();

        let err = provider.complete(request_with_tools()).await.unwrap_err();
        assert!(err.to_string().starts_with("HTTP Error: 500"));
    }

    #[tokio::test]
    async fn garbage_body_maps_to_decode_error() {
        let base = serve_once("200 OK", "not json".to_string()).await;
        let provider =
            OpenAiCompatProvider::new("local", base, "k", Duration::from_secs(5)).unwrap();

        let err = provider.complete(request_with_tools()).await.unwrap_err();
        assert!(err.to_string().starts_with("JSON Decode Error"));
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = OpenAiCompatProvider::new(
            "local",
            format!("http://{addr}/v1"),
            "k",
            Duration::from_secs(5),
        )
        .unwrap();
        let err = provider.complete(request_with_tools()).await.unwrap_err();
        assert!(err.to_string().contains("Connection Error"), "{err}");
    }
}
