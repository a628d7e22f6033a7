use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::{
    config::GatewayConfig,
    gateway::{
        credentials::ResolvedCredential,
        error::{GatewayError, GatewayErrorKind, invalid_request},
        types::{
            ChatMessage, ChatRequest, ChatResponse, ChatRole, FinishReason, ToolCall,
            ToolDefinition, UsageStats,
        },
    },
};

/// The kiosk's view of the external chat service: one blocking completion
/// per call, no streaming.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError>;
}

pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    auth_header: String,
    timeout: Duration,
}

impl OpenAiChatClient {
    pub fn new(
        config: &GatewayConfig,
        credential: ResolvedCredential,
    ) -> Result<Self, GatewayError> {
        if config.endpoint.trim().is_empty() {
            return Err(invalid_request("gateway endpoint cannot be empty"));
        }
        if config.model.trim().is_empty() {
            return Err(invalid_request("gateway model cannot be empty"));
        }
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| {
                GatewayError::new(
                    GatewayErrorKind::Internal,
                    format!("failed to build http client: {}", err),
                )
                .with_retryable(false)
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            auth_header: credential.auth_header,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let body = build_request_body(&self.model, &request);

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, self.auth_header.as_str())
            .header("x-request-id", request.request_id.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body));
        }

        let payload = response.json::<Value>().await.map_err(|err| {
            GatewayError::new(
                GatewayErrorKind::ProtocolViolation,
                format!("chat completion body decode failed: {}", err),
            )
            .with_retryable(false)
        })?;

        let parsed = parse_chat_payload(&payload)?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                target: "gateway",
                request_id = %request.request_id,
                input_tokens = ?usage.input_tokens,
                output_tokens = ?usage.output_tokens,
                "chat_completion_usage"
            );
        }
        Ok(parsed)
    }
}

fn build_request_body(model: &str, request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_wire(&request.messages),
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(tools_to_wire(&request.tools));
        body["tool_choice"] = Value::String("auto".to_string());
    }
    body
}

fn role_to_wire(role: &ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    }
}

fn messages_to_wire(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut obj = serde_json::Map::new();
            obj.insert(
                "role".to_string(),
                Value::String(role_to_wire(&message.role).to_string()),
            );
            obj.insert(
                "content".to_string(),
                match &message.content {
                    Some(text) => Value::String(text.clone()),
                    None => Value::Null,
                },
            );
            if !message.tool_calls.is_empty() {
                obj.insert(
                    "tool_calls".to_string(),
                    Value::Array(message.tool_calls.iter().map(tool_call_to_wire).collect()),
                );
            }
            if let Some(tool_call_id) = &message.tool_call_id {
                obj.insert(
                    "tool_call_id".to_string(),
                    Value::String(tool_call_id.clone()),
                );
            }
            if let Some(tool_name) = &message.tool_name {
                obj.insert("name".to_string(), Value::String(tool_name.clone()));
            }
            Value::Object(obj)
        })
        .collect()
}

fn tool_call_to_wire(call: &ToolCall) -> Value {
    json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": call.arguments_json,
        }
    })
}

fn tools_to_wire(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::new(
            GatewayErrorKind::Timeout,
            format!("chat completion timed out: {}", err),
        )
    } else {
        GatewayError::new(
            GatewayErrorKind::BackendTransient,
            format!("chat completion request failed: {}", err),
        )
    }
}

fn map_http_error(status: u16, body: &str) -> GatewayError {
    let snippet = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 {
        GatewayError::new(GatewayErrorKind::Authentication, "authentication failed")
            .with_retryable(false)
    } else if status == 403 {
        GatewayError::new(GatewayErrorKind::Authorization, "authorization failed")
            .with_retryable(false)
    } else if status == 408 || status == 429 {
        GatewayError::new(
            GatewayErrorKind::RateLimited,
            format!("service returned status {}", status),
        )
        .with_retryable(true)
    } else if (400..500).contains(&status) {
        GatewayError::new(
            GatewayErrorKind::InvalidRequest,
            format!("service returned status {}", status),
        )
        .with_retryable(false)
    } else {
        GatewayError::new(
            GatewayErrorKind::BackendTransient,
            format!("service returned status {}", status),
        )
        .with_retryable(true)
    };

    err = err.with_provider_http_status(status);
    if !snippet.is_empty() {
        err.message = format!("{}: {}", err.message, snippet);
    }
    err
}

fn parse_finish_reason(value: Option<&str>) -> FinishReason {
    match value.unwrap_or("stop") {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" => FinishReason::ToolCalls,
        other => FinishReason::Other(other.to_string()),
    }
}

fn parse_usage(usage: &Value) -> UsageStats {
    UsageStats {
        input_tokens: usage.get("prompt_tokens").and_then(Value::as_u64),
        output_tokens: usage.get("completion_tokens").and_then(Value::as_u64),
        total_tokens: usage.get("total_tokens").and_then(Value::as_u64),
    }
}

fn parse_chat_payload(payload: &Value) -> Result<ChatResponse, GatewayError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            GatewayError::new(
                GatewayErrorKind::ProtocolViolation,
                "chat completion missing choices",
            )
            .with_retryable(false)
        })?;

    let message = choice.get("message");

    let content = message
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message
        .and_then(|message| message.get("tool_calls"))
        .and_then(Value::as_array)
    {
        for (index, call) in calls.iter().enumerate() {
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("call_{}", index));
            let name = call
                .get("function")
                .and_then(|function| function.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("unknown_tool")
                .to_string();
            // Arguments arrive as a JSON-encoded string; some gateways inline
            // the object instead.
            let arguments_json = call
                .get("function")
                .and_then(|function| function.get("arguments"))
                .map(|value| {
                    if let Some(arguments) = value.as_str() {
                        arguments.to_string()
                    } else {
                        value.to_string()
                    }
                })
                .unwrap_or_else(|| "{}".to_string());

            tool_calls.push(ToolCall {
                id,
                name,
                arguments_json,
            });
        }
    }

    let finish_reason = parse_finish_reason(choice.get("finish_reason").and_then(Value::as_str));
    let usage = payload.get("usage").map(parse_usage);

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason,
        usage,
    })
}
