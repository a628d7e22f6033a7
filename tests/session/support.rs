use std::{
    collections::VecDeque,
    fs,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use minwon_kiosk::{
    console::Console,
    gateway::{
        error::GatewayError,
        openai::ChatClient,
        types::{ChatRequest, ChatResponse, FinishReason, ToolCall},
    },
    intent::ISSUE_DOCUMENT_TOOL,
    registry::Registry,
};

pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: Vec::new(),
        }
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }

    pub fn position_of(&self, needle: &str) -> Option<usize> {
        self.output.iter().position(|line| line.contains(needle))
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        self.output.push(text.to_string());
        Ok(self.inputs.pop_front())
    }

    fn say(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

pub enum ScriptedReply {
    /// Free-text answer, no capability invocation.
    Text(&'static str),
    /// The service invokes issue_civil_document with this document type.
    Capability(&'static str),
    Failure(GatewayError),
}

pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().expect("requests lock")[index].clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        self.requests.lock().expect("requests lock").push(request);
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .expect("scripted client ran out of replies");
        match reply {
            ScriptedReply::Text(text) => Ok(ChatResponse {
                content: Some(text.to_string()),
                tool_calls: Vec::new(),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
            ScriptedReply::Capability(document_type) => Ok(ChatResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: ISSUE_DOCUMENT_TOOL.to_string(),
                    arguments_json: format!("{{\"document_type\":\"{document_type}\"}}"),
                }],
                finish_reason: FinishReason::ToolCalls,
                usage: None,
            }),
            ScriptedReply::Failure(err) => Err(err),
        }
    }
}

/// Writes `content` to a throwaway registry file and loads it back.
pub fn registry_from(content: &str) -> Registry {
    let path = std::env::temp_dir().join(format!("kiosk-session-registry-{}.txt", Uuid::now_v7()));
    fs::write(&path, content).expect("registry file should be written");
    let registry = Registry::load(&path);
    let _ = fs::remove_file(&path);
    registry
}
