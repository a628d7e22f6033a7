use std::sync::Arc;

use serde_json::{Value, json};

use crate::gateway::{
    error::GatewayError,
    openai::ChatClient,
    types::{ChatMessage, ChatRequest, ToolCall, ToolDefinition},
};

pub const ISSUE_DOCUMENT_TOOL: &str = "issue_civil_document";

/// A successful classification: the requested document category plus the
/// capability invocation record needed to rebuild the turn transcript.
#[derive(Debug, Clone)]
pub struct DocumentIntent {
    pub document_type: String,
    pub call: ToolCall,
}

pub struct IntentResolver {
    client: Arc<dyn ChatClient>,
}

impl IntentResolver {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    pub fn tool_definition() -> ToolDefinition {
        ToolDefinition {
            name: ISSUE_DOCUMENT_TOOL.to_string(),
            description: "지정된 민원서류의 발급 절차를 안내합니다.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "document_type": {
                        "type": "string",
                        "description": "민원서류 종류, 예: 주민등록등본, 가족관계증명서 등"
                    }
                }
            }),
        }
    }

    /// One classification call per user utterance. Ok(None) means the service
    /// answered in free text instead of invoking the capability; the caller
    /// re-prompts the user, this adapter never retries on its own.
    pub async fn classify(&self, user_text: &str) -> Result<Option<DocumentIntent>, GatewayError> {
        let request = ChatRequest::new(
            vec![ChatMessage::user(user_text)],
            vec![Self::tool_definition()],
        );
        let response = self.client.complete(request).await?;

        for call in response.tool_calls {
            if call.name != ISSUE_DOCUMENT_TOOL {
                tracing::warn!(
                    target: "intent",
                    capability = %call.name,
                    "unexpected_capability_invocation"
                );
                continue;
            }
            return match document_type_from_arguments(&call.arguments_json) {
                Some(document_type) => Ok(Some(DocumentIntent {
                    document_type,
                    call,
                })),
                None => {
                    tracing::warn!(
                        target: "intent",
                        arguments = %call.arguments_json,
                        "capability_arguments_unreadable"
                    );
                    Ok(None)
                }
            };
        }
        Ok(None)
    }
}

fn document_type_from_arguments(arguments_json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(arguments_json).ok()?;
    value
        .get("document_type")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}
