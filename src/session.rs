use std::sync::Arc;

use anyhow::Result;

use crate::{
    catalog::{self, ProcedureGuide},
    config::SessionConfig,
    console::Console,
    gateway::{
        error::{GatewayError, GatewayErrorKind, internal_error},
        openai::ChatClient,
        types::{ChatMessage, ChatRequest},
    },
    intent::{DocumentIntent, IntentResolver},
    registry::Registry,
    verify::VerificationGate,
};

pub const BANNER: &str = "행정복지센터 민원발급기입니다. 종료하려면 '종료'를 입력하세요.";
pub const REQUEST_PROMPT: &str =
    "어떤 민원서류를 발급받으시겠습니까? (예: 주민등록등본, 가족관계증명서 등)\n사용자: ";
pub const EXIT_MESSAGE: &str = "민원발급기를 종료합니다.";
pub const REPROMPT_MESSAGE: &str = "민원발급기: 어떤 민원서류를 원하시는지 다시 입력해 주세요.";
pub const DEGRADED_SERVICE_MESSAGE: &str =
    "민원발급기: 외부 서비스 연결에 문제가 발생했습니다. 잠시 후 다시 시도해 주세요.";
pub const NARRATIVE_RETRY_PROMPT: &str =
    "다시 시도하려면 Enter, 종료하려면 '종료'를 입력하세요.\n사용자: ";

/// One in-flight document request: the utterance that triggered it, the
/// classifier's capability invocation, and the resolved procedure.
struct DocumentRequest {
    raw_text: String,
    intent: DocumentIntent,
    guide: ProcedureGuide,
}

enum SessionState {
    AwaitingRequest,
    Verifying(DocumentRequest),
    Composing(DocumentRequest),
    Terminated,
}

pub struct Kiosk {
    session: SessionConfig,
    registry: Registry,
    resolver: IntentResolver,
    client: Arc<dyn ChatClient>,
}

impl Kiosk {
    pub fn new(session: SessionConfig, registry: Registry, client: Arc<dyn ChatClient>) -> Self {
        Self {
            resolver: IntentResolver::new(Arc::clone(&client)),
            session,
            registry,
            client,
        }
    }

    /// Runs the session to completion. The session ends after the first
    /// successfully issued document.
    pub async fn run(&self, console: &mut dyn Console) -> Result<()> {
        console.say(BANNER);
        let mut state = SessionState::AwaitingRequest;
        loop {
            state = match state {
                SessionState::AwaitingRequest => self.await_request(console).await?,
                SessionState::Verifying(request) => self.verify_citizen(console, request).await?,
                SessionState::Composing(request) => {
                    self.compose_and_deliver(console, request).await?
                }
                SessionState::Terminated => break,
            };
        }
        Ok(())
    }

    async fn await_request(&self, console: &mut dyn Console) -> Result<SessionState> {
        let Some(input) = console.prompt(REQUEST_PROMPT).await? else {
            tracing::info!(target: "session", "console_closed");
            return Ok(SessionState::Terminated);
        };

        if self.is_exit_token(&input) {
            console.say(EXIT_MESSAGE);
            return Ok(SessionState::Terminated);
        }

        let intent = match self.resolver.classify(&input).await {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(
                    target: "session",
                    error = %err,
                    retryable = err.retryable,
                    "classification_call_failed"
                );
                console.say(DEGRADED_SERVICE_MESSAGE);
                return Ok(SessionState::AwaitingRequest);
            }
        };

        let Some(intent) = intent else {
            console.say(REPROMPT_MESSAGE);
            return Ok(SessionState::AwaitingRequest);
        };

        let guide = catalog::resolve_procedure(&intent.document_type);
        console.say(&format!("\n'{}' 민원 발급 절차 안내:", intent.document_type));
        console.say(&format!(
            "{} 발급 서비스를 요청하셨네요!",
            intent.document_type
        ));

        Ok(SessionState::Verifying(DocumentRequest {
            raw_text: input,
            intent,
            guide,
        }))
    }

    async fn verify_citizen(
        &self,
        console: &mut dyn Console,
        request: DocumentRequest,
    ) -> Result<SessionState> {
        let gate = VerificationGate::new(&self.registry, self.session.max_verify_attempts);
        match gate.run(console).await? {
            Some(outcome) => {
                tracing::info!(
                    target: "session",
                    citizen = %outcome.display_name,
                    document = %request.guide.document,
                    "citizen_verified"
                );
                Ok(SessionState::Composing(request))
            }
            None => {
                tracing::info!(
                    target: "session",
                    document = %request.guide.document,
                    "document_request_abandoned"
                );
                Ok(SessionState::AwaitingRequest)
            }
        }
    }

    /// The narrative call may fail without losing the verification already
    /// established; the user chooses between retrying it and exiting.
    async fn compose_and_deliver(
        &self,
        console: &mut dyn Console,
        request: DocumentRequest,
    ) -> Result<SessionState> {
        loop {
            match self.compose_narrative(&request).await {
                Ok(narrative) => {
                    console.say(&format!("\n민원발급기: {narrative}"));
                    return Ok(SessionState::Terminated);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "session",
                        error = %err,
                        retryable = err.retryable,
                        "narrative_call_failed"
                    );
                    console.say(DEGRADED_SERVICE_MESSAGE);
                    let Some(answer) = console.prompt(NARRATIVE_RETRY_PROMPT).await? else {
                        return Ok(SessionState::Terminated);
                    };
                    if self.is_exit_token(&answer) {
                        console.say(EXIT_MESSAGE);
                        return Ok(SessionState::Terminated);
                    }
                }
            }
        }
    }

    async fn compose_narrative(&self, request: &DocumentRequest) -> Result<String, GatewayError> {
        let payload = serde_json::to_string(&request.guide)
            .map_err(|err| internal_error(format!("failed to encode procedure payload: {err}")))?;

        let call = &request.intent.call;
        let messages = vec![
            ChatMessage::user(request.raw_text.clone()),
            ChatMessage::assistant_tool_call(call.clone()),
            ChatMessage::tool_result(call.id.clone(), call.name.clone(), payload),
        ];

        let response = self
            .client
            .complete(ChatRequest::new(messages, Vec::new()))
            .await?;
        response
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::new(
                    GatewayErrorKind::ProtocolViolation,
                    "final narrative missing content",
                )
                .with_retryable(false)
            })
    }

    fn is_exit_token(&self, input: &str) -> bool {
        let input = input.trim();
        self.session
            .exit_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(input))
    }
}
