use minwon_kiosk::{
    config::SessionConfig,
    gateway::{
        error::{GatewayError, GatewayErrorKind},
        types::ChatRole,
    },
    session::{
        DEGRADED_SERVICE_MESSAGE, EXIT_MESSAGE, Kiosk, REPROMPT_MESSAGE,
    },
    verify::{IDENTIFIER_REQUIRED_MESSAGE, IDENTIFIER_UNKNOWN_MESSAGE},
};

use crate::support::{ScriptedChatClient, ScriptedConsole, ScriptedReply, registry_from};

fn kiosk_with(
    session: SessionConfig,
    registry_lines: &str,
    replies: Vec<ScriptedReply>,
) -> (Kiosk, std::sync::Arc<ScriptedChatClient>) {
    let client = ScriptedChatClient::new(replies);
    let kiosk = Kiosk::new(session, registry_from(registry_lines), client.clone());
    (kiosk, client)
}

#[tokio::test]
async fn given_registered_citizen_when_document_requested_then_issuance_narrative_is_printed() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![
            ScriptedReply::Capability("주민등록등본"),
            ScriptedReply::Text("주민등록등본은 신분증 스캔과 수수료 결제 후 발급됩니다."),
        ],
    );
    let mut console = ScriptedConsole::new(&["주민등록등본 발급받고 싶어요", "9001011234567"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw("'주민등록등본' 민원 발급 절차 안내:"));
    assert!(console.saw("주민등록등본 발급 서비스를 요청하셨네요!"));
    assert!(console.saw("홍길동님 안녕하세요!"));
    assert!(console.saw("민원발급기: 주민등록등본은 신분증 스캔과 수수료 결제 후 발급됩니다."));
    assert_eq!(client.request_count(), 2);

    // The narrative call replays the whole turn transcript.
    let narrative_request = client.request(1);
    assert!(narrative_request.tools.is_empty());
    assert_eq!(narrative_request.messages.len(), 3);
    assert_eq!(narrative_request.messages[0].role, ChatRole::User);
    assert_eq!(
        narrative_request.messages[0].content.as_deref(),
        Some("주민등록등본 발급받고 싶어요")
    );
    assert_eq!(narrative_request.messages[1].role, ChatRole::Assistant);
    assert_eq!(narrative_request.messages[1].tool_calls.len(), 1);
    assert_eq!(narrative_request.messages[2].role, ChatRole::Tool);
    assert_eq!(
        narrative_request.messages[2].tool_call_id.as_deref(),
        Some("call_1")
    );
    let payload = narrative_request.messages[2]
        .content
        .as_deref()
        .expect("tool result payload present");
    assert!(payload.contains("주민등록등본"));
    assert!(payload.contains("수수료를 결제한 뒤"));
}

#[tokio::test]
async fn given_exit_token_first_when_session_starts_then_no_external_calls_are_made() {
    let (kiosk, client) = kiosk_with(SessionConfig::default(), "홍길동,9001011234567\n", vec![]);
    let mut console = ScriptedConsole::new(&["종료"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(EXIT_MESSAGE));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn given_ascii_exit_token_in_any_case_then_session_terminates() {
    let (kiosk, client) = kiosk_with(SessionConfig::default(), "", vec![]);
    let mut console = ScriptedConsole::new(&["EXIT"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(EXIT_MESSAGE));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn given_unmapped_text_when_classifier_declines_then_reprompt_without_verification() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![ScriptedReply::Text("무엇을 도와드릴까요?")],
    );
    let mut console = ScriptedConsole::new(&["오늘 날씨 어때요", "종료"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(REPROMPT_MESSAGE));
    assert!(!console.saw("주민등록번호를 입력해"));
    assert!(console.saw(EXIT_MESSAGE));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn given_empty_then_unknown_then_valid_identifier_then_two_distinct_retry_messages() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![
            ScriptedReply::Capability("주민등록등본"),
            ScriptedReply::Text("안내를 마칩니다."),
        ],
    );
    let mut console = ScriptedConsole::new(&[
        "주민등록등본 발급받고 싶어요",
        "",
        "0000000000000",
        "9001011234567",
    ]);

    kiosk.run(&mut console).await.expect("session completes");

    let required_at = console
        .position_of(IDENTIFIER_REQUIRED_MESSAGE)
        .expect("empty-identifier message shown");
    let unknown_at = console
        .position_of(IDENTIFIER_UNKNOWN_MESSAGE)
        .expect("unknown-identifier message shown");
    assert!(required_at < unknown_at);
    assert!(console.saw("홍길동님 안녕하세요!"));
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn given_classification_outage_then_degraded_message_and_session_continues() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![ScriptedReply::Failure(
            GatewayError::new(
                GatewayErrorKind::BackendTransient,
                "chat completion request failed: connection refused",
            ),
        )],
    );
    let mut console = ScriptedConsole::new(&["등본 발급해 주세요", "종료"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(DEGRADED_SERVICE_MESSAGE));
    assert!(console.saw(EXIT_MESSAGE));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn given_narrative_outage_then_retry_succeeds_without_new_verification() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![
            ScriptedReply::Capability("주민등록등본"),
            ScriptedReply::Failure(GatewayError::new(
                GatewayErrorKind::Timeout,
                "chat completion timed out",
            )),
            ScriptedReply::Text("주민등록등본 발급 절차를 안내드립니다."),
        ],
    );
    // Empty answer at the retry prompt means "try again".
    let mut console = ScriptedConsole::new(&["주민등록등본 주세요", "9001011234567", ""]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(DEGRADED_SERVICE_MESSAGE));
    assert!(console.saw("민원발급기: 주민등록등본 발급 절차를 안내드립니다."));
    let greetings = console
        .output
        .iter()
        .filter(|line| line.contains("홍길동님 안녕하세요!"))
        .count();
    assert_eq!(greetings, 1, "verification must not be re-run");
    assert_eq!(client.request_count(), 3);
}

#[tokio::test]
async fn given_narrative_outage_then_exit_token_ends_the_session() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![
            ScriptedReply::Capability("주민등록등본"),
            ScriptedReply::Failure(GatewayError::new(
                GatewayErrorKind::BackendTransient,
                "service returned status 503",
            )),
        ],
    );
    let mut console = ScriptedConsole::new(&["등본 주세요", "9001011234567", "종료"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(DEGRADED_SERVICE_MESSAGE));
    assert!(console.saw(EXIT_MESSAGE));
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn given_attempt_cap_when_identifiers_keep_failing_then_request_is_abandoned() {
    let session = SessionConfig {
        max_verify_attempts: Some(2),
        ..SessionConfig::default()
    };
    let (kiosk, client) = kiosk_with(
        session,
        "홍길동,9001011234567\n",
        vec![ScriptedReply::Capability("주민등록등본")],
    );
    let mut console = ScriptedConsole::new(&["등본 발급", "", "0000000000000", "종료"]);

    kiosk.run(&mut console).await.expect("session completes");

    assert!(console.saw(IDENTIFIER_REQUIRED_MESSAGE));
    assert!(console.saw(IDENTIFIER_UNKNOWN_MESSAGE));
    assert!(!console.saw("안녕하세요!"));
    assert!(console.saw(EXIT_MESSAGE));
    // Only the classification call happened; no narrative was composed.
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn given_unknown_document_type_then_fallback_procedure_reaches_the_transcript() {
    let (kiosk, client) = kiosk_with(
        SessionConfig::default(),
        "홍길동,9001011234567\n",
        vec![
            ScriptedReply::Capability("토지대장"),
            ScriptedReply::Text("토지대장은 센터 창구에서 문의해 주세요."),
        ],
    );
    let mut console = ScriptedConsole::new(&["토지대장 발급해 주세요", "9001011234567"]);

    kiosk.run(&mut console).await.expect("session completes");

    let payload = client.request(1).messages[2]
        .content
        .clone()
        .expect("tool result payload present");
    assert!(payload.contains("토지대장"));
    assert!(payload.contains("센터에서 직접 문의해 주세요"));
}

#[tokio::test]
async fn given_console_eof_at_request_prompt_then_session_ends_quietly() {
    let (kiosk, client) = kiosk_with(SessionConfig::default(), "", vec![]);
    let mut console = ScriptedConsole::new(&[]);

    kiosk.run(&mut console).await.expect("session completes");

    assert_eq!(client.request_count(), 0);
}
