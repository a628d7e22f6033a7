use anyhow::Result;

use crate::{console::Console, registry::Registry};

pub const IDENTIFIER_PROMPT: &str =
    "민원 처리를 위해 주민등록번호를 입력해 주세요 (예: 9001011234567):\n사용자: ";
pub const IDENTIFIER_REQUIRED_MESSAGE: &str =
    "주민등록번호를 반드시 입력해야 민원 처리가 가능합니다.";
pub const IDENTIFIER_UNKNOWN_MESSAGE: &str = "등록된 주민등록번호가 아닙니다. 다시 시도해 주세요.";

/// Outcome of assessing one identifier entry against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStep {
    EmptyIdentifier,
    UnknownIdentifier,
    Verified { display_name: String },
}

pub fn assess_identifier(input: &str, registry: &Registry) -> GateStep {
    if input.trim().is_empty() {
        return GateStep::EmptyIdentifier;
    }
    match registry.lookup(input) {
        Some(display_name) => GateStep::Verified {
            display_name: display_name.to_string(),
        },
        None => GateStep::UnknownIdentifier,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub identifier: String,
    pub display_name: String,
}

/// Identifier sub-dialogue: keeps asking until the registry confirms the
/// citizen. Unbounded unless a maximum attempt count is injected.
pub struct VerificationGate<'a> {
    registry: &'a Registry,
    max_attempts: Option<u32>,
}

impl<'a> VerificationGate<'a> {
    pub fn new(registry: &'a Registry, max_attempts: Option<u32>) -> Self {
        Self {
            registry,
            max_attempts,
        }
    }

    /// Ok(None) means the request was abandoned: the attempt cap ran out or
    /// the console closed mid-dialogue.
    pub async fn run(&self, console: &mut dyn Console) -> Result<Option<VerificationOutcome>> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(max) = self.max_attempts
                && attempts >= max
            {
                tracing::info!(target: "verify", attempts, "verification_attempts_exhausted");
                return Ok(None);
            }
            attempts = attempts.saturating_add(1);

            let Some(input) = console.prompt(IDENTIFIER_PROMPT).await? else {
                tracing::info!(target: "verify", "console_closed_during_verification");
                return Ok(None);
            };

            match assess_identifier(&input, self.registry) {
                GateStep::EmptyIdentifier => console.say(IDENTIFIER_REQUIRED_MESSAGE),
                GateStep::UnknownIdentifier => console.say(IDENTIFIER_UNKNOWN_MESSAGE),
                GateStep::Verified { display_name } => {
                    console.say(&format!("{display_name}님 안녕하세요!\n"));
                    return Ok(Some(VerificationOutcome {
                        identifier: input,
                        display_name,
                    }));
                }
            }
        }
    }
}
