use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::gateway::error::{GatewayError, GatewayErrorKind, invalid_request};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    Inline { token: String },
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::Env {
            var: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub auth_header: String,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, reference: &CredentialRef) -> Result<ResolvedCredential, GatewayError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(&self, reference: &CredentialRef) -> Result<ResolvedCredential, GatewayError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = env::var(var).map_err(|_| {
                    GatewayError::new(
                        GatewayErrorKind::Authentication,
                        format!("missing credential environment variable {}", var),
                    )
                    .with_retryable(false)
                })?;
                if token.trim().is_empty() {
                    return Err(GatewayError::new(
                        GatewayErrorKind::Authentication,
                        format!("credential environment variable {} is empty", var),
                    )
                    .with_retryable(false));
                }
                Ok(ResolvedCredential {
                    auth_header: format!("Bearer {}", token),
                })
            }
            CredentialRef::Inline { token } => {
                if token.trim().is_empty() {
                    return Err(invalid_request("inline credential token cannot be empty"));
                }
                Ok(ResolvedCredential {
                    auth_header: format!("Bearer {}", token),
                })
            }
        }
    }
}
