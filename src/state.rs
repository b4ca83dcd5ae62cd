/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - session_gate: session id のみ検証
 *   - access_gate: session id + one-time access token を検証
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::auth::CredentialGate;
use crate::services::auth::{CredentialValidator, GateMode};

#[derive(Clone)]
pub struct AppState {
    pub session_gate: CredentialGate,
    pub access_gate: CredentialGate,
}

impl AppState {
    pub fn new(config: &Config, validator: Arc<dyn CredentialValidator>) -> Self {
        let headers = Arc::new(config.headers.clone());

        Self {
            session_gate: CredentialGate::new(
                GateMode::Session,
                headers.clone(),
                config.missing_credentials,
                validator.clone(),
            ),
            access_gate: CredentialGate::new(
                GateMode::Access,
                headers,
                config.missing_credentials,
                validator,
            ),
        }
    }
}
