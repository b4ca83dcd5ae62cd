/*
 * Responsibility
 * - gate が返す拒否レスポンスの定義
 * - IntoResponse 実装 (HTTP status / 短いテキスト本文)
 * - InvalidCredentials / ValidationOutcome / TrustPolicyViolation を統一的に変換
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::{
    InvalidCredentials, TrustPolicyViolation, ValidationOutcome, validator::TransportError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<InvalidCredentials> for AppError {
    fn from(e: InvalidCredentials) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        // Only the summary reaches the caller; the source stays in the logs.
        AppError::Unauthorized(format!("credential validation failed: {}", e.kind.summary()))
    }
}

impl From<TrustPolicyViolation> for AppError {
    fn from(_: TrustPolicyViolation) -> Self {
        // Misconfiguration, not a bad credential.
        AppError::Internal
    }
}

/// Maps a non-allowed outcome to its response. `Allowed` has no error form.
pub fn denial(outcome: ValidationOutcome) -> Option<AppError> {
    match outcome {
        ValidationOutcome::Allowed => None,
        ValidationOutcome::Rejected { status } => Some(AppError::Unauthorized(format!(
            "credential validation failed: authority responded {}",
            status.as_u16()
        ))),
        ValidationOutcome::Unreachable(e) => Some(e.into()),
        ValidationOutcome::Unroutable => Some(AppError::BadRequest(
            "malformed credential: dot segment".into(),
        )),
    }
}
