//! Credential gate: header extraction → remote validation → forward or abort.
//!
//! Per request:
//! - required header missing → 400 (or pass-through, when configured) with no outbound call
//! - header value is a dot segment (`.` / `..`) → 400 with no outbound call
//! - authority answers 200 → next handler runs, `GateDecision` in its extensions
//! - anything else → 401, the chain stops here
//!
//! A trust-policy violation is answered with 500 and logged at error level.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::error::{self, AppError};
use crate::services::auth::{
    CredentialValidator, GateMode, HeaderNames, ValidationOutcome, credentials,
};

/// What happens when a required credential header is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCredentialPolicy {
    /// Deny with 400.
    #[default]
    Reject,
    /// Forward unauthenticated without contacting the authority.
    PassThrough,
}

impl MissingCredentialPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "pass-through" | "pass_through" | "passthrough" => Some(Self::PassThrough),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Authority confirmed the credentials.
    Allow,
    /// Credentials incomplete and the policy lets the request through unchecked.
    PassThrough,
}

#[derive(Clone)]
pub struct CredentialGate {
    mode: GateMode,
    headers: Arc<HeaderNames>,
    on_missing: MissingCredentialPolicy,
    validator: Arc<dyn CredentialValidator>,
}

impl CredentialGate {
    pub fn new(
        mode: GateMode,
        headers: Arc<HeaderNames>,
        on_missing: MissingCredentialPolicy,
        validator: Arc<dyn CredentialValidator>,
    ) -> Self {
        Self {
            mode,
            headers,
            on_missing,
            validator,
        }
    }

    pub async fn check(&self, headers: &HeaderMap) -> Result<GateDecision, AppError> {
        let creds = match credentials::extract(headers, &self.headers)
            .require(self.mode, &self.headers)
        {
            Ok(creds) => creds,
            Err(err)
                if self.on_missing == MissingCredentialPolicy::PassThrough
                    && err.is_incomplete_only() =>
            {
                tracing::debug!(mode = ?self.mode, error = %err, "passing through unauthenticated");
                return Ok(GateDecision::PassThrough);
            }
            Err(err) => {
                tracing::debug!(mode = ?self.mode, error = %err, "credential headers unusable");
                return Err(err.into());
            }
        };

        let outcome = match self.validator.validate(&creds).await {
            Ok(outcome) => outcome,
            Err(violation) => {
                tracing::error!(
                    error = %violation,
                    "refusing validation call: certificate bypass requested for non-loopback authority"
                );
                return Err(violation.into());
            }
        };

        match &outcome {
            ValidationOutcome::Allowed => {
                tracing::debug!(mode = ?self.mode, "credentials validated");
                return Ok(GateDecision::Allow);
            }
            ValidationOutcome::Rejected { status } => {
                tracing::warn!(
                    mode = ?self.mode,
                    status = status.as_u16(),
                    "authority rejected credentials"
                );
            }
            ValidationOutcome::Unreachable(err) => {
                tracing::warn!(mode = ?self.mode, error = ?err, "authority call failed");
            }
            ValidationOutcome::Unroutable => {
                tracing::debug!(mode = ?self.mode, "credential cannot be sent to the authority");
            }
        }

        Err(error::denial(outcome).unwrap_or(AppError::Internal))
    }
}

/// Puts `gate` in front of every route of `router`.
///
/// ```ignore
/// let protected = Router::new().route("/ping", get(ping));
/// let protected = middleware::auth::gate::apply(protected, state.session_gate.clone());
/// ```
pub fn apply<S>(router: Router<S>, gate: CredentialGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, credential_gate))
}

async fn credential_gate(
    State(gate): State<CredentialGate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let decision = gate.check(req.headers()).await?;
    req.extensions_mut().insert(decision);
    Ok(next.run(req).await)
}
