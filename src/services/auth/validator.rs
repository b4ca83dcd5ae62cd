//! Remote validation call against the authentication authority.
//!
//! One request per credential set, success iff the authority answers 200.
//! The body is never read; the response is dropped before the outcome is
//! returned, so the connection is released on every path.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::services::auth::credentials::{CredentialSet, is_dot_segment};
use crate::services::auth::trust::{TlsVerification, TransportConfig, TrustPolicyViolation};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How credentials are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `GET {endpoint}/validate_session/{session}` or
    /// `GET {endpoint}/validate_access/{session}/{token}`
    Path,
    /// `POST {endpoint}/t` with form fields `session`, `token`, `uid`
    Form,
}

impl Encoding {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "path" | "get" => Some(Self::Path),
            "form" | "post" => Some(Self::Form),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    pub endpoint: Url,
    pub encoding: Encoding,
    pub timeout: Duration,
    pub tls: TlsVerification,
}

impl AuthorityConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            encoding: Encoding::Path,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsVerification::Auto,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

impl TransportErrorKind {
    /// Caller-facing text. Never includes addresses or TLS details.
    pub fn summary(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "authority did not respond in time",
            TransportErrorKind::Connect => "authority unreachable",
            TransportErrorKind::Other => "authority request failed",
        }
    }
}

#[derive(Debug, Error)]
#[error("{}: {source}", .kind.summary())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    #[source]
    pub source: reqwest::Error,
}

impl From<reqwest::Error> for TransportError {
    fn from(source: reqwest::Error) -> Self {
        let kind = if source.is_timeout() {
            TransportErrorKind::Timeout
        } else if source.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self { kind, source }
    }
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Allowed,
    Rejected { status: StatusCode },
    Unreachable(TransportError),
    /// A credential cannot be carried on the route; nothing was sent.
    Unroutable,
}

impl ValidationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ValidationOutcome::Allowed)
    }
}

/// "Is this credential set currently valid?"
///
/// `Err` is reserved for trust-policy violations; every other failure is a
/// deny outcome.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(
        &self,
        credentials: &CredentialSet,
    ) -> Result<ValidationOutcome, TrustPolicyViolation>;
}

/// reqwest-backed validator.
///
/// Verified calls share one pooled client. Calls that skip certificate checks
/// get their own client, built for that call and dropped with it.
#[derive(Debug, Clone)]
pub struct RemoteValidator {
    config: AuthorityConfig,
    client: reqwest::Client,
}

impl RemoteValidator {
    pub fn new(config: AuthorityConfig) -> Result<Self, reqwest::Error> {
        let client = TransportConfig::verified(config.timeout).build_client()?;
        Ok(Self { config, client })
    }

    /// Route for `credentials` under the configured encoding. Segments are
    /// percent-encoded, so a credential cannot alter the route. `None` when a
    /// path credential is a dot segment, which URL normalization would drop.
    pub fn request_url(&self, credentials: &CredentialSet) -> Option<Url> {
        if self.config.encoding == Encoding::Path
            && (is_dot_segment(credentials.session_id())
                || credentials.access_token().is_some_and(is_dot_segment))
        {
            return None;
        }

        let url = match self.config.encoding {
            Encoding::Path => match credentials.access_token() {
                Some(token) => self.endpoint(&[
                    "validate_access",
                    credentials.session_id(),
                    token,
                ]),
                None => self.endpoint(&["validate_session", credentials.session_id()]),
            },
            Encoding::Form => self.endpoint(&["t"]),
        };
        Some(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.config.endpoint.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn form_fields<'a>(credentials: &'a CredentialSet) -> Vec<(&'static str, &'a str)> {
        let mut fields = vec![("session", credentials.session_id())];
        if let Some(token) = credentials.access_token() {
            fields.push(("token", token));
        }
        if let Some(uid) = credentials.uid() {
            fields.push(("uid", uid));
        }
        fields
    }

    fn request(
        &self,
        client: &reqwest::Client,
        transport: &TransportConfig,
        url: Url,
        credentials: &CredentialSet,
    ) -> reqwest::RequestBuilder {
        let builder = match self.config.encoding {
            Encoding::Path => client.get(url),
            Encoding::Form => client.post(url).form(&Self::form_fields(credentials)),
        };
        builder.timeout(transport.timeout())
    }
}

#[async_trait]
impl CredentialValidator for RemoteValidator {
    async fn validate(
        &self,
        credentials: &CredentialSet,
    ) -> Result<ValidationOutcome, TrustPolicyViolation> {
        let Some(url) = self.request_url(credentials) else {
            return Ok(ValidationOutcome::Unroutable);
        };

        let target = &self.config.endpoint;
        let transport = TransportConfig::for_target(target, self.config.timeout, self.config.tls)?;

        let dedicated;
        let client = if transport.skips_verification() {
            tracing::debug!(
                authority = %target,
                "certificate verification skipped for loopback authority"
            );
            dedicated = match transport.build_client() {
                Ok(client) => client,
                Err(err) => return Ok(ValidationOutcome::Unreachable(err.into())),
            };
            &dedicated
        } else {
            &self.client
        };

        let status = match self.request(client, &transport, url, credentials).send().await {
            // response (and its connection) dropped at the end of this arm
            Ok(response) => response.status(),
            Err(err) => return Ok(ValidationOutcome::Unreachable(err.into())),
        };

        if status == StatusCode::OK {
            Ok(ValidationOutcome::Allowed)
        } else {
            Ok(ValidationOutcome::Rejected { status })
        }
    }
}
