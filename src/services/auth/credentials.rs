//! Header-borne credentials.
//!
//! Two naming conventions exist across clients:
//! - session-id style: `ofte-sessionid` / `ofte-accesstoken`
//! - session-token style: `ofte-session` / `ofte-token`
//!
//! Both carry the same two fields. Lookups go through `HeaderMap`, so names are
//! matched case-insensitively.
use std::fmt;

use axum::http::{HeaderMap, HeaderName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    SessionId,
    SessionToken,
}

impl HeaderStyle {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "session-id" | "sessionid" => Some(Self::SessionId),
            "session-token" | "token" => Some(Self::SessionToken),
            _ => None,
        }
    }
}

/// Which credentials a gate requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Session identifier only.
    Session,
    /// Session identifier plus a one-time access token.
    Access,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Session,
    AccessToken,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Session => write!(f, "session id"),
            Credential::AccessToken => write!(f, "access token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNames {
    pub session: HeaderName,
    pub access_token: HeaderName,
    /// Forwarded as the `uid` form field when present.
    pub uid: Option<HeaderName>,
}

impl HeaderNames {
    pub fn for_style(style: HeaderStyle) -> Self {
        let (session, access_token) = match style {
            HeaderStyle::SessionId => ("ofte-sessionid", "ofte-accesstoken"),
            HeaderStyle::SessionToken => ("ofte-session", "ofte-token"),
        };

        Self {
            session: HeaderName::from_static(session),
            access_token: HeaderName::from_static(access_token),
            uid: None,
        }
    }
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self::for_style(HeaderStyle::SessionId)
    }
}

/// Raw lookup result, one slot per field. Empty or non-text values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHeaders {
    pub session: Option<String>,
    pub access_token: Option<String>,
    pub uid: Option<String>,
}

pub fn extract(headers: &HeaderMap, names: &HeaderNames) -> ExtractedHeaders {
    ExtractedHeaders {
        session: header_value(headers, &names.session),
        access_token: header_value(headers, &names.access_token),
        uid: names
            .uid
            .as_ref()
            .and_then(|name| header_value(headers, name)),
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// `.` and `..` are dot segments of a URL path: they would be resolved away
/// on the outbound route, so neither is accepted as a credential value.
pub fn is_dot_segment(value: &str) -> bool {
    matches!(value, "." | "..")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidCredentials {
    pub missing: Vec<(Credential, HeaderName)>,
    pub malformed: Vec<(Credential, HeaderName)>,
}

impl InvalidCredentials {
    /// Only absent fields, nothing unusable was sent.
    pub fn is_incomplete_only(&self) -> bool {
        self.malformed.is_empty()
    }

    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.malformed.is_empty()
    }
}

fn write_fields(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    fields: &[(Credential, HeaderName)],
) -> fmt::Result {
    write!(f, "{label}")?;
    for (i, (credential, header)) in fields.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        write!(f, "{sep}{credential} (header {header})")?;
    }
    Ok(())
}

impl fmt::Display for InvalidCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.missing.is_empty() {
            write_fields(f, "missing", &self.missing)?;
        }
        if !self.malformed.is_empty() {
            if !self.missing.is_empty() {
                write!(f, "; ")?;
            }
            write_fields(f, "malformed", &self.malformed)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidCredentials {}

impl ExtractedHeaders {
    /// Turns the lookup into a `CredentialSet` carrying exactly what `mode` needs.
    pub fn require(
        self,
        mode: GateMode,
        names: &HeaderNames,
    ) -> Result<CredentialSet, InvalidCredentials> {
        let mut invalid = InvalidCredentials::default();

        let mut check = |credential: Credential, value: &Option<String>, header: &HeaderName| match value {
            None => invalid.missing.push((credential, header.clone())),
            Some(v) if is_dot_segment(v) => invalid.malformed.push((credential, header.clone())),
            Some(_) => {}
        };
        check(Credential::Session, &self.session, &names.session);
        if mode == GateMode::Access {
            check(Credential::AccessToken, &self.access_token, &names.access_token);
        }

        match self.session {
            Some(session) if invalid.is_empty() => Ok(CredentialSet {
                session,
                access_token: match mode {
                    GateMode::Session => None,
                    GateMode::Access => self.access_token,
                },
                uid: self.uid,
            }),
            _ => Err(invalid),
        }
    }
}

/// Credentials of one request. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    session: String,
    access_token: Option<String>,
    uid: Option<String>,
}

impl CredentialSet {
    pub fn session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            access_token: None,
            uid: None,
        }
    }

    pub fn access(session: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            access_token: Some(access_token.into()),
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }
}

// Keeps credentials out of logs.
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("session", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("uid", &self.uid)
            .finish()
    }
}
