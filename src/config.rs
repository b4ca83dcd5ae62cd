/*
 * Responsibility
 * - 環境変数の読み込み (AUTH_ENDPOINT, ヘッダ名, エンコーディング, タイムアウトなど)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動後は不変。Arc で gate に渡す
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;
use url::Url;

use crate::middleware::auth::MissingCredentialPolicy;
use crate::services::auth::{
    AuthorityConfig, Encoding, HeaderNames, HeaderStyle, TlsVerification,
    validator::DEFAULT_TIMEOUT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub authority: AuthorityConfig,
    pub headers: HeaderNames,
    pub missing_credentials: MissingCredentialPolicy,

    // host server limits
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (env, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let endpoint = lookup("AUTH_ENDPOINT")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_ENDPOINT"))?;
        let endpoint = Url::parse(&endpoint).map_err(|_| ConfigError::Invalid("AUTH_ENDPOINT"))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(ConfigError::Invalid("AUTH_ENDPOINT"));
        }

        let encoding = parse_or("AUTH_ENCODING", &lookup, Encoding::parse, Encoding::Path)?;
        let tls = parse_or(
            "AUTH_TLS_VERIFY",
            &lookup,
            TlsVerification::parse,
            TlsVerification::Auto,
        )?;

        let timeout = seconds_or("AUTH_TIMEOUT_SECONDS", &lookup, DEFAULT_TIMEOUT)?;

        let style = parse_or(
            "AUTH_HEADER_STYLE",
            &lookup,
            HeaderStyle::parse,
            HeaderStyle::SessionId,
        )?;
        let mut headers = HeaderNames::for_style(style);
        if let Some(name) = header_name("AUTH_SESSION_HEADER", &lookup)? {
            headers.session = name;
        }
        if let Some(name) = header_name("AUTH_ACCESS_HEADER", &lookup)? {
            headers.access_token = name;
        }
        headers.uid = header_name("AUTH_UID_HEADER", &lookup)?;
        if headers.session == headers.access_token {
            return Err(ConfigError::Invalid("AUTH_ACCESS_HEADER"));
        }

        let missing_credentials = parse_or(
            "AUTH_MISSING_CREDENTIALS",
            &lookup,
            MissingCredentialPolicy::parse,
            MissingCredentialPolicy::Reject,
        )?;

        let request_timeout =
            seconds_or("REQUEST_TIMEOUT_SECONDS", &lookup, Duration::from_secs(30))?;

        let body_limit_bytes = match lookup("BODY_LIMIT_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::Invalid("BODY_LIMIT_BYTES"))?,
            None => 1024 * 1024,
        };

        Ok(Self {
            addr,
            app_env,
            authority: AuthorityConfig::new(endpoint)
                .with_encoding(encoding)
                .with_timeout(timeout)
                .with_tls(tls),
            headers,
            missing_credentials,
            request_timeout,
            body_limit_bytes,
        })
    }
}

fn parse_or<F, T>(
    key: &'static str,
    lookup: &F,
    parse: fn(&str) -> Option<T>,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse(&raw).ok_or(ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn seconds_or<F>(key: &'static str, lookup: &F, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::Invalid(key)),
            Ok(secs) => Ok(Duration::from_secs(secs)),
        },
        None => Ok(default),
    }
}

fn header_name<F>(key: &'static str, lookup: &F) -> Result<Option<HeaderName>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(raw) => HeaderName::from_str(&raw)
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn endpoint_is_required() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing("AUTH_ENDPOINT")
        );
        assert_eq!(
            load(&[("AUTH_ENDPOINT", "  ")]).unwrap_err(),
            ConfigError::Missing("AUTH_ENDPOINT")
        );
    }

    #[test]
    fn endpoint_must_be_http_url() {
        assert_eq!(
            load(&[("AUTH_ENDPOINT", "not a url")]).unwrap_err(),
            ConfigError::Invalid("AUTH_ENDPOINT")
        );
        assert_eq!(
            load(&[("AUTH_ENDPOINT", "ftp://auth.example.com")]).unwrap_err(),
            ConfigError::Invalid("AUTH_ENDPOINT")
        );
    }

    #[test]
    fn defaults() {
        let config = load(&[("AUTH_ENDPOINT", "https://auth.example.com")]).unwrap();

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.authority.encoding, Encoding::Path);
        assert_eq!(config.authority.tls, TlsVerification::Auto);
        assert_eq!(config.authority.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.headers, HeaderNames::for_style(HeaderStyle::SessionId));
        assert_eq!(config.missing_credentials, MissingCredentialPolicy::Reject);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("AUTH_ENDPOINT", "https://localhost:9443"),
            ("PORT", "8080"),
            ("APP_ENV", "prod"),
            ("AUTH_ENCODING", "form"),
            ("AUTH_TLS_VERIFY", "strict"),
            ("AUTH_TIMEOUT_SECONDS", "3"),
            ("AUTH_HEADER_STYLE", "session-token"),
            ("AUTH_UID_HEADER", "X-User-Email"),
            ("AUTH_MISSING_CREDENTIALS", "pass-through"),
        ])
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert!(config.app_env.is_production());
        assert_eq!(config.authority.encoding, Encoding::Form);
        assert_eq!(config.authority.tls, TlsVerification::Strict);
        assert_eq!(config.authority.timeout, Duration::from_secs(3));
        assert_eq!(config.headers.session.as_str(), "ofte-session");
        assert_eq!(config.headers.access_token.as_str(), "ofte-token");
        assert_eq!(
            config.headers.uid.as_ref().map(HeaderName::as_str),
            Some("x-user-email")
        );
        assert_eq!(
            config.missing_credentials,
            MissingCredentialPolicy::PassThrough
        );
    }

    #[test]
    fn explicit_header_names_win() {
        let config = load(&[
            ("AUTH_ENDPOINT", "https://auth.example.com"),
            ("AUTH_SESSION_HEADER", "X-Session"),
            ("AUTH_ACCESS_HEADER", "X-Access"),
        ])
        .unwrap();

        assert_eq!(config.headers.session.as_str(), "x-session");
        assert_eq!(config.headers.access_token.as_str(), "x-access");
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            ("AUTH_ENCODING", "grpc"),
            ("AUTH_TLS_VERIFY", "sometimes"),
            ("AUTH_TIMEOUT_SECONDS", "0"),
            ("AUTH_TIMEOUT_SECONDS", "ten"),
            ("AUTH_HEADER_STYLE", "cookie"),
            ("AUTH_SESSION_HEADER", "bad header"),
            ("AUTH_MISSING_CREDENTIALS", "allow"),
            ("PORT", "http"),
        ];

        for (key, value) in cases {
            let err = load(&[("AUTH_ENDPOINT", "https://auth.example.com"), (key, value)])
                .unwrap_err();
            assert_eq!(err, ConfigError::Invalid(key), "{key}={value}");
        }
    }

    #[test]
    fn session_and_access_headers_must_differ() {
        let err = load(&[
            ("AUTH_ENDPOINT", "https://auth.example.com"),
            ("AUTH_ACCESS_HEADER", "ofte-sessionid"),
        ])
        .unwrap_err();

        assert_eq!(err, ConfigError::Invalid("AUTH_ACCESS_HEADER"));
    }
}
