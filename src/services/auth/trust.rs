//! Transport trust for the outbound validation call.
//!
//! Certificate verification may only be skipped when the authority is the
//! local-loopback one (`https://localhost[:port]`). The check is an exact
//! scheme + host comparison on the parsed URL, so `https://localhost.example.com`
//! or `http://localhost` never qualify.
//!
//! The relaxed configuration is a value built for a single call; it never
//! touches the shared client used for verified calls.
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const LOOPBACK_HOST: &str = "localhost";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("certificate verification bypass refused for non-loopback target {target}")]
pub struct TrustPolicyViolation {
    pub target: String,
}

/// Whether `target` is the loopback authority over TLS.
pub fn is_loopback_authority(target: &Url) -> bool {
    target.scheme() == "https" && target.host_str() == Some(LOOPBACK_HOST)
}

/// Operator choice for certificate checks on the validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVerification {
    /// Skip checks for the loopback authority, verify everything else.
    #[default]
    Auto,
    /// Always verify.
    Strict,
    /// Skip checks. Only legal for the loopback authority.
    Skip,
}

impl TlsVerification {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "strict" | "verify" => Some(Self::Strict),
            "skip" | "insecure" => Some(Self::Skip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CertificateCheck {
    Verify,
    Skip,
}

/// Transport settings for exactly one outbound validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    certificates: CertificateCheck,
    timeout: Duration,
}

impl TransportConfig {
    pub fn verified(timeout: Duration) -> Self {
        Self {
            certificates: CertificateCheck::Verify,
            timeout,
        }
    }

    /// Relaxed settings for the loopback authority. Fails for any other target.
    pub fn skip_verification(
        target: &Url,
        timeout: Duration,
    ) -> Result<Self, TrustPolicyViolation> {
        if !is_loopback_authority(target) {
            return Err(TrustPolicyViolation {
                target: target.origin().ascii_serialization(),
            });
        }

        Ok(Self {
            certificates: CertificateCheck::Skip,
            timeout,
        })
    }

    /// Picks the settings for `target` under `policy`.
    pub fn for_target(
        target: &Url,
        timeout: Duration,
        policy: TlsVerification,
    ) -> Result<Self, TrustPolicyViolation> {
        match policy {
            TlsVerification::Strict => Ok(Self::verified(timeout)),
            TlsVerification::Auto if !is_loopback_authority(target) => Ok(Self::verified(timeout)),
            TlsVerification::Auto | TlsVerification::Skip => {
                Self::skip_verification(target, timeout)
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn skips_verification(&self) -> bool {
        self.certificates == CertificateCheck::Skip
    }

    /// Builds a client carrying these settings.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            // the answer must come from the configured authority itself
            .redirect(reqwest::redirect::Policy::none())
            // rustls skips both chain and hostname checks with this flag
            .danger_accept_invalid_certs(self.skips_verification())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn loopback_requires_https_and_exact_host() {
        assert!(is_loopback_authority(&url("https://localhost")));
        assert!(is_loopback_authority(&url("https://localhost:9443/auth")));

        assert!(!is_loopback_authority(&url("http://localhost:9443")));
        assert!(!is_loopback_authority(&url("https://localhost.example.com")));
        assert!(!is_loopback_authority(&url("https://example.com")));
        assert!(!is_loopback_authority(&url("https://example.com/localhost")));
        assert!(!is_loopback_authority(&url("https://localhost@example.com")));
    }

    #[test]
    fn skip_verification_refuses_remote_target() {
        let err = TransportConfig::skip_verification(
            &url("https://example.com"),
            Duration::from_secs(1),
        )
        .unwrap_err();

        assert_eq!(err.target, "https://example.com");
    }

    #[test]
    fn skip_verification_accepts_loopback() {
        let cfg = TransportConfig::skip_verification(
            &url("https://localhost:9443"),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(cfg.skips_verification());
    }

    #[test]
    fn auto_only_relaxes_loopback() {
        let timeout = Duration::from_secs(5);

        let remote = TransportConfig::for_target(
            &url("https://auth.example.com"),
            timeout,
            TlsVerification::Auto,
        )
        .unwrap();
        assert!(!remote.skips_verification());

        let local = TransportConfig::for_target(
            &url("https://localhost:9443"),
            timeout,
            TlsVerification::Auto,
        )
        .unwrap();
        assert!(local.skips_verification());
        assert_eq!(local.timeout(), timeout);
    }

    #[test]
    fn strict_never_relaxes() {
        let cfg = TransportConfig::for_target(
            &url("https://localhost:9443"),
            Duration::from_secs(5),
            TlsVerification::Strict,
        )
        .unwrap();

        assert!(!cfg.skips_verification());
    }

    #[test]
    fn explicit_skip_against_remote_is_a_violation() {
        let err = TransportConfig::for_target(
            &url("https://example.com"),
            Duration::from_secs(5),
            TlsVerification::Skip,
        )
        .unwrap_err();

        assert_eq!(err.target, "https://example.com");
    }

    #[test]
    fn tls_verification_parse() {
        assert_eq!(TlsVerification::parse("AUTO"), Some(TlsVerification::Auto));
        assert_eq!(TlsVerification::parse("strict"), Some(TlsVerification::Strict));
        assert_eq!(TlsVerification::parse("skip"), Some(TlsVerification::Skip));
        assert_eq!(TlsVerification::parse("maybe"), None);
    }
}
