pub mod credentials;
pub mod trust;
pub mod validator;

pub use credentials::{CredentialSet, GateMode, HeaderNames, HeaderStyle, InvalidCredentials};
pub use trust::{TlsVerification, TrustPolicyViolation};
pub use validator::{
    AuthorityConfig, CredentialValidator, Encoding, RemoteValidator, ValidationOutcome,
};
