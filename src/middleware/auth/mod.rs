pub mod gate;

pub use gate::{CredentialGate, GateDecision, MissingCredentialPolicy, apply};
