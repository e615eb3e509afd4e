//! WebAuthn registration and authentication ceremony verification.

mod config;
mod errors;
mod main;
mod types;

pub use config::RelyingPartyConfig;
pub use errors::{ErrorKind, PasskeyError};

pub use main::{
    AttestationObject, AttestationStatement, AttestedCredentialData, AuthenticatorData, EcCurve,
    HashAlgorithm, RsaScheme, VerifiableKey, cancel_ceremony, consume_session,
    finish_authentication, finish_registration, import_cose_key, start_authentication,
    start_registration, validate_authentication, validate_registration, verify_attestation,
};

pub use types::{
    AuthenticationChallenge, AuthenticationOutcome, AuthenticationResponse, AuthenticationResult,
    CeremonyExpectation, CeremonyKind, CeremonySession, CredentialRecord, PendingUser,
    RegistrationChallenge, RegistrationOutcome, RegistrationResponse,
};
