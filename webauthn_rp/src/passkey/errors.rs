use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

/// Errors that can occur while verifying WebAuthn ceremonies.
///
/// Every variant carries a detail string intended for server-side logs.
/// Use [`PasskeyError::client_message`] for anything returned to a client.
#[derive(Debug, Error)]
pub enum PasskeyError {
    /// Error related to relying-party configuration (e.g., missing origin)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Truncated or ill-typed authenticator data
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Bytes left over after every flagged authenticator data section was consumed
    #[error("Trailing data: {0}")]
    TrailingData(String),

    /// COSE key type other than EC2 or RSA, or an unsupported curve/algorithm
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// COSE key map with absent or mistyped fields
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// Attestation signature or certificate validation failed
    #[error("Attestation verification failed: {0}")]
    VerificationFailed(String),

    /// Attestation statement format this relying party does not implement
    #[error("Unsupported attestation format: {0}")]
    UnsupportedFormat(String),

    /// No trust anchors are registered for the authenticator's AAGUID
    #[error("Unknown authenticator: {0}")]
    UnknownAuthenticator(String),

    /// Client data JSON that does not parse or lacks required fields
    #[error("Malformed client data: {0}")]
    MalformedClientData(String),

    /// Client data `type` does not match the ceremony
    #[error("Unexpected client data type: {0}")]
    UnexpectedType(String),

    #[error("Challenge mismatch: {0}")]
    ChallengeMismatch(String),

    #[error("Origin mismatch: {0}")]
    OriginMismatch(String),

    /// Attestation object that is not valid base64/CBOR or misses a field
    #[error("Malformed attestation object: {0}")]
    MalformedAttestation(String),

    /// Registration authenticator data without the attested credential section
    #[error("Missing attested credential data: {0}")]
    MissingCredentialData(String),

    #[error("RP ID hash mismatch: {0}")]
    RpIdMismatch(String),

    #[error("User not present: {0}")]
    UserNotPresent(String),

    #[error("User not verified: {0}")]
    UserNotVerified(String),

    #[error("Credential ID too long: {0}")]
    CredentialIdTooLong(String),

    /// Assertion signature did not verify against the stored key
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Signature counter did not increase, a possible cloned authenticator
    #[error("Counter replay: {0}")]
    CounterReplay(String),

    /// Ceremony session was found but its expiry is in the past
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate credential: {0}")]
    DuplicateCredential(String),

    /// Error accessing one of the injected stores
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error from utility operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

/// Coarse classification of [`PasskeyError`] for callers mapping errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Truncated or ill-typed binary or JSON input
    MalformedInput,
    /// Wrong challenge, origin, type, RP ID or user flags
    ProtocolMismatch,
    /// Signature, certificate chain or counter failure
    Cryptographic,
    /// Unknown or untrusted authenticator provenance
    Trust,
    /// Session and store conditions
    State,
}

impl PasskeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_)
            | Self::TrailingData(_)
            | Self::MalformedKey(_)
            | Self::MalformedClientData(_)
            | Self::MalformedAttestation(_)
            | Self::MissingCredentialData(_)
            | Self::CredentialIdTooLong(_)
            | Self::Utils(_) => ErrorKind::MalformedInput,
            Self::UnexpectedType(_)
            | Self::ChallengeMismatch(_)
            | Self::OriginMismatch(_)
            | Self::RpIdMismatch(_)
            | Self::UserNotPresent(_)
            | Self::UserNotVerified(_) => ErrorKind::ProtocolMismatch,
            Self::VerificationFailed(_) | Self::SignatureInvalid(_) | Self::CounterReplay(_) => {
                ErrorKind::Cryptographic
            }
            Self::UnsupportedKeyType(_)
            | Self::UnsupportedFormat(_)
            | Self::UnknownAuthenticator(_) => ErrorKind::Trust,
            Self::Config(_)
            | Self::SessionExpired(_)
            | Self::NotFound(_)
            | Self::DuplicateCredential(_)
            | Self::Storage(_) => ErrorKind::State,
        }
    }

    /// Static message safe to hand back to the client.
    ///
    /// The detail string is never included.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::SessionExpired(_) => "The ceremony has expired, please try again",
            Self::NotFound(_) => "No matching ceremony or credential",
            Self::DuplicateCredential(_) => "This authenticator is already registered",
            Self::Storage(_) | Self::Config(_) => "Internal error",
            _ => "Could not verify WebAuthn response",
        }
    }
}

impl From<StorageError> for PasskeyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => Self::NotFound(msg),
            StorageError::Duplicate(msg) => Self::DuplicateCredential(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}
