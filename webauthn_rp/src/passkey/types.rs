use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::RelyingPartyConfig;

/// Identity of the user a registration ceremony is being run for.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PendingUser {
    /// Temporary WebAuthn user handle, later the key of the stored credential
    pub user_handle: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

/// Short-lived record binding a challenge to one pending ceremony.
///
/// Looked up by the random nonce handed to the client and consumed at most once.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CeremonySession {
    /// Random challenge. Its UTF-8 bytes are the WebAuthn challenge.
    pub challenge: String,
    pub kind: CeremonyKind,
    pub user: Option<PendingUser>,
    pub expires_at: DateTime<Utc>,
}

impl CeremonySession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Durable record of one registered authenticator.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Credential ID, base64url without padding
    pub credential_id: String,
    /// COSE-encoded credential public key
    pub public_key: Vec<u8>,
    /// Signature counter, only ever increases
    pub sign_count: u32,
    pub backup_eligible: bool,
    pub backup_state: bool,
    /// AAGUID of the authenticator model, hyphenated lowercase
    pub aaguid: String,
    /// Attestation statement format the credential was registered with
    pub attestation_format: String,
    pub created_at: DateTime<Utc>,
}

/// Counter and backup state to persist after a successful assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub sign_count: u32,
    pub backup_state: bool,
}

/// What a ceremony response is checked against.
#[derive(Clone, Copy, Debug)]
pub struct CeremonyExpectation<'a> {
    /// Raw challenge bytes; client data must carry their base64url encoding
    pub challenge: &'a [u8],
    pub origins: &'a [String],
    pub rp_ids: &'a [String],
    pub require_user_verification: bool,
}

impl<'a> CeremonyExpectation<'a> {
    pub fn new(config: &'a RelyingPartyConfig, challenge: &'a [u8]) -> Self {
        Self {
            challenge,
            origins: &config.origins,
            rp_ids: &config.rp_ids,
            require_user_verification: config.require_user_verification,
        }
    }
}

/// Values handed to the client to start a registration ceremony.
#[derive(Clone, Serialize, Debug)]
pub struct RegistrationChallenge {
    pub nonce: String,
    pub challenge: String,
    pub user_handle: String,
    pub rp_ids: Vec<String>,
    pub require_user_verification: bool,
}

/// Values handed to the client to start an authentication ceremony.
#[derive(Clone, Serialize, Debug)]
pub struct AuthenticationChallenge {
    pub nonce: String,
    pub challenge: String,
    pub rp_ids: Vec<String>,
    pub require_user_verification: bool,
}

/// Client response to a registration challenge.
#[derive(Clone, Deserialize, Debug)]
pub struct RegistrationResponse {
    pub nonce: String,
    /// Client data JSON as sent by the browser
    pub client_data_json: String,
    /// Base64 CBOR attestation object
    pub attestation_object: String,
}

/// Client response to an authentication challenge.
#[derive(Clone, Deserialize, Debug)]
pub struct AuthenticationResponse {
    pub nonce: String,
    pub user_handle: String,
    /// Base64 credential ID
    pub credential_id: String,
    pub client_data_json: String,
    /// Base64 authenticator data
    pub authenticator_data: String,
    /// Base64 signature
    pub signature: String,
}

#[derive(Clone, Debug)]
pub struct RegistrationOutcome {
    pub user: PendingUser,
    pub credential: CredentialRecord,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    pub user_handle: String,
    pub sign_count: u32,
    pub backup_state: bool,
}
