use chrono::Utc;

use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{
    CeremonyExpectation, CeremonyKind, CredentialRecord, PendingUser, RegistrationChallenge,
    RegistrationOutcome, RegistrationResponse,
};
use crate::storage::{CredentialStore, SessionStore, TrustAnchorStore};
use crate::utils::{base64_decode_lenient, base64url_encode, gen_random_string};

use super::attestation::{AttestationObject, verify_attestation};
use super::auth_data::AuthenticatorData;
use super::challenge::{consume_session, new_session};
use super::client_data::{ParsedClientData, TYPE_CREATE};
use super::cose::import_cose_key;
use super::utils::{signed_data, verify_rp_id_and_flags};

const MAX_CREDENTIAL_ID_LEN: usize = 1023;
const USER_HANDLE_BYTES: usize = 16;

/// Validates a registration response and builds the credential record to persist
///
/// Runs the client data checks, decodes the attestation object, checks the RP
/// ID hash and user flags, verifies the attestation statement over
/// `authData || SHA-256(clientDataJSON)` and bounds the credential ID length.
/// Nothing is persisted here.
///
/// # Arguments
/// * `client_data_json` - Raw client data JSON bytes
/// * `attestation_object_b64` - Base64 CBOR attestation object
/// * `expect` - Challenge, origins, RP IDs and the user verification requirement
/// * `trust_store` - Attestation roots for certificate-based attestation
///
/// # Errors
/// Any of the client data, authenticator data, attestation and RP errors of
/// [`PasskeyError`]; see [`PasskeyError::kind`] for their classification.
pub async fn validate_registration(
    client_data_json: &[u8],
    attestation_object_b64: &str,
    expect: &CeremonyExpectation<'_>,
    trust_store: &dyn TrustAnchorStore,
) -> Result<CredentialRecord, PasskeyError> {
    let client_data = ParsedClientData::parse(client_data_json)?;
    client_data.verify(TYPE_CREATE, expect)?;

    let attestation_cbor = base64_decode_lenient(attestation_object_b64).map_err(|e| {
        tracing::error!("Failed to decode attestation object: {}", e);
        PasskeyError::MalformedAttestation("Invalid base64".into())
    })?;
    let attestation = AttestationObject::decode(&attestation_cbor)?;
    tracing::debug!(
        "Attestation format: {}",
        attestation.statement.format()
    );

    let auth_data = AuthenticatorData::decode(&attestation.auth_data)?;
    let credential = auth_data.attested_credential_data.as_ref().ok_or_else(|| {
        tracing::error!("Registration authenticator data has no attested credential data");
        PasskeyError::MissingCredentialData("AT flag not set".into())
    })?;

    verify_rp_id_and_flags(&auth_data, expect)?;

    // Every format, `none` included, must carry a key an assertion can verify under
    import_cose_key(&credential.credential_public_key)?;

    verify_attestation(
        &credential.aaguid,
        &attestation.statement,
        &signed_data(&attestation.auth_data, &client_data.hash),
        &credential.credential_public_key,
        trust_store,
    )
    .await?;

    if credential.credential_id.len() > MAX_CREDENTIAL_ID_LEN {
        tracing::error!(
            "Credential ID is {} bytes, limit {}",
            credential.credential_id.len(),
            MAX_CREDENTIAL_ID_LEN
        );
        return Err(PasskeyError::CredentialIdTooLong(format!(
            "{} bytes",
            credential.credential_id.len()
        )));
    }

    let record = CredentialRecord {
        credential_id: base64url_encode(&credential.credential_id),
        public_key: credential.credential_public_key.clone(),
        sign_count: auth_data.counter,
        backup_eligible: auth_data.is_backup_eligible(),
        backup_state: auth_data.is_backed_up(),
        aaguid: credential.aaguid_string(),
        attestation_format: attestation.statement.format().to_string(),
        created_at: Utc::now(),
    };
    tracing::debug!("Validated registration for credential {}", record.credential_id);

    Ok(record)
}

/// Starts a registration ceremony for a new user.
pub async fn start_registration(
    sessions: &dyn SessionStore,
    config: &RelyingPartyConfig,
    name: &str,
    email: Option<&str>,
) -> Result<RegistrationChallenge, PasskeyError> {
    let user = PendingUser {
        user_handle: gen_random_string(USER_HANDLE_BYTES)?,
        name: name.to_string(),
        email: email.map(str::to_string),
    };
    let user_handle = user.user_handle.clone();

    let (nonce, session) = new_session(
        sessions,
        CeremonyKind::Registration,
        Some(user),
        config.challenge_timeout,
    )
    .await?;
    tracing::info!("Started registration for {}", name);

    Ok(RegistrationChallenge {
        nonce,
        challenge: base64url_encode(session.challenge.as_bytes()),
        user_handle,
        rp_ids: config.rp_ids.clone(),
        require_user_verification: config.require_user_verification,
    })
}

/// Completes a registration ceremony
///
/// The session is consumed first; the credential is persisted under the
/// pending user handle only after validation succeeds.
pub async fn finish_registration(
    sessions: &dyn SessionStore,
    credentials: &dyn CredentialStore,
    trust_store: &dyn TrustAnchorStore,
    config: &RelyingPartyConfig,
    response: RegistrationResponse,
) -> Result<RegistrationOutcome, PasskeyError> {
    let session = consume_session(sessions, &response.nonce, CeremonyKind::Registration).await?;
    let user = session.user.ok_or_else(|| {
        tracing::error!("Registration session carries no pending user");
        PasskeyError::NotFound("Pending user".into())
    })?;

    let expect = CeremonyExpectation::new(config, session.challenge.as_bytes());
    let credential = validate_registration(
        response.client_data_json.as_bytes(),
        &response.attestation_object,
        &expect,
        trust_store,
    )
    .await?;

    credentials
        .put_new(&user.user_handle, credential.clone())
        .await?;
    tracing::info!(
        "Registered credential {} for {}",
        credential.credential_id,
        user.name
    );

    Ok(RegistrationOutcome { user, credential })
}
