use subtle::ConstantTimeEq;

use crate::passkey::config::RelyingPartyConfig;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{
    AuthenticationChallenge, AuthenticationOutcome, AuthenticationResponse, AuthenticationResult,
    CeremonyExpectation, CeremonyKind,
};
use crate::storage::{CredentialStore, SessionStore};
use crate::utils::base64url_encode;

use super::auth_data::AuthenticatorData;
use super::challenge::{consume_session, new_session};
use super::client_data::{ParsedClientData, TYPE_GET};
use super::cose::import_cose_key;
use super::utils::{decode_field, signed_data, verify_rp_id_and_flags};

/// Validates an assertion against a stored credential
///
/// The signature is verified over `authData || SHA-256(clientDataJSON)` with
/// the stored COSE key, using the key's declared algorithm or the curve's
/// native hash. A counter of zero on both sides means the authenticator does
/// not implement counters; otherwise the presented counter must exceed the
/// stored one.
///
/// # Errors
/// * `PasskeyError::SignatureInvalid` - If the signature does not verify
/// * `PasskeyError::CounterReplay` - If the counter did not increase
/// * Any client data, authenticator data or RP error
pub fn validate_authentication(
    client_data_json: &[u8],
    auth_data: &[u8],
    signature: &[u8],
    stored_public_key: &[u8],
    stored_sign_count: u32,
    expect: &CeremonyExpectation<'_>,
) -> Result<AuthenticationResult, PasskeyError> {
    let client_data = ParsedClientData::parse(client_data_json)?;
    client_data.verify(TYPE_GET, expect)?;

    let decoded = AuthenticatorData::decode(auth_data)?;
    verify_rp_id_and_flags(&decoded, expect)?;

    let key = import_cose_key(stored_public_key)?;
    key.verify(
        key.default_hash(),
        &signed_data(auth_data, &client_data.hash),
        signature,
    )
    .map_err(|e| {
        tracing::error!("Assertion signature verification failed: {}", e);
        PasskeyError::SignatureInvalid(e)
    })?;

    let use_count = decoded.counter;
    if use_count == 0 && stored_sign_count == 0 {
        tracing::warn!("Authenticator does not implement a signature counter");
    } else if use_count <= stored_sign_count {
        tracing::error!(
            "Signature counter did not increase: stored {}, presented {}",
            stored_sign_count,
            use_count
        );
        return Err(PasskeyError::CounterReplay(format!(
            "Stored {stored_sign_count}, presented {use_count}"
        )));
    }

    Ok(AuthenticationResult {
        sign_count: use_count,
        backup_state: decoded.is_backed_up(),
    })
}

/// Starts an authentication ceremony.
pub async fn start_authentication(
    sessions: &dyn SessionStore,
    config: &RelyingPartyConfig,
) -> Result<AuthenticationChallenge, PasskeyError> {
    let (nonce, session) = new_session(
        sessions,
        CeremonyKind::Authentication,
        None,
        config.challenge_timeout,
    )
    .await?;
    tracing::debug!("Started authentication ceremony");

    Ok(AuthenticationChallenge {
        nonce,
        challenge: base64url_encode(session.challenge.as_bytes()),
        rp_ids: config.rp_ids.clone(),
        require_user_verification: config.require_user_verification,
    })
}

/// Completes an authentication ceremony and persists the new counter and backup state.
pub async fn finish_authentication(
    sessions: &dyn SessionStore,
    credentials: &dyn CredentialStore,
    config: &RelyingPartyConfig,
    response: AuthenticationResponse,
) -> Result<AuthenticationOutcome, PasskeyError> {
    let session =
        consume_session(sessions, &response.nonce, CeremonyKind::Authentication).await?;

    let auth_data = decode_field(&response.authenticator_data, "authenticator data")?;
    let signature = decode_field(&response.signature, "signature")?;
    let credential_id = decode_field(&response.credential_id, "credential ID")?;

    let stored = credentials
        .get_by_user_handle(&response.user_handle)
        .await?
        .ok_or_else(|| {
            tracing::warn!("No credential registered for the presented user handle");
            PasskeyError::NotFound("Credential not found".into())
        })?;

    let presented_id = base64url_encode(&credential_id);
    if !bool::from(
        presented_id
            .as_bytes()
            .ct_eq(stored.credential_id.as_bytes()),
    ) {
        tracing::error!(
            "Credential ID {} does not belong to the presented user handle",
            presented_id
        );
        return Err(PasskeyError::NotFound("Credential not found".into()));
    }

    let expect = CeremonyExpectation::new(config, session.challenge.as_bytes());
    let result = validate_authentication(
        response.client_data_json.as_bytes(),
        &auth_data,
        &signature,
        &stored.public_key,
        stored.sign_count,
        &expect,
    )?;

    credentials
        .update_counter_and_backup_state(
            &response.user_handle,
            result.sign_count,
            result.backup_state,
        )
        .await?;
    tracing::info!(
        "Authenticated credential {} (counter {})",
        stored.credential_id,
        result.sign_count
    );

    Ok(AuthenticationOutcome {
        user_handle: response.user_handle,
        sign_count: result.sign_count,
        backup_state: result.backup_state,
    })
}
