use ring::digest;
use subtle::ConstantTimeEq;

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::CeremonyExpectation;
use crate::utils::base64_decode_lenient;

use super::auth_data::AuthenticatorData;

/// Checks the RP ID hash against every accepted RP ID, then the UP and UV flags.
pub(super) fn verify_rp_id_and_flags(
    auth_data: &AuthenticatorData,
    expect: &CeremonyExpectation<'_>,
) -> Result<(), PasskeyError> {
    let matched = expect.rp_ids.iter().any(|rp_id| {
        let expected = digest::digest(&digest::SHA256, rp_id.as_bytes());
        bool::from(auth_data.rp_id_hash.ct_eq(expected.as_ref()))
    });
    if !matched {
        tracing::error!(
            "RP ID hash does not match any of {:?}",
            expect.rp_ids
        );
        return Err(PasskeyError::RpIdMismatch(format!(
            "Expected one of {:?}",
            expect.rp_ids
        )));
    }

    if !auth_data.is_user_present() {
        tracing::error!("User presence flag not set");
        return Err(PasskeyError::UserNotPresent(format!(
            "Flags: {:#04x}",
            auth_data.flags
        )));
    }

    if expect.require_user_verification && !auth_data.is_user_verified() {
        tracing::error!("User verification required but flag not set");
        return Err(PasskeyError::UserNotVerified(format!(
            "Flags: {:#04x}",
            auth_data.flags
        )));
    }

    Ok(())
}

/// `authData || clientDataHash`
pub(super) fn signed_data(auth_data: &[u8], client_data_hash: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(auth_data.len() + client_data_hash.len());
    data.extend_from_slice(auth_data);
    data.extend_from_slice(client_data_hash);
    data
}

/// Decodes a base64 ceremony field, mapping failures to `MalformedInput`.
pub(super) fn decode_field(value: &str, what: &str) -> Result<Vec<u8>, PasskeyError> {
    base64_decode_lenient(value).map_err(|e| {
        tracing::error!("Failed to decode {}: {}", what, e);
        PasskeyError::MalformedInput(format!("Invalid base64 in {what}"))
    })
}
