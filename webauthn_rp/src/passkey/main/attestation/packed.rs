use uuid::Uuid;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::time::ASN1Time;
use x509_parser::x509::AttributeTypeAndValue;

use crate::passkey::errors::PasskeyError;
use crate::passkey::main::cose::{HashAlgorithm, VerifiableKey, import_cose_key};
use crate::storage::TrustAnchorStore;
use crate::utils::base64_std_decode;
use crate::x509::{asn1_now, is_time_valid, parse_certificate, verify_chain};

// id-fido-gen-ce-aaguid
const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
const ATTESTATION_OU: &str = "Authenticator Attestation";

/// Verifies a packed attestation statement
///
/// Without `x5c` the statement is a self attestation and `sig` must verify
/// under the credential key itself. With `x5c` the leaf must satisfy the
/// packed certificate requirements, sign `signed_data`, and chain to one of
/// the roots registered for `aaguid` in the trust store.
///
/// # Arguments
/// * `aaguid` - AAGUID from the attested credential data
/// * `alg` - COSE algorithm from the statement
/// * `sig` - Attestation signature
/// * `x5c` - Optional DER certificate chain, leaf first
/// * `signed_data` - `authData || clientDataHash`
/// * `public_key_cose` - Credential public key
/// * `trust_store` - Source of attestation roots
///
/// # Errors
/// * `PasskeyError::UnknownAuthenticator` - If no roots are registered for the AAGUID
/// * `PasskeyError::VerificationFailed` - If any signature or certificate check fails
///
pub(super) async fn verify_packed_attestation(
    aaguid: &[u8; 16],
    alg: i64,
    sig: &[u8],
    x5c: Option<&[Vec<u8>]>,
    signed_data: &[u8],
    public_key_cose: &[u8],
    trust_store: &dyn TrustAnchorStore,
) -> Result<(), PasskeyError> {
    match x5c {
        None => verify_self_attestation(alg, sig, signed_data, public_key_cose),
        Some(chain) => {
            verify_full_attestation(aaguid, alg, sig, chain, signed_data, trust_store).await
        }
    }
}

fn verify_self_attestation(
    alg: i64,
    sig: &[u8],
    signed_data: &[u8],
    public_key_cose: &[u8],
) -> Result<(), PasskeyError> {
    tracing::debug!("Verifying packed self attestation");
    let key = import_cose_key(public_key_cose)?;

    match key.alg() {
        Some(key_alg) if key_alg != alg => {
            tracing::error!(
                "Self attestation alg {} does not match credential key alg {}",
                alg,
                key_alg
            );
            return Err(PasskeyError::VerificationFailed(format!(
                "Statement alg {alg} differs from credential key alg {key_alg}"
            )));
        }
        _ => {}
    }

    let hash = HashAlgorithm::from_cose_alg(alg).ok_or_else(|| {
        PasskeyError::VerificationFailed(format!("Unsupported algorithm: {alg}"))
    })?;

    key.verify(hash, signed_data, sig)
        .map_err(|e| PasskeyError::VerificationFailed(format!("Self attestation: {e}")))
}

async fn verify_full_attestation(
    aaguid: &[u8; 16],
    alg: i64,
    sig: &[u8],
    x5c: &[Vec<u8>],
    signed_data: &[u8],
    trust_store: &dyn TrustAnchorStore,
) -> Result<(), PasskeyError> {
    let aaguid_str = Uuid::from_bytes(*aaguid).hyphenated().to_string();
    tracing::debug!("Verifying packed full attestation for {}", aaguid_str);

    let roots = trust_store
        .get_root_certs(&aaguid_str)
        .await?
        .filter(|roots| !roots.is_empty())
        .ok_or_else(|| {
            tracing::warn!("No attestation roots registered for {}", aaguid_str);
            PasskeyError::UnknownAuthenticator(aaguid_str.clone())
        })?;

    let now = asn1_now().map_err(PasskeyError::VerificationFailed)?;
    let leaf_der = x5c
        .first()
        .ok_or_else(|| PasskeyError::VerificationFailed("Empty x5c".into()))?;
    let leaf = parse_certificate(leaf_der).map_err(PasskeyError::VerificationFailed)?;

    verify_packed_attestation_cert(&leaf, aaguid, now)?;

    let hash = HashAlgorithm::from_cose_alg(alg).ok_or_else(|| {
        PasskeyError::VerificationFailed(format!("Unsupported algorithm: {alg}"))
    })?;
    let leaf_key = VerifiableKey::from_spki(leaf.public_key(), alg)
        .map_err(|e| PasskeyError::VerificationFailed(format!("Attestation key: {e}")))?;
    leaf_key
        .verify(hash, signed_data, sig)
        .map_err(|e| PasskeyError::VerificationFailed(format!("Attestation signature: {e}")))?;

    for (i, root_b64) in roots.iter().enumerate() {
        let root_der = match base64_std_decode(root_b64) {
            Ok(der) => der,
            Err(e) => {
                tracing::warn!("Skipping undecodable root {} for {}: {}", i, aaguid_str, e);
                continue;
            }
        };

        let mut chain = x5c
            .iter()
            .map(|der| parse_certificate(der))
            .collect::<Result<Vec<_>, _>>()
            .map_err(PasskeyError::VerificationFailed)?;
        match parse_certificate(&root_der) {
            Ok(root) => chain.push(root),
            Err(e) => {
                tracing::warn!("Skipping unparsable root {} for {}: {}", i, aaguid_str, e);
                continue;
            }
        }

        match verify_chain(&chain, now) {
            Ok(()) => {
                tracing::debug!("Attestation chain verified against root {}", i);
                return Ok(());
            }
            Err(e) => tracing::debug!("Root {} rejected: {}", i, e),
        }
    }

    tracing::error!("Attestation chain for {} matches no trusted root", aaguid_str);
    Err(PasskeyError::VerificationFailed(
        "Certificate chain does not terminate at a trusted root".into(),
    ))
}

fn has_value(attr: &AttributeTypeAndValue<'_>) -> bool {
    attr.as_str().map(|v| !v.is_empty()).unwrap_or(false)
}

/// Checks the packed attestation certificate requirements on the leaf.
fn verify_packed_attestation_cert(
    cert: &X509Certificate<'_>,
    aaguid: &[u8; 16],
    now: ASN1Time,
) -> Result<(), PasskeyError> {
    let subject = cert.subject();

    if !subject
        .iter_organizational_unit()
        .any(|ou| ou.as_str().map(|v| v == ATTESTATION_OU).unwrap_or(false))
    {
        return Err(PasskeyError::VerificationFailed(format!(
            "Subject OU must be '{ATTESTATION_OU}'"
        )));
    }
    if !subject.iter_common_name().any(has_value) {
        return Err(PasskeyError::VerificationFailed("Subject CN is empty".into()));
    }
    if !subject.iter_organization().any(has_value) {
        return Err(PasskeyError::VerificationFailed("Subject O is empty".into()));
    }
    if !subject.iter_country().any(has_value) {
        return Err(PasskeyError::VerificationFailed("Subject C is empty".into()));
    }

    let is_ca = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid.as_bytes() == oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS.as_bytes())
        .map(|ext| matches!(ext.parsed_extension(), ParsedExtension::BasicConstraints(bc) if bc.ca))
        .unwrap_or(false);
    if is_ca {
        return Err(PasskeyError::VerificationFailed(
            "Attestation certificate must not be a CA".into(),
        ));
    }

    if !is_time_valid(cert, now) {
        return Err(PasskeyError::VerificationFailed(
            "Attestation certificate is not currently valid".into(),
        ));
    }

    if let Some(ext) = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == OID_FIDO_GEN_CE_AAGUID)
    {
        if ext.critical {
            return Err(PasskeyError::VerificationFailed(
                "AAGUID extension must not be critical".into(),
            ));
        }
        // OCTET STRING wrapping 16 bytes
        let value = ext.value;
        if value.len() != 18 || value[0] != 0x04 || value[1] != 0x10 {
            return Err(PasskeyError::VerificationFailed(
                "Malformed AAGUID extension".into(),
            ));
        }
        if &value[2..] != aaguid.as_slice() {
            tracing::error!("AAGUID extension does not match authenticator data");
            return Err(PasskeyError::VerificationFailed(
                "AAGUID mismatch between certificate and authenticator data".into(),
            ));
        }
    }

    Ok(())
}
