use chrono::NaiveDate;
use jsonwebtoken::{Algorithm, DecodingKey};
use x509_parser::public_key::PublicKey;
use x509_parser::time::ASN1Time;

use crate::utils::{base64_decode_lenient, base64_std_decode, base64url_encode, strip_leading_zeros};
use crate::x509::{der_from_pem_or_der, parse_certificate, verify_chain};

use super::errors::MdsError;
use super::types::MetadataBlobPayload;

/// Verified BLOB payload, both as raw JSON and decoded.
#[derive(Debug, Clone)]
pub(super) struct VerifiedBlob {
    pub(super) json: serde_json::Value,
    pub(super) payload: MetadataBlobPayload,
}

/// Authenticates a metadata BLOB JWT
///
/// The signing chain is the header `x5c` followed by `root`. Every adjacent
/// pair must verify and every certificate must be valid at `now`; the leaf
/// must be valid for `host` and its key must verify the JWT signature.
///
/// # Errors
/// * `MdsError::MalformedBlob` - Not a JWT, or header/payload are not the expected JSON
/// * `MdsError::CertChainInvalid` - Chain does not verify or is outside its validity
/// * `MdsError::HostMismatch` - Leaf certificate is not valid for `host`
/// * `MdsError::SignatureInvalid` - JWT signature does not verify under the leaf key
pub(super) fn verify_blob(
    blob: &[u8],
    root: &[u8],
    host: &str,
    now: ASN1Time,
) -> Result<VerifiedBlob, MdsError> {
    let token = std::str::from_utf8(blob)
        .map_err(|_| MdsError::MalformedBlob("BLOB is not UTF-8".into()))?
        .trim();
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(MdsError::MalformedBlob(format!(
            "Expected 3 JWT segments, got {}",
            segments.len()
        )));
    }

    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| MdsError::MalformedBlob(format!("Invalid JWT header: {e}")))?;
    tracing::debug!("MDS JWT header: alg {:?}", header.alg);

    let payload_bytes = base64_decode_lenient(segments[1])
        .map_err(|e| MdsError::MalformedBlob(format!("Invalid payload encoding: {e}")))?;
    let json: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| MdsError::MalformedBlob(format!("Invalid payload JSON: {e}")))?;

    let mut chain_der = Vec::new();
    for (i, cert) in header.x5c.iter().flatten().enumerate() {
        let der = base64_std_decode(cert)
            .map_err(|e| MdsError::MalformedBlob(format!("Invalid x5c[{i}]: {e}")))?;
        chain_der.push(der);
    }
    chain_der.push(der_from_pem_or_der(root).map_err(MdsError::CertChainInvalid)?);

    let chain = chain_der
        .iter()
        .map(|der| parse_certificate(der))
        .collect::<Result<Vec<_>, _>>()
        .map_err(MdsError::CertChainInvalid)?;
    for (i, cert) in chain.iter().enumerate() {
        tracing::debug!(
            "MDS chain[{}]: subject {}, issuer {}",
            i,
            cert.subject(),
            cert.issuer()
        );
    }
    verify_chain(&chain, now).map_err(|e| {
        tracing::error!("MDS certificate chain verification failed: {}", e);
        MdsError::CertChainInvalid(e)
    })?;
    tracing::debug!("MDS certificate chain verified");

    verify_host(&chain_der[0], host)?;

    let key = decoding_key(&chain[0], header.alg)?;
    let signature = base64_decode_lenient(segments[2])
        .map_err(|e| MdsError::MalformedBlob(format!("Invalid signature encoding: {e}")))?;
    let message = format!("{}.{}", segments[0], segments[1]);
    let valid = jsonwebtoken::crypto::verify(
        &base64url_encode(&signature),
        message.as_bytes(),
        &key,
        header.alg,
    )
    .map_err(|e| MdsError::SignatureInvalid(e.to_string()))?;
    if !valid {
        tracing::error!("MDS JWT signature verification failed");
        return Err(MdsError::SignatureInvalid(
            "JWT signature does not verify under the leaf key".into(),
        ));
    }
    tracing::debug!("MDS JWT signature verified");

    let payload: MetadataBlobPayload = serde_json::from_value(json.clone())
        .map_err(|e| MdsError::MalformedBlob(format!("Unexpected payload shape: {e}")))?;

    Ok(VerifiedBlob { json, payload })
}

fn verify_host(leaf_der: &[u8], host: &str) -> Result<(), MdsError> {
    let leaf = webpki::EndEntityCert::try_from(leaf_der)
        .map_err(|e| MdsError::CertChainInvalid(format!("Unusable leaf certificate: {e:?}")))?;
    let name = webpki::DnsNameRef::try_from_ascii_str(host)
        .map_err(|_| MdsError::Config(format!("Invalid MDS host: {host}")))?;

    leaf.verify_is_valid_for_dns_name(name).map_err(|e| {
        tracing::error!("MDS leaf certificate is not valid for {}: {:?}", host, e);
        MdsError::HostMismatch(format!("Leaf certificate is not valid for {host}"))
    })
}

/// JWT verification key from the leaf certificate, refusing algorithms that
/// do not belong to the key type.
fn decoding_key(
    leaf: &x509_parser::certificate::X509Certificate<'_>,
    alg: Algorithm,
) -> Result<DecodingKey, MdsError> {
    let parsed = leaf
        .public_key()
        .parsed()
        .map_err(|e| MdsError::SignatureInvalid(format!("Cannot parse leaf key: {e}")))?;

    match (parsed, alg) {
        (
            PublicKey::RSA(rsa),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
        ) => Ok(DecodingKey::from_rsa_raw_components(
            strip_leading_zeros(rsa.modulus),
            strip_leading_zeros(rsa.exponent),
        )),
        (PublicKey::EC(point), Algorithm::ES256 | Algorithm::ES384) => {
            Ok(DecodingKey::from_ec_der(point.data()))
        }
        (_, alg) => Err(MdsError::SignatureInvalid(format!(
            "Algorithm {alg:?} does not match the leaf key type"
        ))),
    }
}

/// Fails with `StaleFeed` if `next_update` is before `today`.
pub(super) fn check_freshness(
    payload: &MetadataBlobPayload,
    today: NaiveDate,
) -> Result<(), MdsError> {
    let next_update = NaiveDate::parse_from_str(&payload.next_update, "%Y-%m-%d").map_err(|e| {
        MdsError::MalformedBlob(format!("Invalid nextUpdate {}: {e}", payload.next_update))
    })?;

    if next_update < today {
        tracing::error!(
            "MDS BLOB no. {} expired: nextUpdate {} is before {}",
            payload.no,
            next_update,
            today
        );
        return Err(MdsError::StaleFeed(format!(
            "nextUpdate {next_update} is before {today}"
        )));
    }
    Ok(())
}
