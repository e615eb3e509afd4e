//! Certificate helpers shared by attestation and metadata verification.

use x509_parser::prelude::*;

pub(crate) fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, String> {
    X509Certificate::from_der(der)
        .map(|(_, cert)| cert)
        .map_err(|e| format!("Failed to parse certificate: {e}"))
}

/// Accepts a certificate as raw DER or as a PEM document.
pub(crate) fn der_from_pem_or_der(bytes: &[u8]) -> Result<Vec<u8>, String> {
    if bytes.starts_with(b"-----BEGIN") {
        let (_, pem) = x509_parser::pem::parse_x509_pem(bytes)
            .map_err(|e| format!("Failed to parse PEM: {e}"))?;
        Ok(pem.contents)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Current time as an [`ASN1Time`].
pub(crate) fn asn1_now() -> Result<ASN1Time, String> {
    ASN1Time::from_timestamp(chrono::Utc::now().timestamp())
        .map_err(|e| format!("Failed to convert current time: {e}"))
}

pub(crate) fn is_time_valid(cert: &X509Certificate<'_>, at: ASN1Time) -> bool {
    cert.validity().is_valid_at(at)
}

/// Walks `chain` (leaf first, trust anchor last) checking that every
/// certificate is valid at `at` and is signed by the next one.
pub(crate) fn verify_chain(chain: &[X509Certificate<'_>], at: ASN1Time) -> Result<(), String> {
    if chain.is_empty() {
        return Err("Empty certificate chain".to_string());
    }

    for (i, cert) in chain.iter().enumerate() {
        if !is_time_valid(cert, at) {
            return Err(format!(
                "Certificate {i} ({}) is outside its validity window",
                cert.subject()
            ));
        }

        let Some(issuer) = chain.get(i + 1) else {
            continue;
        };
        if cert.issuer() != issuer.subject() {
            return Err(format!(
                "Certificate {i} issuer ({}) does not match next subject ({})",
                cert.issuer(),
                issuer.subject()
            ));
        }
        cert.verify_signature(Some(issuer.public_key()))
            .map_err(|e| format!("Certificate {i} ({}) signature: {e}", cert.subject()))?;
    }

    Ok(())
}
