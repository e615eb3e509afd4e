//! Certificate and key fixtures shared by unit tests across the crate.
//!
//! The PEM files under `testdata/` were issued with long validity windows
//! (2020 to 2120) except `att_leaf_expired.pem`, which lapsed in 2020.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};

pub(crate) const ATT_ROOT_PEM: &str = include_str!("../testdata/att_root.pem");
pub(crate) const ATT_LEAF_PEM: &str = include_str!("../testdata/att_leaf.pem");
pub(crate) const ATT_LEAF_EXPIRED_PEM: &str = include_str!("../testdata/att_leaf_expired.pem");
pub(crate) const ATT_LEAF_CA_PEM: &str = include_str!("../testdata/att_leaf_ca.pem");
pub(crate) const ATT_LEAF_WRONG_OU_PEM: &str = include_str!("../testdata/att_leaf_wrong_ou.pem");
pub(crate) const ATT_LEAF_PKCS8_B64: &str = include_str!("../testdata/att_leaf_pkcs8.b64");
pub(crate) const MDS_ROOT_PEM: &str = include_str!("../testdata/mds_root.pem");
pub(crate) const MDS_ROOT_DER: &[u8] = include_bytes!("../testdata/mds_root.der");
pub(crate) const MDS_LEAF_PEM: &str = include_str!("../testdata/mds_leaf.pem");
pub(crate) const MDS_LEAF_PKCS8_B64: &str = include_str!("../testdata/mds_leaf_pkcs8.b64");
pub(crate) const OTHER_ROOT_PEM: &str = include_str!("../testdata/other_root.pem");
pub(crate) const RSA_PKCS8_B64: &str = include_str!("../testdata/rsa_pkcs8.b64");
pub(crate) const RSA_MODULUS_HEX: &str = include_str!("../testdata/rsa_modulus.hex");

/// AAGUID embedded in the attestation leaf's FIDO extension.
pub(crate) const ATT_LEAF_AAGUID: [u8; 16] = [
    0xee, 0x88, 0x28, 0x79, 0x72, 0x1c, 0x49, 0x13, 0x97, 0x75, 0x3d, 0xfc, 0xce, 0x97, 0x07, 0x2a,
];

pub(crate) fn pem_to_der(pem: &str) -> Vec<u8> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes()).unwrap();
    pem.contents
}

/// Base64 (standard alphabet) DER, the form MDS documents use for certificates.
pub(crate) fn pem_to_b64(pem: &str) -> String {
    STANDARD.encode(pem_to_der(pem))
}

pub(crate) fn b64_to_der(b64: &str) -> Vec<u8> {
    STANDARD.decode(b64.trim()).unwrap()
}

pub(crate) fn hex_decode(hex: &str) -> Vec<u8> {
    let hex = hex.trim();
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

/// Compact ES256 JWT over `payload`, signed with the MDS leaf key.
///
/// `x5c` goes into the header as given, so callers choose the chain.
pub(crate) fn sign_mds_blob(payload: &serde_json::Value, x5c: &[String]) -> String {
    use ring::signature::{ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair};

    let header = serde_json::json!({ "alg": "ES256", "typ": "JWT", "x5c": x5c });
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    );

    let rng = ring::rand::SystemRandom::new();
    let pair = EcdsaKeyPair::from_pkcs8(
        &ECDSA_P256_SHA256_FIXED_SIGNING,
        &b64_to_der(MDS_LEAF_PKCS8_B64),
        &rng,
    )
    .unwrap();
    let sig = pair.sign(&rng, signing_input.as_bytes()).unwrap();

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(sig.as_ref()))
}

/// MDS payload listing the attestation fixture under `aaguid` with `description`.
pub(crate) fn mds_payload(next_update: &str, entries: &[(&str, &str)]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = entries
        .iter()
        .map(|(aaguid, description)| {
            serde_json::json!({
                "aaguid": aaguid,
                "metadataStatement": {
                    "aaguid": aaguid,
                    "description": description,
                    "attestationRootCertificates": [pem_to_b64(ATT_ROOT_PEM)],
                },
                "statusReports": [{ "status": "FIDO_CERTIFIED_L1" }],
                "timeOfLastStatusChange": "2024-01-01",
            })
        })
        .collect();
    serde_json::json!({ "no": 1, "nextUpdate": next_update, "entries": entries })
}
