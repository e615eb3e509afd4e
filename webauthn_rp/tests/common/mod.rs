//! Fixtures and authenticator simulators shared by the integration tests.
//!
//! Everything here drives the crate through its public API only: client data
//! JSON, CBOR attestation objects and signatures are built the way a browser
//! and an authenticator would produce them.

#![allow(dead_code)]

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ciborium::value::Value as CborValue;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair, KeyPair,
};

pub const ORIGIN: &str = "https://example.com";
pub const RP_ID: &str = "example.com";
pub const MDS_HOST: &str = "mds.example.test";

pub const ATT_ROOT_PEM: &str = include_str!("../../testdata/att_root.pem");
pub const ATT_LEAF_PEM: &str = include_str!("../../testdata/att_leaf.pem");
pub const ATT_LEAF_PKCS8_B64: &str = include_str!("../../testdata/att_leaf_pkcs8.b64");
pub const MDS_ROOT_PEM: &str = include_str!("../../testdata/mds_root.pem");
pub const MDS_LEAF_PEM: &str = include_str!("../../testdata/mds_leaf.pem");
pub const MDS_LEAF_PKCS8_B64: &str = include_str!("../../testdata/mds_leaf_pkcs8.b64");

/// AAGUID carried by the attestation leaf certificate
pub const YUBIKEY_NFC: &str = "ee882879-721c-4913-9775-3dfcce97072a";
pub const YUBIKEY_NFC_BYTES: [u8; 16] = [
    0xee, 0x88, 0x28, 0x79, 0x72, 0x1c, 0x49, 0x13, 0x97, 0x75, 0x3d, 0xfc, 0xce, 0x97, 0x07, 0x2a,
];

pub const UP: u8 = 0x01;
pub const UV: u8 = 0x04;
pub const AT: u8 = 0x40;

pub fn pem_to_der(pem: &str) -> Vec<u8> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes()).unwrap();
    pem.contents
}

pub fn pem_to_b64(pem: &str) -> String {
    STANDARD.encode(pem_to_der(pem))
}

pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// P-256 authenticator key producing DER ECDSA signatures.
pub struct SoftAuthenticator {
    pair: EcdsaKeyPair,
    rng: SystemRandom,
}

impl SoftAuthenticator {
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        Self::from_pkcs8(pkcs8.as_ref())
    }

    pub fn attestation_leaf() -> Self {
        Self::from_pkcs8(&STANDARD.decode(ATT_LEAF_PKCS8_B64.trim()).unwrap())
    }

    fn from_pkcs8(der: &[u8]) -> Self {
        let rng = SystemRandom::new();
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, der, &rng).unwrap();
        Self { pair, rng }
    }

    /// EC2 P-256 COSE key with alg ES256
    pub fn cose_key(&self) -> Vec<u8> {
        let pk = self.pair.public_key().as_ref();
        let map = CborValue::Map(vec![
            (CborValue::Integer(1.into()), CborValue::Integer(2.into())),
            (CborValue::Integer(3.into()), CborValue::Integer((-7).into())),
            (CborValue::Integer((-1).into()), CborValue::Integer(1.into())),
            (
                CborValue::Integer((-2).into()),
                CborValue::Bytes(pk[1..33].to_vec()),
            ),
            (
                CborValue::Integer((-3).into()),
                CborValue::Bytes(pk[33..65].to_vec()),
            ),
        ]);
        cbor(&map)
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.pair.sign(&self.rng, msg).unwrap().as_ref().to_vec()
    }
}

fn cbor(value: &CborValue) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).unwrap();
    bytes
}

/// Client data JSON; `challenge` is already base64url as handed out by the relying party.
pub fn client_data(type_: &str, challenge: &str, origin: &str) -> String {
    serde_json::json!({
        "type": type_,
        "challenge": challenge,
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
}

pub fn auth_data(
    flags: u8,
    counter: u32,
    credential: Option<(&[u8; 16], &[u8], &[u8])>,
) -> Vec<u8> {
    let mut data = sha256(RP_ID.as_bytes());
    data.push(flags);
    data.extend_from_slice(&counter.to_be_bytes());
    if let Some((aaguid, credential_id, cose)) = credential {
        data.extend_from_slice(aaguid);
        data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(credential_id);
        data.extend_from_slice(cose);
    }
    data
}

/// Base64 CBOR attestation object
pub fn attestation_object(fmt: &str, att_stmt: CborValue, auth_data: &[u8]) -> String {
    let obj = CborValue::Map(vec![
        (CborValue::Text("fmt".into()), CborValue::Text(fmt.into())),
        (CborValue::Text("attStmt".into()), att_stmt),
        (
            CborValue::Text("authData".into()),
            CborValue::Bytes(auth_data.to_vec()),
        ),
    ]);
    STANDARD.encode(cbor(&obj))
}

/// Packed full attestation signed by the fixture leaf with `x5c = [leaf]`.
pub fn packed_x5c_statement(auth_data: &[u8], client_data_json: &str) -> CborValue {
    let mut signed = auth_data.to_vec();
    signed.extend_from_slice(&sha256(client_data_json.as_bytes()));
    let sig = SoftAuthenticator::attestation_leaf().sign(&signed);

    CborValue::Map(vec![
        (CborValue::Text("alg".into()), CborValue::Integer((-7).into())),
        (CborValue::Text("sig".into()), CborValue::Bytes(sig)),
        (
            CborValue::Text("x5c".into()),
            CborValue::Array(vec![CborValue::Bytes(pem_to_der(ATT_LEAF_PEM))]),
        ),
    ])
}

pub fn b64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

pub fn b64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// ES256 metadata BLOB signed by the MDS leaf, listing the attestation root
/// under each `(aaguid, description)`.
pub fn mds_blob(next_update: &str, entries: &[(&str, &str)]) -> String {
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
                "statusReports": [{ "status": "FIDO_CERTIFIED_L2", "effectiveDate": "2024-01-01" }],
            })
        })
        .collect();
    let payload = serde_json::json!({ "no": 7, "nextUpdate": next_update, "entries": entries });
    let header = serde_json::json!({
        "alg": "ES256",
        "typ": "JWT",
        "x5c": [pem_to_b64(MDS_LEAF_PEM)],
    });

    let signing_input = format!(
        "{}.{}",
        b64url(header.to_string().as_bytes()),
        b64url(payload.to_string().as_bytes())
    );
    let rng = SystemRandom::new();
    let pair = EcdsaKeyPair::from_pkcs8(
        &ECDSA_P256_SHA256_FIXED_SIGNING,
        &STANDARD.decode(MDS_LEAF_PKCS8_B64.trim()).unwrap(),
        &rng,
    )
    .unwrap();
    let sig = pair.sign(&rng, signing_input.as_bytes()).unwrap();

    format!("{signing_input}.{}", b64url(sig.as_ref()))
}

/// Serves `blob` at `/blob` and the MDS root at `/root.pem`.
pub fn serve_mds(server: &httpmock::MockServer, blob: String) {
    use httpmock::Method::GET;

    server.mock(|when, then| {
        when.method(GET).path("/blob");
        then.status(200).body(blob);
    });
    server.mock(|when, then| {
        when.method(GET).path("/root.pem");
        then.status(200).body(MDS_ROOT_PEM);
    });
}

pub fn mds_config(server: &httpmock::MockServer) -> webauthn_rp::MdsConfig {
    webauthn_rp::MdsConfig::new(&server.url("/blob"), &server.url("/root.pem"), MDS_HOST)
}
