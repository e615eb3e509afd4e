//! Builders for WebAuthn structures used by passkey unit tests.

use ciborium::value::Value as CborValue;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair, RsaKeyPair};

use crate::test_utils::{RSA_MODULUS_HEX, RSA_PKCS8_B64, b64_to_der, hex_decode};
use crate::utils::{base64_std_encode, base64url_encode};

/// P-256 signing key with its COSE encoding.
pub(crate) struct TestKey {
    pair: EcdsaKeyPair,
    rng: SystemRandom,
}

impl TestKey {
    pub(crate) fn generate() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        Self::from_pkcs8(pkcs8.as_ref())
    }

    pub(crate) fn from_pkcs8(der: &[u8]) -> Self {
        let rng = SystemRandom::new();
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, der, &rng).unwrap();
        Self { pair, rng }
    }

    /// Uncompressed SEC1 point
    pub(crate) fn public_key(&self) -> &[u8] {
        self.pair.public_key().as_ref()
    }

    pub(crate) fn cose(&self) -> Vec<u8> {
        let pk = self.public_key();
        ec2_cose_key(&pk[1..33], &pk[33..65])
    }

    /// ASN.1 DER ECDSA signature over `msg` with SHA-256
    pub(crate) fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.pair.sign(&self.rng, msg).unwrap().as_ref().to_vec()
    }
}

pub(crate) fn cose_key(entries: Vec<(i64, CborValue)>) -> Vec<u8> {
    let map = CborValue::Map(
        entries
            .into_iter()
            .map(|(k, v)| (CborValue::Integer(k.into()), v))
            .collect(),
    );
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&map, &mut bytes).unwrap();
    bytes
}

/// EC2 P-256 COSE key with alg ES256
pub(crate) fn ec2_cose_key(x: &[u8], y: &[u8]) -> Vec<u8> {
    cose_key(vec![
        (1, CborValue::Integer(2.into())),
        (3, CborValue::Integer((-7).into())),
        (-1, CborValue::Integer(1.into())),
        (-2, CborValue::Bytes(x.to_vec())),
        (-3, CborValue::Bytes(y.to_vec())),
    ])
}

/// RSA fixture key pair and its COSE encoding with the given `alg`.
pub(crate) fn rsa_test_key(alg: i64) -> (RsaKeyPair, Vec<u8>) {
    let pair = RsaKeyPair::from_pkcs8(&b64_to_der(RSA_PKCS8_B64)).unwrap();
    let cose = cose_key(vec![
        (1, CborValue::Integer(3.into())),
        (3, CborValue::Integer(alg.into())),
        (-1, CborValue::Bytes(hex_decode(RSA_MODULUS_HEX))),
        (-2, CborValue::Bytes(vec![0x01, 0x00, 0x01])),
    ]);
    (pair, cose)
}

pub(crate) fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Authenticator data for `rp_id`, optionally carrying `(aaguid, credential_id, cose_key)`.
pub(crate) fn build_auth_data(
    rp_id: &str,
    flags: u8,
    counter: u32,
    credential: Option<(&[u8; 16], &[u8], &[u8])>,
) -> Vec<u8> {
    let mut data = sha256(rp_id.as_bytes());
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

pub(crate) fn client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": type_,
        "challenge": base64url_encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

/// Base64 CBOR attestation object `{fmt, attStmt, authData}`.
pub(crate) fn attestation_object(fmt: &str, att_stmt: CborValue, auth_data: &[u8]) -> String {
    let obj = CborValue::Map(vec![
        (CborValue::Text("fmt".into()), CborValue::Text(fmt.into())),
        (CborValue::Text("attStmt".into()), att_stmt),
        (
            CborValue::Text("authData".into()),
            CborValue::Bytes(auth_data.to_vec()),
        ),
    ]);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&obj, &mut bytes).unwrap();
    base64_std_encode(&bytes)
}

/// Packed statement `{alg, sig, x5c?}`
pub(crate) fn packed_statement(alg: i64, sig: Vec<u8>, x5c: Option<Vec<Vec<u8>>>) -> CborValue {
    let mut entries = vec![
        (CborValue::Text("alg".into()), CborValue::Integer(alg.into())),
        (CborValue::Text("sig".into()), CborValue::Bytes(sig)),
    ];
    if let Some(chain) = x5c {
        entries.push((
            CborValue::Text("x5c".into()),
            CborValue::Array(chain.into_iter().map(CborValue::Bytes).collect()),
        ));
    }
    CborValue::Map(entries)
}
