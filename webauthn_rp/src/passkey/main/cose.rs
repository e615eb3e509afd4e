use ciborium::value::Value as CborValue;
use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::passkey::errors::PasskeyError;
use crate::utils::strip_leading_zeros;

// COSE key map labels (RFC 9052 / RFC 9053)
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV_OR_N: i64 = -1;
const LABEL_X_OR_E: i64 = -2;
const LABEL_Y: i64 = -3;

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_CURVE_P384: &str = "1.3.132.0.34";
const OID_CURVE_P521: &str = "1.3.132.0.35";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn from_cose(crv: i64) -> Option<Self> {
        match crv {
            1 => Some(Self::P256),
            2 => Some(Self::P384),
            3 => Some(Self::P521),
            _ => None,
        }
    }

    fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    fn default_hash(self) -> HashAlgorithm {
        match self {
            Self::P256 => HashAlgorithm::Sha256,
            Self::P384 => HashAlgorithm::Sha384,
            Self::P521 => HashAlgorithm::Sha512,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaScheme {
    Pkcs1v15,
    Pss,
}

impl RsaScheme {
    fn from_cose_alg(alg: i64) -> Option<Self> {
        match alg {
            -39..=-37 => Some(Self::Pss),
            -259..=-257 | -65535 => Some(Self::Pkcs1v15),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Hash implied by a COSE algorithm identifier.
    pub fn from_cose_alg(alg: i64) -> Option<Self> {
        match alg {
            -7 | -37 | -257 => Some(Self::Sha256),
            -35 | -38 | -258 => Some(Self::Sha384),
            -36 | -8 | -39 | -259 => Some(Self::Sha512),
            -65535 => Some(Self::Sha1),
            _ => None,
        }
    }
}

/// Public key ready for signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiableKey {
    Ec {
        curve: EcCurve,
        alg: Option<i64>,
        /// SEC1 uncompressed point, `0x04 || x || y`
        point: Vec<u8>,
    },
    Rsa {
        scheme: RsaScheme,
        alg: i64,
        /// Big-endian modulus without leading zeros
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl VerifiableKey {
    pub fn alg(&self) -> Option<i64> {
        match self {
            Self::Ec { alg, .. } => *alg,
            Self::Rsa { alg, .. } => Some(*alg),
        }
    }

    /// Hash to use when the caller has no algorithm of its own: the key's
    /// declared `alg`, else the curve's native hash.
    pub fn default_hash(&self) -> HashAlgorithm {
        match self {
            Self::Ec { curve, alg, .. } => alg
                .and_then(HashAlgorithm::from_cose_alg)
                .unwrap_or(curve.default_hash()),
            Self::Rsa { alg, .. } => {
                HashAlgorithm::from_cose_alg(*alg).unwrap_or(HashAlgorithm::Sha256)
            }
        }
    }

    /// Verifies a DER (ECDSA) or raw (RSA) signature over `message`.
    pub fn verify(
        &self,
        hash: HashAlgorithm,
        message: &[u8],
        sig: &[u8],
    ) -> Result<(), String> {
        match self {
            Self::Ec {
                curve: EcCurve::P521,
                point,
                ..
            } => {
                if hash != HashAlgorithm::Sha512 {
                    return Err(format!("P-521 with {hash:?} is not supported"));
                }
                verify_p521(point, message, sig)
            }
            Self::Ec { curve, point, .. } => {
                let alg: &'static signature::EcdsaVerificationAlgorithm = match (curve, hash) {
                    (EcCurve::P256, HashAlgorithm::Sha256) => &signature::ECDSA_P256_SHA256_ASN1,
                    (EcCurve::P256, HashAlgorithm::Sha384) => &signature::ECDSA_P256_SHA384_ASN1,
                    (EcCurve::P384, HashAlgorithm::Sha256) => &signature::ECDSA_P384_SHA256_ASN1,
                    (EcCurve::P384, HashAlgorithm::Sha384) => &signature::ECDSA_P384_SHA384_ASN1,
                    _ => return Err(format!("{curve:?} with {hash:?} is not supported")),
                };
                UnparsedPublicKey::new(alg, point)
                    .verify(message, sig)
                    .map_err(|_| format!("{curve:?} signature did not verify"))
            }
            Self::Rsa { scheme, n, e, .. } => {
                let params: &'static signature::RsaParameters = match (scheme, hash) {
                    (RsaScheme::Pkcs1v15, HashAlgorithm::Sha1) => {
                        &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
                    }
                    (RsaScheme::Pkcs1v15, HashAlgorithm::Sha256) => {
                        &signature::RSA_PKCS1_2048_8192_SHA256
                    }
                    (RsaScheme::Pkcs1v15, HashAlgorithm::Sha384) => {
                        &signature::RSA_PKCS1_2048_8192_SHA384
                    }
                    (RsaScheme::Pkcs1v15, HashAlgorithm::Sha512) => {
                        &signature::RSA_PKCS1_2048_8192_SHA512
                    }
                    (RsaScheme::Pss, HashAlgorithm::Sha256) => &signature::RSA_PSS_2048_8192_SHA256,
                    (RsaScheme::Pss, HashAlgorithm::Sha384) => &signature::RSA_PSS_2048_8192_SHA384,
                    (RsaScheme::Pss, HashAlgorithm::Sha512) => &signature::RSA_PSS_2048_8192_SHA512,
                    (RsaScheme::Pss, HashAlgorithm::Sha1) => {
                        return Err("RSA-PSS with SHA-1 is not supported".to_string());
                    }
                };
                RsaPublicKeyComponents { n, e }
                    .verify(params, message, sig)
                    .map_err(|_| format!("RSA {scheme:?} signature did not verify"))
            }
        }
    }

    /// Key from an X.509 SubjectPublicKeyInfo, used with COSE algorithm `alg`.
    pub(crate) fn from_spki(spki: &SubjectPublicKeyInfo, alg: i64) -> Result<Self, PasskeyError> {
        let parsed = spki.parsed().map_err(|e| {
            PasskeyError::UnsupportedKeyType(format!("Cannot parse certificate key: {e}"))
        })?;

        match parsed {
            PublicKey::RSA(rsa) => {
                let scheme = RsaScheme::from_cose_alg(alg).ok_or_else(|| {
                    PasskeyError::UnsupportedKeyType(format!("alg {alg} is not an RSA algorithm"))
                })?;
                Ok(Self::Rsa {
                    scheme,
                    alg,
                    n: strip_leading_zeros(rsa.modulus).to_vec(),
                    e: strip_leading_zeros(rsa.exponent).to_vec(),
                })
            }
            PublicKey::EC(point) => {
                let curve_oid = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.as_oid().ok())
                    .map(|oid| oid.to_id_string())
                    .ok_or_else(|| {
                        PasskeyError::MalformedKey("EC key without named curve".into())
                    })?;
                let curve = match curve_oid.as_str() {
                    OID_CURVE_P256 => EcCurve::P256,
                    OID_CURVE_P384 => EcCurve::P384,
                    OID_CURVE_P521 => EcCurve::P521,
                    other => {
                        return Err(PasskeyError::UnsupportedKeyType(format!(
                            "Unsupported curve {other}"
                        )));
                    }
                };
                Ok(Self::Ec {
                    curve,
                    alg: Some(alg),
                    point: point.data().to_vec(),
                })
            }
            _ => Err(PasskeyError::UnsupportedKeyType(
                "Certificate key is neither EC nor RSA".into(),
            )),
        }
    }
}

fn verify_p521(point: &[u8], message: &[u8], sig: &[u8]) -> Result<(), String> {
    use p521::ecdsa::signature::Verifier;

    let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point)
        .map_err(|e| format!("Invalid P-521 point: {e}"))?;
    let sig = p521::ecdsa::Signature::from_der(sig)
        .map_err(|e| format!("Invalid P-521 signature encoding: {e}"))?;
    key.verify(message, &sig)
        .map_err(|_| "P-521 signature did not verify".to_string())
}

/// Imports a COSE-encoded EC2 or RSA public key.
pub fn import_cose_key(cose: &[u8]) -> Result<VerifiableKey, PasskeyError> {
    let value: CborValue = ciborium::de::from_reader(cose)
        .map_err(|e| PasskeyError::MalformedKey(format!("Invalid CBOR: {e}")))?;
    let CborValue::Map(entries) = value else {
        return Err(PasskeyError::MalformedKey("COSE key is not a map".into()));
    };
    let map = CoseMap(entries);

    let kty = map
        .int(LABEL_KTY)?
        .ok_or_else(|| PasskeyError::MalformedKey("Missing kty".into()))?;

    match kty {
        KTY_EC2 => {
            let crv = map
                .int(LABEL_CRV_OR_N)?
                .ok_or_else(|| PasskeyError::MalformedKey("Missing crv".into()))?;
            let curve = EcCurve::from_cose(crv).ok_or_else(|| {
                PasskeyError::UnsupportedKeyType(format!("Unsupported EC2 curve {crv}"))
            })?;
            let x = map.required_bytes(LABEL_X_OR_E, "x")?;
            let y = map.required_bytes(LABEL_Y, "y")?;
            let len = curve.coordinate_len();
            if x.len() != len || y.len() != len {
                return Err(PasskeyError::MalformedKey(format!(
                    "{curve:?} coordinates must be {len} bytes, got x={} y={}",
                    x.len(),
                    y.len()
                )));
            }

            let mut point = Vec::with_capacity(1 + 2 * len);
            point.push(0x04);
            point.extend_from_slice(x);
            point.extend_from_slice(y);

            tracing::debug!("Imported EC2 key on {:?}", curve);
            Ok(VerifiableKey::Ec {
                curve,
                alg: map.int(LABEL_ALG)?,
                point,
            })
        }
        KTY_RSA => {
            let alg = map
                .int(LABEL_ALG)?
                .ok_or_else(|| PasskeyError::MalformedKey("Missing alg for RSA key".into()))?;
            let scheme = RsaScheme::from_cose_alg(alg).ok_or_else(|| {
                PasskeyError::UnsupportedKeyType(format!("Unsupported RSA alg {alg}"))
            })?;
            let n = map.required_bytes(LABEL_CRV_OR_N, "n")?;
            let e = map.required_bytes(LABEL_X_OR_E, "e")?;

            tracing::debug!("Imported RSA key, scheme {:?}, alg {}", scheme, alg);
            Ok(VerifiableKey::Rsa {
                scheme,
                alg,
                n: strip_leading_zeros(n).to_vec(),
                e: strip_leading_zeros(e).to_vec(),
            })
        }
        other => Err(PasskeyError::UnsupportedKeyType(format!(
            "Unsupported kty {other}"
        ))),
    }
}

/// Integer-labelled view over a decoded COSE map.
struct CoseMap(Vec<(CborValue, CborValue)>);

impl CoseMap {
    fn get(&self, label: i64) -> Option<&CborValue> {
        self.0.iter().find_map(|(k, v)| match k {
            CborValue::Integer(i) if i64::try_from(*i).ok() == Some(label) => Some(v),
            _ => None,
        })
    }

    fn int(&self, label: i64) -> Result<Option<i64>, PasskeyError> {
        match self.get(label) {
            None => Ok(None),
            Some(CborValue::Integer(i)) => i64::try_from(*i)
                .map(Some)
                .map_err(|_| PasskeyError::MalformedKey(format!("Label {label} out of range"))),
            Some(_) => Err(PasskeyError::MalformedKey(format!(
                "Label {label} is not an integer"
            ))),
        }
    }

    fn required_bytes(&self, label: i64, name: &str) -> Result<&[u8], PasskeyError> {
        match self.get(label) {
            Some(CborValue::Bytes(b)) => Ok(b),
            Some(_) => Err(PasskeyError::MalformedKey(format!(
                "{name} is not a byte string"
            ))),
            None => Err(PasskeyError::MalformedKey(format!("Missing {name}"))),
        }
    }
}
