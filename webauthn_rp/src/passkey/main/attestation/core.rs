use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;
use crate::storage::TrustAnchorStore;

use super::none::verify_none_attestation;
use super::packed::verify_packed_attestation;

/// Attestation statement, validated once at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatement {
    None,
    Packed {
        /// COSE algorithm identifier
        alg: i64,
        sig: Vec<u8>,
        /// DER certificates, leaf first
        x5c: Option<Vec<Vec<u8>>>,
    },
}

impl AttestationStatement {
    pub fn format(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Packed { .. } => "packed",
        }
    }

    pub(crate) fn from_cbor(fmt: &str, att_stmt: &CborValue) -> Result<Self, PasskeyError> {
        let CborValue::Map(entries) = att_stmt else {
            return Err(PasskeyError::MalformedAttestation(
                "attStmt is not a map".into(),
            ));
        };
        let field = |name: &str| {
            entries.iter().find_map(|(k, v)| match k {
                CborValue::Text(key) if key == name => Some(v),
                _ => None,
            })
        };

        match fmt {
            "none" => {
                if !entries.is_empty() {
                    tracing::warn!("Ignoring non-empty attStmt for 'none' attestation");
                }
                Ok(Self::None)
            }
            "packed" => {
                if field("ecdaaKeyId").is_some() {
                    tracing::error!("ECDAA packed attestation is not supported");
                    return Err(PasskeyError::UnsupportedFormat("packed/ECDAA".into()));
                }

                let alg = match field("alg") {
                    Some(CborValue::Integer(i)) => i64::try_from(*i).map_err(|_| {
                        PasskeyError::MalformedAttestation("alg out of range".into())
                    })?,
                    Some(_) => {
                        return Err(PasskeyError::MalformedAttestation(
                            "alg is not an integer".into(),
                        ));
                    }
                    None => return Err(PasskeyError::MalformedAttestation("Missing alg".into())),
                };

                let sig = match field("sig") {
                    Some(CborValue::Bytes(b)) => b.clone(),
                    Some(_) => {
                        return Err(PasskeyError::MalformedAttestation(
                            "sig is not a byte string".into(),
                        ));
                    }
                    None => return Err(PasskeyError::MalformedAttestation("Missing sig".into())),
                };

                let x5c = match field("x5c") {
                    None => None,
                    Some(CborValue::Array(certs)) if !certs.is_empty() => Some(
                        certs
                            .iter()
                            .map(|c| match c {
                                CborValue::Bytes(der) => Ok(der.clone()),
                                _ => Err(PasskeyError::MalformedAttestation(
                                    "x5c entry is not a byte string".into(),
                                )),
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    Some(_) => {
                        return Err(PasskeyError::MalformedAttestation(
                            "x5c is not a non-empty array".into(),
                        ));
                    }
                };

                Ok(Self::Packed { alg, sig, x5c })
            }
            other => {
                tracing::error!("Unsupported attestation format: {}", other);
                Err(PasskeyError::UnsupportedFormat(other.to_string()))
            }
        }
    }
}

/// Decoded CBOR attestation object.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub statement: AttestationStatement,
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    pub fn decode(cbor: &[u8]) -> Result<Self, PasskeyError> {
        let value: CborValue = ciborium::de::from_reader(cbor)
            .map_err(|e| PasskeyError::MalformedAttestation(format!("Invalid CBOR: {e}")))?;
        let CborValue::Map(entries) = value else {
            return Err(PasskeyError::MalformedAttestation(
                "Attestation object is not a map".into(),
            ));
        };

        let mut fmt = None;
        let mut att_stmt = None;
        let mut auth_data = None;
        for (k, v) in entries {
            match (k, v) {
                (CborValue::Text(k), CborValue::Text(v)) if k == "fmt" => fmt = Some(v),
                (CborValue::Text(k), v @ CborValue::Map(_)) if k == "attStmt" => {
                    att_stmt = Some(v)
                }
                (CborValue::Text(k), CborValue::Bytes(v)) if k == "authData" => {
                    auth_data = Some(v)
                }
                _ => {}
            }
        }

        let fmt =
            fmt.ok_or_else(|| PasskeyError::MalformedAttestation("Missing fmt".into()))?;
        let att_stmt = att_stmt
            .ok_or_else(|| PasskeyError::MalformedAttestation("Missing attStmt".into()))?;
        let auth_data = auth_data
            .ok_or_else(|| PasskeyError::MalformedAttestation("Missing authData".into()))?;

        Ok(Self {
            statement: AttestationStatement::from_cbor(&fmt, &att_stmt)?,
            auth_data,
        })
    }
}

/// Verifies an attestation statement over `signed_data` (`authData || clientDataHash`).
///
/// `aaguid` selects the trust anchors for certificate-based attestation and
/// `public_key_cose` is the credential key used for self attestation.
pub async fn verify_attestation(
    aaguid: &[u8; 16],
    statement: &AttestationStatement,
    signed_data: &[u8],
    public_key_cose: &[u8],
    trust_store: &dyn TrustAnchorStore,
) -> Result<(), PasskeyError> {
    match statement {
        AttestationStatement::None => {
            tracing::debug!("Using 'none' attestation format");
            verify_none_attestation();
            Ok(())
        }
        AttestationStatement::Packed { alg, sig, x5c } => {
            tracing::debug!("Using 'packed' attestation format");
            verify_packed_attestation(
                aaguid,
                *alg,
                sig,
                x5c.as_deref(),
                signed_data,
                public_key_cose,
                trust_store,
            )
            .await
        }
    }
}
