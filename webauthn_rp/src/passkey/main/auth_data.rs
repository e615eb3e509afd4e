use ciborium::value::Value as CborValue;
use uuid::Uuid;

use crate::passkey::errors::PasskeyError;

/// Flags for AuthenticatorData as defined in WebAuthn Level 3
pub(crate) mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(crate) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(crate) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 4
    pub(crate) const BE: u8 = 1 << 4;
    /// Backup State (BS) - Bit 5
    pub(crate) const BS: u8 = 1 << 5;
    /// Attested Credential Data Present - Bit 6
    pub(crate) const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub(crate) const ED: u8 = 1 << 7;
}

const RP_ID_HASH_LEN: usize = 32;
const MIN_AUTH_DATA_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

/// Decoded authenticator data.
///
/// Layout (minimum 37 bytes):
/// - RP ID Hash (32 bytes)
/// - Flags (1 byte)
/// - Counter (4 bytes, big-endian)
/// - Optional: Attested Credential Data (flag AT)
/// - Optional: Extensions, one CBOR item (flag ED)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: u8,
    pub counter: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Raw CBOR of the extensions map, not interpreted
    pub extensions: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// COSE key, re-encoded from the decoded CBOR item
    pub credential_public_key: Vec<u8>,
}

impl AttestedCredentialData {
    /// AAGUID in hyphenated lowercase form, the key used by the trust store
    pub fn aaguid_string(&self) -> String {
        Uuid::from_bytes(self.aaguid).hyphenated().to_string()
    }
}

impl AuthenticatorData {
    pub fn decode(data: &[u8]) -> Result<Self, PasskeyError> {
        if data.len() < MIN_AUTH_DATA_LEN {
            tracing::error!(
                "Authenticator data too short: {} < {}",
                data.len(),
                MIN_AUTH_DATA_LEN
            );
            return Err(PasskeyError::MalformedInput(format!(
                "Authenticator data too short: {} bytes",
                data.len()
            )));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&data[..RP_ID_HASH_LEN]);
        let flags = data[32];
        let counter = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);
        let mut pos = MIN_AUTH_DATA_LEN;

        let attested_credential_data = if flags & auth_data_flags::AT != 0 {
            let (acd, consumed) = parse_attested_credential_data(&data[pos..])?;
            pos += consumed;
            Some(acd)
        } else {
            None
        };

        let extensions = if flags & auth_data_flags::ED != 0 {
            let ext = read_cbor_item(&data[pos..], "extensions")?;
            pos += ext.len();
            Some(ext)
        } else {
            None
        };

        if pos != data.len() {
            tracing::error!(
                "Authenticator data has {} trailing bytes",
                data.len() - pos
            );
            return Err(PasskeyError::TrailingData(format!(
                "Consumed {pos} of {} bytes",
                data.len()
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            counter,
            attested_credential_data,
            extensions,
        })
    }

    pub fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub fn is_backup_eligible(&self) -> bool {
        (self.flags & auth_data_flags::BE) != 0
    }

    pub fn is_backed_up(&self) -> bool {
        (self.flags & auth_data_flags::BS) != 0
    }

    pub fn has_attested_credential_data(&self) -> bool {
        (self.flags & auth_data_flags::AT) != 0
    }

    pub fn has_extension_data(&self) -> bool {
        (self.flags & auth_data_flags::ED) != 0
    }
}

/// Returns the attested credential data and the number of bytes it occupies.
fn parse_attested_credential_data(
    data: &[u8],
) -> Result<(AttestedCredentialData, usize), PasskeyError> {
    if data.len() < AAGUID_LEN + 2 {
        return Err(PasskeyError::MalformedInput(
            "Attested credential data truncated before credential ID length".into(),
        ));
    }

    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&data[..AAGUID_LEN]);
    let id_len = u16::from_be_bytes([data[16], data[17]]) as usize;
    let mut pos = AAGUID_LEN + 2;

    if data.len() < pos + id_len {
        return Err(PasskeyError::MalformedInput(format!(
            "Credential ID length {id_len} exceeds remaining {} bytes",
            data.len() - pos
        )));
    }
    let credential_id = data[pos..pos + id_len].to_vec();
    pos += id_len;

    let credential_public_key = read_cbor_item(&data[pos..], "credential public key")?;
    pos += credential_public_key.len();

    Ok((
        AttestedCredentialData {
            aaguid,
            credential_id,
            credential_public_key,
        },
        pos,
    ))
}

/// Decodes the first CBOR item in `data` and returns its re-encoded bytes.
///
/// The length of the item is not stored anywhere in authenticator data; the
/// re-encoded length is how far the cursor advances.
fn read_cbor_item(data: &[u8], what: &str) -> Result<Vec<u8>, PasskeyError> {
    let value: CborValue = ciborium::de::from_reader(data)
        .map_err(|e| PasskeyError::MalformedInput(format!("Invalid CBOR in {what}: {e}")))?;

    let mut encoded = Vec::new();
    ciborium::ser::into_writer(&value, &mut encoded)
        .map_err(|e| PasskeyError::MalformedInput(format!("Failed to re-encode {what}: {e}")))?;

    if encoded.len() > data.len() {
        return Err(PasskeyError::MalformedInput(format!(
            "Non-canonical CBOR in {what}"
        )));
    }
    Ok(encoded)
}
