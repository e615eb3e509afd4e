use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded payload of the metadata BLOB JWT.
///
/// Only the fields this crate acts on are modelled; everything else in the
/// feed is ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBlobPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_header: Option<String>,
    /// Serial number of this BLOB
    pub no: u64,
    /// `YYYY-MM-DD` date by which a newer BLOB is published
    pub next_update: String,
    #[serde(default)]
    pub entries: Vec<MetadataBlobPayloadEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBlobPayloadEntry {
    /// Present for FIDO2 authenticators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaguid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_statement: Option<MetadataStatement>,
    #[serde(default)]
    pub status_reports: Vec<StatusReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_last_status_change: Option<String>,
}

impl MetadataBlobPayloadEntry {
    /// The AAGUID this entry is filtered and stored under.
    ///
    /// Either the entry's or the statement's AAGUID may be absent. When both
    /// are present they must agree (case-insensitively), otherwise the entry
    /// has no usable AAGUID.
    pub fn resolved_aaguid(&self) -> Option<&str> {
        let statement = self
            .metadata_statement
            .as_ref()
            .and_then(|s| s.aaguid.as_deref());
        match (self.aaguid.as_deref(), statement) {
            (Some(entry), Some(statement)) if !entry.eq_ignore_ascii_case(statement) => None,
            (Some(entry), _) => Some(entry),
            (None, statement) => statement,
        }
    }

    /// True when the entry and its statement name different AAGUIDs.
    pub fn has_conflicting_aaguid(&self) -> bool {
        let statement = self
            .metadata_statement
            .as_ref()
            .and_then(|s| s.aaguid.as_deref());
        matches!(
            (self.aaguid.as_deref(), statement),
            (Some(entry), Some(statement)) if !entry.eq_ignore_ascii_case(statement)
        )
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata_statement
            .as_ref()
            .map(|s| s.description.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaguid: Option<String>,
    pub description: String,
    /// Base64 DER certificates
    #[serde(default)]
    pub attestation_root_certificates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// e.g. `FIDO_CERTIFIED_L1`, `REVOKED`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
}

/// Persisted trust-anchor record for one authenticator model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Hyphenated lowercase AAGUID
    pub aaguid: String,
    pub description: String,
    /// Base64 DER root certificates
    pub attestation_root_certificates: Vec<String>,
    pub status_reports: Vec<StatusReport>,
    pub time_of_last_status_change: Option<String>,
    /// When this entry was written by a refresh
    pub updated_at: DateTime<Utc>,
}

impl MetadataEntry {
    /// Builds a persistable entry, or `None` if the feed entry lacks an
    /// AAGUID, a metadata statement or any root certificate.
    pub(super) fn from_payload_entry(
        entry: &MetadataBlobPayloadEntry,
        updated_at: DateTime<Utc>,
    ) -> Option<Self> {
        let aaguid = entry.resolved_aaguid()?;
        let statement = entry.metadata_statement.as_ref()?;
        if statement.attestation_root_certificates.is_empty() {
            return None;
        }

        Some(Self {
            aaguid: aaguid.to_lowercase(),
            description: statement.description.clone(),
            attestation_root_certificates: statement.attestation_root_certificates.clone(),
            status_reports: entry.status_reports.clone(),
            time_of_last_status_change: entry.time_of_last_status_change.clone(),
            updated_at,
        })
    }
}
