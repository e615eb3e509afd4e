use serde::{Deserialize, Serialize};

use super::types::MetadataBlobPayloadEntry;

/// One operator-approved authenticator model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowedAuthenticator {
    pub aaguid: String,
    /// Must equal the feed's metadata statement description
    pub description: String,
}

impl AllowedAuthenticator {
    pub fn new(aaguid: &str, description: &str) -> Self {
        Self {
            aaguid: aaguid.to_string(),
            description: description.to_string(),
        }
    }
}

/// YubiKey 5 family.
pub fn default_allow_list() -> Vec<AllowedAuthenticator> {
    vec![
        AllowedAuthenticator::new("cb69481e-8ff7-4039-93ec-0a2729a154a8", "YubiKey 5 Series"),
        AllowedAuthenticator::new(
            "ee882879-721c-4913-9775-3dfcce97072a",
            "YubiKey 5 Series with NFC",
        ),
        AllowedAuthenticator::new(
            "fa2b99dc-9e39-4257-8f92-4a30d23c4118",
            "YubiKey 5 Series with NFC",
        ),
        AllowedAuthenticator::new(
            "2fc0579f-8113-47ea-b116-bb5a8db9202a",
            "YubiKey 5 Series with NFC",
        ),
        AllowedAuthenticator::new(
            "c5ef55ff-ad9a-4b9f-b580-adebafe026d0",
            "YubiKey 5Ci",
        ),
    ]
}

/// Keeps the feed entries whose AAGUID and description both match an allowed
/// model
///
/// AAGUIDs compare case-insensitively. Each allowed model admits at most one
/// entry, so a later feed entry reusing an already matched AAGUID is dropped.
pub(super) fn apply_allow_list(
    entries: Vec<MetadataBlobPayloadEntry>,
    allow_list: &[AllowedAuthenticator],
) -> Vec<MetadataBlobPayloadEntry> {
    let mut remaining: Vec<&AllowedAuthenticator> = allow_list.iter().collect();
    let mut kept = Vec::new();

    for entry in entries {
        if remaining.is_empty() {
            break;
        }
        let Some(aaguid) = entry.resolved_aaguid() else {
            if entry.has_conflicting_aaguid() {
                tracing::warn!(
                    "Skipping feed entry {:?} whose statement names AAGUID {:?}",
                    entry.aaguid,
                    entry.metadata_statement.as_ref().and_then(|s| s.aaguid.as_deref())
                );
            }
            continue;
        };

        let position = remaining.iter().position(|allowed| {
            allowed.aaguid.eq_ignore_ascii_case(aaguid)
                && entry.description() == Some(allowed.description.as_str())
        });
        match position {
            Some(index) => {
                tracing::debug!("Allow-listed {} ({})", aaguid, remaining[index].description);
                remaining.swap_remove(index);
                kept.push(entry);
            }
            None => {
                if remaining
                    .iter()
                    .any(|allowed| allowed.aaguid.eq_ignore_ascii_case(aaguid))
                {
                    tracing::warn!(
                        "Feed entry {} matches an allowed AAGUID but not its description: {:?}",
                        aaguid,
                        entry.description()
                    );
                }
            }
        }
    }

    kept
}
