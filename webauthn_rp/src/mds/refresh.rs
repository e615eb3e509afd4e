use chrono::Utc;
use tokio::sync::Mutex;

use crate::storage::TrustAnchorStore;
use crate::x509::asn1_now;

use super::blob::{check_freshness, verify_blob};
use super::config::MdsConfig;
use super::download::{build_client, download};
use super::errors::MdsError;
use super::types::MetadataEntry;
use super::whitelist::apply_allow_list;

/// Downloads, authenticates and installs FIDO metadata as trust anchors.
///
/// Concurrent calls to [`MdsRefresher::refresh`] on one refresher run one at
/// a time.
pub struct MdsRefresher {
    config: MdsConfig,
    client: reqwest::Client,
    lock: Mutex<()>,
}

impl MdsRefresher {
    pub fn new(config: MdsConfig) -> Result<Self, MdsError> {
        config.validate()?;
        Ok(Self {
            config,
            client: build_client()?,
            lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &MdsConfig {
        &self.config
    }

    /// Replaces the contents of `store` with the verified, filtered feed
    ///
    /// Returns the number of entries stored. On any error the store keeps its
    /// previous contents.
    ///
    /// # Errors
    /// * `MdsError::DownloadFailed` / `MdsError::TooManyRedirects` - BLOB or root unavailable
    /// * `MdsError::MalformedBlob`, `CertChainInvalid`, `HostMismatch`, `SignatureInvalid` -
    ///   BLOB failed authentication
    /// * `MdsError::StaleFeed` - `nextUpdate` has passed
    /// * `MdsError::EmptyWhitelist` - Nothing left to store after filtering
    /// * `MdsError::Io` - JSON dump could not be written
    /// * `MdsError::Storage` - Store rejected the new set
    pub async fn refresh(&self, store: &dyn TrustAnchorStore) -> Result<usize, MdsError> {
        let _guard = self.lock.lock().await;
        tracing::info!("Refreshing trust anchors from {}", self.config.blob_url);

        let blob = download(&self.client, &self.config.blob_url, self.config.max_redirects).await?;
        let root = download(
            &self.client,
            &self.config.root_cert_url,
            self.config.max_redirects,
        )
        .await?;

        let now = asn1_now().map_err(MdsError::CertChainInvalid)?;
        let verified = verify_blob(&blob, &root, &self.config.host, now)?;
        let payload = verified.payload;
        check_freshness(&payload, Utc::now().date_naive())?;
        tracing::info!(
            "MDS BLOB no. {} verified with {} entries, next update {}",
            payload.no,
            payload.entries.len(),
            payload.next_update
        );

        let candidates = if self.config.enforce_allow_list {
            apply_allow_list(payload.entries, &self.config.allow_list)
        } else {
            tracing::warn!("Allow-list not enforced, keeping all {} entries", payload.entries.len());
            payload.entries
        };

        let updated_at = Utc::now();
        let entries: Vec<MetadataEntry> = candidates
            .iter()
            .filter_map(|entry| {
                let converted = MetadataEntry::from_payload_entry(entry, updated_at);
                if converted.is_none() {
                    tracing::warn!(
                        "Skipping feed entry {:?} without a consistent AAGUID or attestation roots",
                        entry.resolved_aaguid()
                    );
                }
                converted
            })
            .collect();

        if entries.is_empty() {
            tracing::error!("No usable authenticator entries after filtering");
            return Err(MdsError::EmptyWhitelist(
                "No feed entry matched the allow-list".into(),
            ));
        }

        if let Some(path) = &self.config.json_dump_path {
            let pretty = serde_json::to_string_pretty(&verified.json)
                .map_err(|e| MdsError::MalformedBlob(e.to_string()))?;
            tokio::fs::write(path, pretty).await?;
            tracing::debug!("Wrote MDS payload to {}", path.display());
        }

        let stored = store.replace_all(entries).await?;
        tracing::info!("Installed {} trust anchor entries", stored);
        Ok(stored)
    }
}
