use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::mds::MetadataEntry;
use crate::passkey::{CeremonySession, CredentialRecord};

use super::errors::StorageError;
use super::types::{CredentialStore, SessionStore, TrustAnchorStore};

/// Session store backed by a process-local map.
///
/// The TTL is not enforced here; expired sessions are still returned and the
/// ceremony code rejects them by their `expires_at`.
#[derive(Default)]
pub struct InMemorySessionStore {
    entry: RwLock<HashMap<String, CeremonySession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(
        &self,
        nonce: &str,
        session: CeremonySession,
        _ttl: u64,
    ) -> Result<(), StorageError> {
        self.entry.write().await.insert(nonce.to_string(), session);
        Ok(())
    }

    async fn get(&self, nonce: &str) -> Result<Option<CeremonySession>, StorageError> {
        Ok(self.entry.read().await.get(nonce).cloned())
    }

    async fn delete(&self, nonce: &str) -> Result<bool, StorageError> {
        Ok(self.entry.write().await.remove(nonce).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entry: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory credential store");
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_user_handle(
        &self,
        user_handle: &str,
    ) -> Result<Option<CredentialRecord>, StorageError> {
        Ok(self.entry.read().await.get(user_handle).cloned())
    }

    async fn put_new(
        &self,
        user_handle: &str,
        record: CredentialRecord,
    ) -> Result<(), StorageError> {
        let mut entry = self.entry.write().await;
        if entry.contains_key(user_handle) {
            return Err(StorageError::Duplicate(format!(
                "User handle {user_handle} already registered"
            )));
        }
        if entry
            .values()
            .any(|r| r.credential_id == record.credential_id)
        {
            return Err(StorageError::Duplicate(format!(
                "Credential {} already registered",
                record.credential_id
            )));
        }
        entry.insert(user_handle.to_string(), record);
        Ok(())
    }

    async fn update_counter_and_backup_state(
        &self,
        user_handle: &str,
        sign_count: u32,
        backup_state: bool,
    ) -> Result<(), StorageError> {
        let mut entry = self.entry.write().await;
        let record = entry
            .get_mut(user_handle)
            .ok_or_else(|| StorageError::NotFound(format!("User handle {user_handle}")))?;
        record.sign_count = sign_count;
        record.backup_state = backup_state;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTrustAnchorStore {
    entry: RwLock<HashMap<String, MetadataEntry>>,
}

impl InMemoryTrustAnchorStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory trust anchor store");
        Self::default()
    }
}

#[async_trait]
impl TrustAnchorStore for InMemoryTrustAnchorStore {
    async fn get_root_certs(&self, aaguid: &str) -> Result<Option<Vec<String>>, StorageError> {
        Ok(self
            .entry
            .read()
            .await
            .get(aaguid)
            .map(|e| e.attestation_root_certificates.clone()))
    }

    async fn get_entry(&self, aaguid: &str) -> Result<Option<MetadataEntry>, StorageError> {
        Ok(self.entry.read().await.get(aaguid).cloned())
    }

    async fn list_aaguids(&self) -> Result<Vec<String>, StorageError> {
        let mut aaguids: Vec<String> = self.entry.read().await.keys().cloned().collect();
        aaguids.sort();
        Ok(aaguids)
    }

    async fn replace_all(&self, entries: Vec<MetadataEntry>) -> Result<usize, StorageError> {
        let fresh: HashMap<String, MetadataEntry> = entries
            .into_iter()
            .map(|e| (e.aaguid.clone(), e))
            .collect();

        let mut entry = self.entry.write().await;
        let purged = entry.keys().filter(|k| !fresh.contains_key(*k)).count();
        if purged > 0 {
            tracing::info!("Purging {} stale trust anchor entries", purged);
        }
        *entry = fresh;
        Ok(entry.len())
    }
}
