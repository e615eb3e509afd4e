use async_trait::async_trait;

use crate::mds::MetadataEntry;
use crate::passkey::{CeremonySession, CredentialRecord};

use super::errors::StorageError;

/// Pending ceremony sessions keyed by nonce.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a session. `ttl` is a hint in seconds; expiry is also carried in the session.
    async fn put(
        &self,
        nonce: &str,
        session: CeremonySession,
        ttl: u64,
    ) -> Result<(), StorageError>;

    async fn get(&self, nonce: &str) -> Result<Option<CeremonySession>, StorageError>;

    /// Remove a session. Returns whether a session was present; two concurrent
    /// deletes of one nonce must not both return `true`.
    async fn delete(&self, nonce: &str) -> Result<bool, StorageError>;
}

/// Registered credentials keyed by user handle.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_by_user_handle(
        &self,
        user_handle: &str,
    ) -> Result<Option<CredentialRecord>, StorageError>;

    /// Persist a new credential.
    ///
    /// Fails with [`StorageError::Duplicate`] if the handle or the credential ID
    /// is already registered for any user.
    async fn put_new(&self, user_handle: &str, record: CredentialRecord)
    -> Result<(), StorageError>;

    /// Fails with [`StorageError::NotFound`] for an unknown handle.
    async fn update_counter_and_backup_state(
        &self,
        user_handle: &str,
        sign_count: u32,
        backup_state: bool,
    ) -> Result<(), StorageError>;
}

/// Trusted authenticator models and their attestation roots, keyed by AAGUID.
#[async_trait]
pub trait TrustAnchorStore: Send + Sync {
    /// Base64 DER root certificates registered for `aaguid`.
    async fn get_root_certs(&self, aaguid: &str) -> Result<Option<Vec<String>>, StorageError>;

    async fn get_entry(&self, aaguid: &str) -> Result<Option<MetadataEntry>, StorageError>;

    async fn list_aaguids(&self) -> Result<Vec<String>, StorageError>;

    /// Replace the whole trust-anchor set, purging AAGUIDs absent from `entries`.
    ///
    /// Returns the number of entries stored.
    async fn replace_all(&self, entries: Vec<MetadataEntry>) -> Result<usize, StorageError>;
}
