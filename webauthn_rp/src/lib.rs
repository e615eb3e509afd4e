//! webauthn-rp - WebAuthn relying-party verification engine
//!
//! This crate verifies passkey registration and authentication ceremonies
//! (client data, authenticator data, COSE keys, `none` and `packed`
//! attestation, signature counters) and maintains attestation trust anchors
//! ingested from the FIDO Metadata Service.

pub mod mds;
pub mod passkey;
pub mod storage;
#[cfg(test)]
mod test_utils;
mod utils;
mod x509;

pub use mds::{MdsConfig, MdsError, MdsRefresher, MetadataEntry};
pub use passkey::{
    CeremonyExpectation, CredentialRecord, PasskeyError, RelyingPartyConfig,
    validate_authentication, validate_registration,
};
pub use storage::{
    CredentialStore, InMemoryCredentialStore, InMemorySessionStore, InMemoryTrustAnchorStore,
    SessionStore, StorageError, TrustAnchorStore,
};
pub use utils::UtilError;
