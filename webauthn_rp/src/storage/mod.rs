mod errors;
mod memory;
mod types;

pub use errors::StorageError;
pub use memory::{InMemoryCredentialStore, InMemorySessionStore, InMemoryTrustAnchorStore};
pub use types::{CredentialStore, SessionStore, TrustAnchorStore};
