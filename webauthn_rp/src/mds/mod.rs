//! FIDO Metadata Service ingestion: download, authenticate and install the
//! metadata BLOB as attestation trust anchors.

mod blob;
mod config;
mod download;
mod errors;
mod refresh;
mod types;
mod whitelist;

pub use config::{
    DEFAULT_MDS_HOST, DEFAULT_MDS_ROOT_CERT_URL, DEFAULT_MDS_URL, MAX_REDIRECTS, MdsConfig,
};
pub use errors::MdsError;
pub use refresh::MdsRefresher;
pub use types::{
    MetadataBlobPayload, MetadataBlobPayloadEntry, MetadataEntry, MetadataStatement, StatusReport,
};
pub use whitelist::{AllowedAuthenticator, default_allow_list};
