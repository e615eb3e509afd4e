use std::env;
use std::path::PathBuf;

use super::errors::MdsError;
use super::whitelist::{AllowedAuthenticator, default_allow_list};

pub const DEFAULT_MDS_URL: &str = "https://mds3.fidoalliance.org/";
pub const DEFAULT_MDS_ROOT_CERT_URL: &str = "https://secure.globalsign.com/cacert/root-r3.crt";
pub const DEFAULT_MDS_HOST: &str = "mds.fidoalliance.org";
/// Upper bound on redirects followed per download
pub const MAX_REDIRECTS: usize = 10;

/// Where to fetch the metadata BLOB and how to filter it.
#[derive(Clone, Debug)]
pub struct MdsConfig {
    pub blob_url: String,
    /// CA root the BLOB signing chain must terminate at, DER or PEM
    pub root_cert_url: String,
    /// DNS name the BLOB signing certificate must be valid for
    pub host: String,
    pub enforce_allow_list: bool,
    pub allow_list: Vec<AllowedAuthenticator>,
    /// Pretty-printed copy of the verified payload is written here when set
    pub json_dump_path: Option<PathBuf>,
    pub max_redirects: usize,
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MDS_URL, DEFAULT_MDS_ROOT_CERT_URL, DEFAULT_MDS_HOST)
    }
}

impl MdsConfig {
    pub fn new(blob_url: &str, root_cert_url: &str, host: &str) -> Self {
        Self {
            blob_url: blob_url.to_string(),
            root_cert_url: root_cert_url.to_string(),
            host: host.to_string(),
            enforce_allow_list: true,
            allow_list: default_allow_list(),
            json_dump_path: None,
            max_redirects: MAX_REDIRECTS,
        }
    }

    /// Reads `MDS_URL`, `MDS_ROOT_CERT_URL`, `MDS_HOST`, `MDS_AUTH_WHITELIST`
    /// and `MDS_JSON_FILEPATH`, falling back to the public FIDO Alliance feed.
    pub fn from_env() -> Result<Self, MdsError> {
        let var = |name: &str, default: &str| match env::var(name) {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => default.to_string(),
        };

        let mut config = Self::new(
            &var("MDS_URL", DEFAULT_MDS_URL),
            &var("MDS_ROOT_CERT_URL", DEFAULT_MDS_ROOT_CERT_URL),
            &var("MDS_HOST", DEFAULT_MDS_HOST),
        );

        config.enforce_allow_list = match env::var("MDS_AUTH_WHITELIST") {
            Ok(v) if v.eq_ignore_ascii_case("false") => {
                tracing::warn!("Authenticator allow-list is disabled, every MDS entry is trusted");
                false
            }
            _ => true,
        };

        config.json_dump_path = env::var("MDS_JSON_FILEPATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    pub(super) fn validate(&self) -> Result<(), MdsError> {
        for (name, value) in [
            ("MDS_URL", &self.blob_url),
            ("MDS_ROOT_CERT_URL", &self.root_cert_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| MdsError::Config(format!("{name} is not a valid URL: {e}")))?;
        }
        if self.host.is_empty() {
            return Err(MdsError::Config("MDS host is empty".into()));
        }
        if self.max_redirects > MAX_REDIRECTS {
            return Err(MdsError::Config(format!(
                "max_redirects {} exceeds {MAX_REDIRECTS}",
                self.max_redirects
            )));
        }
        Ok(())
    }
}
