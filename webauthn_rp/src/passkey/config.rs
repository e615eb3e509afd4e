use std::env;

use super::errors::PasskeyError;

const DEFAULT_CHALLENGE_TIMEOUT: u64 = 60;

/// Relying-party settings passed to every ceremony operation.
#[derive(Clone, Debug)]
pub struct RelyingPartyConfig {
    /// Origins accepted in client data, e.g. `https://example.com`
    pub origins: Vec<String>,
    /// RP IDs whose SHA-256 may appear in authenticator data
    pub rp_ids: Vec<String>,
    pub require_user_verification: bool,
    /// Lifetime of a ceremony session in seconds
    pub challenge_timeout: u64,
}

impl RelyingPartyConfig {
    /// Builds a config for a single origin, deriving the RP ID from its host.
    pub fn for_origin(origin: &str) -> Self {
        Self {
            origins: vec![origin.to_string()],
            rp_ids: vec![rp_id_from_origin(origin)],
            require_user_verification: true,
            challenge_timeout: DEFAULT_CHALLENGE_TIMEOUT,
        }
    }

    /// Reads `ORIGIN`, `PASSKEY_RP_ID`, `PASSKEY_USER_VERIFICATION` and
    /// `PASSKEY_CHALLENGE_TIMEOUT`.
    ///
    /// `ORIGIN` and `PASSKEY_RP_ID` may hold comma-separated lists. Without
    /// `PASSKEY_RP_ID` each origin's host becomes an RP ID.
    pub fn from_env() -> Result<Self, PasskeyError> {
        let origins = split_list(
            &env::var("ORIGIN").map_err(|_| PasskeyError::Config("ORIGIN must be set".into()))?,
        );
        if origins.is_empty() {
            return Err(PasskeyError::Config("ORIGIN is empty".into()));
        }

        let rp_ids = match env::var("PASSKEY_RP_ID") {
            Ok(v) if !split_list(&v).is_empty() => split_list(&v),
            _ => {
                let mut ids: Vec<String> = origins.iter().map(|o| rp_id_from_origin(o)).collect();
                ids.dedup();
                ids
            }
        };

        let require_user_verification = env::var("PASSKEY_USER_VERIFICATION").map_or(
            true,
            |v| match v.to_lowercase().as_str() {
                "required" => true,
                "preferred" | "discouraged" => false,
                _ => {
                    tracing::warn!("Invalid user verification: {}. Using default 'required'", v);
                    true
                }
            },
        );

        let challenge_timeout = env::var("PASSKEY_CHALLENGE_TIMEOUT")
            .map(|v| {
                v.parse::<u64>().unwrap_or_else(|_| {
                    tracing::warn!(
                        "Invalid PASSKEY_CHALLENGE_TIMEOUT: {}. Using default {}",
                        v,
                        DEFAULT_CHALLENGE_TIMEOUT
                    );
                    DEFAULT_CHALLENGE_TIMEOUT
                })
            })
            .unwrap_or(DEFAULT_CHALLENGE_TIMEOUT);

        Ok(Self {
            origins,
            rp_ids,
            require_user_verification,
            challenge_timeout,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn rp_id_from_origin(origin: &str) -> String {
    origin
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split([':', '/'])
        .next()
        .unwrap_or_default()
        .to_string()
}
