use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ring::rand::SecureRandom;
use thiserror::Error;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes base64 in either alphabet, with or without padding.
///
/// Ceremony inputs arrive from browsers and native clients that do not agree
/// on a single encoding, so both `+/` and `-_` are accepted.
pub(crate) fn base64_decode_lenient(input: &str) -> Result<Vec<u8>, UtilError> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    base64url_decode(&normalized)
}

/// Decodes standard (padded) base64 as used for certificates in MDS documents.
pub(crate) fn base64_std_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    STANDARD
        .decode(input.trim())
        .map_err(|_| UtilError::Format("Failed to decode base64".to_string()))
}

#[cfg(test)]
pub(crate) fn base64_std_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

/// Big-endian integer bytes without leading zeros, keeping at least one byte.
pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    &bytes[start..]
}

pub(crate) fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(base64url_encode(&buf))
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}
