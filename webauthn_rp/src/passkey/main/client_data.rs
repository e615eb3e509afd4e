use ring::digest;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::CeremonyExpectation;
use crate::utils::base64url_encode;

pub(crate) const TYPE_CREATE: &str = "webauthn.create";
pub(crate) const TYPE_GET: &str = "webauthn.get";

#[derive(Deserialize)]
struct CollectedClientData {
    #[serde(rename = "type")]
    type_: Option<String>,
    challenge: Option<String>,
    origin: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ParsedClientData {
    pub(crate) type_: String,
    pub(crate) challenge: String,
    pub(crate) origin: String,
    /// SHA-256 over the raw JSON bytes
    pub(crate) hash: Vec<u8>,
}

impl ParsedClientData {
    pub(crate) fn parse(raw: &[u8]) -> Result<Self, PasskeyError> {
        let collected: CollectedClientData = serde_json::from_slice(raw)
            .map_err(|e| PasskeyError::MalformedClientData(format!("Invalid JSON: {e}")))?;

        let required = |field: Option<String>, name: &str| {
            field.filter(|v| !v.is_empty()).ok_or_else(|| {
                tracing::error!("Client data missing {}", name);
                PasskeyError::MalformedClientData(format!("Missing {name}"))
            })
        };

        Ok(Self {
            type_: required(collected.type_, "type")?,
            challenge: required(collected.challenge, "challenge")?,
            origin: required(collected.origin, "origin")?,
            hash: digest::digest(&digest::SHA256, raw).as_ref().to_vec(),
        })
    }

    /// Checks type, then challenge, then origin.
    pub(crate) fn verify(
        &self,
        expected_type: &str,
        expect: &CeremonyExpectation<'_>,
    ) -> Result<(), PasskeyError> {
        if self.type_ != expected_type {
            tracing::error!(
                "Invalid type. Expected '{}', Got: {}",
                expected_type,
                self.type_
            );
            return Err(PasskeyError::UnexpectedType(format!(
                "Expected {expected_type}, got {}",
                self.type_
            )));
        }

        let expected_challenge = base64url_encode(expect.challenge);
        if !bool::from(
            self.challenge
                .as_bytes()
                .ct_eq(expected_challenge.as_bytes()),
        ) {
            tracing::error!(
                "Challenge mismatch. Expected: {}, Got: {}",
                expected_challenge,
                self.challenge
            );
            return Err(PasskeyError::ChallengeMismatch(format!(
                "Got {}",
                self.challenge
            )));
        }

        if !expect.origins.iter().any(|o| *o == self.origin) {
            tracing::error!(
                "Invalid origin. Expected one of: {:?}, Got: {}",
                expect.origins,
                self.origin
            );
            return Err(PasskeyError::OriginMismatch(self.origin.clone()));
        }

        tracing::debug!("Client data verified for {}", self.type_);
        Ok(())
    }
}
