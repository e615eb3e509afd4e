mod attestation;
mod auth;
mod auth_data;
mod challenge;
mod client_data;
mod cose;
mod register;
#[cfg(test)]
pub(crate) mod test_utils;
mod utils;

pub use attestation::{AttestationObject, AttestationStatement, verify_attestation};
pub use auth::{finish_authentication, start_authentication, validate_authentication};
pub use auth_data::{AttestedCredentialData, AuthenticatorData};
pub use challenge::{cancel_ceremony, consume_session};
pub use cose::{EcCurve, HashAlgorithm, RsaScheme, VerifiableKey, import_cose_key};
pub use register::{finish_registration, start_registration, validate_registration};
