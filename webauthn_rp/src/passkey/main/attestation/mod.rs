mod core;
mod none;
mod packed;

pub use core::{AttestationObject, AttestationStatement, verify_attestation};
