/// `none` attestation carries no provenance; it is accepted with reduced assurance.
pub(super) fn verify_none_attestation() {
    tracing::warn!("Accepting 'none' attestation: authenticator provenance is not verified");
}
