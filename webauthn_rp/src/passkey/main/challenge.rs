use chrono::{Duration, Utc};

use crate::passkey::errors::PasskeyError;
use crate::passkey::types::{CeremonyKind, CeremonySession, PendingUser};
use crate::storage::SessionStore;
use crate::utils::gen_random_string;

const NONCE_BYTES: usize = 16;
const CHALLENGE_BYTES: usize = 32;

/// Creates and stores a new ceremony session, returning `(nonce, session)`.
pub(super) async fn new_session(
    sessions: &dyn SessionStore,
    kind: CeremonyKind,
    user: Option<PendingUser>,
    ttl: u64,
) -> Result<(String, CeremonySession), PasskeyError> {
    let expires_at = i64::try_from(ttl)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| PasskeyError::Config(format!("Challenge timeout {ttl} is out of range")))?;

    let nonce = gen_random_string(NONCE_BYTES)?;
    let session = CeremonySession {
        challenge: gen_random_string(CHALLENGE_BYTES)?,
        kind,
        user,
        expires_at,
    };

    sessions.put(&nonce, session.clone(), ttl).await?;
    tracing::debug!("Stored {:?} session", kind);

    Ok((nonce, session))
}

/// Retrieves a ceremony session and deletes it before any check is made
///
/// The session is gone after this call whatever the outcome, so a nonce can
/// be presented at most once. Of two concurrent calls that both read the
/// session, only the one whose delete removed it proceeds; this relies on
/// [`SessionStore::delete`] reporting removal atomically.
///
/// # Errors
/// * `PasskeyError::NotFound` - No session for `nonce`, or it belongs to the other ceremony
/// * `PasskeyError::SessionExpired` - The session expiry is in the past
pub async fn consume_session(
    sessions: &dyn SessionStore,
    nonce: &str,
    kind: CeremonyKind,
) -> Result<CeremonySession, PasskeyError> {
    let session = sessions.get(nonce).await?;
    let removed = sessions.delete(nonce).await?;

    let session = session.filter(|_| removed).ok_or_else(|| {
        tracing::warn!("No ceremony session for the presented nonce");
        PasskeyError::NotFound("Ceremony session not found".into())
    })?;

    let now = Utc::now();
    if session.is_expired_at(now) {
        tracing::warn!(
            "Ceremony session expired at {} (now: {})",
            session.expires_at,
            now
        );
        return Err(PasskeyError::SessionExpired(format!(
            "Expired at {}",
            session.expires_at
        )));
    }

    if session.kind != kind {
        tracing::error!(
            "Session kind mismatch. Expected {:?}, Got: {:?}",
            kind,
            session.kind
        );
        return Err(PasskeyError::NotFound("Ceremony session not found".into()));
    }

    Ok(session)
}

/// Deletes a pending ceremony session on explicit client cancellation.
pub async fn cancel_ceremony(sessions: &dyn SessionStore, nonce: &str) -> Result<(), PasskeyError> {
    if sessions.delete(nonce).await? {
        tracing::info!("Ceremony cancelled");
    }
    Ok(())
}
