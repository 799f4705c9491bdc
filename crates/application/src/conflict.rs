use chrono::{DateTime, Utc};

/// Returns whether the server copy changed after the version the client last saw.
///
/// No client timestamp means no optimistic check was requested. Equal timestamps
/// are not a conflict so a client can safely retry a write it already sent.
#[must_use]
pub fn has_conflict(
    client_known_updated_at: Option<DateTime<Utc>>,
    server_updated_at: DateTime<Utc>,
) -> bool {
    client_known_updated_at.is_some_and(|client_known| server_updated_at > client_known)
}
