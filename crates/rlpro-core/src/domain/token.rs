use chrono::{DateTime, Utc};

/// A signed, self-contained bearer credential.
///
/// The server keeps no record of issued tokens; `expires_at` mirrors the
/// `exp` claim embedded in `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}
