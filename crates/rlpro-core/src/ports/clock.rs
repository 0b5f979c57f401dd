use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected wherever expiry is computed so tests can pin or advance time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
