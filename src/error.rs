//! Unified error handling for the journey tracking engine.
//!
//! Expected conditions never surface as errors: low-accuracy samples are
//! dropped silently, geocode failures keep the previous place name, and a
//! failed periodic write is logged and implicitly retried by the next tick.
//! Only unrecoverable setup failures and store/channel breakage are typed.

use thiserror::Error;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Location permission is denied or restricted; tracking cannot start
    /// until the authorization state changes.
    #[error("location authorization denied")]
    AuthorizationDenied,

    /// The session task has already stopped or was never started.
    #[error("session is not active")]
    SessionNotActive,

    /// SQLite-level persistence failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Failed to encode or decode a stored path blob.
    #[error("path encoding error: {0}")]
    Encoding(String),

    /// Reverse geocode lookup failed. Internal to the geocode task; callers
    /// of the session API never see this.
    #[error("geocode failed: {0}")]
    Geocode(String),

    /// An internal channel closed unexpectedly.
    #[error("engine channel closed")]
    ChannelClosed,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::AuthorizationDenied.to_string(),
            "location authorization denied"
        );
        let err = EngineError::Encoding("bad blob".into());
        assert!(err.to_string().contains("bad blob"));
    }

    #[test]
    fn test_from_rusqlite() {
        let err: EngineError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, EngineError::Persistence(_)));
    }
}
