//! Request-level error type shared across relay crates.

/// Errors that abort a request before or while the event stream is produced.
///
/// Tool failures are not represented here: they are reported inside the
/// stream and never abort the request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("session error: {0}")]
    SessionError(String),

    #[error("event stream error: {0}")]
    StreamError(#[from] std::io::Error),
}
