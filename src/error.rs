use thiserror::Error;

/// The application's error type.
///
/// Unknown sessions and unknown tokens are never reported through this type;
/// they resolve to no-ops or to a negative verification outcome.
#[derive(Error, Debug)]
pub enum AppError {
    /// An I/O error while reading or writing the session document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// An internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;
