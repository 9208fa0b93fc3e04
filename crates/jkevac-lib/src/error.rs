use thiserror::Error;

/// Convenient result alias for the jkevac library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// These errors describe why a remote call failed. They are logged, but the
/// store only ever shows the fixed user-facing messages exported by the
/// coordinator.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured service base URL could not be parsed or joined.
    #[error("invalid service base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The service answered with a status that carries no usable payload.
    #[error("{endpoint} returned unexpected status {status}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn decode(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Decode {
            endpoint,
            message: err.to_string(),
        }
    }
}
