use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable session; nothing was sent upstream.
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid request header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    /// Upstream failure, passed through untouched.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
