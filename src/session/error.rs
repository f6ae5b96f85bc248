use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth provider URL: {0}")]
    InvalidUrl(String),
    #[error("auth provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("invalid session payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl AuthError {
    /// The provider answered and refused the request (4xx), as opposed to an
    /// outage or a transport failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Provider { status, .. } if (400..500).contains(status))
    }
}
