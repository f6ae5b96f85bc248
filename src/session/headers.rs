//! Outbound auth headers derived from the current session.

use super::{Session, SessionSource};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE,
};

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// `Authorization`, `Content-Type` and `X-User-ID` for one backend call.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    authorization: String,
    content_type: &'static str,
    user_id: String,
}

impl AuthHeaders {
    /// Headers for `session`, or `None` when the session carries no user.
    #[must_use]
    pub fn from_session(session: &Session) -> Option<Self> {
        let user_id = session.user_id()?;
        Some(Self {
            authorization: format!("Bearer {}", session.access_token),
            content_type: "application/json",
            user_id: user_id.to_string(),
        })
    }

    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// # Errors
    /// Returns an error if the token or user id contain bytes not allowed in headers.
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut authorization = HeaderValue::from_str(&self.authorization)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        headers.insert(X_USER_ID, HeaderValue::from_str(&self.user_id)?);
        Ok(headers)
    }
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("authorization", &"Bearer ***")
            .field("content_type", &self.content_type)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Ask `source` for the session and derive headers from it.
///
/// `None` means "not authenticated"; redirecting is left to the caller.
pub async fn get_auth_headers<S: SessionSource>(source: &S) -> Option<AuthHeaders> {
    let session = source.session().await?;
    AuthHeaders::from_session(&session)
}
