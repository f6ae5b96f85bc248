use crate::session::{AuthError, RequestAuth, Session, SessionSource};

/// Per-request auth capability, attached by the hook and taken by handlers
/// as `Extension<RequestContext>`.
#[derive(Clone, Debug)]
pub struct RequestContext {
    auth: RequestAuth,
}

impl RequestContext {
    #[must_use]
    pub fn new(auth: RequestAuth) -> Self {
        Self { auth }
    }

    #[must_use]
    pub fn auth(&self) -> &RequestAuth {
        &self.auth
    }

    pub async fn get_session(&self) -> Option<Session> {
        self.auth.get_session().await
    }

    /// # Errors
    /// Returns an error if the provider rejects the logout or cannot be reached.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await
    }
}

impl SessionSource for RequestContext {
    async fn session(&self) -> Option<Session> {
        self.get_session().await
    }

    fn forwarded_cookies(&self) -> Option<String> {
        self.auth.forwarded_cookies()
    }
}
