//! Auth provider sessions.
//!
//! The provider persists its session in a browser cookie. This module reads that
//! cookie from the request jar, refreshes expired access tokens through the
//! provider, and turns a live session into outbound auth headers.
//!
//! Absence of a session is the normal "not logged in" path and never an error.

pub mod client;
pub mod cookies;
pub mod error;
pub mod headers;
pub mod storage;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::future::Future;
use utoipa::ToSchema;

pub use client::{AuthClient, AuthConfig, RequestAuth};
pub use cookies::RequestCookies;
pub use error::AuthError;
pub use headers::{get_auth_headers, AuthHeaders};

/// Identity record issued by the auth provider. Only `id` is required downstream.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Authenticated identity plus bearer token.
///
/// The refresh token never leaves the gateway: it is skipped when the session
/// is serialized for pages.
#[derive(ToSchema, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub access_token: String,
    /// Access token expiry as unix seconds, when the provider reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip)]
    pub(crate) refresh_token: Option<SecretString>,
}

impl Session {
    #[must_use]
    pub fn new(user: Option<UserIdentity>, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            expires_at: None,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// User id of the session owner, if the provider attached a user.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Anything that can answer "who is calling?" for an outbound request.
///
/// The request-scoped [`RequestAuth`] is the production source; a plain
/// `Option<Session>` works for fixed identities.
pub trait SessionSource: Send + Sync {
    /// Current session, or `None` when the caller is not logged in.
    fn session(&self) -> impl Future<Output = Option<Session>> + Send;

    /// Incoming `Cookie` header for credentialed upstream calls, minus the provider session.
    fn forwarded_cookies(&self) -> Option<String> {
        None
    }
}

impl SessionSource for Option<Session> {
    async fn session(&self) -> Option<Session> {
        self.clone()
    }
}

impl SessionSource for Session {
    async fn session(&self) -> Option<Session> {
        Some(self.clone())
    }
}
