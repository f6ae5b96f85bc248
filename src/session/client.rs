//! Auth provider client.
//!
//! Flow overview: [`AuthClient`] is built once at startup and shared. For every
//! request the hook binds it to that request's cookie jar, producing a
//! [`RequestAuth`]. Reads decode the persisted session cookie; expired access
//! tokens are renewed through the provider token endpoint and written back to
//! the jar so the browser receives the new session with the response.

use super::{
    error::AuthError,
    storage::{self, ProviderSession},
    RequestCookies, Session, SessionSource,
};
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECONDS: i64 = 90;

#[derive(Clone)]
pub struct AuthConfig {
    url: Url,
    anon_key: SecretString,
    storage_key: String,
    cookie_secure: bool,
}

impl AuthConfig {
    /// Build provider settings from the public project URL and anon key.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or has no host to derive the cookie name from.
    pub fn new(url: &str, anon_key: SecretString) -> Result<Self, AuthError> {
        let parsed =
            Url::parse(url).map_err(|err| AuthError::InvalidUrl(format!("{url}: {err}")))?;
        let storage_key = storage::storage_key(&parsed)
            .ok_or_else(|| AuthError::InvalidUrl(format!("{url}: missing host")))?;

        Ok(Self {
            url: parsed,
            anon_key,
            storage_key,
            cookie_secure: false,
        })
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Cookie name of the persisted session.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"***")
            .field("storage_key", &self.storage_key)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Shared auth provider client; cheap to clone.
#[derive(Clone, Debug)]
pub struct AuthClient {
    config: Arc<AuthConfig>,
    http: Client,
}

impl AuthClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let http = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Bind the client to one request's cookie jar.
    #[must_use]
    pub fn for_request(&self, cookies: RequestCookies) -> RequestAuth {
        RequestAuth {
            client: self.clone(),
            cookies,
        }
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, AuthError> {
        let anon_key = self.config.anon_key.expose_secret();
        let response = self
            .http
            .post(self.config.endpoint("/auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", anon_key)
            .bearer_auth(anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        Ok(response.json::<ProviderSession>().await?)
    }

    #[instrument(skip_all)]
    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.config.endpoint("/auth/v1/logout"))
            .query(&[("scope", "global")])
            .header("apikey", self.config.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The provider no longer knows this session; it is gone either way.
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            debug!("Provider reported session already invalid: {status}");
            return Ok(());
        }

        Err(provider_error(response).await)
    }
}

/// Auth client bound to the cookie jar of a single request.
#[derive(Clone, Debug)]
pub struct RequestAuth {
    client: AuthClient,
    cookies: RequestCookies,
}

impl RequestAuth {
    #[must_use]
    pub fn cookies(&self) -> &RequestCookies {
        &self.cookies
    }

    /// Current session, refreshed if the access token is about to expire.
    ///
    /// Returns `None` when no session cookie exists, it cannot be decoded, or
    /// the refresh fails. Undecodable sessions and sessions the provider refuses
    /// to refresh are cleared.
    #[instrument(skip(self))]
    pub async fn get_session(&self) -> Option<Session> {
        let key = self.client.config.storage_key();
        let raw = storage::read_chunked(&self.cookies, key)?;

        let Some(stored) = storage::decode(&raw) else {
            warn!("Discarding unreadable session cookie");
            storage::remove_chunked(&self.cookies, key);
            return None;
        };

        let now = Utc::now().timestamp();
        if !stored.expires_within(now, EXPIRY_MARGIN_SECONDS) {
            return Some(stored.into_session());
        }

        let Some(refresh_token) = stored.refresh_token.as_deref() else {
            debug!("Session expired without a refresh token");
            storage::remove_chunked(&self.cookies, key);
            return None;
        };

        match self.client.refresh(refresh_token).await {
            Ok(renewed) => {
                let renewed = renewed.with_expiry_from(Utc::now().timestamp());
                match storage::encode(&renewed) {
                    Ok(value) => storage::write_chunked(&self.cookies, key, &value),
                    Err(err) => warn!("Failed to persist refreshed session: {err}"),
                }
                debug!("Session refreshed");
                Some(renewed.into_session())
            }
            Err(err) => {
                warn!("Session refresh failed: {err}");
                // Only a provider rejection ends the session; outages keep it for a retry.
                if err.is_rejection() {
                    storage::remove_chunked(&self.cookies, key);
                }
                None
            }
        }
    }

    /// Invalidate the session at the provider and clear the session cookies.
    ///
    /// A request without a session is already signed out.
    ///
    /// # Errors
    /// Returns an error if the provider rejects the logout or cannot be reached.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let key = self.client.config.storage_key();

        if let Some(session) = self.get_session().await {
            self.client.logout(&session.access_token).await?;
        }

        storage::remove_chunked(&self.cookies, key);
        Ok(())
    }
}

impl SessionSource for RequestAuth {
    async fn session(&self) -> Option<Session> {
        self.get_session().await
    }

    /// Incoming cookies without the provider session, which stays in the gateway.
    fn forwarded_cookies(&self) -> Option<String> {
        let key = self.client.config.storage_key();
        self.cookies
            .header_without(|name| storage::is_session_cookie(name, key))
    }
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

async fn provider_error(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderErrorBody>(&body)
        .ok()
        .and_then(|body| {
            body.msg
                .or(body.message)
                .or(body.error_description)
                .or(body.error)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("auth provider returned {status}"));

    AuthError::Provider {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderMap};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ANON_KEY: &str = "anon-key";

    fn client(url: &str) -> AuthClient {
        let config = AuthConfig::new(url, SecretString::from(ANON_KEY)).unwrap();
        AuthClient::new(config).unwrap()
    }

    fn jar_with(client: &AuthClient, session: &ProviderSession) -> RequestCookies {
        let value = storage::encode(session).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("{}={value}", client.config().storage_key())
                .parse()
                .unwrap(),
        );
        RequestCookies::from_headers(&headers)
    }

    fn stored(expires_at: i64) -> ProviderSession {
        ProviderSession {
            access_token: "old-access".to_string(),
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            expires_at: Some(expires_at),
            refresh_token: Some("old-refresh".to_string()),
            user: Some(json!({ "id": "user-1" })),
        }
    }

    #[test]
    fn config_rejects_invalid_urls() {
        assert!(AuthConfig::new("not a url", SecretString::from(ANON_KEY)).is_err());
        assert!(AuthConfig::new("unix:/tmp/socket", SecretString::from(ANON_KEY)).is_err());
    }

    #[test]
    fn config_debug_redacts_anon_key() {
        let config =
            AuthConfig::new("https://project.supabase.co", SecretString::from(ANON_KEY)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(ANON_KEY));
        assert!(debug.contains("sb-project-auth-token"));
    }

    #[tokio::test]
    async fn missing_cookie_is_not_logged_in() {
        let client = client("http://127.0.0.1:9");
        let auth = client.for_request(RequestCookies::default());
        assert!(auth.get_session().await.is_none());
        assert!(!auth.cookies().has_changes());
    }

    #[tokio::test]
    async fn unexpired_session_is_returned_without_provider_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() + 3600));
        let session = client.for_request(jar.clone()).get_session().await.unwrap();

        assert_eq!(session.access_token, "old-access");
        assert_eq!(session.user_id(), Some("user-1"));
        assert!(!jar.has_changes());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_and_written_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(header("apikey", ANON_KEY))
            .and(body_json(json!({ "refresh_token": "old-refresh" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "new-refresh",
                "user": { "id": "user-1", "email": "user@example.com" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() - 10));
        let session = client.for_request(jar.clone()).get_session().await.unwrap();

        assert_eq!(session.access_token, "new-access");
        assert!(session.expires_at.is_some());

        let written = jar.get(client.config().storage_key()).unwrap();
        let persisted = storage::decode(&written).unwrap();
        assert_eq!(persisted.access_token, "new-access");
        assert_eq!(persisted.refresh_token.as_deref(), Some("new-refresh"));
    }

    #[tokio::test]
    async fn failed_refresh_clears_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token"
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() - 10));
        assert!(client.for_request(jar.clone()).get_session().await.is_none());
        assert!(jar.get(client.config().storage_key()).is_none());
        assert!(jar.has_changes());
    }

    #[tokio::test]
    async fn unreachable_provider_keeps_the_session_cookie() {
        let client = client("http://127.0.0.1:9");
        let jar = jar_with(&client, &stored(Utc::now().timestamp() - 10));

        assert!(client.for_request(jar.clone()).get_session().await.is_none());
        assert!(jar.get(client.config().storage_key()).is_some());
        assert!(!jar.has_changes());
    }

    #[tokio::test]
    async fn provider_server_error_keeps_the_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() - 10));
        assert!(client.for_request(jar.clone()).get_session().await.is_none());
        assert!(!jar.has_changes());
    }

    #[test]
    fn forwarded_cookies_never_include_the_session() {
        let client = client("https://project.supabase.co");
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "theme=dark; sb-project-auth-token=base64-abc; sb-project-auth-token.0=x; backend_sid=42"
                .parse()
                .unwrap(),
        );
        let auth = client.for_request(RequestCookies::from_headers(&headers));

        assert_eq!(
            auth.forwarded_cookies(),
            Some("theme=dark; backend_sid=42".to_string())
        );
    }

    #[test]
    fn forwarded_cookies_empty_when_only_the_session_is_present() {
        let client = client("https://project.supabase.co");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "sb-project-auth-token=abc".parse().unwrap());
        let auth = client.for_request(RequestCookies::from_headers(&headers));

        assert_eq!(auth.forwarded_cookies(), None);
    }

    #[tokio::test]
    async fn sign_out_revokes_and_clears_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer old-access"))
            .and(header("apikey", ANON_KEY))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() + 3600));
        client.for_request(jar.clone()).sign_out().await.unwrap();
        assert!(jar.get(client.config().storage_key()).is_none());
    }

    #[tokio::test]
    async fn sign_out_tolerates_already_invalid_sessions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() + 3600));
        assert!(client.for_request(jar).sign_out().await.is_ok());
    }

    #[tokio::test]
    async fn sign_out_surfaces_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "msg": "database unavailable" })),
            )
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let jar = jar_with(&client, &stored(Utc::now().timestamp() + 3600));
        let err = client.for_request(jar.clone()).sign_out().await.unwrap_err();

        assert!(matches!(err, AuthError::Provider { status: 500, .. }));
        assert_eq!(err.to_string(), "database unavailable");
        // The session stays in place so the user can retry.
        assert!(jar.get(client.config().storage_key()).is_some());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_a_noop() {
        let client = client("http://127.0.0.1:9");
        assert!(client
            .for_request(RequestCookies::default())
            .sign_out()
            .await
            .is_ok());
    }
}
