//! HTTP client for the backend items API.
//!
//! Every call first derives auth headers from the caller's session. Without a
//! session the call fails with [`ApiError::NotAuthenticated`] before any network
//! I/O. Upstream errors are returned as-is: no retries, no status remapping and
//! no explicit timeout beyond the HTTP client defaults.

use super::{
    error::ApiError,
    types::{CreateItemRequest, Item, ItemFilter, ItemList, UpdateItemRequest},
};
use crate::session::{get_auth_headers, SessionSource};
use reqwest::{
    header::{HeaderMap, HeaderValue, COOKIE},
    Client, StatusCode,
};
use std::{fmt, str::FromStr};
use tracing::{debug, instrument};
use url::Url;

/// How the backend is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiTarget {
    /// Absolute backend URL under `/api/v1`, forwarding the caller's cookies.
    #[default]
    Direct,
    /// Same-origin reverse proxy under `/api`, without cookies.
    Proxy,
}

impl ApiTarget {
    #[must_use]
    pub const fn items_path(self) -> &'static str {
        match self {
            Self::Direct => "/api/v1/items",
            Self::Proxy => "/api/items",
        }
    }

    #[must_use]
    pub const fn forwards_credentials(self) -> bool {
        matches!(self, Self::Direct)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Proxy => "proxy",
        }
    }
}

impl fmt::Display for ApiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "proxy" => Ok(Self::Proxy),
            other => Err(format!("invalid API mode: {other} (expected direct or proxy)")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ItemsClient {
    http: Client,
    base_url: String,
    target: ApiTarget,
}

impl ItemsClient {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, target: ApiTarget) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Self::with_client(http, base_url, target)
    }

    /// Use an existing HTTP client (shared connection pool).
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn with_client(http: Client, base_url: &str, target: ApiTarget) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            target,
        })
    }

    #[must_use]
    pub fn target(&self) -> ApiTarget {
        self.target
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.target.items_path())
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/{id}", self.collection_url())
    }

    async fn headers<S: SessionSource>(&self, source: &S) -> Result<HeaderMap, ApiError> {
        let Some(auth) = get_auth_headers(source).await else {
            debug!("No session; refusing to call the items API");
            return Err(ApiError::NotAuthenticated);
        };

        let mut headers = auth.to_header_map()?;
        if self.target.forwards_credentials() {
            if let Some(cookies) = source.forwarded_cookies() {
                let mut value = HeaderValue::from_str(&cookies)?;
                value.set_sensitive(true);
                headers.insert(COOKIE, value);
            }
        }
        Ok(headers)
    }

    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    #[instrument(skip(self, source))]
    pub async fn list_items<S: SessionSource>(
        &self,
        source: &S,
        filter: &ItemFilter,
    ) -> Result<ItemList, ApiError> {
        let headers = self.headers(source).await?;
        let response = self
            .http
            .get(self.collection_url())
            .headers(headers)
            .query(filter)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    pub async fn create_item<S: SessionSource>(
        &self,
        source: &S,
        item: &CreateItemRequest,
    ) -> Result<Item, ApiError> {
        let (_, item) = self.create_item_with_status(source, item).await?;
        Ok(item)
    }

    /// Like [`create_item`](Self::create_item), also returning the success
    /// status the backend chose.
    ///
    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    #[instrument(skip(self, source, item))]
    pub async fn create_item_with_status<S: SessionSource>(
        &self,
        source: &S,
        item: &CreateItemRequest,
    ) -> Result<(StatusCode, Item), ApiError> {
        let headers = self.headers(source).await?;
        let response = self
            .http
            .post(self.collection_url())
            .headers(headers)
            .json(item)
            .send()
            .await?
            .error_for_status()?;

        let status = response.status();
        Ok((status, response.json().await?))
    }

    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    #[instrument(skip(self, source, item))]
    pub async fn update_item<S: SessionSource>(
        &self,
        source: &S,
        id: i64,
        item: &UpdateItemRequest,
    ) -> Result<Item, ApiError> {
        let headers = self.headers(source).await?;
        let response = self
            .http
            .put(self.item_url(id))
            .headers(headers)
            .json(item)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    pub async fn delete_item<S: SessionSource>(&self, source: &S, id: i64) -> Result<(), ApiError> {
        self.delete_item_with_status(source, id).await.map(|_| ())
    }

    /// Delete and return the backend's success status. The body is ignored.
    ///
    /// # Errors
    /// [`ApiError::NotAuthenticated`] without a session, otherwise the upstream error.
    #[instrument(skip(self, source))]
    pub async fn delete_item_with_status<S: SessionSource>(
        &self,
        source: &S,
        id: i64,
    ) -> Result<StatusCode, ApiError> {
        let headers = self.headers(source).await?;
        let response = self
            .http
            .delete(self.item_url(id))
            .headers(headers)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.status())
    }
}
