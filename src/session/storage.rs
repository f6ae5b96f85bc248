//! Cookie persistence format of the auth provider session.
//!
//! The provider stores its session as JSON under `sb-<project-ref>-auth-token`.
//! Values are either raw JSON (possibly percent-encoded) or `base64-` followed
//! by unpadded base64url JSON, and values longer than [`MAX_CHUNK_SIZE`] are split across `<key>.0`,
//! `<key>.1`, ... cookies.

use super::{error::AuthError, RequestCookies, Session, UserIdentity};
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

const BASE64_PREFIX: &str = "base64-";

/// Largest cookie value written before splitting into chunks.
pub const MAX_CHUNK_SIZE: usize = 3180;

/// Session as persisted by the provider and returned by its token endpoint.
/// Not `Debug`: carries both tokens in the clear.
#[derive(Serialize, Deserialize, Clone)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Kept as raw JSON so writes preserve everything the provider sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

impl ProviderSession {
    /// Fill in `expires_at` from `expires_in` when the provider omitted it.
    #[must_use]
    pub fn with_expiry_from(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|expires_in| now + expires_in);
        }
        self
    }

    /// True when the access token expires within `margin` seconds of `now`.
    /// Sessions without a known expiry are taken at face value.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - margin <= now)
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        let user = self.user.and_then(|user| {
            serde_json::from_value::<UserIdentity>(user)
                .map_err(|err| debug!("Ignoring unreadable session user: {err}"))
                .ok()
        });

        Session {
            user,
            access_token: self.access_token,
            expires_at: self.expires_at,
            refresh_token: self.refresh_token.map(SecretString::from),
        }
    }
}

/// Storage key the provider uses for a project URL: `sb-<first host label>-auth-token`.
#[must_use]
pub fn storage_key(auth_url: &Url) -> Option<String> {
    let host = auth_url.host_str()?;
    let project_ref = host.split('.').next().filter(|label| !label.is_empty())?;
    Some(format!("sb-{project_ref}-auth-token"))
}

/// Decode a cookie value in raw JSON, percent-encoded JSON or `base64-` form.
#[must_use]
pub fn decode(raw: &str) -> Option<ProviderSession> {
    let json = if let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) {
        let bytes = Base64UrlUnpadded::decode_vec(encoded.trim_end_matches('='))
            .map_err(|err| debug!("Invalid base64 session cookie: {err}"))
            .ok()?;
        String::from_utf8(bytes).ok()?
    } else if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        urlencoding::decode(raw)
            .map_err(|err| debug!("Invalid percent-encoded session cookie: {err}"))
            .ok()?
            .into_owned()
    };

    serde_json::from_str(&json)
        .map_err(|err| debug!("Invalid session cookie payload: {err}"))
        .ok()
}

/// Encode a session in the cookie-safe `base64-` form.
///
/// # Errors
/// Returns an error if the session cannot be serialized.
pub fn encode(session: &ProviderSession) -> Result<String, AuthError> {
    let json = serde_json::to_string(session)?;
    Ok(format!(
        "{BASE64_PREFIX}{}",
        Base64UrlUnpadded::encode_string(json.as_bytes())
    ))
}

fn chunk_name(key: &str, index: usize) -> String {
    format!("{key}.{index}")
}

/// Read a possibly chunked value: the plain key wins, otherwise chunks are
/// concatenated from `.0` until the first gap.
pub fn read_chunked(cookies: &RequestCookies, key: &str) -> Option<String> {
    if let Some(value) = cookies.get(key) {
        return Some(value);
    }

    let mut value = String::new();
    let mut index = 0;
    while let Some(chunk) = cookies.get(&chunk_name(key, index)) {
        value.push_str(&chunk);
        index += 1;
    }

    if index == 0 {
        None
    } else {
        Some(value)
    }
}

/// Write a value under `key`, chunking when needed and expiring leftovers
/// from any previous layout.
pub fn write_chunked(cookies: &RequestCookies, key: &str, value: &str) {
    let previous = existing_chunks(cookies, key);

    if value.len() <= MAX_CHUNK_SIZE {
        cookies.set(key, value);
        for name in previous {
            cookies.remove(&name);
        }
        return;
    }

    // Encoded values are ASCII, so byte chunks never split a character.
    let chunks: Vec<&str> = value
        .as_bytes()
        .chunks(MAX_CHUNK_SIZE)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();

    for (index, chunk) in chunks.iter().enumerate() {
        cookies.set(&chunk_name(key, index), chunk);
    }

    if cookies.get(key).is_some() {
        cookies.remove(key);
    }
    for name in previous {
        let stale = name
            .rsplit_once('.')
            .and_then(|(_, index)| index.parse::<usize>().ok())
            .is_some_and(|index| index >= chunks.len());
        if stale {
            cookies.remove(&name);
        }
    }
}

/// Expire the key and all of its chunks.
pub fn remove_chunked(cookies: &RequestCookies, key: &str) {
    if cookies.get(key).is_some() {
        cookies.remove(key);
    }
    for name in existing_chunks(cookies, key) {
        cookies.remove(&name);
    }
}

/// True for `key` itself and for its numbered chunks.
#[must_use]
pub fn is_session_cookie(name: &str, key: &str) -> bool {
    name == key || is_chunk_of(name, key)
}

fn is_chunk_of(name: &str, key: &str) -> bool {
    name.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|index| index.parse::<usize>().is_ok())
}

fn existing_chunks(cookies: &RequestCookies, key: &str) -> Vec<String> {
    cookies
        .names()
        .into_iter()
        .filter(|name| is_chunk_of(name, key))
        .collect()
}
