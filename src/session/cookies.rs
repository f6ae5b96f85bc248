//! Request-scoped cookie jar.
//!
//! The jar is built from the incoming `Cookie` header, handed to the auth client
//! for the duration of one request, and drained into `Set-Cookie` headers by the
//! request hook once the handler has produced a response. Every cookie written
//! here is scoped to `Path=/`.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Persisted session cookies live as long as the browser allows (400 days).
const COOKIE_MAX_AGE_SECONDS: u64 = 400 * 24 * 60 * 60;

#[derive(Debug, Default)]
struct Jar {
    /// Raw `Cookie` header as received.
    header: Option<String>,
    /// Current view of the cookies, including changes made during the request.
    values: BTreeMap<String, String>,
    /// Pending writes: `Some` sets a value, `None` expires the cookie.
    changes: BTreeMap<String, Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct RequestCookies {
    inner: Arc<Mutex<Jar>>,
}

impl RequestCookies {
    /// Parse the `Cookie` headers of an incoming request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = Jar::default();
        let mut raw = Vec::new();

        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            raw.push(value.to_string());
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(name), Some(val)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let name = name.trim();
                if !name.is_empty() {
                    jar.values.insert(name.to_string(), val.trim().to_string());
                }
            }
        }

        if !raw.is_empty() {
            jar.header = Some(raw.join("; "));
        }

        Self {
            inner: Arc::new(Mutex::new(jar)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Jar> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().values.get(name).cloned()
    }

    /// Names of all cookies currently visible in the jar.
    pub fn names(&self) -> Vec<String> {
        self.lock().values.keys().cloned().collect()
    }

    pub fn set(&self, name: &str, value: &str) {
        let mut jar = self.lock();
        jar.values.insert(name.to_string(), value.to_string());
        jar.changes
            .insert(name.to_string(), Some(value.to_string()));
    }

    pub fn remove(&self, name: &str) {
        let mut jar = self.lock();
        jar.values.remove(name);
        jar.changes.insert(name.to_string(), None);
    }

    /// The `Cookie` header the request arrived with.
    pub fn header(&self) -> Option<String> {
        self.lock().header.clone()
    }

    /// The incoming `Cookie` header minus every pair whose name matches `exclude`.
    pub fn header_without<F>(&self, exclude: F) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        let header = self.header()?;
        let kept: Vec<&str> = header
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let name = pair.split_once('=').map_or(*pair, |(name, _)| name);
                !exclude(name.trim())
            })
            .collect();

        if kept.is_empty() {
            None
        } else {
            Some(kept.join("; "))
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.lock().changes.is_empty()
    }

    /// Render pending changes as `Set-Cookie` header values.
    ///
    /// # Errors
    /// Returns an error if a cookie value is not a valid header value.
    pub fn set_cookie_headers(&self, secure: bool) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
        let jar = self.lock();
        jar.changes
            .iter()
            .map(|(name, value)| {
                let mut cookie = match value {
                    Some(value) => format!(
                        "{name}={value}; Path=/; SameSite=Lax; Max-Age={COOKIE_MAX_AGE_SECONDS}"
                    ),
                    None => format!("{name}=; Path=/; SameSite=Lax; Max-Age=0"),
                };
                if secure {
                    cookie.push_str("; Secure");
                }
                HeaderValue::from_str(&cookie)
            })
            .collect()
    }
}
