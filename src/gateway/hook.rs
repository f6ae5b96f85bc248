//! Request hook run before every route.

use super::{Gateway, RequestContext};
use crate::session::RequestCookies;
use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Probe Chrome devtools sends to every local origin.
pub const DEVTOOLS_PROBE_PATH: &str = "/.well-known/appspecific/com.chrome.devtools.json";

/// Bind a [`RequestContext`] to the request and flush cookie changes into
/// `Set-Cookie` headers on the way out.
pub async fn handle(
    State(gateway): State<Arc<Gateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookies = RequestCookies::from_headers(request.headers());
    let context = RequestContext::new(gateway.auth().for_request(cookies.clone()));
    request.extensions_mut().insert(context);

    if gateway.dev() && request.uri().path() == DEVTOOLS_PROBE_PATH {
        debug!("Answering devtools probe");
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut response = next.run(request).await;

    if cookies.has_changes() {
        match cookies.set_cookie_headers(gateway.auth().config().cookie_secure()) {
            Ok(values) => {
                let headers = response.headers_mut();
                for value in values {
                    headers.append(SET_COOKIE, value);
                }
            }
            Err(err) => warn!("Dropping invalid Set-Cookie header: {err}"),
        }
    }

    response
}
