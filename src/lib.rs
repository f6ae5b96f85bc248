//! # Bassoon (session-aware items gateway)
//!
//! `bassoon` sits between the browser and two upstreams: a hosted auth provider
//! that keeps the user session in a cookie, and a backend CRUD API for a single
//! `items` resource.
//!
//! ## Request flow
//!
//! 1. **Hook:** every request passes through [`gateway::hook`], which binds a
//!    request-scoped auth client to the request cookie jar and attaches a
//!    [`gateway::RequestContext`] to the request.
//! 2. **Session:** handlers ask the context for the current session. Expired
//!    access tokens are refreshed against the provider and written back to the
//!    jar; anything that cannot be refreshed is treated as "not logged in".
//! 3. **Headers:** [`session::headers`] turns a session into the
//!    `Authorization`, `Content-Type` and `X-User-ID` headers. No session, no
//!    headers: item calls fail closed before any network I/O.
//! 4. **Items:** [`items::ItemsClient`] forwards list/create/update/delete to the
//!    backend. Unauthenticated callers are redirected to the root route;
//!    upstream failures are surfaced unchanged.

pub mod cli;
pub mod gateway;
pub mod items;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
