//! HTTP surface of the gateway.
//!
//! [`Gateway`] owns the shared upstream clients and builds the axum router.
//! Every request runs through [`hook::handle`] first, which attaches a
//! [`RequestContext`] bound to that request's cookies.

pub mod context;
pub mod handlers;
pub mod hook;
pub mod openapi;

pub use context::RequestContext;

use crate::{items::ItemsClient, session::AuthClient};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use handlers::{health, items, layout, logout};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Debug)]
pub struct Gateway {
    auth: AuthClient,
    items: ItemsClient,
    base_path: String,
    dev: bool,
}

impl Gateway {
    #[must_use]
    pub fn new(auth: AuthClient, items: ItemsClient) -> Self {
        Self {
            auth,
            items,
            base_path: String::new(),
            dev: false,
        }
    }

    /// Serve the app routes under `base_path`; `""` and `"/"` mean the root.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    #[must_use]
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    #[must_use]
    pub fn items(&self) -> &ItemsClient {
        &self.items
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn dev(&self) -> bool {
        self.dev
    }

    /// Where unauthenticated callers are sent.
    #[must_use]
    pub fn root_route(&self) -> String {
        format!("{}/", self.base_path)
    }

    /// Build the complete application router.
    pub fn router(self) -> Router {
        let gateway = Arc::new(self);

        let app_routes = Router::new()
            .route("/layout", get(layout::layout))
            .route("/auth/logout", post(logout::logout))
            .route("/items", get(items::list_items).post(items::create_item))
            .route(
                "/items/:id",
                put(items::update_item).delete(items::delete_item),
            );

        let router = if gateway.base_path.is_empty() {
            app_routes
        } else {
            Router::new().nest(&gateway.base_path, app_routes)
        };

        router
            .route("/health", get(health::health).options(health::health))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(
                gateway.clone(),
                hook::handle,
            ))
            .layer(Extension(gateway))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestHeaderLayer::if_not_present(
                        X_REQUEST_ID,
                        |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                    ))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span)),
            )
    }

    /// Bind `[::]:port` and serve until ctrl-c or SIGTERM.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound or the server fails.
    pub async fn serve(self, port: u16) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(format!("::0:{port}")).await?;

        info!("Listening on [::]:{}", port);

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str);
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, route, request_id)
}
