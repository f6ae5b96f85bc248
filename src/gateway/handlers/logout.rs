use super::ErrorBody;
use crate::gateway::RequestContext;
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

#[utoipa::path(
    post,
    path= "/auth/logout",
    responses (
        (status = 200, description = "Signed out, session cookies cleared"),
        (status = 500, description = "Auth provider rejected the sign-out", body = ErrorBody)
    ),
    tag = "session",
)]
pub async fn logout(Extension(context): Extension<RequestContext>) -> Response {
    match context.sign_out().await {
        Ok(()) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")]).into_response(),
        Err(err) => {
            error!("Sign-out failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(err.to_string())),
            )
                .into_response()
        }
    }
}
