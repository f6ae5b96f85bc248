use crate::{gateway::RequestContext, session::Session};
use axum::{extract::Extension, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

/// Data every page receives: the current session, or `null` when logged out.
#[derive(ToSchema, Serialize, Debug)]
pub struct LayoutData {
    pub session: Option<Session>,
}

#[utoipa::path(
    get,
    path= "/layout",
    responses (
        (status = 200, description = "Current session, null when not logged in", body = LayoutData)
    ),
    tag = "session",
)]
pub async fn layout(Extension(context): Extension<RequestContext>) -> Json<LayoutData> {
    Json(LayoutData {
        session: context.get_session().await,
    })
}
