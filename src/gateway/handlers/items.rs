//! Item routes: thin wrappers over [`ItemsClient`](crate::items::ItemsClient).
//!
//! Callers without a session are redirected to the root route. Upstream
//! answers keep their status code, successes included; failures that never
//! got one are 502.

use super::ErrorBody;
use crate::{
    gateway::{Gateway, RequestContext},
    items::{ApiError, CreateItemRequest, Item, ItemFilter, ItemList, UpdateItemRequest},
};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

fn api_error_response(err: ApiError, gateway: &Gateway) -> Response {
    match err {
        ApiError::NotAuthenticated => {
            debug!("Redirecting unauthenticated caller");
            Redirect::to(&gateway.root_route()).into_response()
        }
        ApiError::Http(err) => {
            let status = err.status().unwrap_or(StatusCode::BAD_GATEWAY);
            error!("Items API call failed: {err}");
            (status, Json(ErrorBody::new(err.to_string()))).into_response()
        }
        err @ (ApiError::InvalidUrl(_) | ApiError::InvalidHeader(_)) => {
            error!("Items API call not sent: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(err.to_string())),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path= "/items",
    params(ItemFilter),
    responses (
        (status = 200, description = "Items visible to the caller", body = ItemList),
        (status = 303, description = "Not authenticated, redirected to the root route"),
        (status = 502, description = "Items API unreachable", body = ErrorBody)
    ),
    tag = "items",
)]
pub async fn list_items(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(context): Extension<RequestContext>,
    Query(filter): Query<ItemFilter>,
) -> Response {
    match gateway.items().list_items(&context, &filter).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => api_error_response(err, &gateway),
    }
}

#[utoipa::path(
    post,
    path= "/items",
    request_body = CreateItemRequest,
    responses (
        (status = 201, description = "Item created; the backend's success status is kept", body = Item),
        (status = 303, description = "Not authenticated, redirected to the root route"),
        (status = 502, description = "Items API unreachable", body = ErrorBody)
    ),
    tag = "items",
)]
pub async fn create_item(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<CreateItemRequest>,
) -> Response {
    match gateway.items().create_item_with_status(&context, &request).await {
        Ok((status, item)) => (status, Json(item)).into_response(),
        Err(err) => api_error_response(err, &gateway),
    }
}

#[utoipa::path(
    put,
    path= "/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses (
        (status = 200, description = "Item updated", body = Item),
        (status = 303, description = "Not authenticated, redirected to the root route"),
        (status = 404, description = "No such item", body = ErrorBody)
    ),
    tag = "items",
)]
pub async fn update_item(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> Response {
    match gateway.items().update_item(&context, id, &request).await {
        Ok(item) => Json(item).into_response(),
        Err(err) => api_error_response(err, &gateway),
    }
}

#[utoipa::path(
    delete,
    path= "/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses (
        (status = 204, description = "Item deleted; the backend's success status is kept"),
        (status = 303, description = "Not authenticated, redirected to the root route"),
        (status = 404, description = "No such item", body = ErrorBody)
    ),
    tag = "items",
)]
pub async fn delete_item(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Response {
    match gateway.items().delete_item_with_status(&context, id).await {
        Ok(status) => status.into_response(),
        Err(err) => api_error_response(err, &gateway),
    }
}
