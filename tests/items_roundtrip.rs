//! CRUD round trips against an in-process items backend.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use bassoon::{
    items::{
        ApiError, ApiTarget, CreateItemRequest, Item, ItemFilter, ItemList, ItemsClient,
        UpdateItemRequest,
    },
    session::{Session, UserIdentity},
};
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Backend {
    items: Arc<Mutex<BTreeMap<i64, Item>>>,
    next_id: Arc<AtomicI64>,
    requests: Arc<AtomicUsize>,
}

impl Backend {
    fn authorize(&self, headers: &HeaderMap) -> Result<String, StatusCode> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
        let user_id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match (bearer, user_id) {
            (true, Some(user_id)) => Ok(user_id),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    fn store(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, Item>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn list(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(_query): Query<HashMap<String, String>>,
) -> Response {
    match backend.authorize(&headers) {
        Ok(user_id) => {
            let data = backend
                .store()
                .values()
                .filter(|item| item.user_id == user_id)
                .cloned()
                .collect();
            Json(ItemList { data }).into_response()
        }
        Err(status) => status.into_response(),
    }
}

async fn create(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreateItemRequest>,
) -> Response {
    let user_id = match backend.authorize(&headers) {
        Ok(user_id) => user_id,
        Err(status) => return status.into_response(),
    };

    let now = Utc::now().to_rfc3339();
    let item = Item {
        id: backend.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        title: request.title,
        description: request.description,
        created_at: now.clone(),
        updated_at: now,
        user_id,
    };
    backend.store().insert(item.id, item.clone());
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn update(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> Response {
    if let Err(status) = backend.authorize(&headers) {
        return status.into_response();
    }

    let mut store = backend.store();
    let Some(item) = store.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(title) = request.title {
        item.title = title;
    }
    if request.description.is_some() {
        item.description = request.description;
    }
    item.updated_at = Utc::now().to_rfc3339();
    Json(item.clone()).into_response()
}

async fn delete(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(status) = backend.authorize(&headers) {
        return status.into_response();
    }

    match backend.store().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve the backend on an ephemeral port under both API layouts.
async fn spawn_backend() -> Result<(String, Backend)> {
    let backend = Backend::default();

    let app = Router::new()
        .route("/api/v1/items", get(list).post(create))
        .route("/api/v1/items/:id", put(update).delete(delete))
        .route("/api/items", get(list).post(create))
        .route("/api/items/:id", put(update).delete(delete))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{addr}"), backend))
}

fn session() -> Option<Session> {
    Some(Session::new(
        Some(UserIdentity {
            id: "user-1".to_string(),
            email: None,
            role: None,
        }),
        "access-token",
    ))
}

#[tokio::test]
async fn created_item_is_listed_with_server_fields() -> Result<()> {
    let (url, _backend) = spawn_backend().await?;
    let client = ItemsClient::new(&url, ApiTarget::Direct)?;
    let session = session();

    let created = client
        .create_item(&session, &CreateItemRequest::new("T"))
        .await?;
    assert!(created.id > 0);

    let list = client.list_items(&session, &ItemFilter::default()).await?;
    let listed = list
        .data
        .iter()
        .find(|item| item.id == created.id)
        .context("created item missing from list")?;
    assert_eq!(listed.title, "T");
    assert_eq!(listed.created_at, created.created_at);
    assert_eq!(listed.updated_at, created.updated_at);
    assert_eq!(listed.user_id, "user-1");
    Ok(())
}

#[tokio::test]
async fn update_changes_only_the_sent_fields() -> Result<()> {
    let (url, _backend) = spawn_backend().await?;
    let client = ItemsClient::new(&url, ApiTarget::Direct)?;
    let session = session();

    let created = client
        .create_item(
            &session,
            &CreateItemRequest::new("T").with_description("before"),
        )
        .await?;

    let update = UpdateItemRequest {
        description: Some("D".to_string()),
        ..UpdateItemRequest::default()
    };
    let updated = client.update_item(&session, created.id, &update).await?;

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "T");
    assert_eq!(updated.description.as_deref(), Some("D"));
    assert_eq!(updated.created_at, created.created_at);
    let before = DateTime::parse_from_rfc3339(&created.updated_at)?;
    let after = DateTime::parse_from_rfc3339(&updated.updated_at)?;
    assert!(after >= before);
    Ok(())
}

#[tokio::test]
async fn deleted_item_is_no_longer_listed() -> Result<()> {
    let (url, _backend) = spawn_backend().await?;
    let client = ItemsClient::new(&url, ApiTarget::Proxy)?;
    let session = session();

    let keep = client
        .create_item(&session, &CreateItemRequest::new("keep"))
        .await?;
    let gone = client
        .create_item(&session, &CreateItemRequest::new("gone"))
        .await?;

    client.delete_item(&session, gone.id).await?;

    let ids: Vec<i64> = client
        .list_items(&session, &ItemFilter::default())
        .await?
        .data
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert!(ids.contains(&keep.id));
    assert!(!ids.contains(&gone.id));

    // A second delete reaches the backend and surfaces its 404.
    let err = client.delete_item(&session, gone.id).await.err();
    match err {
        Some(ApiError::Http(err)) => assert_eq!(err.status(), Some(StatusCode::NOT_FOUND)),
        other => panic!("expected upstream 404, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn no_session_never_reaches_the_backend() -> Result<()> {
    let (url, backend) = spawn_backend().await?;
    let client = ItemsClient::new(&url, ApiTarget::Direct)?;
    let anonymous: Option<Session> = None;

    let list = client.list_items(&anonymous, &ItemFilter::default()).await;
    assert!(matches!(list, Err(ApiError::NotAuthenticated)));

    let create = client
        .create_item(&anonymous, &CreateItemRequest::new("T"))
        .await;
    assert!(matches!(create, Err(ApiError::NotAuthenticated)));

    let delete = client.delete_item(&anonymous, 1).await;
    assert!(matches!(delete, Err(ApiError::NotAuthenticated)));

    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);
    Ok(())
}
