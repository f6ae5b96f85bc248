use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Backend-owned item; the gateway only moves it around.
///
/// Timestamps stay in whatever form the backend wrote them, with or without an
/// offset, so they are never reparsed here.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub user_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateItemRequest {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update: omitted fields are left alone by the backend.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Query filter forwarded to the backend as-is.
#[derive(IntoParams, ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemList {
    pub data: Vec<Item>,
}
