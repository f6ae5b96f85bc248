//! Backend items API: types and the authenticated HTTP client.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiTarget, ItemsClient};
pub use error::ApiError;
pub use types::{CreateItemRequest, Item, ItemFilter, ItemList, UpdateItemRequest};
