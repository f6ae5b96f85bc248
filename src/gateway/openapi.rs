use super::handlers::{self, health, items, layout, logout};
use crate::items::{CreateItemRequest, Item, ItemList, UpdateItemRequest};
use crate::session::{Session, UserIdentity};
use utoipa::openapi::{Contact, License};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        layout::layout,
        logout::logout,
        items::list_items,
        items::create_item,
        items::update_item,
        items::delete_item,
    ),
    components(schemas(
        health::Health,
        layout::LayoutData,
        handlers::ErrorBody,
        Session,
        UserIdentity,
        Item,
        ItemList,
        CreateItemRequest,
        UpdateItemRequest,
    )),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "session", description = "Session of the browser calling the gateway"),
        (name = "items", description = "Authenticated proxy to the items API"),
    )
)]
struct ApiDoc;

/// `OpenAPI` document of the routes relative to the configured base path.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Cargo.toml metadata instead of the derive defaults.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.find('<') {
        Some(start) => (
            non_empty(&author[..start]),
            non_empty(author[start + 1..].trim_end_matches('>')),
        ),
        None => (non_empty(author), None),
    }
}
