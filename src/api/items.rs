//! Item listing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        item::{CreateItem, Item, ItemQuery, UpdateItem},
        transaction::{RequestItem, TransactionDetails},
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List items with search and pagination
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    params(ItemQuery),
    responses(
        (status = 200, description = "List of items", body = PaginatedResponse<Item>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<PaginatedResponse<Item>>> {
    let page = state.services.items.search(&query).await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.items.get(id).await?;
    Ok(Json(item))
}

/// List a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Pending penalty or blocked account", body = crate::error::ErrorResponse),
        (status = 422, description = "Offer terms do not match the availability mode", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let created = state.services.items.create(&claims.actor(), item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an item (owner or admin)
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item is engaged in a transaction", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    let updated = state.services.items.update(&claims.actor(), id, data).await?;
    Ok(Json(updated))
}

/// Delete an item (owner or admin)
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item has transaction history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.items.delete(&claims.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request to borrow or buy an item
#[utoipa::path(
    post,
    path = "/items/{id}/request",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = RequestItem,
    responses(
        (status = 201, description = "Transaction created (pending)", body = TransactionDetails),
        (status = 403, description = "Requester has a pending penalty", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item not available", body = crate::error::ErrorResponse),
        (status = 422, description = "Own item or mode not offered", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RequestItem>,
) -> AppResult<(StatusCode, Json<TransactionDetails>)> {
    let created = state
        .services
        .transactions
        .request(&claims.actor(), id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
