//! Catalog view endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::item::{CommentView, CreateCommentRequest, ItemView},
};

use super::SharerId;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Zero-based offset into the ordered result
    pub from: Option<i64>,
    /// Page length
    pub size: Option<i64>,
}

/// List the caller's items with their last and next approved bookings
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        PageQuery
    ),
    responses(
        (status = 200, description = "The caller's items", body = Vec<ItemView>),
        (status = 404, description = "User not found")
    )
)]
pub async fn items_for_owner(
    State(state): State<crate::AppState>,
    SharerId(owner_id): SharerId,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<ItemView>>> {
    let now = Utc::now().naive_utc();
    let items = state
        .services
        .catalog
        .items_for_owner(owner_id, query.from.unwrap_or(0), query.size.unwrap_or(10), now)
        .await?;
    Ok(Json(items))
}

/// Item details; booking history appears only for the owner
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemView),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    SharerId(viewer_id): SharerId,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ItemView>> {
    let now = Utc::now().naive_utc();
    let item = state
        .services
        .catalog
        .item_details(viewer_id, item_id, now)
        .await?;
    Ok(Json(item))
}

/// Comment on an item after completing a booking of it
#[utoipa::path(
    post,
    path = "/items/{id}/comment",
    tag = "items",
    request_body = CreateCommentRequest,
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Comment added", body = CommentView),
        (status = 400, description = "Caller never completed a booking of this item"),
        (status = 404, description = "User or item not found")
    )
)]
pub async fn add_comment(
    State(state): State<crate::AppState>,
    SharerId(author_id): SharerId,
    Path(item_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<Json<CommentView>> {
    let now = Utc::now().naive_utc();
    let comment = state
        .services
        .catalog
        .add_comment(author_id, item_id, &request.text, now)
        .await?;
    Ok(Json(comment))
}
