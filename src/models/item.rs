//! Item records and catalog read models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::booking::NearestBooking;
use super::user::UserRef;

/// Full item record from the catalog. The booking subsystem reads it for
/// availability and ownership checks but never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    pub request_id: Option<i64>,
}

/// Item projection carried inside a booking record. Keeps the owner id so
/// access checks do not need a second catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

impl From<&Item> for ItemRef {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            owner_id: item.owner_id,
        }
    }
}

/// Comment left on an item by a user who finished a booking of it
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub item_id: i64,
    pub author: UserRef,
    pub created: NaiveDateTime,
}

/// Comment response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub created: NaiveDateTime,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text.clone(),
            author_name: comment.author.name.clone(),
            created: comment.created,
        }
    }
}

/// Comment creation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub text: String,
}

/// Item detail view rendered by the catalog. `last_booking` and
/// `next_booking` are populated only for the item's owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_booking: Option<NearestBooking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_booking: Option<NearestBooking>,
    pub comments: Vec<CommentView>,
}

impl ItemView {
    pub fn new(
        item: &Item,
        last_booking: Option<NearestBooking>,
        next_booking: Option<NearestBooking>,
        comments: Vec<CommentView>,
    ) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
            last_booking,
            next_booking,
            comments,
        }
    }
}
