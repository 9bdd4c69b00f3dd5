//! Catalog read views and item comments.
//!
//! Consumes the nearest-booking aggregation when rendering item details;
//! last/next are only ever attached for the item's owner.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::Page,
        item::{CommentView, Item, ItemView},
        user::UserRef,
    },
    repository::Repository,
};

use super::bookings::BookingsService;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    bookings: BookingsService,
}

impl CatalogService {
    pub fn new(repository: Repository, bookings: BookingsService) -> Self {
        Self {
            repository,
            bookings,
        }
    }

    /// Item detail view. Booking history is only revealed to the owner.
    pub async fn item_details(
        &self,
        viewer_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<ItemView> {
        let item = self.find_item(item_id).await?;
        let comments = self.comments_for(&[item_id]).await?.remove(&item_id).unwrap_or_default();

        let (last, next) = if item.owner_id == viewer_id {
            let mut nearest = self.bookings.nearest_bookings(&[item_id], now).await?;
            (nearest.last.remove(&item_id), nearest.next.remove(&item_id))
        } else {
            (None, None)
        };

        Ok(ItemView::new(&item, last, next, comments))
    }

    /// The owner's items with last/next bookings, resolved in one batch
    /// aggregation call rather than per item.
    pub async fn items_for_owner(
        &self,
        owner_id: i64,
        from: i64,
        size: i64,
        now: NaiveDateTime,
    ) -> AppResult<Vec<ItemView>> {
        self.find_user(owner_id).await?;
        let page = Page::from_offset(from, size).ok_or_else(|| {
            AppError::Validation(format!("Invalid page request: from={from}, size={size}"))
        })?;

        let items = self.repository.items.list_by_owner(owner_id, page).await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let mut nearest = self.bookings.nearest_bookings(&item_ids, now).await?;
        let mut comments = self.comments_for(&item_ids).await?;

        Ok(items
            .iter()
            .map(|item| {
                ItemView::new(
                    item,
                    nearest.last.remove(&item.id),
                    nearest.next.remove(&item.id),
                    comments.remove(&item.id).unwrap_or_default(),
                )
            })
            .collect())
    }

    /// Leave a comment on an item. Only users who completed an approved
    /// booking of the item may comment.
    pub async fn add_comment(
        &self,
        author_id: i64,
        item_id: i64,
        text: &str,
        now: NaiveDateTime,
    ) -> AppResult<CommentView> {
        let author = self.find_user(author_id).await?;
        let item = self.find_item(item_id).await?;

        if !self
            .bookings
            .has_finished_booking(author_id, item.id, now)
            .await?
        {
            return Err(AppError::Validation(
                "Only users who completed a booking of this item can comment on it".to_string(),
            ));
        }

        let comment = self
            .repository
            .items
            .add_comment(item.id, &UserRef::from(&author), text, now)
            .await?;
        Ok(CommentView::from(&comment))
    }

    async fn comments_for(&self, item_ids: &[i64]) -> AppResult<HashMap<i64, Vec<CommentView>>> {
        let comments = self.repository.items.comments_for_items(item_ids).await?;
        let mut grouped: HashMap<i64, Vec<CommentView>> = HashMap::new();
        for comment in &comments {
            grouped
                .entry(comment.item_id)
                .or_default()
                .push(CommentView::from(comment));
        }
        Ok(grouped)
    }

    async fn find_user(&self, id: i64) -> AppResult<crate::models::user::User> {
        self.repository
            .users
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    async fn find_item(&self, id: i64) -> AppResult<Item> {
        self.repository
            .items
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))
    }
}
