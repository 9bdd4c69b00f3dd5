//! In-memory storage backend.
//!
//! One shared state implements all three collaborator contracts, mirroring
//! what the Postgres backend does with joins. Backs the unit and router
//! tests and local runs without a database; listing evaluates the same
//! [`BookingWindow`] predicate the engine hands to the SQL backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingDraft, BookingStatus, BookingWindow, Page},
        item::{Comment, Item},
        user::{User, UserRef},
    },
};

use super::{bookings::BookingStore, items::ItemCatalog, users::UserDirectory};

#[derive(Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    items: HashMap<i64, Item>,
    bookings: HashMap<i64, Booking>,
    comments: Vec<Comment>,
    next_booking_id: i64,
    next_comment_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.state.write().unwrap().users.insert(user.id, user);
    }

    pub fn add_item(&self, item: Item) {
        self.state.write().unwrap().items.insert(item.id, item);
    }

    /// Inserts a booking as-is, bypassing the engine. Test seeding only.
    pub fn add_booking(&self, booking: Booking) {
        let mut state = self.state.write().unwrap();
        state.next_booking_id = state.next_booking_id.max(booking.id);
        state.bookings.insert(booking.id, booking);
    }

    fn list_page<F>(&self, window: &BookingWindow, page: Page, scope: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let state = self.state.read().unwrap();
        let mut matches: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| scope(b) && window.matches(b))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
        matches
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect()
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn get(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.state.read().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl ItemCatalog for MemoryBackend {
    async fn get(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.state.read().unwrap().items.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<Item>> {
        let state = self.state.read().unwrap();
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect())
    }

    async fn comments_for_items(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>> {
        let state = self.state.read().unwrap();
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| item_ids.contains(&c.item_id))
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created);
        Ok(comments)
    }

    async fn add_comment(
        &self,
        item_id: i64,
        author: &UserRef,
        text: &str,
        created: NaiveDateTime,
    ) -> AppResult<Comment> {
        let mut state = self.state.write().unwrap();
        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            text: text.to_string(),
            item_id,
            author: author.clone(),
            created,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl BookingStore for MemoryBackend {
    async fn create(&self, draft: &BookingDraft) -> AppResult<Booking> {
        let mut state = self.state.write().unwrap();
        if !state.items.contains_key(&draft.item.id) {
            return Err(AppError::Internal(format!(
                "Booking references unknown item {}",
                draft.item.id
            )));
        }
        state.next_booking_id += 1;
        let booking = Booking {
            id: state.next_booking_id,
            start: draft.start,
            end: draft.end,
            status: BookingStatus::Waiting,
            item: draft.item.clone(),
            booker: draft.booker.clone(),
        };
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Booking>> {
        Ok(self.state.read().unwrap().bookings.get(&id).cloned())
    }

    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        match state.bookings.get_mut(&id) {
            Some(booking) => {
                booking.status = status;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Booking {id} not found"))),
        }
    }

    async fn list_for_booker(
        &self,
        booker_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>> {
        Ok(self.list_page(window, page, |b| b.booker.id == booker_id))
    }

    async fn list_for_owner(
        &self,
        owner_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>> {
        Ok(self.list_page(window, page, |b| b.item.owner_id == owner_id))
    }

    async fn find_overlapping(
        &self,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: &[BookingStatus],
    ) -> AppResult<Vec<Booking>> {
        let state = self.state.read().unwrap();
        Ok(state
            .bookings
            .values()
            .filter(|b| {
                b.item.id == item_id
                    && !exclude.contains(&b.status)
                    && b.start < end
                    && b.end > start
            })
            .cloned()
            .collect())
    }

    async fn last_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>> {
        let state = self.state.read().unwrap();
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| {
                item_ids.contains(&b.item.id)
                    && b.status == BookingStatus::Approved
                    && b.start < now
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
        Ok(bookings)
    }

    async fn next_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>> {
        let state = self.state.read().unwrap();
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| {
                item_ids.contains(&b.item.id)
                    && b.status == BookingStatus::Approved
                    && b.start >= now
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        Ok(bookings)
    }

    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let state = self.state.read().unwrap();
        Ok(state.bookings.values().any(|b| {
            b.booker.id == booker_id
                && b.item.id == item_id
                && b.status == BookingStatus::Approved
                && b.end < now
        }))
    }
}
