//! Booking engine: creation validation, approval state machine, access
//! checks, state-filtered listing and the nearest-booking aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            Booking, BookingDraft, BookingStatus, BookingView, ConflictPolicy,
            CreateBookingRequest, NearestBooking, Page, StateFilter,
        },
        item::{Item, ItemRef},
        user::{User, UserRef},
    },
    repository::Repository,
};

/// Per-item last/next approved bookings, keyed by item id. Items without a
/// qualifying booking are absent.
#[derive(Debug, Default)]
pub struct NearestBookings {
    pub last: HashMap<i64, NearestBooking>,
    pub next: HashMap<i64, NearestBooking>,
}

type LockRegistry = Arc<DashMap<i64, Arc<Mutex<()>>>>;

fn lock_for(registry: &LockRegistry, key: i64) -> Arc<Mutex<()>> {
    registry
        .entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    conflict_policy: ConflictPolicy,
    /// Serializes the overlap check and insert per item under the strict
    /// policy, and approval against concurrent creations.
    item_locks: LockRegistry,
    /// Serializes the approval read-modify-write per booking.
    booking_locks: LockRegistry,
}

impl BookingsService {
    pub fn new(repository: Repository, conflict_policy: ConflictPolicy) -> Self {
        Self {
            repository,
            conflict_policy,
            item_locks: Arc::new(DashMap::new()),
            booking_locks: Arc::new(DashMap::new()),
        }
    }

    /// Create a booking request for an item. The booking enters the store
    /// as `Waiting` and awaits the owner's decision.
    pub async fn create_booking(
        &self,
        booker_id: i64,
        request: CreateBookingRequest,
    ) -> AppResult<BookingView> {
        let booker = self.find_user(booker_id).await?;
        let item = self.find_item(request.item_id).await?;

        if !item.available {
            return Err(AppError::Conflict(format!(
                "Item {} is not available for booking",
                item.id
            )));
        }
        if item.owner_id == booker_id {
            return Err(AppError::PermissionDenied(
                "Owner cannot book their own item".to_string(),
            ));
        }
        if request.start >= request.end {
            return Err(AppError::Validation(
                "Booking start must be before its end".to_string(),
            ));
        }

        let draft = BookingDraft {
            start: request.start,
            end: request.end,
            item: ItemRef::from(&item),
            booker: UserRef::from(&booker),
        };

        let booking = match self.conflict_policy {
            ConflictPolicy::Advisory => self.repository.bookings.create(&draft).await?,
            ConflictPolicy::Strict => {
                let lock = lock_for(&self.item_locks, item.id);
                let _guard = lock.lock().await;
                self.ensure_no_approved_overlap(item.id, request.start, request.end, None)
                    .await?;
                self.repository.bookings.create(&draft).await?
            }
        };

        tracing::info!(
            booking_id = booking.id,
            item_id = booking.item.id,
            booker_id,
            "Booking created"
        );
        Ok(BookingView::from(&booking))
    }

    /// Approve or reject a waiting booking. Only the item's owner may
    /// decide; re-approving an approved booking is rejected. Re-rejecting
    /// and approving a previously rejected booking are both permitted.
    pub async fn approve_booking(
        &self,
        owner_id: i64,
        booking_id: i64,
        approved: bool,
    ) -> AppResult<BookingView> {
        let booking_lock = lock_for(&self.booking_locks, booking_id);
        let _booking_guard = booking_lock.lock().await;

        let mut booking = self.find_booking(booking_id).await?;

        if booking.item.owner_id != owner_id {
            return Err(AppError::PermissionDenied(
                "Only the item's owner can approve a booking".to_string(),
            ));
        }
        if approved && booking.status == BookingStatus::Approved {
            return Err(AppError::Conflict(format!(
                "Booking {booking_id} is already approved"
            )));
        }

        if approved && self.conflict_policy == ConflictPolicy::Strict {
            // A second waiting request may have been created before the
            // first one was approved; the approved set must stay
            // overlap-free.
            let item_lock = lock_for(&self.item_locks, booking.item.id);
            let _item_guard = item_lock.lock().await;
            self.ensure_no_approved_overlap(
                booking.item.id,
                booking.start,
                booking.end,
                Some(booking_id),
            )
            .await?;
            booking.status = BookingStatus::Approved;
            self.repository
                .bookings
                .set_status(booking_id, booking.status)
                .await?;
        } else {
            booking.status = if approved {
                BookingStatus::Approved
            } else {
                BookingStatus::Rejected
            };
            self.repository
                .bookings
                .set_status(booking_id, booking.status)
                .await?;
        }

        tracing::info!(booking_id, approved, "Booking decision recorded");
        Ok(BookingView::from(&booking))
    }

    /// Single booking lookup, visible to its booker and the item's owner.
    pub async fn get_booking(&self, user_id: i64, booking_id: i64) -> AppResult<BookingView> {
        let booking = self.find_booking(booking_id).await?;
        if booking.booker.id != user_id && booking.item.owner_id != user_id {
            return Err(AppError::PermissionDenied(
                "No access to this booking".to_string(),
            ));
        }
        Ok(BookingView::from(&booking))
    }

    /// Bookings made by the user, newest start first.
    pub async fn bookings_for_user(
        &self,
        user_id: i64,
        state: StateFilter,
        from: i64,
        size: i64,
        now: NaiveDateTime,
    ) -> AppResult<Vec<BookingView>> {
        self.find_user(user_id).await?;
        let page = Self::page(from, size)?;
        let window = state.window(now);
        let bookings = self
            .repository
            .bookings
            .list_for_booker(user_id, &window, page)
            .await?;
        Ok(bookings.iter().map(BookingView::from).collect())
    }

    /// Bookings of the owner's items, newest start first.
    pub async fn bookings_for_owner(
        &self,
        owner_id: i64,
        state: StateFilter,
        from: i64,
        size: i64,
        now: NaiveDateTime,
    ) -> AppResult<Vec<BookingView>> {
        self.find_user(owner_id).await?;
        let page = Self::page(from, size)?;
        let window = state.window(now);
        let bookings = self
            .repository
            .bookings
            .list_for_owner(owner_id, &window, page)
            .await?;
        Ok(bookings.iter().map(BookingView::from).collect())
    }

    /// Batch last/next approved bookings for a set of items.
    ///
    /// Two range queries plus a first-wins reduction over rows the store
    /// pre-orders per the tie rule, so the cost stays linear in items and
    /// rows instead of one query per item.
    pub async fn nearest_bookings(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<NearestBookings> {
        if item_ids.is_empty() {
            return Ok(NearestBookings::default());
        }

        let mut nearest = NearestBookings::default();
        for booking in self.repository.bookings.last_for_items(item_ids, now).await? {
            nearest
                .last
                .entry(booking.item.id)
                .or_insert_with(|| NearestBooking::from(&booking));
        }
        for booking in self.repository.bookings.next_for_items(item_ids, now).await? {
            nearest
                .next
                .entry(booking.item.id)
                .or_insert_with(|| NearestBooking::from(&booking));
        }
        Ok(nearest)
    }

    /// Whether the user completed an approved booking of the item before
    /// `now`. Gates item comments.
    pub async fn has_finished_booking(
        &self,
        user_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        self.repository
            .bookings
            .has_finished_booking(user_id, item_id, now)
            .await
    }

    async fn ensure_no_approved_overlap(
        &self,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_booking: Option<i64>,
    ) -> AppResult<()> {
        let conflicts = self
            .repository
            .bookings
            .find_overlapping(
                item_id,
                start,
                end,
                &[
                    BookingStatus::Waiting,
                    BookingStatus::Rejected,
                    BookingStatus::Canceled,
                ],
            )
            .await?;
        if conflicts
            .iter()
            .any(|b| Some(b.id) != exclude_booking)
        {
            return Err(AppError::Conflict(format!(
                "Item {item_id} is already booked for this period"
            )));
        }
        Ok(())
    }

    fn page(from: i64, size: i64) -> AppResult<Page> {
        Page::from_offset(from, size).ok_or_else(|| {
            AppError::Validation(format!("Invalid page request: from={from}, size={size}"))
        })
    }

    async fn find_user(&self, id: i64) -> AppResult<User> {
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

    async fn find_booking(&self, id: i64) -> AppResult<Booking> {
        self.repository
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {id} not found")))
    }
}
