//! Booking store for database operations

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingDraft, BookingStatus, BookingWindow, Page},
        item::ItemRef,
        user::UserRef,
    },
};

/// Booking persistence contract consumed by the engine and the aggregator.
///
/// Records come back hydrated: the booker and the item carry the names and
/// the owner id the engine needs for views and access checks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persists a new booking with status `Waiting` and returns it with its
    /// assigned id.
    async fn create(&self, draft: &BookingDraft) -> AppResult<Booking>;

    async fn get(&self, id: i64) -> AppResult<Option<Booking>>;

    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<()>;

    /// Bookings made by one user matching `window`, ordered by start
    /// descending.
    async fn list_for_booker(
        &self,
        booker_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>>;

    /// Bookings of items owned by one user matching `window`, ordered by
    /// start descending.
    async fn list_for_owner(
        &self,
        owner_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>>;

    /// Bookings of one item intersecting `[start, end)` whose status is not
    /// in `exclude`.
    async fn find_overlapping(
        &self,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: &[BookingStatus],
    ) -> AppResult<Vec<Booking>>;

    /// Approved bookings of the given items with `start < now`, ordered by
    /// start descending then end descending, so the first row per item is
    /// that item's last booking.
    async fn last_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>>;

    /// Approved bookings of the given items with `start >= now`, ordered by
    /// start ascending then end ascending, so the first row per item is
    /// that item's next booking.
    async fn next_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>>;

    /// Whether the user holds an approved booking of the item that ended
    /// before `now`.
    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool>;
}

const SELECT_BOOKING: &str = r#"
SELECT b.id, b.start_date, b.end_date, b.status,
       b.item_id, i.name AS item_name, i.owner_id,
       b.booker_id, u.name AS booker_name
FROM bookings b
JOIN items i ON b.item_id = i.id
JOIN users u ON b.booker_id = u.id
"#;

fn booking_from_row(row: &PgRow) -> AppResult<Booking> {
    let status: String = row.try_get("status")?;
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| AppError::Internal(format!("Unknown booking status in store: {status}")))?;

    Ok(Booking {
        id: row.try_get("id")?,
        start: row.try_get("start_date")?,
        end: row.try_get("end_date")?,
        status,
        item: ItemRef {
            id: row.try_get("item_id")?,
            name: row.try_get("item_name")?,
            owner_id: row.try_get("owner_id")?,
        },
        booker: UserRef {
            id: row.try_get("booker_id")?,
            name: row.try_get("booker_name")?,
        },
    })
}

#[derive(Clone)]
pub struct PgBookingStore {
    pool: Pool<Postgres>,
}

impl PgBookingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn list_page(
        &self,
        scope: &str,
        id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>> {
        let (clause, time_bind, status_bind) = match window {
            BookingWindow::All => ("", None, None),
            BookingWindow::Current(now) => {
                (" AND b.start_date < $4 AND b.end_date > $4", Some(*now), None)
            }
            BookingWindow::Past(now) => (" AND b.end_date < $4", Some(*now), None),
            BookingWindow::Future(now) => (" AND b.start_date > $4", Some(*now), None),
            BookingWindow::Status(status) => (" AND b.status = $4", None, Some(status.as_str())),
        };

        let sql = format!(
            "{SELECT_BOOKING} WHERE {scope} = $1{clause} \
             ORDER BY b.start_date DESC LIMIT $2 OFFSET $3"
        );

        let mut query = sqlx::query(&sql).bind(id).bind(page.size).bind(page.offset());
        if let Some(time) = time_bind {
            query = query.bind(time);
        }
        if let Some(status) = status_bind {
            query = query.bind(status);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(booking_from_row).collect()
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, draft: &BookingDraft) -> AppResult<Booking> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(draft.start)
        .bind(draft.end)
        .bind(draft.item.id)
        .bind(draft.booker.id)
        .bind(BookingStatus::Waiting.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(Booking {
            id,
            start: draft.start,
            end: draft.end,
            status: BookingStatus::Waiting,
            item: draft.item.clone(),
            booker: draft.booker.clone(),
        })
    }

    async fn get(&self, id: i64) -> AppResult<Option<Booking>> {
        let sql = format!("{SELECT_BOOKING} WHERE b.id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn set_status(&self, id: i64, status: BookingStatus) -> AppResult<()> {
        sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_booker(
        &self,
        booker_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>> {
        self.list_page("b.booker_id", booker_id, window, page).await
    }

    async fn list_for_owner(
        &self,
        owner_id: i64,
        window: &BookingWindow,
        page: Page,
    ) -> AppResult<Vec<Booking>> {
        self.list_page("i.owner_id", owner_id, window, page).await
    }

    async fn find_overlapping(
        &self,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: &[BookingStatus],
    ) -> AppResult<Vec<Booking>> {
        let excluded: Vec<String> = exclude.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            "{SELECT_BOOKING} \
             WHERE b.item_id = $1 \
               AND b.status <> ALL($2) \
               AND b.start_date < $3 \
               AND b.end_date > $4"
        );
        let rows = sqlx::query(&sql)
            .bind(item_id)
            .bind(&excluded)
            .bind(end)
            .bind(start)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn last_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>> {
        let sql = format!(
            "{SELECT_BOOKING} \
             WHERE b.item_id = ANY($1) \
               AND b.status = 'APPROVED' \
               AND b.start_date < $2 \
             ORDER BY b.start_date DESC, b.end_date DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(item_ids)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn next_for_items(
        &self,
        item_ids: &[i64],
        now: NaiveDateTime,
    ) -> AppResult<Vec<Booking>> {
        let sql = format!(
            "{SELECT_BOOKING} \
             WHERE b.item_id = ANY($1) \
               AND b.status = 'APPROVED' \
               AND b.start_date >= $2 \
             ORDER BY b.start_date, b.end_date"
        );
        let rows = sqlx::query(&sql)
            .bind(item_ids)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn has_finished_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE booker_id = $1
                  AND item_id = $2
                  AND status = 'APPROVED'
                  AND end_date < $3
            )
            "#,
        )
        .bind(booker_id)
        .bind(item_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
