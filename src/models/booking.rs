//! Booking records, state machine vocabulary and read models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::item::ItemRef;
use super::user::UserRef;

/// Approval status of a booking.
///
/// Every booking starts as `Waiting` and is moved to `Approved` or
/// `Rejected` by the item's owner. `Canceled` is part of the persisted
/// vocabulary but reserved: no operation currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "WAITING" => Some(BookingStatus::Waiting),
            "APPROVED" => Some(BookingStatus::Approved),
            "REJECTED" => Some(BookingStatus::Rejected),
            "CANCELED" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }
}

/// Hydrated booking record as returned by the store: booker and item come
/// back with the names and ownership needed for views and access checks.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
    pub item: ItemRef,
    pub booker: UserRef,
}

/// New booking waiting to be persisted. Always enters the store as
/// `Waiting`; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub item: ItemRef,
    pub booker: UserRef,
}

/// Booking creation request: `{itemId, start, end}`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub item_id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// `{id, name}` item projection on the wire
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemBrief {
    pub id: i64,
    pub name: String,
}

/// Booking response DTO. Timestamps serialize as ISO-8601 local date-time
/// without an offset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingView {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
    pub booker: UserRef,
    pub item: ItemBrief,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            start: booking.start,
            end: booking.end,
            status: booking.status,
            booker: booking.booker.clone(),
            item: ItemBrief {
                id: booking.item.id,
                name: booking.item.name.clone(),
            },
        }
    }
}

/// Minimal projection of an approved booking handed to the catalog when it
/// renders item details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearestBooking {
    pub id: i64,
    pub booker_id: i64,
}

impl From<&Booking> for NearestBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            booker_id: booking.booker.id,
        }
    }
}

/// State filter tokens accepted by the listing endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl StateFilter {
    /// Parses a state token, case-insensitively.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "ALL" => Some(StateFilter::All),
            "CURRENT" => Some(StateFilter::Current),
            "PAST" => Some(StateFilter::Past),
            "FUTURE" => Some(StateFilter::Future),
            "WAITING" => Some(StateFilter::Waiting),
            "REJECTED" => Some(StateFilter::Rejected),
            _ => None,
        }
    }

    /// Resolves the filter against a reference time into the predicate the
    /// store evaluates. `now` is captured once per request so a listing is
    /// consistent across its page.
    pub fn window(self, now: NaiveDateTime) -> BookingWindow {
        match self {
            StateFilter::All => BookingWindow::All,
            StateFilter::Current => BookingWindow::Current(now),
            StateFilter::Past => BookingWindow::Past(now),
            StateFilter::Future => BookingWindow::Future(now),
            StateFilter::Waiting => BookingWindow::Status(BookingStatus::Waiting),
            StateFilter::Rejected => BookingWindow::Status(BookingStatus::Rejected),
        }
    }
}

/// Resolved listing predicate with the reference time baked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingWindow {
    All,
    /// `start < now < end`
    Current(NaiveDateTime),
    /// `end < now`
    Past(NaiveDateTime),
    /// `now < start`
    Future(NaiveDateTime),
    Status(BookingStatus),
}

impl BookingWindow {
    pub fn matches(&self, booking: &Booking) -> bool {
        match *self {
            BookingWindow::All => true,
            BookingWindow::Current(now) => booking.start < now && now < booking.end,
            BookingWindow::Past(now) => booking.end < now,
            BookingWindow::Future(now) => now < booking.start,
            BookingWindow::Status(status) => booking.status == status,
        }
    }
}

/// Conflict-enforcement policy applied when a booking is created.
///
/// Both behaviors exist in the wild for this domain: `advisory` leaves
/// overlap resolution to the approving owner, `strict` rejects a creation
/// that overlaps an approved booking of the same item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Advisory,
    Strict,
}

/// Page request translated from an `from`/`size` offset pair.
///
/// The store pages by page number, so the offset snaps to a page boundary
/// via `from / size`. A non-multiple `from` silently coarsens; inherited
/// behavior, kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    pub fn from_offset(from: i64, size: i64) -> Option<Self> {
        if from < 0 || size < 1 {
            return None;
        }
        Some(Self {
            number: from / size,
            size,
        })
    }

    pub fn offset(&self) -> i64 {
        self.number * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn booking(start: NaiveDateTime, end: NaiveDateTime, status: BookingStatus) -> Booking {
        Booking {
            id: 1,
            start,
            end,
            status,
            item: ItemRef {
                id: 10,
                name: "Drill".to_string(),
                owner_id: 2,
            },
            booker: UserRef {
                id: 3,
                name: "Maya".to_string(),
            },
        }
    }

    #[test]
    fn state_filter_parses_case_insensitively() {
        assert_eq!(StateFilter::parse("ALL"), Some(StateFilter::All));
        assert_eq!(StateFilter::parse("current"), Some(StateFilter::Current));
        assert_eq!(StateFilter::parse("Waiting"), Some(StateFilter::Waiting));
        assert_eq!(StateFilter::parse("rejected"), Some(StateFilter::Rejected));
        assert_eq!(StateFilter::parse("UNKNOWN"), None);
        assert_eq!(StateFilter::parse(""), None);
    }

    #[test]
    fn current_window_requires_strictly_inside() {
        let b = booking(at(10, 9), at(10, 17), BookingStatus::Waiting);
        assert!(BookingWindow::Current(at(10, 12)).matches(&b));
        // boundaries are excluded
        assert!(!BookingWindow::Current(at(10, 9)).matches(&b));
        assert!(!BookingWindow::Current(at(10, 17)).matches(&b));
    }

    #[test]
    fn past_and_future_windows_are_strict() {
        let b = booking(at(10, 9), at(10, 17), BookingStatus::Approved);
        assert!(BookingWindow::Past(at(11, 0)).matches(&b));
        assert!(!BookingWindow::Past(at(10, 17)).matches(&b));
        assert!(BookingWindow::Future(at(10, 8)).matches(&b));
        assert!(!BookingWindow::Future(at(10, 9)).matches(&b));
    }

    #[test]
    fn status_window_matches_exactly() {
        let b = booking(at(10, 9), at(10, 17), BookingStatus::Rejected);
        assert!(BookingWindow::Status(BookingStatus::Rejected).matches(&b));
        assert!(!BookingWindow::Status(BookingStatus::Waiting).matches(&b));
    }

    #[test]
    fn page_snaps_offset_to_page_boundary() {
        let page = Page::from_offset(0, 10).unwrap();
        assert_eq!((page.number, page.offset()), (0, 0));

        let page = Page::from_offset(20, 10).unwrap();
        assert_eq!((page.number, page.offset()), (2, 20));

        // non-multiple offset snaps down
        let page = Page::from_offset(7, 5).unwrap();
        assert_eq!((page.number, page.offset()), (1, 5));
    }

    #[test]
    fn page_rejects_invalid_arguments() {
        assert_eq!(Page::from_offset(-1, 10), None);
        assert_eq!(Page::from_offset(0, 0), None);
        assert_eq!(Page::from_offset(0, -3), None);
    }

    #[test]
    fn booking_status_round_trips_through_text() {
        for status in [
            BookingStatus::Waiting,
            BookingStatus::Approved,
            BookingStatus::Rejected,
            BookingStatus::Canceled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("PENDING"), None);
    }

    #[test]
    fn timestamps_serialize_without_offset() {
        let view = BookingView::from(&booking(at(10, 9), at(10, 17), BookingStatus::Waiting));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["start"], "2024-06-10T09:00:00");
        assert_eq!(json["end"], "2024-06-10T17:00:00");
        assert_eq!(json["status"], "WAITING");
        assert_eq!(json["item"]["name"], "Drill");
        assert_eq!(json["booker"]["id"], 3);
    }
}
