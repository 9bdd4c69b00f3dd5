//! Booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    models::booking::{BookingView, CreateBookingRequest, StateFilter},
};

use super::SharerId;

/// Listing query: state filter plus offset pagination
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListBookingsQuery {
    /// One of ALL, CURRENT, PAST, FUTURE, WAITING, REJECTED (any case)
    pub state: Option<String>,
    /// Zero-based offset into the ordered result
    pub from: Option<i64>,
    /// Page length
    pub size: Option<i64>,
}

impl ListBookingsQuery {
    fn state_filter(&self) -> AppResult<StateFilter> {
        let token = self.state.as_deref().unwrap_or("ALL");
        StateFilter::parse(token)
            .ok_or_else(|| AppError::Validation(format!("Unknown state: {token}")))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ApproveQuery {
    pub approved: bool,
}

/// Create a booking request for an item
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id")
    ),
    responses(
        (status = 201, description = "Booking created", body = BookingView),
        (status = 400, description = "Invalid time range"),
        (status = 404, description = "User or item not found"),
        (status = 409, description = "Item unavailable or period already booked")
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    SharerId(booker_id): SharerId,
    Json(request): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingView>)> {
    let booking = state
        .services
        .bookings
        .create_booking(booker_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Approve or reject a booking of an owned item
#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ("id" = i64, Path, description = "Booking ID"),
        ApproveQuery
    ),
    responses(
        (status = 200, description = "Decision recorded", body = BookingView),
        (status = 404, description = "Booking not found or caller is not the owner"),
        (status = 409, description = "Already approved or period already booked")
    )
)]
pub async fn approve_booking(
    State(state): State<crate::AppState>,
    SharerId(owner_id): SharerId,
    Path(booking_id): Path<i64>,
    Query(query): Query<ApproveQuery>,
) -> AppResult<Json<BookingView>> {
    let booking = state
        .services
        .bookings
        .approve_booking(owner_id, booking_id, query.approved)
        .await?;
    Ok(Json(booking))
}

/// Get a booking, visible to its booker and the item's owner
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ("id" = i64, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "The booking", body = BookingView),
        (status = 404, description = "Booking not found or not visible to the caller")
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    SharerId(user_id): SharerId,
    Path(booking_id): Path<i64>,
) -> AppResult<Json<BookingView>> {
    let booking = state
        .services
        .bookings
        .get_booking(user_id, booking_id)
        .await?;
    Ok(Json(booking))
}

/// List the caller's bookings, newest start first
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ListBookingsQuery
    ),
    responses(
        (status = 200, description = "Bookings made by the caller", body = Vec<BookingView>),
        (status = 400, description = "Unknown state token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn bookings_for_user(
    State(state): State<crate::AppState>,
    SharerId(user_id): SharerId,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<Vec<BookingView>>> {
    let filter = query.state_filter()?;
    let now = Utc::now().naive_utc();
    let bookings = state
        .services
        .bookings
        .bookings_for_user(
            user_id,
            filter,
            query.from.unwrap_or(0),
            query.size.unwrap_or(10),
            now,
        )
        .await?;
    Ok(Json(bookings))
}

/// List bookings of the caller's items, newest start first
#[utoipa::path(
    get,
    path = "/bookings/owner",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Acting user id"),
        ListBookingsQuery
    ),
    responses(
        (status = 200, description = "Bookings of the caller's items", body = Vec<BookingView>),
        (status = 400, description = "Unknown state token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn bookings_for_owner(
    State(state): State<crate::AppState>,
    SharerId(owner_id): SharerId,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<Vec<BookingView>>> {
    let filter = query.state_filter()?;
    let now = Utc::now().naive_utc();
    let bookings = state
        .services
        .bookings
        .bookings_for_owner(
            owner_id,
            filter,
            query.from.unwrap_or(0),
            query.size.unwrap_or(10),
            now,
        )
        .await?;
    Ok(Json(bookings))
}
