//! API handlers for ShareLoop REST endpoints

pub mod bookings;
pub mod health;
pub mod items;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Header carrying the caller's identity. The gateway in front of this
/// service authenticates the user and forwards only the id.
pub const USER_ID_HEADER: &str = "X-Sharer-User-Id";

/// Extractor for the trusted caller-supplied user id
pub struct SharerId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for SharerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Validation(format!("Missing {USER_ID_HEADER} header"))
            })?;

        let id = value.parse::<i64>().map_err(|_| {
            AppError::Validation(format!("Invalid {USER_ID_HEADER} header: {value}"))
        })?;

        Ok(SharerId(id))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings", get(bookings::bookings_for_user))
        .route("/bookings/owner", get(bookings::bookings_for_owner))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id", patch(bookings::approve_booking))
        // Items (catalog views)
        .route("/items", get(items::items_for_owner))
        .route("/items/:id", get(items::get_item))
        .route("/items/:id/comment", post(items::add_comment))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .merge(api)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
