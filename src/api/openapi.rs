//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, health, items};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ShareLoop API",
        version = "1.0.0",
        description = "Peer-to-peer item sharing REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Bookings
        bookings::create_booking,
        bookings::approve_booking,
        bookings::get_booking,
        bookings::bookings_for_user,
        bookings::bookings_for_owner,
        // Items
        items::items_for_owner,
        items::get_item,
        items::add_comment,
    ),
    components(
        schemas(
            // Bookings
            crate::models::booking::BookingStatus,
            crate::models::booking::BookingView,
            crate::models::booking::CreateBookingRequest,
            crate::models::booking::ItemBrief,
            crate::models::booking::NearestBooking,
            // Items
            crate::models::item::ItemView,
            crate::models::item::CommentView,
            crate::models::item::CreateCommentRequest,
            // Users
            crate::models::user::UserRef,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "bookings", description = "Booking requests and approvals"),
        (name = "items", description = "Catalog views and comments")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
