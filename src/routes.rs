use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/dealers/:dealer_id/slots",
            get(handlers::slots::list_slots).post(handlers::slots::create_slot),
        )
        .route(
            "/api/dealers/:dealer_id/slots/available",
            get(handlers::slots::list_available_slots),
        )
        .route(
            "/api/dealers/:dealer_id/slots/:slot_id",
            delete(handlers::slots::delete_slot),
        )
        .route(
            "/api/dealers/:dealer_id/bookings",
            get(handlers::bookings::dealer_bookings).post(handlers::bookings::staff_book),
        )
        .route("/api/slots/:slot_id", get(handlers::slots::get_slot))
        .route(
            "/api/slots/:slot_id/bookings",
            get(handlers::bookings::slot_bookings).post(handlers::bookings::book_slot),
        )
        .route("/api/bookings", post(handlers::bookings::book_direct))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_status),
        )
        .route(
            "/api/customers/:customer_id/bookings",
            get(handlers::bookings::customer_bookings),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
