//! Notification and transaction route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications",
            axum::routing::get(list_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            axum::routing::post(mark_notification_read),
        )
        .route(
            "/api/transactions",
            axum::routing::get(list_transactions),
        )
}
