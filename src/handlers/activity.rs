//! Notification and transaction handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{ApiResponse, Notification, Transaction};
use crate::store::SessionStore;

/// GET /api/notifications - All notifications, newest first
pub async fn list_notifications(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = store.read(|state| state.notifications.clone()).await;
    Ok(Json(ApiResponse::ok(notifications)))
}

/// POST /api/notifications/:id/read - Mark every notification with this
/// identity as read. Repeated risk alerts share an id, so one action
/// clears the whole stack.
pub async fn mark_notification_read(
    State(store): State<Arc<SessionStore>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<usize>>, ApiError> {
    let marked = store
        .mutate(|state| {
            let mut marked = 0;
            for notification in state.notifications.iter_mut().filter(|n| n.id == id) {
                notification.read = true;
                marked += 1;
            }
            marked
        })
        .await;

    if marked == 0 {
        return Err(ApiError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(Json(ApiResponse::ok(marked)))
}

/// GET /api/transactions - Ledger entries, newest first
pub async fn list_transactions(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, ApiError> {
    let transactions = store.read(|state| state.transactions.clone()).await;
    Ok(Json(ApiResponse::ok(transactions)))
}
