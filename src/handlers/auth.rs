//! Demo authentication handlers
//!
//! There is exactly one demo credential pair and no real session token;
//! logging in wipes every session-scoped collection and seeds the demo
//! user, logging out wipes them again. The last observed BTC price
//! survives both.

use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{ApiResponse, KycStatus, LoginRequest, User};
use crate::store::SessionStore;

const DEMO_EMAIL: &str = "demo@pledg.in";
const DEMO_PASSWORD: &str = "demo1234";

/// POST /api/auth/login - Demo login, resets the session
pub async fn login(
    State(store): State<Arc<SessionStore>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    request.validate()?;

    if request.email != DEMO_EMAIL || request.password != DEMO_PASSWORD {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    store.reset().await;

    let user = User {
        id: "user-123".to_string(),
        email: request.email,
        name: "Demo User".to_string(),
        kyc_verified: false,
        kyc_status: KycStatus::None,
        phone_number: Some("9876543210".to_string()),
    };

    let logged_in = user.clone();
    store
        .mutate(|state| {
            state.user = Some(user);
            state.is_authenticated = true;
        })
        .await;

    tracing::info!(user_id = %logged_in.id, "User logged in");

    Ok(Json(ApiResponse::ok(logged_in)))
}

/// POST /api/auth/logout - Clears the session
pub async fn logout(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    store.reset().await;
    tracing::info!("User logged out");
    Ok(Json(ApiResponse::ok(())))
}

/// GET /api/auth/me - Current session user
pub async fn current_user(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = store
        .read(|state| state.user.clone())
        .await
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;
    Ok(Json(ApiResponse::ok(user)))
}
