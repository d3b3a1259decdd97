//! Onboarding route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route("/api/kyc", axum::routing::post(submit_kyc))
        .route("/api/kyc/status", axum::routing::get(kyc_status))
        .route(
            "/api/bank-accounts",
            axum::routing::post(link_bank_account).get(list_bank_accounts),
        )
        .route(
            "/api/bank-accounts/status",
            axum::routing::get(bank_link_status),
        )
        .route("/api/eligibility", axum::routing::get(get_eligibility))
}
