//! Loan route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/loans",
            axum::routing::get(list_loans).post(apply_loan),
        )
        .route("/api/loans/quote", axum::routing::get(quote_loan))
        .route("/api/loans/:id", axum::routing::get(get_loan))
        .route(
            "/api/loans/:id/deposit",
            axum::routing::post(deposit_collateral),
        )
        .route(
            "/api/loans/:id/deposit/status",
            axum::routing::get(deposit_status),
        )
        .route("/api/loans/:id/repay", axum::routing::post(repay_loan))
}
