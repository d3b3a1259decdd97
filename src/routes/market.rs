//! Market data route definitions

use axum::Router;

use crate::handlers::*;
use crate::state::AppState;

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/price", axum::routing::get(get_price))
        .route("/api/simulator", axum::routing::get(simulate))
}
