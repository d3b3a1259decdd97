//! Market data handlers: current price and the LTV/price simulator

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::ltv::simulator::{PriceSimulator, Simulation};
use crate::models::{ApiResponse, SimulationQuery};
use crate::store::SessionStore;

/// Current BTC price response
#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub btc_inr: f64,
}

/// GET /api/price - Last observed BTC/INR price
pub async fn get_price(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<PriceResponse>>, ApiError> {
    let btc_inr = store.btc_price().await;
    Ok(Json(ApiResponse::ok(PriceResponse { btc_inr })))
}

/// GET /api/simulator?price=... | ?ltv=... - What-if position
///
/// The simulator is anchored at the current market price and never touches
/// loan state. Exactly one of the two parameters drives the computation.
pub async fn simulate(
    State(store): State<Arc<SessionStore>>,
    Query(query): Query<SimulationQuery>,
) -> Result<Json<ApiResponse<Simulation>>, ApiError> {
    let base_price = store.btc_price().await;
    let simulator = PriceSimulator::new(base_price)?;

    let simulation = match (query.price, query.ltv) {
        (Some(price), None) => simulator.simulate_price(price)?,
        (None, Some(ltv)) => simulator.simulate_ltv(ltv)?,
        _ => {
            return Err(ApiError::BadRequest(
                "Provide exactly one of `price` or `ltv`".to_string(),
            ))
        }
    };

    Ok(Json(ApiResponse::ok(simulation)))
}
