//! Loan lifecycle handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::flows::{FlowOutcome, FlowProgress, StagedFlow};
use crate::loans::{LoanQuote, LoanService};
use crate::models::{ApiResponse, Loan, LoanApplicationRequest, LoanStatus, RepaymentRequest};
use crate::state::AppState;

/// Query for the prospective-loan quote endpoint
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub amount: f64,
    pub tenure_months: u32,
}

/// GET /api/loans - All loans of the session
pub async fn list_loans(
    State(loans): State<Arc<LoanService>>,
) -> Result<Json<ApiResponse<Vec<Loan>>>, ApiError> {
    Ok(Json(ApiResponse::ok(loans.list().await)))
}

/// GET /api/loans/:id - Single loan
pub async fn get_loan(
    State(loans): State<Arc<LoanService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = loans
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", id)))?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// POST /api/loans - Apply for a loan
pub async fn apply_loan(
    State(state): State<AppState>,
    Json(request): Json<LoanApplicationRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    request.validate()?;

    let user_id = state
        .store
        .read(|s| s.user.as_ref().map(|u| u.id.clone()))
        .await
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    let eligibility = state.onboarding.eligibility().await;
    let price = state.store.btc_price().await;

    let loan = state
        .loan_service
        .apply(&user_id, &request, price, eligibility.is_eligible())
        .await?;

    Ok(Json(ApiResponse::ok(loan)))
}

/// GET /api/loans/quote - Terms for a prospective loan, nothing created
pub async fn quote_loan(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<ApiResponse<LoanQuote>>, ApiError> {
    if !(1..=12).contains(&query.tenure_months) {
        return Err(ApiError::BadRequest(
            "tenure must be between 1 and 12 months".to_string(),
        ));
    }
    let price = state.store.btc_price().await;
    let quote = LoanService::quote(query.amount, query.tenure_months, price)?;
    Ok(Json(ApiResponse::ok(quote)))
}

/// POST /api/loans/:id/deposit - Simulate the collateral deposit.
///
/// Starts the deposit-detection flow; when it completes the loan moves to
/// Disbursing, the disbursement flow runs, and the loan lands in Active.
/// Progress is polled via the deposit status endpoint.
pub async fn deposit_collateral(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let loan = state
        .loan_service
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", id)))?;
    if loan.status != LoanStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Loan {} is not awaiting a collateral deposit",
            id
        )));
    }

    let key = format!("loan:{}", id);
    if state
        .flow_tracker
        .status(&key)
        .is_some_and(|p| p.state == crate::flows::FlowState::Running)
    {
        return Err(ApiError::Conflict(format!(
            "A deposit is already being processed for loan {}",
            id
        )));
    }

    let deposit = StagedFlow::collateral_deposit();
    let (progress_tx, progress_rx, _cancel_tx, _cancel_rx) = deposit.channels();
    state.flow_tracker.register(key.clone(), progress_rx);

    let loans = state.loan_service.clone();
    let tracker = state.flow_tracker.clone();
    let time_scale = state.config.flow_time_scale;
    let mut shutdown = state.shutdown.clone();
    let flow_key = key.clone();
    tokio::spawn(async move {
        if deposit.run(time_scale, &progress_tx, &mut shutdown).await
            != FlowOutcome::Completed
        {
            return;
        }
        if let Err(e) = loans.confirm_collateral_deposit(&id).await {
            tracing::error!(loan_id = %id, error = %e, "Deposit confirmation failed");
            return;
        }

        let disbursement = StagedFlow::disbursement();
        let (progress_tx, progress_rx, _cancel_tx, _cancel_rx) = disbursement.channels();
        tracker.register(flow_key, progress_rx);
        if disbursement
            .run(time_scale, &progress_tx, &mut shutdown)
            .await
            != FlowOutcome::Completed
        {
            return;
        }
        if let Err(e) = loans.confirm_disbursement(&id).await {
            tracing::error!(loan_id = %id, error = %e, "Disbursement failed");
        }
    });

    Ok(Json(ApiResponse::ok(key)))
}

/// GET /api/loans/:id/deposit/status - Progress of the deposit flow
pub async fn deposit_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FlowProgress>>, ApiError> {
    let status = state
        .flow_tracker
        .status(&format!("loan:{}", id))
        .ok_or_else(|| ApiError::NotFound(format!("No deposit in progress for loan {}", id)))?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/loans/:id/repay - Apply a repayment
pub async fn repay_loan(
    State(loans): State<Arc<LoanService>>,
    Path(id): Path<String>,
    Json(request): Json<RepaymentRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    request.validate()?;
    let loan = loans.repay(&id, request.amount).await?;
    Ok(Json(ApiResponse::ok(loan)))
}
