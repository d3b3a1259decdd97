//! Onboarding handlers: KYC verification and bank account linking

use axum::{extract::State, Json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::flows::FlowProgress;
use crate::models::{ApiResponse, BankAccount, BankLinkRequest, KycSubmissionRequest};
use crate::onboarding::{Eligibility, OnboardingService, BANK_FLOW_KEY, KYC_FLOW_KEY};
use crate::store::SessionStore;

/// POST /api/kyc - Submit KYC documents, starts the verification flow
pub async fn submit_kyc(
    State(onboarding): State<Arc<OnboardingService>>,
    Json(request): Json<KycSubmissionRequest>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    request.validate()?;
    onboarding.submit_kyc(&request).await?;
    Ok(Json(ApiResponse::ok(KYC_FLOW_KEY)))
}

/// GET /api/kyc/status - Progress of the running KYC flow
pub async fn kyc_status(
    State(onboarding): State<Arc<OnboardingService>>,
) -> Result<Json<ApiResponse<FlowProgress>>, ApiError> {
    let status = onboarding
        .flow_status(KYC_FLOW_KEY)
        .ok_or_else(|| ApiError::NotFound("No KYC verification in progress".to_string()))?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/bank-accounts - Link a bank account via simulated penny drop
pub async fn link_bank_account(
    State(onboarding): State<Arc<OnboardingService>>,
    Json(request): Json<BankLinkRequest>,
) -> Result<Json<ApiResponse<Uuid>>, ApiError> {
    request.validate()?;
    let account_id = onboarding.link_bank_account(&request).await?;
    Ok(Json(ApiResponse::ok(account_id)))
}

/// GET /api/bank-accounts - Linked bank accounts
pub async fn list_bank_accounts(
    State(store): State<Arc<SessionStore>>,
) -> Result<Json<ApiResponse<Vec<BankAccount>>>, ApiError> {
    let accounts = store.read(|state| state.bank_accounts.clone()).await;
    Ok(Json(ApiResponse::ok(accounts)))
}

/// GET /api/bank-accounts/status - Progress of the running penny drop
pub async fn bank_link_status(
    State(onboarding): State<Arc<OnboardingService>>,
) -> Result<Json<ApiResponse<FlowProgress>>, ApiError> {
    let status = onboarding
        .flow_status(BANK_FLOW_KEY)
        .ok_or_else(|| ApiError::NotFound("No bank verification in progress".to_string()))?;
    Ok(Json(ApiResponse::ok(status)))
}

/// GET /api/eligibility - The pair gating loan applications
pub async fn get_eligibility(
    State(onboarding): State<Arc<OnboardingService>>,
) -> Result<Json<ApiResponse<Eligibility>>, ApiError> {
    Ok(Json(ApiResponse::ok(onboarding.eligibility().await)))
}
