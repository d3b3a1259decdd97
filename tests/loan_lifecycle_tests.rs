//! Loan Lifecycle Tests
//!
//! These tests drive the loan state machine end to end: application with
//! the eligibility gate, collateral sizing at the origination LTV, the
//! deposit and disbursement transitions, and repayment down to closure.

use std::sync::Arc;

use pledg_server::error::LendingError;
use pledg_server::loans::LoanService;
use pledg_server::models::{LoanApplicationRequest, LoanStatus, TransactionType};
use pledg_server::store::SessionStore;

fn request(amount: f64, tenure_months: u32) -> LoanApplicationRequest {
    LoanApplicationRequest {
        amount,
        tenure_months,
        purpose: Some("Personal".to_string()),
    }
}

fn setup() -> (Arc<SessionStore>, LoanService) {
    let store = Arc::new(SessionStore::in_memory());
    let service = LoanService::new(store.clone());
    (store, service)
}

// ============================================================================
// Application
// ============================================================================

#[tokio::test]
async fn test_application_scenario_from_reference() {
    // 50,000 INR at 7,200,000 INR/BTC sizes 0.013889 BTC at 50% LTV
    let (_, service) = setup();
    let loan = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, true)
        .await
        .unwrap();

    assert!((loan.btc_collateral - 0.013889).abs() < 1e-6);
    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.ltv, 50.0);
    assert_eq!(loan.interest_rate, 14.0);
}

#[tokio::test]
async fn test_application_requires_eligibility() {
    let (_, service) = setup();
    let err = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, false)
        .await
        .unwrap_err();
    assert!(matches!(err, LendingError::Eligibility(_)));
}

#[tokio::test]
async fn test_application_enforces_minimum_amount_and_tenure() {
    let (_, service) = setup();

    assert!(service
        .apply("user-123", &request(10_000.0, 1), 7_200_000.0, true)
        .await
        .is_ok());
    assert!(matches!(
        service
            .apply("user-123", &request(9_999.99, 1), 7_200_000.0, true)
            .await,
        Err(LendingError::InvalidAmount(_))
    ));
    assert!(matches!(
        service
            .apply("user-123", &request(10_000.0, 13), 7_200_000.0, true)
            .await,
        Err(LendingError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_application_refuses_dead_price_feed_value() {
    // Collateral sizing must never divide by zero
    let (_, service) = setup();
    assert!(matches!(
        service
            .apply("user-123", &request(50_000.0, 12), 0.0, true)
            .await,
        Err(LendingError::InvalidInput(_))
    ));
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn test_full_lifecycle_to_closure() {
    let (store, service) = setup();
    let loan = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, true)
        .await
        .unwrap();

    let loan = service.confirm_collateral_deposit(&loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Disbursing);

    let loan = service.confirm_disbursement(&loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    assert!(loan.disbursement_date.is_some());
    assert!(loan.maturity_date.is_some());

    let loan = service.repay(&loan.id, 50_000.0).await.unwrap();
    assert_eq!(loan.amount, 0.0);
    assert_eq!(loan.status, LoanStatus::Closed);

    // Disbursement and repayment both hit the ledger
    let transactions = store.read(|s| s.transactions.clone()).await;
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].transaction_type, TransactionType::Repayment);
    assert_eq!(
        transactions[1].transaction_type,
        TransactionType::Disbursement
    );
}

#[tokio::test]
async fn test_transitions_reject_wrong_source_state() {
    let (_, service) = setup();
    let loan = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, true)
        .await
        .unwrap();

    // Cannot disburse a loan whose deposit was never confirmed
    assert!(matches!(
        service.confirm_disbursement(&loan.id).await,
        Err(LendingError::InvalidTransition(_))
    ));

    service.confirm_collateral_deposit(&loan.id).await.unwrap();

    // Re-confirming the deposit is refused, the first transition stands
    assert!(matches!(
        service.confirm_collateral_deposit(&loan.id).await,
        Err(LendingError::InvalidTransition(_))
    ));
    assert_eq!(
        service.get(&loan.id).await.unwrap().status,
        LoanStatus::Disbursing
    );
}

#[tokio::test]
async fn test_transitions_on_unknown_loan() {
    let (_, service) = setup();
    assert!(matches!(
        service.confirm_collateral_deposit("LN-nope").await,
        Err(LendingError::NotFound(_))
    ));
    assert!(matches!(
        service.repay("LN-nope", 1_000.0).await,
        Err(LendingError::NotFound(_))
    ));
}

// ============================================================================
// Repayment
// ============================================================================

#[tokio::test]
async fn test_repayment_boundaries() {
    let (_, service) = setup();
    let loan = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, true)
        .await
        .unwrap();
    service.confirm_collateral_deposit(&loan.id).await.unwrap();
    service.confirm_disbursement(&loan.id).await.unwrap();

    // Overpayment fails and leaves the loan unchanged
    let err = service.repay(&loan.id, 60_000.0).await.unwrap_err();
    assert!(matches!(err, LendingError::InvalidAmount(_)));
    let unchanged = service.get(&loan.id).await.unwrap();
    assert_eq!(unchanged.amount, 50_000.0);
    assert_eq!(unchanged.status, LoanStatus::Active);

    // Exact payoff closes at exactly zero
    let closed = service.repay(&loan.id, 50_000.0).await.unwrap();
    assert_eq!(closed.amount, 0.0);
    assert_eq!(closed.status, LoanStatus::Closed);
}

#[tokio::test]
async fn test_repayment_does_not_touch_collateral() {
    let (_, service) = setup();
    let loan = service
        .apply("user-123", &request(50_000.0, 12), 7_200_000.0, true)
        .await
        .unwrap();
    let pledged = loan.btc_collateral;
    service.confirm_collateral_deposit(&loan.id).await.unwrap();
    service.confirm_disbursement(&loan.id).await.unwrap();

    service.repay(&loan.id, 50_000.0).await.unwrap();
    let closed = service.get(&loan.id).await.unwrap();
    assert_eq!(closed.btc_collateral, pledged);
}

// ============================================================================
// Quote
// ============================================================================

#[test]
fn test_quote_flat_pro_rata_interest() {
    let quote = LoanService::quote(50_000.0, 12, 7_200_000.0).unwrap();
    assert!((quote.total_repayment - 57_000.0).abs() < 1e-9);
    assert!((quote.required_collateral_btc - 0.013889).abs() < 1e-9);

    let half_year = LoanService::quote(50_000.0, 6, 7_200_000.0).unwrap();
    assert!((half_year.total_repayment - 53_500.0).abs() < 1e-9);
}
