//! Loan service layer - business logic for the loan lifecycle
//!
//! Owns every mutation of the loan collection: application, the collateral
//! deposit / disbursement transitions, repayment, and the LTV write-back
//! used by the risk scan. Collateral is sized once at application time and
//! never changes afterwards; only the derived LTV moves with the market.

use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::LendingError;
use crate::ltv::{
    self, liquidation_price, ANNUAL_INTEREST_RATE, MARGIN_CALL_ALERT_LTV, MIN_LOAN_AMOUNT,
    ORIGINATION_LTV,
};
use crate::models::{
    Currency, Loan, LoanApplicationRequest, LoanStatus, Transaction, TransactionStatus,
    TransactionType,
};
use crate::store::SessionStore;

/// Decimal places the sized BTC collateral is rounded to
const COLLATERAL_DECIMALS: i32 = 6;

/// Quote for a prospective loan, served to the calculator panel
#[derive(Debug, serde::Serialize)]
pub struct LoanQuote {
    pub amount: f64,
    pub tenure_months: u32,
    pub btc_price: f64,
    pub required_collateral_btc: f64,
    pub interest_rate: f64,
    pub total_repayment: f64,
    pub admin_fee: f64,
    pub margin_call_ltv: f64,
    pub liquidation_ltv: f64,
    pub liquidation_price: f64,
}

/// Admin fee: 2% of principal with a fixed floor (₹25-equivalent)
const ADMIN_FEE_PERCENT: f64 = 2.0;
const MIN_ADMIN_FEE: f64 = 25.0 * 87.0;

fn round_collateral(btc: f64) -> f64 {
    let factor = 10f64.powi(COLLATERAL_DECIMALS);
    (btc * factor).round() / factor
}

/// Loan service for managing the loan lifecycle
pub struct LoanService {
    store: Arc<SessionStore>,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Create a loan application.
    ///
    /// The caller passes the eligibility pair it resolved (KYC verified,
    /// verified bank account present); the service refuses creation unless
    /// both hold. Collateral is sized at the 50% origination LTV against the
    /// supplied price and fixed from here on.
    pub async fn apply(
        &self,
        user_id: &str,
        request: &LoanApplicationRequest,
        btc_price: f64,
        eligible: bool,
    ) -> Result<Loan, LendingError> {
        if !eligible {
            return Err(LendingError::Eligibility(
                "KYC and a verified bank account are required before applying".to_string(),
            ));
        }
        if request.amount < MIN_LOAN_AMOUNT {
            return Err(LendingError::InvalidAmount(format!(
                "minimum loan amount is {}, got {}",
                MIN_LOAN_AMOUNT, request.amount
            )));
        }
        if !(1..=12).contains(&request.tenure_months) {
            return Err(LendingError::InvalidInput(format!(
                "tenure must be between 1 and 12 months, got {}",
                request.tenure_months
            )));
        }

        let collateral = round_collateral(ltv::required_collateral(
            request.amount,
            btc_price,
            ORIGINATION_LTV,
        )?);

        let loan = Loan {
            id: Self::new_loan_id(),
            user_id: user_id.to_string(),
            amount: request.amount,
            tenure_months: request.tenure_months,
            interest_rate: ANNUAL_INTEREST_RATE,
            status: LoanStatus::Pending,
            btc_collateral: collateral,
            btc_price_at_disbursement: btc_price,
            ltv: ORIGINATION_LTV * 100.0,
            disbursement_date: None,
            maturity_date: None,
        };

        let created = loan.clone();
        self.store.mutate(|state| state.loans.push(loan)).await;

        tracing::info!(
            loan_id = %created.id,
            amount = created.amount,
            collateral_btc = created.btc_collateral,
            "Loan application created"
        );

        Ok(created)
    }

    /// Human-readable id embedding the current year and a random suffix
    fn new_loan_id() -> String {
        let year = Utc::now().year();
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        format!("LN{}{}", year, suffix)
    }

    /// Quote the terms of a prospective loan without creating anything
    pub fn quote(
        amount: f64,
        tenure_months: u32,
        btc_price: f64,
    ) -> Result<LoanQuote, LendingError> {
        let collateral = round_collateral(ltv::required_collateral(
            amount,
            btc_price,
            ORIGINATION_LTV,
        )?);
        let admin_fee = (amount * ADMIN_FEE_PERCENT / 100.0).max(MIN_ADMIN_FEE);

        Ok(LoanQuote {
            amount,
            tenure_months,
            btc_price,
            required_collateral_btc: collateral,
            interest_rate: ANNUAL_INTEREST_RATE,
            total_repayment: ltv::total_repayment(amount, ANNUAL_INTEREST_RATE, tenure_months),
            admin_fee,
            margin_call_ltv: MARGIN_CALL_ALERT_LTV,
            liquidation_ltv: ltv::LIQUIDATION_ALERT_LTV,
            liquidation_price: liquidation_price(amount, collateral)?,
        })
    }

    /// Collateral deposit confirmed: `Pending -> Disbursing`
    pub async fn confirm_collateral_deposit(&self, loan_id: &str) -> Result<Loan, LendingError> {
        self.transition(loan_id, LoanStatus::Pending, LoanStatus::Disbursing)
            .await
    }

    /// Disbursement confirmed: `Disbursing -> Active`. Stamps disbursement
    /// and maturity dates and records the disbursement in the ledger.
    pub async fn confirm_disbursement(&self, loan_id: &str) -> Result<Loan, LendingError> {
        let loan = self
            .transition(loan_id, LoanStatus::Disbursing, LoanStatus::Active)
            .await?;

        let now = Utc::now();
        let maturity = now + Duration::days(30 * loan.tenure_months as i64);
        let updated = self
            .store
            .mutate(|state| {
                let entry = state.loans.iter_mut().find(|l| l.id == loan.id)?;
                entry.disbursement_date = Some(now);
                entry.maturity_date = Some(maturity);

                state.transactions.insert(
                    0,
                    Transaction {
                        id: format!("tx-{}", Uuid::new_v4()),
                        user_id: entry.user_id.clone(),
                        loan_id: Some(entry.id.clone()),
                        transaction_type: TransactionType::Disbursement,
                        amount: entry.amount,
                        currency: Currency::Inr,
                        status: TransactionStatus::Success,
                        date: now,
                        reference_id: format!("ref-disb-{}", now.timestamp_millis()),
                    },
                );
                Some(entry.clone())
            })
            .await;

        updated.ok_or_else(|| LendingError::NotFound(format!("loan {} not found", loan_id)))
    }

    /// Apply a repayment. The amount must be positive and no larger than
    /// the outstanding principal; the principal is clamped at zero and the
    /// loan closes when it gets there. Collateral is untouched.
    pub async fn repay(&self, loan_id: &str, amount: f64) -> Result<Loan, LendingError> {
        let result = self
            .store
            .mutate(|state| {
                let loan = match state.loans.iter_mut().find(|l| l.id == loan_id) {
                    Some(loan) => loan,
                    None => {
                        return Err(LendingError::NotFound(format!("loan {} not found", loan_id)))
                    }
                };

                if loan.status != LoanStatus::Active {
                    return Err(LendingError::InvalidTransition(format!(
                        "loan {} is not active",
                        loan_id
                    )));
                }
                if amount <= 0.0 {
                    return Err(LendingError::InvalidAmount(
                        "repayment amount must be positive".to_string(),
                    ));
                }
                if amount > loan.amount {
                    return Err(LendingError::InvalidAmount(format!(
                        "repayment {} exceeds outstanding principal {}",
                        amount, loan.amount
                    )));
                }

                let new_amount = (loan.amount - amount).max(0.0);
                loan.amount = new_amount;
                if new_amount == 0.0 {
                    loan.status = LoanStatus::Closed;
                }

                let now = Utc::now();
                state.transactions.insert(
                    0,
                    Transaction {
                        id: format!("tx-{}", Uuid::new_v4()),
                        user_id: loan.user_id.clone(),
                        loan_id: Some(loan.id.clone()),
                        transaction_type: TransactionType::Repayment,
                        amount,
                        currency: Currency::Inr,
                        status: TransactionStatus::Success,
                        date: now,
                        reference_id: format!("ref-repay-{}", now.timestamp_millis()),
                    },
                );

                Ok(state.loans.iter().find(|l| l.id == loan_id).cloned())
            })
            .await?;

        let loan =
            result.ok_or_else(|| LendingError::NotFound(format!("loan {} not found", loan_id)))?;

        tracing::info!(
            loan_id = %loan.id,
            remaining = loan.amount,
            status = ?loan.status,
            "Repayment applied"
        );

        Ok(loan)
    }

    /// Recompute and store the current LTV on a loan. Idempotent; unknown
    /// loan ids are a no-op so the risk scan can race loan closure safely.
    pub async fn record_ltv(&self, loan_id: &str, btc_price: f64) -> Result<(), LendingError> {
        if btc_price <= 0.0 {
            return Err(LendingError::InvalidInput(format!(
                "BTC price must be positive, got {}",
                btc_price
            )));
        }

        self.store
            .mutate(|state| {
                if let Some(loan) = state.loans.iter_mut().find(|l| l.id == loan_id) {
                    if let Ok(current) = ltv::current_ltv(loan.amount, loan.btc_collateral, btc_price)
                    {
                        loan.ltv = current;
                    }
                }
            })
            .await;

        Ok(())
    }

    /// Get a loan by id
    pub async fn get(&self, loan_id: &str) -> Option<Loan> {
        self.store
            .read(|state| state.loans.iter().find(|l| l.id == loan_id).cloned())
            .await
    }

    /// List all loans of the session
    pub async fn list(&self) -> Vec<Loan> {
        self.store.read(|state| state.loans.clone()).await
    }

    async fn transition(
        &self,
        loan_id: &str,
        from: LoanStatus,
        to: LoanStatus,
    ) -> Result<Loan, LendingError> {
        self.store
            .mutate(|state| {
                let loan = match state.loans.iter_mut().find(|l| l.id == loan_id) {
                    Some(loan) => loan,
                    None => {
                        return Err(LendingError::NotFound(format!("loan {} not found", loan_id)))
                    }
                };
                if loan.status != from {
                    return Err(LendingError::InvalidTransition(format!(
                        "loan {} is {:?}, expected {:?}",
                        loan_id, loan.status, from
                    )));
                }
                loan.status = to;
                Ok(loan.clone())
            })
            .await
    }
}
