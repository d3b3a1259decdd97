//! Data models for the Pledg backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// KYC verification status
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    None,
    Pending,
    Verified,
    Rejected,
}

/// User model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub kyc_verified: bool,
    pub kyc_status: KycStatus,
    pub phone_number: Option<String>,
}

/// Linked bank account. Only `is_verified` matters to the lending core:
/// its presence gates loan application eligibility.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankAccount {
    pub id: Uuid,
    pub user_id: String,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub is_primary: bool,
    pub is_verified: bool,
}

/// Loan status state machine: `Pending -> Disbursing -> Active -> Closed`,
/// with `Pending -> Rejected` as the alternative terminal. Closed and
/// Rejected have no outgoing transitions.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Disbursing,
    Active,
    Closed,
    Rejected,
}

impl LoanStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Closed | LoanStatus::Rejected)
    }
}

/// Loan model. `btc_collateral` is fixed once the application is created;
/// only the derived `ltv` field changes as the BTC price moves.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    /// Outstanding principal in INR
    pub amount: f64,
    pub tenure_months: u32,
    /// Annual interest rate, percent
    pub interest_rate: f64,
    pub status: LoanStatus,
    /// Pledged collateral in BTC, sized at application time
    pub btc_collateral: f64,
    /// BTC/INR price recorded when the application was created
    pub btc_price_at_disbursement: f64,
    /// Last computed loan-to-value, percent
    pub ltv: f64,
    pub disbursement_date: Option<DateTime<Utc>>,
    pub maturity_date: Option<DateTime<Utc>>,
}

/// Ledger entry types
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Disbursement,
    Deposit,
    Repayment,
    Liquidation,
    Interest,
    Withdrawal,
}

/// Currency of a ledger entry
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Btc,
}

/// Transaction status
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed,
}

/// Transaction ledger entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub loan_id: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub date: DateTime<Utc>,
    pub reference_id: String,
}

/// Notification severity
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
    Success,
}

/// Risk (and general) notification. The id is derived deterministically
/// from the alert kind and loan id (`margin-call-LN20261234`), so repeated
/// alerts for the same loan and condition share a stable identity that
/// downstream consumers can dedup on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub read: bool,
    pub date: DateTime<Utc>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

// ============================================================================
// Request payloads
// ============================================================================

/// Login request (demo credentials)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Loan application input
#[derive(Debug, Deserialize, Validate)]
pub struct LoanApplicationRequest {
    /// Requested principal in INR
    #[validate(range(min = 1.0))]
    pub amount: f64,
    /// Tenure in months
    #[validate(range(min = 1, max = 12))]
    pub tenure_months: u32,
    pub purpose: Option<String>,
}

/// Repayment input
#[derive(Debug, Deserialize, Validate)]
pub struct RepaymentRequest {
    #[validate(range(min = 0.01))]
    pub amount: f64,
}

/// Bank account link input (verified via simulated penny drop)
#[derive(Debug, Deserialize, Validate)]
pub struct BankLinkRequest {
    #[validate(length(min = 2))]
    pub account_holder_name: String,
    #[validate(length(min = 6, max = 18))]
    pub account_number: String,
    /// IFSC-style routing code, e.g. HDFC0001234
    #[validate(length(equal = 11))]
    pub ifsc_code: String,
}

/// KYC submission input (documents handled by the upload collaborator;
/// the core only needs to know both were provided)
#[derive(Debug, Deserialize, Validate)]
pub struct KycSubmissionRequest {
    pub aadhaar_document: bool,
    pub pan_document: bool,
}

/// Simulator query: exactly one of the two fields drives the computation
#[derive(Debug, Deserialize)]
pub struct SimulationQuery {
    pub price: Option<f64>,
    pub ltv: Option<f64>,
}
