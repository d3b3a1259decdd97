//! Periodic risk scanner
//!
//! Re-evaluates the LTV of every active loan on a fixed cadence and appends
//! a notification for each loan sitting in the margin-call or liquidation
//! zone. Pending loans have no collateral on deposit yet and are skipped
//! outright. A missing or non-positive price aborts the whole tick: better
//! to say nothing than to alert on a nonsensical LTV.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::loans::LoanService;
use crate::ltv::{LIQUIDATION_ALERT_LTV, MARGIN_CALL_ALERT_LTV};
use crate::models::{LoanStatus, Notification, Severity};
use crate::store::SessionStore;

/// Risk scanner over the session's loan collection
pub struct RiskScanner {
    store: Arc<SessionStore>,
    loans: Arc<LoanService>,
}

impl RiskScanner {
    pub fn new(store: Arc<SessionStore>, loans: Arc<LoanService>) -> Self {
        Self { store, loans }
    }

    /// Evaluate all active loans once. Returns the notifications appended
    /// during this tick, mostly for tests and logging.
    pub async fn scan_once(&self) -> Vec<Notification> {
        let price = self.store.btc_price().await;
        if price <= 0.0 || !price.is_finite() {
            tracing::warn!(price, "Skipping risk scan, no usable BTC price");
            return Vec::new();
        }

        let active: Vec<_> = self
            .store
            .read(|state| {
                state
                    .loans
                    .iter()
                    .filter(|l| l.status == LoanStatus::Active)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;

        let mut raised = Vec::new();

        for loan in active {
            if self.loans.record_ltv(&loan.id, price).await.is_err() {
                continue;
            }
            let Some(loan) = self.loans.get(&loan.id).await else {
                continue;
            };

            let notification = if loan.ltv > LIQUIDATION_ALERT_LTV {
                Some(Notification {
                    id: format!("liquidation-{}", loan.id),
                    user_id: loan.user_id.clone(),
                    title: "Liquidation Risk".to_string(),
                    message: format!(
                        "Loan {} is at liquidation risk! LTV: {:.2}%",
                        loan.id, loan.ltv
                    ),
                    severity: Severity::Danger,
                    read: false,
                    date: Utc::now(),
                })
            } else if loan.ltv > MARGIN_CALL_ALERT_LTV {
                Some(Notification {
                    id: format!("margin-call-{}", loan.id),
                    user_id: loan.user_id.clone(),
                    title: "Margin Call".to_string(),
                    message: format!(
                        "Loan {} is approaching margin call! LTV: {:.2}%",
                        loan.id, loan.ltv
                    ),
                    severity: Severity::Warning,
                    read: false,
                    date: Utc::now(),
                })
            } else {
                None
            };

            if let Some(notification) = notification {
                tracing::warn!(
                    loan_id = %loan.id,
                    ltv = loan.ltv,
                    severity = ?notification.severity,
                    "Risk threshold crossed"
                );
                self.store
                    .mutate(|state| state.notifications.insert(0, notification.clone()))
                    .await;
                raised.push(notification);
            }
        }

        raised
    }

    /// Interval loop around `scan_once`. Stops when the shutdown signal
    /// flips; a failed tick never kills the task.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = interval.as_secs(), "Risk scanner started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let raised = self.scan_once().await;
                    if !raised.is_empty() {
                        tracing::info!(count = raised.len(), "Risk notifications raised");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Risk scanner stopping");
                    break;
                }
            }
        }
    }
}
