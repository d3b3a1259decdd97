//! Onboarding service - KYC verification and bank account linking
//!
//! Both checks are simulated staged flows. Submission returns immediately;
//! the spawned flow publishes progress through the `FlowTracker` and commits
//! its result to the session store when it completes. The eligibility pair
//! exposed here gates loan applications.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::error::LendingError;
use crate::flows::{FlowOutcome, FlowTracker, StagedFlow};
use crate::models::{BankAccount, BankLinkRequest, KycStatus, KycSubmissionRequest};
use crate::store::SessionStore;

/// Tracker key of the KYC verification flow
pub const KYC_FLOW_KEY: &str = "kyc";

/// Tracker key of the bank penny-drop flow
pub const BANK_FLOW_KEY: &str = "bank";

/// Eligibility pair consumed by the loan application gate
#[derive(Debug, serde::Serialize, Clone, Copy)]
pub struct Eligibility {
    pub kyc_verified: bool,
    pub has_verified_bank_account: bool,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        self.kyc_verified && self.has_verified_bank_account
    }
}

/// Onboarding service over the session store
pub struct OnboardingService {
    store: Arc<SessionStore>,
    tracker: FlowTracker,
    time_scale: f64,
    shutdown: watch::Receiver<bool>,
}

impl OnboardingService {
    pub fn new(
        store: Arc<SessionStore>,
        tracker: FlowTracker,
        time_scale: f64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            tracker,
            time_scale,
            shutdown,
        }
    }

    /// Current eligibility pair for the session user
    pub async fn eligibility(&self) -> Eligibility {
        self.store
            .read(|state| Eligibility {
                kyc_verified: state.user.as_ref().map(|u| u.kyc_verified).unwrap_or(false),
                has_verified_bank_account: state.bank_accounts.iter().any(|b| b.is_verified),
            })
            .await
    }

    /// Kick off the simulated KYC verification flow. Marks the user's KYC
    /// pending, runs the staged checks in the background, and flips the
    /// user to verified when the flow completes.
    pub async fn submit_kyc(&self, request: &KycSubmissionRequest) -> Result<(), LendingError> {
        if !request.aadhaar_document || !request.pan_document {
            return Err(LendingError::InvalidInput(
                "both Aadhaar and PAN documents are required".to_string(),
            ));
        }

        let status = self
            .store
            .mutate(|state| {
                let user = state.user.as_mut()?;
                let previous = user.kyc_status;
                if previous == KycStatus::None || previous == KycStatus::Rejected {
                    user.kyc_status = KycStatus::Pending;
                }
                Some(previous)
            })
            .await;

        match status {
            None => return Err(LendingError::Eligibility("no user logged in".to_string())),
            Some(KycStatus::Pending) => {
                return Err(LendingError::InvalidTransition(
                    "KYC verification already in progress".to_string(),
                ))
            }
            Some(KycStatus::Verified) => {
                return Err(LendingError::InvalidTransition(
                    "KYC already verified".to_string(),
                ))
            }
            Some(KycStatus::None) | Some(KycStatus::Rejected) => {}
        }

        let flow = StagedFlow::kyc_verification();
        let (progress_tx, progress_rx, _cancel_tx, _cancel_rx) = flow.channels();
        self.tracker.register(KYC_FLOW_KEY, progress_rx);

        let store = self.store.clone();
        let time_scale = self.time_scale;
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let outcome = flow.run(time_scale, &progress_tx, &mut shutdown).await;
            if outcome == FlowOutcome::Completed {
                store
                    .mutate(|state| {
                        if let Some(user) = state.user.as_mut() {
                            user.kyc_verified = true;
                            user.kyc_status = KycStatus::Verified;
                        }
                    })
                    .await;
                tracing::info!("KYC verification completed");
            }
        });

        Ok(())
    }

    /// Kick off the simulated penny-drop verification for a bank account.
    /// The account only lands in the session store, verified, when the flow
    /// completes. Returns the id the account will carry.
    pub async fn link_bank_account(&self, request: &BankLinkRequest) -> Result<Uuid, LendingError> {
        let user_id = self
            .store
            .read(|state| state.user.as_ref().map(|u| u.id.clone()))
            .await
            .ok_or_else(|| LendingError::Eligibility("no user logged in".to_string()))?;

        let account = BankAccount {
            id: Uuid::new_v4(),
            user_id,
            account_holder_name: request.account_holder_name.clone(),
            bank_name: infer_bank_name(&request.ifsc_code),
            account_number: request.account_number.clone(),
            ifsc_code: request.ifsc_code.clone(),
            is_primary: true,
            is_verified: true,
        };
        let account_id = account.id;

        let flow = StagedFlow::penny_drop();
        let (progress_tx, progress_rx, _cancel_tx, _cancel_rx) = flow.channels();
        self.tracker.register(BANK_FLOW_KEY, progress_rx);

        let store = self.store.clone();
        let time_scale = self.time_scale;
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let outcome = flow.run(time_scale, &progress_tx, &mut shutdown).await;
            if outcome == FlowOutcome::Completed {
                tracing::info!(account_id = %account.id, bank = %account.bank_name, "Bank account verified");
                store
                    .mutate(|state| state.bank_accounts.push(account))
                    .await;
            }
        });

        Ok(account_id)
    }

    /// Latest progress of the named onboarding flow
    pub fn flow_status(&self, key: &str) -> Option<crate::flows::FlowProgress> {
        self.tracker.status(key)
    }
}

/// Infer a display bank name from the IFSC prefix
fn infer_bank_name(ifsc_code: &str) -> String {
    let prefix: String = ifsc_code.chars().take(4).collect::<String>().to_uppercase();
    match prefix.as_str() {
        "HDFC" => "HDFC Bank".to_string(),
        "SBIN" => "State Bank of India".to_string(),
        "ICIC" => "ICICI Bank".to_string(),
        _ if prefix.len() == 4 => format!("{} Bank (Mock)", prefix),
        _ => "Unknown Bank".to_string(),
    }
}
