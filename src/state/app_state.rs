//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::watch;

use crate::config::Config;
use crate::flows::FlowTracker;
use crate::loans::LoanService;
use crate::onboarding::OnboardingService;
use crate::store::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SessionStore>,
    pub loan_service: Arc<LoanService>,
    pub onboarding: Arc<OnboardingService>,
    pub flow_tracker: FlowTracker,
    /// Background tasks and in-flight flows watch this to stop cleanly
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<SessionStore>,
        loan_service: Arc<LoanService>,
        onboarding: Arc<OnboardingService>,
        flow_tracker: FlowTracker,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            store,
            loan_service,
            onboarding,
            flow_tracker,
            shutdown,
        }
    }
}

impl FromRef<AppState> for Arc<SessionStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<OnboardingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.onboarding.clone()
    }
}

impl FromRef<AppState> for FlowTracker {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.flow_tracker.clone()
    }
}
