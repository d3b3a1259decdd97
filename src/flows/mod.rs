//! Simulated multi-stage verification flows
//!
//! The demo backend fakes its slow external processes (KYC document checks,
//! bank penny-drop verification, collateral deposit confirmation) as finite
//! sequences of named stages with fixed durations. `StagedFlow` makes that
//! sequence explicit and cancelable instead of a chain of ad hoc timeouts:
//! a spawned task walks the stages, publishes progress through a `watch`
//! channel, and bails out cleanly when the cancel signal flips.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

/// One named stage of a simulated flow
#[derive(Debug, Clone, Copy)]
pub struct FlowStage {
    pub label: &'static str,
    pub duration_ms: u64,
    /// Progress shown while this stage runs, percent
    pub percent: u8,
}

/// Where a flow currently stands
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowState {
    Running,
    Completed,
    Cancelled,
}

/// Progress snapshot published after every stage change
#[derive(Debug, Serialize, Clone)]
pub struct FlowProgress {
    pub flow: &'static str,
    pub state: FlowState,
    pub stage: usize,
    pub total_stages: usize,
    pub label: &'static str,
    pub percent: u8,
}

/// Outcome of driving a flow to its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    Cancelled,
}

/// Resolve once the cancel signal is raised. A closed channel means the
/// owner went away without cancelling; in that case never resolve, so the
/// flow simply runs out its stages.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A finite sequence of delayed stages
#[derive(Debug, Clone)]
pub struct StagedFlow {
    pub name: &'static str,
    pub stages: Vec<FlowStage>,
}

impl StagedFlow {
    /// KYC document verification: upload, OCR, face match, registry check
    pub fn kyc_verification() -> Self {
        Self {
            name: "kyc",
            stages: vec![
                FlowStage {
                    label: "Securely uploading documents",
                    duration_ms: 1500,
                    percent: 10,
                },
                FlowStage {
                    label: "Scanning documents (OCR)",
                    duration_ms: 2000,
                    percent: 40,
                },
                FlowStage {
                    label: "Verifying face match with ID",
                    duration_ms: 1500,
                    percent: 70,
                },
                FlowStage {
                    label: "Validating with UIDAI database",
                    duration_ms: 1500,
                    percent: 90,
                },
                FlowStage {
                    label: "Finalizing",
                    duration_ms: 500,
                    percent: 100,
                },
            ],
        }
    }

    /// Bank account ownership check via simulated penny drop
    pub fn penny_drop() -> Self {
        Self {
            name: "penny-drop",
            stages: vec![
                FlowStage {
                    label: "Initiating penny drop transaction",
                    duration_ms: 1500,
                    percent: 10,
                },
                FlowStage {
                    label: "Connecting to bank servers",
                    duration_ms: 1500,
                    percent: 40,
                },
                FlowStage {
                    label: "Depositing Rs 1.00 to account",
                    duration_ms: 2000,
                    percent: 70,
                },
                FlowStage {
                    label: "Verifying beneficiary name",
                    duration_ms: 1500,
                    percent: 90,
                },
                FlowStage {
                    label: "Finalizing",
                    duration_ms: 500,
                    percent: 100,
                },
            ],
        }
    }

    /// BTC collateral deposit detection and confirmation
    pub fn collateral_deposit() -> Self {
        Self {
            name: "collateral-deposit",
            stages: vec![
                FlowStage {
                    label: "Detecting BTC deposit",
                    duration_ms: 2000,
                    percent: 40,
                },
                FlowStage {
                    label: "Waiting for confirmations",
                    duration_ms: 3000,
                    percent: 100,
                },
            ],
        }
    }

    /// Fiat disbursement to the verified bank account
    pub fn disbursement() -> Self {
        Self {
            name: "disbursement",
            stages: vec![FlowStage {
                label: "Disbursing funds",
                duration_ms: 3000,
                percent: 100,
            }],
        }
    }

    /// Walk the stages, publishing progress and honoring cancellation.
    /// Durations are multiplied by `time_scale`; zero runs the flow
    /// without waiting (tests).
    pub async fn run(
        &self,
        time_scale: f64,
        progress: &watch::Sender<FlowProgress>,
        cancel: &mut watch::Receiver<bool>,
    ) -> FlowOutcome {
        let total = self.stages.len();

        for (index, stage) in self.stages.iter().enumerate() {
            let _ = progress.send(FlowProgress {
                flow: self.name,
                state: FlowState::Running,
                stage: index + 1,
                total_stages: total,
                label: stage.label,
                percent: stage.percent,
            });

            let wait = Duration::from_millis((stage.duration_ms as f64 * time_scale) as u64);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancelled(cancel) => {
                    tracing::info!(flow = self.name, stage = stage.label, "Flow cancelled");
                    let _ = progress.send(FlowProgress {
                        flow: self.name,
                        state: FlowState::Cancelled,
                        stage: index + 1,
                        total_stages: total,
                        label: stage.label,
                        percent: stage.percent,
                    });
                    return FlowOutcome::Cancelled;
                }
            }
        }

        let last = self.stages.last();
        let _ = progress.send(FlowProgress {
            flow: self.name,
            state: FlowState::Completed,
            stage: total,
            total_stages: total,
            label: last.map(|s| s.label).unwrap_or(""),
            percent: 100,
        });

        FlowOutcome::Completed
    }

    /// Fresh progress/cancel channel pair for one run of this flow
    pub fn channels(
        &self,
    ) -> (
        watch::Sender<FlowProgress>,
        watch::Receiver<FlowProgress>,
        watch::Sender<bool>,
        watch::Receiver<bool>,
    ) {
        let initial = FlowProgress {
            flow: self.name,
            state: FlowState::Running,
            stage: 0,
            total_stages: self.stages.len(),
            label: "Starting",
            percent: 0,
        };
        let (progress_tx, progress_rx) = watch::channel(initial);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (progress_tx, progress_rx, cancel_tx, cancel_rx)
    }
}

/// Registry of in-flight (and recently finished) flow runs, keyed by a
/// caller-chosen id such as `kyc` or `loan:LN20261234`. Handlers poll it
/// for progress; the latest snapshot stays readable after completion.
#[derive(Clone, Default)]
pub struct FlowTracker {
    inner: Arc<Mutex<HashMap<String, watch::Receiver<FlowProgress>>>>,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the progress receiver of a new run under the given key,
    /// replacing any previous run
    pub fn register(&self, key: impl Into<String>, rx: watch::Receiver<FlowProgress>) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.into(), rx);
        }
    }

    /// Latest progress snapshot for a key
    pub fn status(&self, key: &str) -> Option<FlowProgress> {
        self.inner
            .lock()
            .ok()
            .and_then(|map| map.get(key).map(|rx| rx.borrow().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flow_completes_through_all_stages() {
        let flow = StagedFlow::kyc_verification();
        let (progress_tx, progress_rx, _cancel_tx, mut cancel_rx) = flow.channels();

        let outcome = flow.run(0.0, &progress_tx, &mut cancel_rx).await;

        assert_eq!(outcome, FlowOutcome::Completed);
        let last = progress_rx.borrow().clone();
        assert_eq!(last.state, FlowState::Completed);
        assert_eq!(last.percent, 100);
        assert_eq!(last.total_stages, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_cancellation_stops_mid_sequence() {
        let flow = StagedFlow::penny_drop();
        let (progress_tx, progress_rx, cancel_tx, mut cancel_rx) = flow.channels();

        let handle =
            tokio::spawn(async move { flow.run(1.0, &progress_tx, &mut cancel_rx).await });

        // Let the first stage start, then pull the plug
        tokio::task::yield_now().await;
        cancel_tx.send(true).unwrap();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, FlowOutcome::Cancelled);
        assert_eq!(progress_rx.borrow().state, FlowState::Cancelled);
    }

    #[tokio::test]
    async fn test_tracker_returns_latest_snapshot() {
        let tracker = FlowTracker::new();
        let flow = StagedFlow::disbursement();
        let (progress_tx, progress_rx, _cancel_tx, mut cancel_rx) = flow.channels();
        tracker.register("loan:LN20260001", progress_rx);

        flow.run(0.0, &progress_tx, &mut cancel_rx).await;

        let status = tracker.status("loan:LN20260001").unwrap();
        assert_eq!(status.state, FlowState::Completed);
        assert!(tracker.status("loan:other").is_none());
    }
}
