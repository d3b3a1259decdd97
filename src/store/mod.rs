//! Session state store
//!
//! The entire session — user, bank accounts, loans, transactions,
//! notifications, and the current BTC price — lives in one `SessionState`
//! document behind a single `RwLock`. Every mutation runs as one write-lock
//! critical section, so concurrent readers (the risk scan, list handlers)
//! observe either the fully-old or fully-new document, never a partial write.
//!
//! The document is persisted as a single JSON file and rehydrated in full on
//! startup. A file that fails to deserialize is discarded and a fresh session
//! starts; there is no migration logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::{BankAccount, Loan, Notification, Transaction, User};

/// Fallback BTC/INR price used when no price has ever been observed
pub const FALLBACK_BTC_PRICE: f64 = 8_000_000.0;

/// The one session document
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub bank_accounts: Vec<BankAccount>,
    pub loans: Vec<Loan>,
    pub transactions: Vec<Transaction>,
    pub notifications: Vec<Notification>,
    pub btc_price: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            bank_accounts: Vec::new(),
            loans: Vec::new(),
            transactions: Vec::new(),
            notifications: Vec::new(),
            btc_price: FALLBACK_BTC_PRICE,
        }
    }
}

/// Owns the session document and its persistence
pub struct SessionStore {
    path: Option<PathBuf>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Open a store backed by the given file, rehydrating any persisted
    /// session. A missing or unreadable document starts a fresh session.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<SessionState>(&raw) {
                Ok(state) => {
                    tracing::info!(path = %path.display(), "Session state rehydrated");
                    state
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Persisted session did not match the expected shape, starting fresh"
                    );
                    SessionState::default()
                }
            },
            Err(_) => SessionState::default(),
        };

        Self {
            path: Some(path),
            state: RwLock::new(state),
        }
    }

    /// In-memory store with no persistence
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Read a value out of the session under the read lock
    pub async fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Apply one atomic mutation under the write lock, then persist the
    /// whole document. Persistence failures are logged and swallowed;
    /// durability is not a contract this store makes.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.write().await;
        let result = f(&mut guard);
        self.persist(&guard).await;
        result
    }

    /// Clear all session-scoped collections, keeping the last known price
    pub async fn reset(&self) {
        self.mutate(|state| {
            state.user = None;
            state.is_authenticated = false;
            state.bank_accounts.clear();
            state.loans.clear();
            state.transactions.clear();
            state.notifications.clear();
        })
        .await;
        tracing::info!("Session state reset");
    }

    /// Current BTC price
    pub async fn btc_price(&self) -> f64 {
        self.read(|state| state.btc_price).await
    }

    /// Store a refreshed BTC price. Non-positive values are refused here as
    /// a last line of defense; the feed client should never pass one.
    pub async fn set_btc_price(&self, price: f64) {
        if price <= 0.0 || !price.is_finite() {
            tracing::warn!(price, "Refusing to store a non-positive BTC price");
            return;
        }
        self.mutate(|state| state.btc_price = price).await;
    }

    async fn persist(&self, state: &SessionState) {
        let Some(path) = &self.path else {
            return;
        };
        match serde_json::to_string_pretty(state) {
            Ok(raw) => {
                if let Err(e) = tokio::fs::write(path, raw).await {
                    tracing::error!(path = %path.display(), error = %e, "Failed to persist session");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KycStatus, User};

    fn demo_user() -> User {
        User {
            id: "user-123".to_string(),
            email: "demo@pledg.in".to_string(),
            name: "Demo User".to_string(),
            kyc_verified: false,
            kyc_status: KycStatus::None,
            phone_number: None,
        }
    }

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir().join(format!("pledg-store-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reset_clears_collections_but_keeps_price() {
        let store = SessionStore::in_memory();
        store.set_btc_price(9_500_000.0).await;
        store
            .mutate(|state| {
                state.user = Some(demo_user());
                state.is_authenticated = true;
            })
            .await;

        store.reset().await;

        assert!(store.read(|s| s.user.is_none()).await);
        assert!(store.read(|s| s.loans.is_empty()).await);
        assert_eq!(store.btc_price().await, 9_500_000.0);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_price() {
        let store = SessionStore::in_memory();
        store.set_btc_price(0.0).await;
        assert_eq!(store.btc_price().await, FALLBACK_BTC_PRICE);
        store.set_btc_price(-10.0).await;
        assert_eq!(store.btc_price().await, FALLBACK_BTC_PRICE);
        store.set_btc_price(f64::NAN).await;
        assert_eq!(store.btc_price().await, FALLBACK_BTC_PRICE);
    }

    #[tokio::test]
    async fn test_round_trips_through_disk() {
        let path = temp_store_path();

        {
            let store = SessionStore::open(&path);
            store
                .mutate(|state| {
                    state.user = Some(demo_user());
                    state.is_authenticated = true;
                    state.btc_price = 7_200_000.0;
                })
                .await;
        }

        let reopened = SessionStore::open(&path);
        assert!(reopened.read(|s| s.is_authenticated).await);
        assert_eq!(reopened.btc_price().await, 7_200_000.0);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_corrupt_document_starts_fresh() {
        let path = temp_store_path();
        std::fs::write(&path, "{not json at all").unwrap();

        let store = SessionStore::open(&path);
        assert!(store.read(|s| s.user.is_none()).await);
        assert_eq!(store.btc_price().await, FALLBACK_BTC_PRICE);

        let _ = std::fs::remove_file(&path);
    }
}
