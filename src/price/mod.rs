//! BTC/INR price feed client
//!
//! One GET against the configured endpoint, expecting a JSON body with a
//! `bitcoin.inr` numeric field. Every failure mode — transport error,
//! non-2xx, malformed body, nonsense value — is absorbed here: the stored
//! price keeps its previous value, or takes the fixed fallback when nothing
//! was ever observed. Feed trouble never reaches the UI as an error.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::store::{SessionStore, FALLBACK_BTC_PRICE};

/// Price feed failure, recovered locally and never propagated upward
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Feed returned status {0}")]
    BadStatus(u16),

    #[error("Feed body missing bitcoin.inr")]
    MalformedBody,

    #[error("Feed returned non-positive price {0}")]
    BadValue(f64),
}

/// Expected feed body: `{"bitcoin": {"inr": 8123456.0}}`
#[derive(Debug, Deserialize)]
struct FeedBody {
    bitcoin: Option<FeedQuote>,
}

#[derive(Debug, Deserialize)]
struct FeedQuote {
    inr: Option<f64>,
}

/// Extract and validate the quote from a feed body
fn parse_feed_body(body: &str) -> Result<f64, FeedError> {
    let parsed: FeedBody = serde_json::from_str(body).map_err(|_| FeedError::MalformedBody)?;
    let price = parsed
        .bitcoin
        .and_then(|b| b.inr)
        .ok_or(FeedError::MalformedBody)?;
    if price <= 0.0 || !price.is_finite() {
        return Err(FeedError::BadValue(price));
    }
    Ok(price)
}

/// Price feed client, shared process-wide
pub struct PriceFeed {
    client: reqwest::Client,
    endpoint: String,
    store: Arc<SessionStore>,
}

impl PriceFeed {
    pub fn new(endpoint: String, store: Arc<SessionStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            store,
        }
    }

    /// One fetch attempt against the feed endpoint
    async fn fetch(&self) -> Result<f64, FeedError> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::BadStatus(status.as_u16()));
        }
        let body = response.text().await?;
        parse_feed_body(&body)
    }

    /// Refresh the stored price once. On failure the previous value is
    /// kept, except when nothing was ever observed (price still zero),
    /// in which case the fixed fallback is stored.
    pub async fn refresh(&self) {
        match self.fetch().await {
            Ok(price) => {
                self.store.set_btc_price(price).await;
                tracing::debug!(price, "BTC price refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "BTC price fetch failed, keeping last known value");
                if self.store.btc_price().await == 0.0 {
                    self.store.set_btc_price(FALLBACK_BTC_PRICE).await;
                }
            }
        }
    }

    /// Periodic refresh loop. Runs until the shutdown signal flips; each
    /// tick is independent, so one bad fetch never kills the task.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = interval.as_secs(), "Price refresher started");

        // Prime the store before the first interval elapses
        self.refresh().await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.refresh().await;
                }
                _ = shutdown.changed() => {
                    tracing::info!("Price refresher stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_body() {
        let price = parse_feed_body(r#"{"bitcoin": {"inr": 8123456.5}}"#).unwrap();
        assert_eq!(price, 8_123_456.5);
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        assert!(matches!(
            parse_feed_body("not json"),
            Err(FeedError::MalformedBody)
        ));
        assert!(matches!(
            parse_feed_body(r#"{"ethereum": {"inr": 100}}"#),
            Err(FeedError::MalformedBody)
        ));
        assert!(matches!(
            parse_feed_body(r#"{"bitcoin": {"usd": 60000}}"#),
            Err(FeedError::MalformedBody)
        ));
    }

    #[test]
    fn test_parse_rejects_nonsense_values() {
        assert!(matches!(
            parse_feed_body(r#"{"bitcoin": {"inr": 0}}"#),
            Err(FeedError::BadValue(_))
        ));
        assert!(matches!(
            parse_feed_body(r#"{"bitcoin": {"inr": -5.0}}"#),
            Err(FeedError::BadValue(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_price() {
        let store = Arc::new(SessionStore::in_memory());
        store.set_btc_price(7_900_000.0).await;

        // Endpoint that cannot resolve; the fetch fails, the price stands.
        let feed = PriceFeed::new("http://127.0.0.1:1/".to_string(), store.clone());
        feed.refresh().await;

        assert_eq!(store.btc_price().await, 7_900_000.0);
    }
}
