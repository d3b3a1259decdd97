//! Pledg Backend Server
//!
//! Demo backend for a Bitcoin-collateralized lending product: loan
//! origination against BTC collateral, a periodic LTV risk scan, a
//! BTC/INR price feed with fallback, simulated KYC and bank verification
//! flows, and the interactive LTV/price simulator.

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use pledg_server::config::Config;
use pledg_server::flows::FlowTracker;
use pledg_server::loans::LoanService;
use pledg_server::onboarding::OnboardingService;
use pledg_server::price::PriceFeed;
use pledg_server::risk::RiskScanner;
use pledg_server::state::AppState;
use pledg_server::store::SessionStore;
use pledg_server::{middleware, routes};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    let config = Arc::new(config);

    // Rehydrate the session document
    let store = Arc::new(SessionStore::open(&config.storage_path));

    // Shutdown signal watched by every background task and in-flight flow
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Services over the shared session store
    let loan_service = Arc::new(LoanService::new(store.clone()));
    let flow_tracker = FlowTracker::new();
    let onboarding = Arc::new(OnboardingService::new(
        store.clone(),
        flow_tracker.clone(),
        config.flow_time_scale,
        shutdown_rx.clone(),
    ));

    // Start the price refresher in the background
    let price_feed = Arc::new(PriceFeed::new(config.price_feed_url.clone(), store.clone()));
    tokio::spawn(price_feed.clone().run(
        Duration::from_secs(config.price_refresh_secs),
        shutdown_rx.clone(),
    ));

    // Start the risk scanner in the background
    let risk_scanner = Arc::new(RiskScanner::new(store.clone(), loan_service.clone()));
    tokio::spawn(risk_scanner.clone().run(
        Duration::from_secs(config.risk_scan_secs),
        shutdown_rx.clone(),
    ));

    // Create shared app state
    let app_state = AppState::new(
        config.clone(),
        store.clone(),
        loan_service,
        onboarding,
        flow_tracker,
        shutdown_rx,
    );

    // Create the app router
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::auth_routes())
        .merge(routes::onboarding_routes())
        .merge(routes::loan_routes())
        .merge(routes::market_routes())
        .merge(routes::activity_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    // Stop the periodic tasks and in-flight flows
    let _ = shutdown_tx.send(true);

    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "Pledg API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
