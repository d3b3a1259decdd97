//! Route definitions for the Pledg API

mod activity;
mod auth;
mod loans;
mod market;
mod onboarding;

pub use activity::activity_routes;
pub use auth::auth_routes;
pub use loans::loan_routes;
pub use market::market_routes;
pub use onboarding::onboarding_routes;
