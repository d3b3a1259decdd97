//! API handlers for the Pledg backend

pub mod activity;
pub mod auth;
pub mod loans;
pub mod market;
pub mod onboarding;

pub use activity::*;
pub use auth::*;
pub use loans::*;
pub use market::*;
pub use onboarding::*;
