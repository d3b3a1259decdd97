//! Loan-to-Value risk model for Pledg
//!
//! Pure collateral-sizing and LTV math plus the risk tier classification
//! used by loan origination and the dashboard risk scan. Everything in this
//! module is stateless and side-effect free, so it is callable concurrently
//! without coordination.

use serde::{Deserialize, Serialize};

use crate::error::LendingError;

pub mod simulator;

// ============================================================================
// Configuration Constants
// ============================================================================

/// LTV ratio applied when sizing collateral at origination (50%)
pub const ORIGINATION_LTV: f64 = 0.5;

/// Upper bound of the Safe tier, percent (closed bound)
pub const SAFE_MAX_LTV: f64 = 50.0;

/// Upper bound of the Monitor tier, percent (closed bound).
/// Calibration constant, not a rounding artifact.
pub const MONITOR_MAX_LTV: f64 = 71.59;

/// Upper bound of the MarginCall tier, percent (closed bound).
/// Calibration constant, not a rounding artifact.
pub const MARGIN_CALL_MAX_LTV: f64 = 83.32;

/// Scanner threshold above which a margin call alert is raised, percent
pub const MARGIN_CALL_ALERT_LTV: f64 = 70.0;

/// Scanner threshold above which a liquidation alert is raised, percent
pub const LIQUIDATION_ALERT_LTV: f64 = 83.0;

/// LTV ratio at which collateral starts being sold off
pub const LIQUIDATION_LTV_RATIO: f64 = 0.83;

/// Minimum loan principal in INR
pub const MIN_LOAN_AMOUNT: f64 = 10_000.0;

/// Annual interest rate fixed at loan creation, percent
pub const ANNUAL_INTEREST_RATE: f64 = 14.0;

// ============================================================================
// Risk tiers
// ============================================================================

/// Risk tier classification for a live loan, as shown on the dashboard.
///
/// Thresholds are evaluated in ascending order, first match wins, and each
/// bound is closed on the upper side: an LTV of exactly 71.59 is still
/// Monitor.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// At or below the origination LTV
    Safe,
    /// Rising, but no action required yet
    Monitor,
    /// User should top up collateral or repay
    MarginCall,
    /// Collateral sell-off imminent
    LiquidationRisk,
}

impl RiskTier {
    /// Classify an LTV percentage into its risk tier
    pub fn classify(ltv: f64) -> Self {
        if ltv <= SAFE_MAX_LTV {
            RiskTier::Safe
        } else if ltv <= MONITOR_MAX_LTV {
            RiskTier::Monitor
        } else if ltv <= MARGIN_CALL_MAX_LTV {
            RiskTier::MarginCall
        } else {
            RiskTier::LiquidationRisk
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskTier::Safe => "LTV at or below the starting ratio",
            RiskTier::Monitor => "LTV rising, keep an eye on the market",
            RiskTier::MarginCall => "Add collateral or repay to avoid liquidation",
            RiskTier::LiquidationRisk => "Collateral may be partially sold to reduce risk",
        }
    }
}

// ============================================================================
// Pure LTV math
// ============================================================================

/// BTC collateral required to back `loan_amount` at `target_ltv`.
///
/// `target_ltv` is a ratio (0.5 for the 50% origination default). The price
/// guard is load-bearing: collateral sizing must never silently divide by
/// zero and hand back Infinity.
pub fn required_collateral(
    loan_amount: f64,
    btc_price: f64,
    target_ltv: f64,
) -> Result<f64, LendingError> {
    if loan_amount <= 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "loan amount must be positive, got {}",
            loan_amount
        )));
    }
    if btc_price <= 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "BTC price must be positive, got {}",
            btc_price
        )));
    }
    if target_ltv <= 0.0 || target_ltv > 1.0 {
        return Err(LendingError::InvalidInput(format!(
            "target LTV must be in (0, 1], got {}",
            target_ltv
        )));
    }

    Ok(loan_amount / (btc_price * target_ltv))
}

/// Current LTV of a loan as a percentage of collateral value
pub fn current_ltv(
    loan_amount: f64,
    btc_collateral: f64,
    btc_price: f64,
) -> Result<f64, LendingError> {
    if loan_amount < 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "loan amount must not be negative, got {}",
            loan_amount
        )));
    }
    if btc_collateral <= 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "collateral must be positive, got {}",
            btc_collateral
        )));
    }
    if btc_price <= 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "BTC price must be positive, got {}",
            btc_price
        )));
    }

    Ok((loan_amount / (btc_collateral * btc_price)) * 100.0)
}

/// BTC price at which the loan hits the liquidation LTV
pub fn liquidation_price(loan_amount: f64, btc_collateral: f64) -> Result<f64, LendingError> {
    if btc_collateral <= 0.0 {
        return Err(LendingError::InvalidInput(format!(
            "collateral must be positive, got {}",
            btc_collateral
        )));
    }
    Ok(loan_amount / (btc_collateral * LIQUIDATION_LTV_RATIO))
}

/// Total repayment under the flat pro-rata interest formula:
/// principal plus `rate% * months/12` of it. Not compounding.
pub fn total_repayment(principal: f64, annual_rate: f64, tenure_months: u32) -> f64 {
    principal + principal * (annual_rate / 100.0) * (tenure_months as f64 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_collateral_at_origination() {
        // 50,000 INR at 7,200,000 INR/BTC and 50% LTV
        let btc = required_collateral(50_000.0, 7_200_000.0, ORIGINATION_LTV).unwrap();
        assert!((btc - 0.0138889).abs() < 1e-6);
    }

    #[test]
    fn test_required_collateral_rejects_zero_price() {
        assert!(matches!(
            required_collateral(50_000.0, 0.0, ORIGINATION_LTV),
            Err(LendingError::InvalidInput(_))
        ));
        assert!(matches!(
            required_collateral(50_000.0, -1.0, ORIGINATION_LTV),
            Err(LendingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_current_ltv_round_trips_sizing() {
        // Sizing collateral at a target then measuring must reproduce the target
        for &target in &[0.25, 0.5, 0.83, 1.0] {
            for &price in &[1_000.0, 7_200_000.0, 10_000_000.0] {
                let collateral = required_collateral(80_000.0, price, target).unwrap();
                let ltv = current_ltv(80_000.0, collateral, price).unwrap();
                assert!(
                    (ltv - target * 100.0).abs() < 1e-9,
                    "target {} price {} gave {}",
                    target,
                    price,
                    ltv
                );
            }
        }
    }

    #[test]
    fn test_current_ltv_rejects_bad_inputs() {
        assert!(current_ltv(50_000.0, 0.0, 7_200_000.0).is_err());
        assert!(current_ltv(50_000.0, 0.5, 0.0).is_err());
        assert!(current_ltv(-1.0, 0.5, 7_200_000.0).is_err());
    }

    #[test]
    fn test_tier_boundaries_closed_on_upper_bound() {
        assert_eq!(RiskTier::classify(50.0), RiskTier::Safe);
        assert_eq!(RiskTier::classify(50.01), RiskTier::Monitor);
        assert_eq!(RiskTier::classify(71.59), RiskTier::Monitor);
        assert_eq!(RiskTier::classify(71.60), RiskTier::MarginCall);
        assert_eq!(RiskTier::classify(83.32), RiskTier::MarginCall);
        assert_eq!(RiskTier::classify(83.33), RiskTier::LiquidationRisk);
    }

    #[test]
    fn test_tier_extremes() {
        assert_eq!(RiskTier::classify(0.0), RiskTier::Safe);
        assert_eq!(RiskTier::classify(10.0), RiskTier::Safe);
        assert_eq!(RiskTier::classify(200.0), RiskTier::LiquidationRisk);
    }

    #[test]
    fn test_liquidation_price() {
        // 50,000 INR against 0.0138889 BTC liquidates around 4.34M INR/BTC
        let price = liquidation_price(50_000.0, 0.0138889).unwrap();
        assert!((price - 4_337_342.0).abs() < 1_000.0);
        assert!(liquidation_price(50_000.0, 0.0).is_err());
    }

    #[test]
    fn test_total_repayment_flat_pro_rata() {
        // 50,000 at 14% for 12 months -> 57,000
        assert!((total_repayment(50_000.0, 14.0, 12) - 57_000.0).abs() < 1e-9);
        // 6 months -> half the interest
        assert!((total_repayment(50_000.0, 14.0, 6) - 53_500.0).abs() < 1e-9);
    }
}
