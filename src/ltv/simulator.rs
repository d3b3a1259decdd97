//! Interactive LTV/price what-if simulator
//!
//! A bidirectional linear model anchored at a single `(base_price, 50%)`
//! baseline: moving the price derives the implied LTV, moving the LTV derives
//! the implied price. Purely illustrative; it never touches real loan state.
//!
//! The narrative thresholds here (55/70/83) are deliberately distinct from
//! the live-loan tier table in the parent module: the simulator communicates
//! anticipatory risk for a hypothetical new loan, not the health of an
//! existing one. Do not unify the two sets.

use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Baseline LTV of a fresh loan, percent
pub const BASE_LTV: f64 = 50.0;

/// Lower clamp of the simulated LTV range, percent
pub const SIM_MIN_LTV: f64 = 10.0;

/// Upper clamp of the simulated LTV range, percent
pub const SIM_MAX_LTV: f64 = 83.0;

/// Narrative threshold below which the position reads as healthy
pub const SIM_HEALTHY_LTV: f64 = 55.0;

/// Narrative threshold below which the position reads as moderate risk
pub const SIM_MODERATE_LTV: f64 = 70.0;

/// Narrative verdict shown next to the simulated position
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorVerdict {
    Healthy,
    ModerateRisk,
    MarginCallRisk,
    LiquidationRisk,
}

impl SimulatorVerdict {
    pub fn for_ltv(ltv: f64) -> Self {
        if ltv < SIM_HEALTHY_LTV {
            SimulatorVerdict::Healthy
        } else if ltv < SIM_MODERATE_LTV {
            SimulatorVerdict::ModerateRisk
        } else if ltv < SIM_MAX_LTV {
            SimulatorVerdict::MarginCallRisk
        } else {
            SimulatorVerdict::LiquidationRisk
        }
    }

    pub fn narrative(&self) -> &'static str {
        match self {
            SimulatorVerdict::Healthy => {
                "Loans start at 50% LTV. BTC market price and finance charges will make your LTV fluctuate."
            }
            SimulatorVerdict::ModerateRisk => {
                "Your LTV is rising. If it hits 70%, you'll receive a margin call."
            }
            SimulatorVerdict::MarginCallRisk => {
                "Warning: At 70% LTV, you will be asked to add collateral or repay part of the loan."
            }
            SimulatorVerdict::LiquidationRisk => {
                "Critical: At 83% LTV, a portion of your collateral will be sold to reduce risk."
            }
        }
    }
}

/// One simulated position, returned to the UI collaborator
#[derive(Debug, Serialize, Clone)]
pub struct Simulation {
    pub base_price: f64,
    pub simulated_price: f64,
    pub simulated_ltv: f64,
    pub verdict: SimulatorVerdict,
    pub narrative: &'static str,
}

/// Price/LTV simulator anchored at the current market price
#[derive(Debug, Clone, Copy)]
pub struct PriceSimulator {
    base_price: f64,
}

impl PriceSimulator {
    /// Anchor a simulator at the given baseline price
    pub fn new(base_price: f64) -> Result<Self, LendingError> {
        if base_price <= 0.0 {
            return Err(LendingError::InvalidInput(format!(
                "base price must be positive, got {}",
                base_price
            )));
        }
        Ok(Self { base_price })
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Implied LTV for a simulated price, before clamping.
    /// `new_ltv = BASE_LTV * (base_price / new_price)`
    pub fn ltv_for_price_unclamped(&self, price: f64) -> Result<f64, LendingError> {
        if price <= 0.0 {
            return Err(LendingError::InvalidInput(format!(
                "simulated price must be positive, got {}",
                price
            )));
        }
        Ok(BASE_LTV * (self.base_price / price))
    }

    /// Implied LTV for a simulated price, clamped to the slider range
    pub fn ltv_for_price(&self, price: f64) -> Result<f64, LendingError> {
        Ok(self
            .ltv_for_price_unclamped(price)?
            .clamp(SIM_MIN_LTV, SIM_MAX_LTV))
    }

    /// Implied price for a simulated LTV.
    /// `new_price = base_price * (BASE_LTV / new_ltv)`
    pub fn price_for_ltv(&self, ltv: f64) -> Result<f64, LendingError> {
        if !(SIM_MIN_LTV..=SIM_MAX_LTV).contains(&ltv) {
            return Err(LendingError::InvalidInput(format!(
                "simulated LTV must be within [{}, {}], got {}",
                SIM_MIN_LTV, SIM_MAX_LTV, ltv
            )));
        }
        Ok(self.base_price * (BASE_LTV / ltv))
    }

    /// Full simulation result for a price movement
    pub fn simulate_price(&self, price: f64) -> Result<Simulation, LendingError> {
        let ltv = self.ltv_for_price(price)?;
        let verdict = SimulatorVerdict::for_ltv(ltv);
        Ok(Simulation {
            base_price: self.base_price,
            simulated_price: price,
            simulated_ltv: ltv,
            verdict,
            narrative: verdict.narrative(),
        })
    }

    /// Full simulation result for an LTV movement
    pub fn simulate_ltv(&self, ltv: f64) -> Result<Simulation, LendingError> {
        let price = self.price_for_ltv(ltv)?;
        let verdict = SimulatorVerdict::for_ltv(ltv);
        Ok(Simulation {
            base_price: self.base_price,
            simulated_price: price,
            simulated_ltv: ltv,
            verdict,
            narrative: verdict.narrative(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_drop_raises_ltv() {
        let sim = PriceSimulator::new(8_000_000.0).unwrap();
        // Price rising to 10M drops the implied LTV to 40
        assert!((sim.ltv_for_price(10_000_000.0).unwrap() - 40.0).abs() < 1e-9);
        // Price halving doubles the implied LTV (clamped at 83)
        assert!((sim.ltv_for_price(4_000_000.0).unwrap() - 83.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_round_trip() {
        let sim = PriceSimulator::new(8_000_000.0).unwrap();

        let ltv = sim.ltv_for_price(10_000_000.0).unwrap();
        assert!((ltv - 40.0).abs() < 1e-9);

        let price = sim.price_for_ltv(ltv).unwrap();
        assert!((price - 10_000_000.0).abs() < 1e-6);

        // And back through the unclamped direction exactly
        let ltv_again = sim.ltv_for_price_unclamped(price).unwrap();
        assert!((ltv_again - ltv).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_bounds() {
        let sim = PriceSimulator::new(8_000_000.0).unwrap();
        // Extreme price spike clamps at the low end
        assert_eq!(sim.ltv_for_price(8_000_000_000.0).unwrap(), SIM_MIN_LTV);
        // Extreme crash clamps at the high end
        assert_eq!(sim.ltv_for_price(1_000.0).unwrap(), SIM_MAX_LTV);
    }

    #[test]
    fn test_ltv_out_of_range_rejected() {
        let sim = PriceSimulator::new(8_000_000.0).unwrap();
        assert!(sim.price_for_ltv(9.9).is_err());
        assert!(sim.price_for_ltv(83.1).is_err());
        assert!(sim.price_for_ltv(50.0).is_ok());
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(SimulatorVerdict::for_ltv(50.0), SimulatorVerdict::Healthy);
        assert_eq!(
            SimulatorVerdict::for_ltv(55.0),
            SimulatorVerdict::ModerateRisk
        );
        assert_eq!(
            SimulatorVerdict::for_ltv(70.0),
            SimulatorVerdict::MarginCallRisk
        );
        assert_eq!(
            SimulatorVerdict::for_ltv(83.0),
            SimulatorVerdict::LiquidationRisk
        );
    }

    #[test]
    fn test_rejects_non_positive_baseline() {
        assert!(PriceSimulator::new(0.0).is_err());
        assert!(PriceSimulator::new(-5.0).is_err());
    }
}
