//! Bet sizing: confidence tiers and fractional Kelly.

use serde::Serialize;
use std::fmt;

/// Net payout per unit staked at -110
pub const STANDARD_PAYOUT: f64 = 100.0 / 110.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    Max,
    Standard,
    Lean,
    Pass,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.60 {
            ConfidenceTier::Max
        } else if confidence >= 0.55 {
            ConfidenceTier::Standard
        } else if confidence > 0.53 {
            ConfidenceTier::Lean
        } else {
            ConfidenceTier::Pass
        }
    }

    /// Suggested stake in units
    pub fn units(&self) -> f64 {
        match self {
            ConfidenceTier::Max => 1.5,
            ConfidenceTier::Standard => 1.0,
            ConfidenceTier::Lean => 0.5,
            ConfidenceTier::Pass => 0.0,
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::Max => write!(f, "MAX (1.5u)"),
            ConfidenceTier::Standard => write!(f, "STANDARD (1.0u)"),
            ConfidenceTier::Lean => write!(f, "LEAN (0.5u)"),
            ConfidenceTier::Pass => write!(f, "PASS"),
        }
    }
}

/// Full Kelly fraction `f* = (b*p - q) / b`, floored at zero
pub fn kelly_fraction(win_prob: f64, payout: f64) -> f64 {
    if payout <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - win_prob;
    ((payout * win_prob - q) / payout).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KellySettings {
    pub bankroll: f64,
    /// Fractional Kelly multiplier
    pub fraction: f64,
    /// Only stake when the win probability is strictly above this
    pub min_prob: f64,
    pub payout: f64,
}

impl Default for KellySettings {
    fn default() -> Self {
        Self {
            bankroll: 1000.0,
            fraction: 0.25,
            min_prob: 0.53,
            payout: STANDARD_PAYOUT,
        }
    }
}

impl KellySettings {
    /// Dollar stake for a pick with this win probability
    pub fn stake(&self, win_prob: f64) -> f64 {
        if win_prob <= self.min_prob {
            return 0.0;
        }
        self.bankroll * self.fraction * kelly_fraction(win_prob, self.payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tiers() {
        assert_eq!(ConfidenceTier::from_confidence(0.61), ConfidenceTier::Max);
        assert_eq!(ConfidenceTier::from_confidence(0.60), ConfidenceTier::Max);
        assert_eq!(ConfidenceTier::from_confidence(0.55), ConfidenceTier::Standard);
        assert_eq!(ConfidenceTier::from_confidence(0.535), ConfidenceTier::Lean);
        assert_eq!(ConfidenceTier::from_confidence(0.53), ConfidenceTier::Pass);
        assert_relative_eq!(ConfidenceTier::Lean.units(), 0.5);
    }

    #[test]
    fn test_kelly_no_edge_at_break_even() {
        // Break-even at -110 is 110/210
        assert_relative_eq!(kelly_fraction(110.0 / 210.0, STANDARD_PAYOUT), 0.0, epsilon = 1e-12);
        assert_relative_eq!(kelly_fraction(0.4, STANDARD_PAYOUT), 0.0);
    }

    #[test]
    fn test_quarter_kelly_stake() {
        let kelly = KellySettings::default();
        let p: f64 = 0.60;
        let b = 100.0 / 110.0;
        let expected = 1000.0 * 0.25 * (b * p - (1.0 - p)) / b;
        assert_relative_eq!(kelly.stake(p), expected, epsilon = 1e-9);
        assert!(kelly.stake(p) > 0.0);
        // At or below the threshold nothing is staked
        assert_relative_eq!(kelly.stake(0.53), 0.0);
        assert_relative_eq!(kelly.stake(0.45), 0.0);
    }
}
