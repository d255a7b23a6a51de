use serde::{Deserialize, Serialize};

/// Caller-supplied thresholds for valuation and scoring.
///
/// The health-score cutoffs follow the canonical 5-criterion rubric:
/// ROE > 10%, net margin > 10%, current ratio > 1.0, EPS > 0,
/// dividend yield > 4%. Callers that prefer looser cutoffs can override
/// individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum Graham margin of safety (percent) for the best tier.
    pub min_graham_margin_pct: f64,
    /// Target dividend yield (percent) used for the Bazin ceiling price.
    pub min_bazin_yield_pct: f64,
    /// Return-on-equity cutoff (fraction) worth one health point.
    pub min_roe: f64,
    /// Net-margin cutoff (fraction) worth one health point.
    pub min_net_margin: f64,
    /// Current-ratio cutoff worth one health point.
    pub min_current_ratio: f64,
    /// Dividend-yield cutoff (fraction) worth one health point.
    pub min_dividend_yield: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_graham_margin_pct: 20.0,
            min_bazin_yield_pct: 6.0,
            min_roe: 0.10,
            min_net_margin: 0.10,
            min_current_ratio: 1.0,
            min_dividend_yield: 0.04,
        }
    }
}
