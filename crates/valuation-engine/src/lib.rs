use valuation_core::{EngineConfig, FundamentalsRecord, Status, ValuationResult};

/// Pure valuation engine: fair value, ceiling price, health score and
/// status for one fundamentals record at a time. Stateless and
/// deterministic; safe to share across tasks with no synchronization.
pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Benjamin Graham's intrinsic-value heuristic, `sqrt(22.5 x EPS x BVPS)`.
    /// Undefined for loss-making companies or negative equity; never coerced
    /// to zero, so the classifier can tell "overpriced" from "no data".
    fn graham_fair_value(&self, eps: f64, bvps: f64) -> Option<f64> {
        if eps > 0.0 && bvps > 0.0 {
            Some((22.5 * eps * bvps).sqrt())
        } else {
            None
        }
    }

    /// Percentage by which fair value exceeds the current price.
    fn graham_margin_pct(&self, fair_value: f64, price: f64) -> Option<f64> {
        if fair_value > 0.0 {
            Some((fair_value - price) / fair_value * 100.0)
        } else {
            None
        }
    }

    /// Décio Bazin's maximum buy price: the price at which trailing
    /// dividends yield at least `min_yield_pct`.
    fn bazin_ceiling_price(&self, annual_dividend: f64, min_yield_pct: f64) -> Option<f64> {
        if annual_dividend > 0.0 && min_yield_pct > 0.0 {
            Some(annual_dividend / (min_yield_pct / 100.0))
        } else {
            None
        }
    }

    /// Additive 0-5 rubric over profitability and liquidity ratios. Depends
    /// only on record fields, never on price-derived valuations.
    fn health_score(&self, record: &FundamentalsRecord, config: &EngineConfig) -> u8 {
        let criteria = [
            record.return_on_equity > config.min_roe,
            record.net_margin > config.min_net_margin,
            record.current_ratio > config.min_current_ratio,
            record.earnings_per_share > 0.0,
            record.dividend_yield > config.min_dividend_yield,
        ];
        criteria.iter().filter(|&&met| met).count() as u8
    }

    /// Decision table over the two valuation legs and the health gate.
    /// Comparisons against an undefined ceiling evaluate to false: a
    /// non-paying stock can still reach Watch or Rejected through the
    /// Graham leg, but never Shielded through the Bazin leg.
    fn classify(
        &self,
        margin_pct: Option<f64>,
        ceiling_price: Option<f64>,
        price: f64,
        health_score: u8,
        config: &EngineConfig,
    ) -> Status {
        let margin = match margin_pct {
            Some(m) => m,
            None => return Status::InsufficientData,
        };

        // Inclusive: a price exactly at the ceiling still qualifies.
        let below_ceiling = ceiling_price.map_or(false, |ceiling| price <= ceiling);

        if margin >= config.min_graham_margin_pct && below_ceiling && health_score >= 3 {
            Status::Shielded
        } else if margin > 0.0 || below_ceiling {
            Status::Watch
        } else {
            Status::Rejected
        }
    }

    /// Evaluate one record against the configured thresholds. Never fails:
    /// a record the formulas cannot price comes back as InsufficientData,
    /// so a batch of N tickers always yields N results.
    pub fn evaluate(&self, record: &FundamentalsRecord, config: &EngineConfig) -> ValuationResult {
        let fair_value =
            self.graham_fair_value(record.earnings_per_share, record.book_value_per_share);
        let margin_pct = fair_value.and_then(|fv| self.graham_margin_pct(fv, record.price));

        let annual_dividend = record.annual_dividend();
        let ceiling_price =
            self.bazin_ceiling_price(annual_dividend, config.min_bazin_yield_pct);

        let health_score = self.health_score(record, config);
        let status = self.classify(margin_pct, ceiling_price, record.price, health_score, config);

        ValuationResult {
            ticker: record.ticker.clone(),
            price: record.price,
            graham_fair_value: fair_value,
            graham_margin_pct: margin_pct,
            annual_dividend,
            bazin_ceiling_price: ceiling_price,
            health_score,
            status,
        }
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}
