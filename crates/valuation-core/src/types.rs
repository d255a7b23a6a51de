use serde::{Deserialize, Serialize};

use crate::FetchError;

/// Raw fundamentals payload as delivered by a supplier.
/// Field presence is uncontrolled; everything except the ticker may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFundamentals {
    pub ticker: String,
    pub price: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    /// May arrive as a fraction (0.07) or as a whole percentage (7.0).
    pub dividend_yield: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub net_margin: Option<f64>,
    pub current_ratio: Option<f64>,
}

/// One normalized snapshot of a ticker at analysis time.
///
/// Every ratio field other than price defaults to 0 when the supplier omits
/// it: "unknown" is scored as "neutral", not treated as a data error. Only a
/// missing price is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    /// Uppercase, exchange suffix stripped (e.g. "PETR4").
    pub ticker: String,
    pub price: f64,
    pub earnings_per_share: f64,
    pub book_value_per_share: f64,
    /// Annualized trailing yield as a fraction, normalized at ingestion.
    pub dividend_yield: f64,
    pub return_on_equity: f64,
    pub net_margin: f64,
    pub current_ratio: f64,
}

impl FundamentalsRecord {
    /// Normalize a raw payload into a stable record.
    ///
    /// Returns `FetchError::MissingPrice` when the price is absent, zero or
    /// negative. Dividend-yield values >= 1.0 are taken to be whole
    /// percentages and divided by 100; this rule is applied here exactly
    /// once, so every downstream consumer sees a fraction.
    pub fn from_raw(raw: RawFundamentals) -> Result<Self, FetchError> {
        let ticker = clean_ticker(&raw.ticker);

        let price = match raw.price {
            Some(p) if p > 0.0 => p,
            _ => return Err(FetchError::MissingPrice { ticker }),
        };

        let dividend_yield = raw.dividend_yield.map_or(0.0, normalize_dividend_yield);

        Ok(Self {
            ticker,
            price,
            earnings_per_share: raw.earnings_per_share.unwrap_or(0.0),
            book_value_per_share: raw.book_value_per_share.unwrap_or(0.0),
            dividend_yield,
            return_on_equity: raw.return_on_equity.unwrap_or(0.0),
            net_margin: raw.net_margin.unwrap_or(0.0),
            current_ratio: raw.current_ratio.unwrap_or(0.0),
        })
    }

    /// Trailing dividends paid per share over one year, in currency.
    pub fn annual_dividend(&self) -> f64 {
        self.price * self.dividend_yield
    }
}

/// Uppercase and strip the B3 exchange suffix.
pub fn clean_ticker(ticker: &str) -> String {
    let upper = ticker.trim().to_uppercase();
    upper.strip_suffix(".SA").unwrap_or(&upper).to_string()
}

/// Values below 1.0 are already fractions; anything else is a whole
/// percentage. Suppliers deliver both shapes inconsistently.
pub fn normalize_dividend_yield(raw: f64) -> f64 {
    if raw < 1.0 {
        raw
    } else {
        raw / 100.0
    }
}

/// Status bucket for one ticker. Each classification is independent; there
/// is no transition history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Passed the Graham margin, the Bazin ceiling and the health gate.
    Shielded,
    /// Some margin of safety or below the ceiling, but not all gates.
    Watch,
    /// No margin and above the ceiling.
    Rejected,
    /// Graham fair value undefined (loss-making or negative equity).
    InsufficientData,
}

impl Status {
    /// Sort rank, best tier first.
    pub fn rank(&self) -> u8 {
        match self {
            Status::Shielded => 0,
            Status::Watch => 1,
            Status::Rejected => 2,
            Status::InsufficientData => 3,
        }
    }

    /// Human-readable label for the status
    pub fn as_label(&self) -> &'static str {
        match self {
            Status::Shielded => "Shielded",
            Status::Watch => "Watch",
            Status::Rejected => "Rejected",
            Status::InsufficientData => "Insufficient Data",
        }
    }
}

/// Derived valuation for one ticker. Pure function of one
/// `FundamentalsRecord` and the caller's `EngineConfig`; deterministic, so
/// two runs over the same inputs are identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub ticker: String,
    pub price: f64,
    /// `sqrt(22.5 x EPS x BVPS)`; `None` when EPS or BVPS is non-positive.
    pub graham_fair_value: Option<f64>,
    /// Percentage margin of price below fair value; `None` with fair value.
    pub graham_margin_pct: Option<f64>,
    pub annual_dividend: f64,
    /// `None` when the ticker pays no dividend.
    pub bazin_ceiling_price: Option<f64>,
    /// 0 to 5, one point per health criterion.
    pub health_score: u8,
    pub status: Status,
}
