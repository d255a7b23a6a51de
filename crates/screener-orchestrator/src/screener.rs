use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::task::JoinSet;
use valuation_core::{EngineConfig, FundamentalsProvider, FundamentalsRecord, ValuationResult};
use valuation_engine::ValuationEngine;

/// One ticker the supplier could not answer for. The rest of the batch is
/// unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    /// Valuations ordered by status tier, then margin of safety descending.
    pub results: Vec<ValuationResult>,
    pub failures: Vec<TickerFailure>,
    pub total_requested: usize,
    pub timestamp: DateTime<Utc>,
}

/// Batch screener: fans out one fetch per ticker, applies the pure engine to
/// each record, and degrades per ticker instead of aborting the run.
pub struct Screener {
    provider: Arc<dyn FundamentalsProvider>,
    engine: ValuationEngine,
    config: EngineConfig,
}

impl Screener {
    pub fn new(provider: Arc<dyn FundamentalsProvider>, config: EngineConfig) -> Self {
        Self {
            provider,
            engine: ValuationEngine::new(),
            config,
        }
    }

    pub async fn screen(&self, tickers: &[String]) -> ScreenReport {
        let total_requested = tickers.len();
        tracing::info!("Screening {} tickers", total_requested);

        // Fetching is the only suspend point; valuation itself is O(1) and
        // runs on the collecting side.
        let mut tasks = JoinSet::new();
        for ticker in tickers {
            let provider = Arc::clone(&self.provider);
            let ticker = ticker.clone();
            tasks.spawn(async move {
                let payload = provider.fetch(&ticker).await;
                (ticker, payload)
            });
        }

        let mut results = Vec::new();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ticker, Ok(raw))) => match FundamentalsRecord::from_raw(raw) {
                    Ok(record) => results.push(self.engine.evaluate(&record, &self.config)),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", ticker, e);
                        failures.push(TickerFailure {
                            ticker,
                            error: e.to_string(),
                        });
                    }
                },
                Ok((ticker, Err(e))) => {
                    tracing::warn!("Failed to fetch {}: {}", ticker, e);
                    failures.push(TickerFailure {
                        ticker,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!("Task error: {}", e);
                }
            }
        }

        sort_results(&mut results);

        tracing::info!(
            "Screen complete: {} valued, {} failed out of {}",
            results.len(),
            failures.len(),
            total_requested
        );

        ScreenReport {
            results,
            failures,
            total_requested,
            timestamp: Utc::now(),
        }
    }
}

/// Best status tier first; within a tier, widest margin of safety first,
/// undefined margins last.
fn sort_results(results: &mut [ValuationResult]) {
    results.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| compare_margin_desc(a.graham_margin_pct, b.graham_margin_pct))
    });
}

fn compare_margin_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
