use crate::{FetchError, RawFundamentals};
use async_trait::async_trait;

/// Trait for market-data suppliers: given a ticker, deliver one raw
/// fundamentals payload or a typed fetch error.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<RawFundamentals, FetchError>;
}
