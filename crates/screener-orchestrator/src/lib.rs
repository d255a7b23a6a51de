use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use valuation_core::{clean_ticker, FetchError, FundamentalsProvider, RawFundamentals};

pub mod screener;
pub mod watchlist;

pub use screener::{ScreenReport, Screener, TickerFailure};
pub use watchlist::{JsonFileWatchlist, WatchlistStore};

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// 15 minutes, matching the quote refresh interval of the dashboards this
/// feeds.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 900;

/// Cache-aside decorator over any fundamentals provider. Successful payloads
/// are kept per ticker for the TTL; errors are never cached, so a flaky
/// ticker is retried on the next screen.
pub struct CachedProvider<P> {
    inner: P,
    ttl_secs: i64,
    cache: DashMap<String, CacheEntry<RawFundamentals>>,
}

impl<P: FundamentalsProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL_SECS)
    }

    pub fn with_ttl(inner: P, ttl_secs: i64) -> Self {
        Self {
            inner,
            ttl_secs,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl<P: FundamentalsProvider> FundamentalsProvider for CachedProvider<P> {
    async fn fetch(&self, ticker: &str) -> Result<RawFundamentals, FetchError> {
        let cache_key = clean_ticker(ticker);
        if let Some(entry) = self.cache.get(&cache_key) {
            let age = (Utc::now() - entry.cached_at).num_seconds();
            if age < self.ttl_secs {
                return Ok(entry.data.clone());
            }
        }

        let raw = self.inner.fetch(ticker).await?;

        self.cache.insert(
            cache_key,
            CacheEntry {
                data: raw.clone(),
                cached_at: Utc::now(),
            },
        );

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts how many times it is actually hit.
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FundamentalsProvider for CountingProvider {
        async fn fetch(&self, ticker: &str) -> Result<RawFundamentals, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawFundamentals {
                ticker: ticker.to_string(),
                price: Some(10.0),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_second_fetch_within_ttl_hits_cache() {
        let provider = CachedProvider::with_ttl(CountingProvider::new(), 3600);

        provider.fetch("PETR4").await.unwrap();
        provider.fetch("PETR4").await.unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let provider = CachedProvider::with_ttl(CountingProvider::new(), 0);

        provider.fetch("PETR4").await.unwrap();
        provider.fetch("PETR4").await.unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_key_ignores_suffix_and_case() {
        let provider = CachedProvider::with_ttl(CountingProvider::new(), 3600);

        provider.fetch("petr4").await.unwrap();
        provider.fetch("PETR4.SA").await.unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_tickers_are_cached_separately() {
        let provider = CachedProvider::with_ttl(CountingProvider::new(), 3600);

        provider.fetch("PETR4").await.unwrap();
        provider.fetch("VALE3").await.unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
    }
}
