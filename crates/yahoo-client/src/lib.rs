use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use valuation_core::{clean_ticker, FetchError, FundamentalsProvider, RawFundamentals};

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "defaultKeyStatistics,financialData,summaryDetail";

// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Need to wait until the oldest request falls out of the window
            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Yahoo API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Fundamentals supplier over the public Yahoo Finance HTTP API.
///
/// Price comes from the chart endpoint (regular-market price, with the last
/// daily close as fallback); ratios come from the quoteSummary endpoint.
/// B3 tickers get the `.SA` suffix appended on the wire and stripped again
/// in the returned payload.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new() -> Self {
        // Conservative default for the unauthenticated endpoints.
        // Override with YAHOO_RATE_LIMIT (requests per minute).
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// B3 symbols are quoted on Yahoo under the `.SA` suffix.
    fn api_symbol(ticker: &str) -> String {
        format!("{}.SA", clean_ticker(ticker))
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let request = builder.build().map_err(|e| FetchError::Api(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| FetchError::Api("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| FetchError::Api(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 10u64;
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(FetchError::RateLimited)
    }

    /// Current price for a symbol, or `None` when Yahoo has no usable quote.
    async fn fetch_price(&self, symbol: &str) -> Result<Option<f64>, FetchError> {
        let url = format!("{}/{}", CHART_BASE_URL, symbol);

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("range", "1d"), ("interval", "1d")]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Api(format!(
                "Chart HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(extract_price(&chart))
    }

    /// Fundamentals modules for a symbol. Missing modules or fields come
    /// back as `None`; only a fully empty payload is an error.
    async fn fetch_summary(&self, symbol: &str) -> Result<SummaryModules, FetchError> {
        let url = format!("{}/{}", SUMMARY_BASE_URL, symbol);

        let response = self
            .send_request(self.client.get(&url).query(&[("modules", SUMMARY_MODULES)]))
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Api(format!(
                "QuoteSummary HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: QuoteSummaryResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        body.quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::EmptyFundamentals {
                ticker: clean_ticker(symbol),
            })
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    async fn fetch(&self, ticker: &str) -> Result<RawFundamentals, FetchError> {
        let symbol = Self::api_symbol(ticker);

        let price = self.fetch_price(&symbol).await?;
        let summary = self.fetch_summary(&symbol).await?;

        let stats = summary.default_key_statistics.unwrap_or_default();
        let financial = summary.financial_data.unwrap_or_default();
        let detail = summary.summary_detail.unwrap_or_default();

        Ok(RawFundamentals {
            ticker: clean_ticker(ticker),
            price,
            earnings_per_share: stats.trailing_eps.and_then(|v| v.raw),
            book_value_per_share: stats.book_value.and_then(|v| v.raw),
            dividend_yield: detail.dividend_yield.and_then(|v| v.raw),
            return_on_equity: financial.return_on_equity.and_then(|v| v.raw),
            net_margin: financial.profit_margins.and_then(|v| v.raw),
            current_ratio: financial.current_ratio.and_then(|v| v.raw),
        })
    }
}

/// Hybrid price strategy: the meta regular-market price when valid,
/// otherwise the most recent non-null daily close.
fn extract_price(chart: &ChartResponse) -> Option<f64> {
    let result = chart.chart.result.as_ref()?.first()?;

    let meta_price = result.meta.regular_market_price.filter(|p| *p > 0.0);
    if meta_price.is_some() {
        return meta_price;
    }

    result
        .indicators
        .quote
        .first()?
        .close
        .as_ref()?
        .iter()
        .rev()
        .copied()
        .find_map(|c| c.filter(|p| *p > 0.0))
}

// Chart response structures

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartPayload,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    close: Option<Vec<Option<f64>>>,
}

// QuoteSummary response structures. Yahoo wraps every numeric field in a
// `{raw, fmt}` object; only `raw` matters here.

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryPayload,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryPayload {
    #[serde(default)]
    result: Option<Vec<SummaryModules>>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryModules {
    #[serde(rename = "defaultKeyStatistics")]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(rename = "financialData")]
    financial_data: Option<FinancialData>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyStatistics {
    #[serde(rename = "trailingEps")]
    trailing_eps: Option<RawValue>,
    #[serde(rename = "bookValue")]
    book_value: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancialData {
    #[serde(rename = "returnOnEquity")]
    return_on_equity: Option<RawValue>,
    #[serde(rename = "profitMargins")]
    profit_margins: Option<RawValue>,
    #[serde(rename = "currentRatio")]
    current_ratio: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryDetail {
    #[serde(rename = "dividendYield")]
    dividend_yield: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}
