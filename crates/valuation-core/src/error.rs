use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No valid price for {ticker}")]
    MissingPrice { ticker: String },

    #[error("Empty fundamentals payload for {ticker}")]
    EmptyFundamentals { ticker: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Rate limited by supplier after retries")]
    RateLimited,
}
