// Core structs: WishlistItem, Deal, DealPrices and the error types
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WishlistItem {
    #[serde(alias = "accountId")]
    pub steamid: u64,
    #[serde(alias = "appId")]
    pub appid: u32,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    9999
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct DealPrices {
    pub retail_price: f64,
    pub retail_price_low: f64,
    pub keyshop_price: f64,
    pub keyshop_price_low: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Deal {
    pub appid: u32,
    pub name: String,
    pub url: String,
    pub image_url: String,
    pub prices: DealPrices,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Retail,
    Keyshop,
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Retail => write!(f, "retail"),
            Store::Keyshop => write!(f, "keyshop"),
        }
    }
}

impl Deal {
    /// Cheapest current price across retail and keyshop listings.
    /// A price of zero means the store has no listing and is ignored.
    pub fn best_offer(&self) -> Option<(Store, f64)> {
        [
            (Store::Retail, self.prices.retail_price),
            (Store::Keyshop, self.prices.keyshop_price),
        ]
        .into_iter()
        .filter(|(_, price)| *price > 0.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Request body of the pricing batch endpoint.
#[derive(Debug, Serialize)]
pub struct AppIdsRequest<'a> {
    pub appids: &'a [u32],
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("upstream responded with status {status}: {body}")]
    InvalidResponse { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::HttpError(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
