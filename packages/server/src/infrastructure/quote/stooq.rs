//! Stooq CSV quote lookup.
//!
//! `GET <base>/q/l/?s=<ticker>&f=sd2t2ohlcv&h&e=csv` answers with a header
//! row followed by one data row:
//!
//! ```text
//! Symbol,Date,Time,Open,High,Low,Close,Volume
//! AAPL.US,2024-01-02,22:00:05,187.15,188.44,183.89,185.64,82488674
//! ```
//!
//! Unknown symbols come back with `N/D` in every field.

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::domain::{QuoteError, QuoteFetcher};

pub const DEFAULT_STOOQ_URL: &str = "https://stooq.com";

/// Index of the close price in a data row.
const CLOSE_COLUMN: usize = 6;

/// Marker stooq uses for missing values.
const NO_DATA: &str = "N/D";

pub struct StooqQuoteFetcher {
    base_url: String,
    client: Client,
}

impl StooqQuoteFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn quote_url(&self, ticker: &str) -> Result<Url, QuoteError> {
        let mut url = Url::parse(&format!("{}/q/l/", self.base_url.trim_end_matches('/')))
            .map_err(|e| QuoteError::Unavailable(format!("invalid quote url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("s", ticker)
            .append_pair("f", "sd2t2ohlcv")
            .append_key_only("h")
            .append_pair("e", "csv");
        Ok(url)
    }
}

impl Default for StooqQuoteFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_STOOQ_URL)
    }
}

#[async_trait]
impl QuoteFetcher for StooqQuoteFetcher {
    async fn fetch(&self, ticker: &str) -> Result<String, QuoteError> {
        let url = self.quote_url(ticker)?;
        tracing::debug!("Fetching quote: {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteError::Unavailable(format!(
                "quote service answered {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;

        parse_close_price(&body, ticker)
    }
}

/// Extract the close price from a stooq CSV response.
pub fn parse_close_price(csv: &str, ticker: &str) -> Result<String, QuoteError> {
    let row = csv
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .ok_or_else(|| QuoteError::NotFound(ticker.to_string()))?;

    match row.split(',').nth(CLOSE_COLUMN).map(str::trim) {
        Some(close) if !close.is_empty() && close != NO_DATA => Ok(close.to_string()),
        _ => Err(QuoteError::NotFound(ticker.to_string())),
    }
}
