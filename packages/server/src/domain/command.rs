//! Classification of inbound chat text.
//!
//! Every inbound frame is classified exactly once at ingestion. The raw text
//! is always broadcast as chat; a recognised command additionally triggers
//! its side effect.

/// Prefix of the stock quote command (`/stock=<ticker>`).
pub const STOCK_COMMAND_PREFIX: &str = "/stock=";

/// Recognised kinds of inbound text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Ordinary chat text
    Plain,
    /// Stock quote lookup for a non-empty, trimmed ticker
    StockQuote { ticker: String },
}

impl ChatCommand {
    /// Classify a raw client frame.
    ///
    /// A `/stock=` prefix whose ticker is blank after trimming is plain chat.
    pub fn classify(text: &str) -> Self {
        match text.strip_prefix(STOCK_COMMAND_PREFIX).map(str::trim) {
            Some(ticker) if !ticker.is_empty() => Self::StockQuote {
                ticker: ticker.to_string(),
            },
            _ => Self::Plain,
        }
    }
}
