use serde::{Deserialize, Serialize};

/// Normalized real-time quote produced by the market data client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockData {
    /// Exchange-qualified display symbol, e.g. `NSE-RELIANCE`.
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    /// Day change, absolute.
    pub change: f64,
    /// Day change, percent.
    pub change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub volume: Option<u64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    /// Unix seconds at normalization time.
    pub last_updated: i64,
}

/// One OHLCV candle. Prices are rounded to cent precision upstream of
/// this type; `volume` is `None` when the provider reports zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds for the bucket open.
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Equity instrument returned by symbol search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
}

/// Normalized news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    /// Truncated to at most 200 characters.
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    pub image: Option<String>,
}
