//! Domain types for the market assistant core.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExchangeSymbol`] | Validated exchange-qualified trading symbol |
//! | [`Exchange`] | NSE / BSE exchange identifier |
//! | [`Timeframe`] | Chart lookback window (1d .. 5y) |
//! | [`StockData`] | Normalized real-time quote |
//! | [`Candle`] | OHLCV record |
//! | [`Instrument`] | Symbol-search result |
//! | [`NewsArticle`] | Normalized news article |

mod models;
mod symbol;
mod timeframe;

pub use models::{Candle, Instrument, NewsArticle, StockData};
pub use symbol::{Exchange, ExchangeSymbol};
pub use timeframe::Timeframe;
