//! # Bazaarbot Core
//!
//! Data-access core for an Indian stock-market conversational
//! assistant: cached, rate-limited clients for the upstream quote and
//! news providers, plus a deterministic query router.
//!
//! ## Overview
//!
//! This crate provides the foundational components:
//!
//! - **TTL cache** with LRU eviction and a stale-serve window
//! - **Token-bucket limiter** enforcing daily + hourly free-tier budgets
//! - **Retry policy** with exponential backoff and jitter
//! - **Request coalescer** deduplicating concurrent identical fetches
//! - **Market data client** for live quotes, candles, search, trending
//! - **News client** with global call pacing
//! - **Query router** mapping free text to a structured intent
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL + LRU cache with stale window |
//! | [`coalesce`] | Single-flight fetch deduplication |
//! | [`core`] | Composition root ([`CoreBuilder`] / [`Core`]) |
//! | [`domain`] | Domain models (symbols, quotes, candles, articles) |
//! | [`error`] | Validation and source error types |
//! | [`http`] | HTTP transport abstraction |
//! | [`limiter`] | Token-bucket admission control |
//! | [`market`] | Market data client and candle sources |
//! | [`news`] | News client |
//! | [`retry`] | Backoff and retry execution |
//! | [`router`] | Intent/entity query router |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bazaarbot_core::CoreBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let core = CoreBuilder::from_env().build();
//!
//!     let parsed = core.router.parse("What is the price of Reliance?");
//!     for symbol in &parsed.symbols {
//!         if let Some(quote) = core.market.stock_data(symbol).await {
//!             println!("{}: ₹{:.2}", quote.symbol, quote.current_price);
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Query Router    │  free text → intent + symbols + timeframe
//! └────────┬─────────┘
//!          │ (calling code dispatches)
//!          ▼
//! ┌──────────────────┐    ┌──────────────────┐
//! │ MarketDataClient │    │   NewsClient     │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │  TtlCache → Coalescer │  TtlCache → pacing
//!          │  → TokenBucket → Retry│  → TokenBucket → Retry
//!          ▼                       ▼
//! ┌──────────────────────────────────────────┐
//! │      HttpClient (reqwest / noop)         │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! No public entry point panics or propagates upstream failures: quote
//! paths degrade to stale cached data under rate pressure, and every
//! client method returns a normal value (absent or an empty list) on
//! all failure paths. The structured [`SourceError`] taxonomy is
//! internal fuel for those decisions.

pub mod cache;
pub mod coalesce;
pub mod core;
pub mod domain;
pub mod error;
pub mod http;
pub mod limiter;
pub mod market;
pub mod news;
pub mod retry;
pub mod router;

// Re-export commonly used types at crate root for convenience

pub use crate::core::{Core, CoreBuilder};

pub use cache::{Stale, TtlCache};

pub use coalesce::RequestCoalescer;

pub use domain::{Candle, Exchange, ExchangeSymbol, Instrument, NewsArticle, StockData, Timeframe};

pub use error::{SourceError, SourceErrorKind, ValidationError};

pub use http::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

pub use limiter::{
    LimiterRegistry, LimiterStatus, TokenBucketLimiter, MARKET_DATA_SERVICE, NEWS_SERVICE,
};

pub use market::{
    BlockingHttpCandleSource, CandleSource, DisabledCandleSource, MarketDataClient,
    MarketDataConfig,
};

pub use news::{NewsClient, NewsConfig};

pub use retry::{Backoff, RetryConfig};

pub use router::{Intent, ParsedQuery, QueryRouter};
