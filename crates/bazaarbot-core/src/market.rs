//! Market data client: live quotes, historical candles, instrument
//! search and the trending list.
//!
//! The quote path layers the shared infrastructure in a fixed order:
//! fresh cache, then single-flight coalescing, then the local token
//! bucket, then the upstream call wrapped in the retry policy. Rate
//! pressure and upstream failure degrade to stale cached data before
//! giving up. Every public method returns a normal value (possibly
//! absent or empty) on all failure paths.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::coalesce::RequestCoalescer;
use crate::domain::{Candle, ExchangeSymbol, Instrument, StockData, Timeframe};
use crate::error::SourceError;
use crate::http::{HttpClient, HttpRequest};
use crate::limiter::TokenBucketLimiter;
use crate::retry::RetryConfig;

/// Curated large-cap symbols used for the trending list.
const TRENDING_SYMBOLS: [&str; 8] = [
    "RELIANCE",
    "TCS",
    "HDFCBANK",
    "ICICIBANK",
    "INFY",
    "SBIN",
    "ITC",
    "BHARTIARTL",
];

/// Tuning knobs for the market data client.
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub quote_base_url: String,
    pub search_base_url: String,
    pub quote_timeout: Duration,
    pub quote_cache_size: usize,
    pub quote_ttl: Duration,
    pub quote_stale_window: Duration,
    pub history_cache_size: usize,
    pub history_ttl: Duration,
    pub search_cache_size: usize,
    pub search_ttl: Duration,
    pub retry: RetryConfig,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quote_base_url: String::from("https://groww.in/v1/api/stocks_data/v1"),
            search_base_url: String::from(
                "https://groww.in/v1/api/search/v3/query/globalSuggestion/exchange/NSE_EQ",
            ),
            quote_timeout: Duration::from_secs(10),
            quote_cache_size: 200,
            quote_ttl: Duration::from_secs(30),
            quote_stale_window: Duration::from_secs(300),
            history_cache_size: 50,
            history_ttl: Duration::from_secs(300),
            search_cache_size: 50,
            search_ttl: Duration::from_secs(600),
            retry: RetryConfig::exponential(2, Duration::from_millis(500)),
        }
    }
}

/// Historical candle capability.
///
/// The candle source is a blocking call by contract (the client runs
/// it on the blocking worker pool). Selected at construction time:
/// [`BlockingHttpCandleSource`] when charting is configured,
/// [`DisabledCandleSource`] otherwise.
pub trait CandleSource: Send + Sync {
    fn fetch(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<Candle>, SourceError>;
}

/// Candle source for builds without chart data configured.
#[derive(Debug, Default)]
pub struct DisabledCandleSource;

impl CandleSource for DisabledCandleSource {
    fn fetch(&self, ticker: &str, _range: &str, _interval: &str) -> Result<Vec<Candle>, SourceError> {
        Err(SourceError::not_found(format!(
            "historical data source is not configured (requested {ticker})"
        )))
    }
}

/// HTTP-only candle source against the public chart API.
pub struct BlockingHttpCandleSource {
    base_url: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl BlockingHttpCandleSource {
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com/v8/finance/chart")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            client: reqwest::blocking::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }
}

impl Default for BlockingHttpCandleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CandleSource for BlockingHttpCandleSource {
    fn fetch(&self, ticker: &str, range: &str, interval: &str) -> Result<Vec<Candle>, SourceError> {
        let url = format!(
            "{}/{}?range={}&interval={}",
            self.base_url,
            urlencoding::encode(ticker),
            range,
            interval
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .map_err(|e| SourceError::unavailable(format!("chart transport error: {e}")))?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(SourceError::rate_limited("chart provider rate limited"));
        }
        if !(200..300).contains(&status) {
            return Err(SourceError::unavailable(format!(
                "chart endpoint returned status {status}"
            )));
        }

        let body = response
            .text()
            .map_err(|e| SourceError::unavailable(format!("chart read error: {e}")))?;
        let chart: ChartResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::internal(format!("failed to parse chart payload: {e}")))?;

        let result = chart
            .chart
            .result
            .first()
            .ok_or_else(|| SourceError::not_found(format!("no chart data for {ticker}")))?;
        let timestamps = result
            .timestamp
            .as_ref()
            .ok_or_else(|| SourceError::not_found(format!("no candle timestamps for {ticker}")))?;
        let quote = result
            .indicators
            .quote
            .first()
            .ok_or_else(|| SourceError::not_found(format!("no candle series for {ticker}")))?;

        let mut candles = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            if let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
                quote.open.get(i),
                quote.high.get(i),
                quote.low.get(i),
                quote.close.get(i),
            ) {
                candles.push(Candle {
                    ts,
                    open: *open,
                    high: *high,
                    low: *low,
                    close: *close,
                    volume: quote.volume.get(i).copied().flatten().map(|v| v as u64),
                });
            }
        }

        Ok(candles)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchEntity>,
}

#[derive(Debug, Deserialize)]
struct SearchEntity {
    #[serde(default)]
    entity_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    nse_scrip_code: Option<String>,
    #[serde(default)]
    bse_scrip_code: Option<String>,
}

/// Cached, rate-limited client for the upstream market data provider.
#[derive(Clone)]
pub struct MarketDataClient {
    http: Arc<dyn HttpClient>,
    candles: Arc<dyn CandleSource>,
    limiter: Arc<TokenBucketLimiter>,
    coalescer: Arc<RequestCoalescer<Value>>,
    quote_cache: Arc<TtlCache<Value>>,
    history_cache: Arc<TtlCache<Vec<Candle>>>,
    search_cache: Arc<TtlCache<Vec<Instrument>>>,
    config: Arc<MarketDataConfig>,
}

impl MarketDataClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        candles: Arc<dyn CandleSource>,
        limiter: Arc<TokenBucketLimiter>,
        config: MarketDataConfig,
    ) -> Self {
        Self {
            http,
            candles,
            limiter,
            coalescer: Arc::new(RequestCoalescer::new()),
            quote_cache: Arc::new(TtlCache::new(
                config.quote_cache_size,
                config.quote_ttl,
                config.quote_stale_window,
            )),
            history_cache: Arc::new(TtlCache::with_ttl(
                config.history_cache_size,
                config.history_ttl,
            )),
            search_cache: Arc::new(TtlCache::with_ttl(
                config.search_cache_size,
                config.search_ttl,
            )),
            config: Arc::new(config),
        }
    }

    /// Raw live price payload for a symbol, served from cache when
    /// fresh and coalesced across concurrent callers when cold.
    pub async fn live_price(&self, symbol: &str) -> Option<Value> {
        let parsed = match ExchangeSymbol::parse(symbol) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(symbol, %error, "rejecting unparseable symbol");
                return None;
            }
        };

        let key = format!("price:{}", parsed.cache_token());
        if let Some(cached) = self.quote_cache.get(&key) {
            return Some(cached);
        }

        match self
            .coalescer
            .coalesce(&key, || self.fetch_quote(&parsed, &key))
            .await
        {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(symbol = %parsed, %error, "live price unavailable");
                None
            }
        }
    }

    async fn fetch_quote(
        &self,
        symbol: &ExchangeSymbol,
        cache_key: &str,
    ) -> Result<Value, SourceError> {
        if !self.limiter.acquire() {
            if let Some(stale) = self.quote_cache.get_allow_stale(cache_key) {
                tracing::warn!(
                    symbol = %symbol,
                    "local call budget exhausted, serving stale quote"
                );
                return Ok(stale.value);
            }
            return Err(SourceError::rate_limited(
                "market-data call budget exhausted and no stale quote available",
            ));
        }

        let url = format!(
            "{}/accord_points/exchange/{}/segment/CASH/latest_prices_ohlc/{}",
            self.config.quote_base_url,
            symbol.exchange().as_str(),
            symbol.symbol()
        );
        let request = HttpRequest::get(url).with_timeout(self.config.quote_timeout);

        let response = match self
            .config
            .retry
            .run("market.quote", || self.http.execute(request.clone()))
            .await
        {
            Ok(response) => response,
            Err(error) => {
                if let Some(stale) = self.quote_cache.get_allow_stale(cache_key) {
                    tracing::warn!(
                        symbol = %symbol,
                        %error,
                        "quote transport failed, serving stale quote"
                    );
                    return Ok(stale.value);
                }
                return Err(SourceError::unavailable(format!(
                    "quote transport failed: {error}"
                )));
            }
        };

        if response.is_rate_limited() {
            if let Some(stale) = self.quote_cache.get_allow_stale(cache_key) {
                tracing::warn!(
                    symbol = %symbol,
                    "provider rate limited, serving stale quote"
                );
                return Ok(stale.value);
            }
            return Err(SourceError::rate_limited(
                "quote provider rate limited and no stale quote available",
            ));
        }

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "quote endpoint returned status {}",
                response.status
            )));
        }

        let value: Value = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::internal(format!("failed to parse quote payload: {e}")))?;
        self.quote_cache.set(cache_key, value.clone());
        Ok(value)
    }

    /// Normalized quote, or absent when the raw fetch failed or the
    /// payload cannot be coerced.
    pub async fn stock_data(&self, symbol: &str) -> Option<StockData> {
        let parsed = ExchangeSymbol::parse(symbol).ok()?;
        let raw = self.live_price(symbol).await?;

        match normalize_quote(&parsed, &raw) {
            Some(data) => Some(data),
            None => {
                tracing::warn!(symbol = %parsed, "quote payload missing required fields");
                None
            }
        }
    }

    /// Historical OHLCV candles for the given timeframe, fetched on
    /// the blocking worker pool and cached for a few minutes.
    pub async fn historical_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Option<Vec<Candle>> {
        let parsed = ExchangeSymbol::parse(symbol).ok()?;
        let key = format!("history:{}:{}", parsed.cache_token(), timeframe.as_str());
        if let Some(cached) = self.history_cache.get(&key) {
            return Some(cached);
        }

        let (range, interval) = timeframe.candle_window();
        let ticker = parsed.candle_ticker();
        let source = Arc::clone(&self.candles);

        let fetched =
            tokio::task::spawn_blocking(move || source.fetch(&ticker, range, interval)).await;

        let candles = match fetched {
            Ok(Ok(candles)) => normalize_candles(candles),
            Ok(Err(error)) => {
                tracing::warn!(symbol = %parsed, timeframe = %timeframe, %error, "candle fetch failed");
                return None;
            }
            Err(error) => {
                tracing::error!(symbol = %parsed, %error, "candle fetch task failed");
                return None;
            }
        };

        if candles.is_empty() {
            return None;
        }

        self.history_cache.set(key, candles.clone());
        Some(candles)
    }

    /// Equity instruments matching a free-text query. Always returns a
    /// list; empty on no match or any failure.
    pub async fn search_stocks(&self, query: &str, limit: usize) -> Vec<Instrument> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() || limit == 0 {
            return Vec::new();
        }

        let key = format!("search:{normalized}");
        if let Some(cached) = self.search_cache.get(&key) {
            return cached.into_iter().take(limit).collect();
        }

        let request = HttpRequest::get(self.config.search_base_url.clone())
            .with_query("query", normalized.clone())
            .with_query("size", limit.to_string())
            .with_timeout(self.config.quote_timeout);

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(query = %normalized, %error, "instrument search failed");
                return Vec::new();
            }
        };

        if !response.is_success() {
            tracing::warn!(
                query = %normalized,
                status = response.status,
                "instrument search returned non-success status"
            );
            return Vec::new();
        }

        let parsed: SearchResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(query = %normalized, %error, "unparseable search payload");
                return Vec::new();
            }
        };

        let instruments = parsed
            .data
            .into_iter()
            .filter(|entity| entity.entity_type == "STOCKS")
            .filter_map(|entity| {
                let (symbol, exchange) = match (entity.nse_scrip_code, entity.bse_scrip_code) {
                    (Some(code), _) if !code.is_empty() => (code, Some(String::from("NSE"))),
                    (_, Some(code)) if !code.is_empty() => (code, Some(String::from("BSE"))),
                    _ => return None,
                };
                Some(Instrument {
                    symbol,
                    name: entity.title,
                    exchange,
                })
            })
            .collect::<Vec<_>>();

        self.search_cache.set(key, instruments.clone());
        instruments.into_iter().take(limit).collect()
    }

    /// Live quotes for the curated trending list, fetched
    /// concurrently. Symbols that fail to resolve are dropped.
    pub async fn trending_stocks(&self) -> Vec<StockData> {
        let mut tasks = tokio::task::JoinSet::new();
        for (index, symbol) in TRENDING_SYMBOLS.iter().enumerate() {
            let client = self.clone();
            tasks.spawn(async move { (index, client.stock_data(symbol).await) });
        }

        let mut slots: Vec<Option<StockData>> = vec![None; TRENDING_SYMBOLS.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, Some(data))) = joined {
                slots[index] = Some(data);
            }
        }

        slots.into_iter().flatten().collect()
    }
}

fn normalize_quote(symbol: &ExchangeSymbol, raw: &Value) -> Option<StockData> {
    let current_price = raw.get("ltp")?.as_f64()?;

    let float = |field: &str| raw.get(field).and_then(Value::as_f64);
    let name = raw
        .get("displayName")
        .and_then(Value::as_str)
        .unwrap_or(symbol.symbol())
        .to_owned();

    Some(StockData {
        symbol: symbol.to_string(),
        name,
        current_price,
        change: float("dayChange").unwrap_or(0.0),
        change_percent: float("dayChangePerc").unwrap_or(0.0),
        open: float("open").unwrap_or(0.0),
        high: float("high").unwrap_or(0.0),
        low: float("low").unwrap_or(0.0),
        prev_close: float("close").unwrap_or(0.0),
        volume: raw.get("volume").and_then(Value::as_u64).filter(|v| *v > 0),
        week_52_high: float("yearHighPrice"),
        week_52_low: float("yearLowPrice"),
        last_updated: time::OffsetDateTime::now_utc().unix_timestamp(),
    })
}

fn normalize_candles(candles: Vec<Candle>) -> Vec<Candle> {
    candles
        .into_iter()
        .map(|candle| Candle {
            ts: candle.ts,
            open: round_cents(candle.open),
            high: round_cents(candle.high),
            low: round_cents(candle.low),
            close: round_cents(candle.close),
            volume: candle.volume.filter(|v| *v > 0),
        })
        .collect()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
