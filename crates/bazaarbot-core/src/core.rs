//! Composition root wiring the shared infrastructure into clients.
//!
//! All process-wide state — the limiter registry, caches, transport —
//! is constructed exactly once here and handed to the clients by
//! shared handle. Nothing in this crate reaches for globals;
//! environment variables are read only by [`CoreBuilder::from_env`].

use std::env;
use std::sync::Arc;

use crate::http::{HttpClient, NoopHttpClient, ReqwestHttpClient};
use crate::limiter::{LimiterRegistry, LimiterStatus, TokenBucketLimiter, MARKET_DATA_SERVICE, NEWS_SERVICE};
use crate::market::{
    BlockingHttpCandleSource, CandleSource, DisabledCandleSource, MarketDataClient,
    MarketDataConfig,
};
use crate::news::{NewsClient, NewsConfig};
use crate::router::QueryRouter;

/// Builder for the assembled core services.
///
/// # Environment variables (read by [`CoreBuilder::from_env`] only)
///
/// | Variable | Fallback | Purpose |
/// |----------|----------|---------|
/// | `BAZAARBOT_NEWS_API_KEY` | `NEWSDATA_API_KEY` | News provider key |
/// | `BAZAARBOT_QUOTE_BASE_URL` | built-in default | Quote endpoint |
/// | `BAZAARBOT_SEARCH_BASE_URL` | built-in default | Search endpoint |
/// | `BAZAARBOT_CHART_BASE_URL` | built-in default | Candle endpoint |
#[derive(Default)]
pub struct CoreBuilder {
    use_mock: bool,
    http_client: Option<Arc<dyn HttpClient>>,
    candle_source: Option<Arc<dyn CandleSource>>,
    news_api_key: Option<String>,
    market_config: Option<MarketDataConfig>,
    news_config: Option<NewsConfig>,
    disable_charts: bool,
}

impl CoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preconfigured from the process environment.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        builder.news_api_key = env::var("BAZAARBOT_NEWS_API_KEY")
            .or_else(|_| env::var("NEWSDATA_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        let mut market_config = MarketDataConfig::default();
        if let Ok(base) = env::var("BAZAARBOT_QUOTE_BASE_URL") {
            market_config.quote_base_url = base;
        }
        if let Ok(base) = env::var("BAZAARBOT_SEARCH_BASE_URL") {
            market_config.search_base_url = base;
        }
        builder.market_config = Some(market_config);

        if let Ok(base) = env::var("BAZAARBOT_CHART_BASE_URL") {
            builder.candle_source = Some(Arc::new(BlockingHttpCandleSource::with_base_url(base)));
        }

        builder
    }

    /// All transports become offline no-ops; useful for tests and dry
    /// runs.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_candle_source(mut self, candle_source: Arc<dyn CandleSource>) -> Self {
        self.candle_source = Some(candle_source);
        self
    }

    pub fn with_news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    pub fn with_market_config(mut self, config: MarketDataConfig) -> Self {
        self.market_config = Some(config);
        self
    }

    pub fn with_news_config(mut self, config: NewsConfig) -> Self {
        self.news_config = Some(config);
        self
    }

    pub fn with_charts_disabled(mut self) -> Self {
        self.disable_charts = true;
        self
    }

    pub fn build(self) -> Core {
        let limiters = LimiterRegistry::with_defaults();

        let http: Arc<dyn HttpClient> = match self.http_client {
            Some(client) => client,
            None if self.use_mock => Arc::new(NoopHttpClient),
            None => Arc::new(ReqwestHttpClient::new()),
        };

        let candles: Arc<dyn CandleSource> = if self.disable_charts || self.use_mock {
            Arc::new(DisabledCandleSource)
        } else {
            self.candle_source
                .unwrap_or_else(|| Arc::new(BlockingHttpCandleSource::new()))
        };

        let market_limiter = limiters
            .handle(MARKET_DATA_SERVICE)
            .unwrap_or_else(|| Arc::new(TokenBucketLimiter::market_data_default()));
        let news_limiter = limiters
            .handle(NEWS_SERVICE)
            .unwrap_or_else(|| Arc::new(TokenBucketLimiter::news_default()));

        let market = MarketDataClient::new(
            Arc::clone(&http),
            candles,
            market_limiter,
            self.market_config.unwrap_or_default(),
        );

        let mut news_config = self.news_config.unwrap_or_default();
        if news_config.api_key.is_none() {
            news_config.api_key = self.news_api_key;
        }
        let news = NewsClient::new(http, news_limiter, news_config);

        Core {
            market,
            news,
            router: QueryRouter::new(),
            limiters,
        }
    }
}

/// Assembled core services handed to route handlers and the CLI.
pub struct Core {
    pub market: MarketDataClient,
    pub news: NewsClient,
    pub router: QueryRouter,
    limiters: LimiterRegistry,
}

impl Core {
    /// Budget usage for every upstream service.
    pub fn limiter_statuses(&self) -> Vec<LimiterStatus> {
        self.limiters.statuses()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_core_serves_offline() {
        let core = CoreBuilder::new().with_mock_mode().build();

        // Noop transport returns an empty object, which fails quote
        // normalization: absent, not a panic.
        assert!(core.market.stock_data("RELIANCE").await.is_none());
        assert!(core.market.historical_candles("TCS", Default::default()).await.is_none());
        assert!(core.news.search_news("markets", 3).await.is_empty());

        let statuses = core.limiter_statuses();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().any(|s| s.name == MARKET_DATA_SERVICE));
        assert!(statuses.iter().any(|s| s.name == NEWS_SERVICE));
    }

    #[test]
    fn parses_queries_without_io() {
        let core = CoreBuilder::new().with_mock_mode().build();
        let parsed = core.router.parse("TCS price today");
        assert_eq!(parsed.intent, crate::router::Intent::PriceQuote);
    }
}
