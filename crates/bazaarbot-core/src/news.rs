//! News client for the upstream news provider.
//!
//! News is an enrichment, not a required capability: every failure
//! path — missing API key, exhausted budget, transport failure,
//! malformed payload — degrades to an empty list after a log record.
//! A strict daily free tier is respected twice over: the shared token
//! bucket covers the daily/hourly budget, and a global pacing quota
//! keeps a minimum spacing between upstream calls.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::domain::NewsArticle;
use crate::http::{HttpClient, HttpError, HttpRequest};
use crate::limiter::TokenBucketLimiter;
use crate::retry::RetryConfig;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const MAX_DESCRIPTION_CHARS: usize = 200;

/// Tuning knobs for the news client.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub language: String,
    pub country: String,
    pub timeout: Duration,
    /// Minimum spacing between upstream calls (global, not per-key).
    pub min_call_interval: Duration,
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://newsdata.io/api/1/latest"),
            api_key: None,
            language: String::from("en"),
            country: String::from("in"),
            timeout: Duration::from_secs(15),
            min_call_interval: Duration::from_secs(7),
            cache_size: 100,
            cache_ttl: Duration::from_secs(600),
            retry: RetryConfig::exponential(2, Duration::from_secs(1)),
        }
    }
}

/// Cached, paced client for the upstream news provider.
#[derive(Clone)]
pub struct NewsClient {
    http: Arc<dyn HttpClient>,
    limiter: Arc<TokenBucketLimiter>,
    pacer: Option<Arc<DirectRateLimiter>>,
    cache: Arc<TtlCache<Vec<NewsArticle>>>,
    config: Arc<NewsConfig>,
}

impl NewsClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        limiter: Arc<TokenBucketLimiter>,
        config: NewsConfig,
    ) -> Self {
        let pacer = Quota::with_period(config.min_call_interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(one()))));

        Self {
            http,
            limiter,
            pacer,
            cache: Arc::new(TtlCache::with_ttl(config.cache_size, config.cache_ttl)),
            config: Arc::new(config),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Articles matching a keyword query, newest first as returned by
    /// the provider.
    pub async fn search_news(&self, query: &str, max_results: usize) -> Vec<NewsArticle> {
        let trimmed = query.trim();
        if trimmed.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let cache_key = format!(
            "news:{}:{}:{}",
            trimmed.to_lowercase(),
            self.config.language,
            self.config.country
        );

        let request = |api_key: &str| {
            HttpRequest::get(self.config.base_url.clone())
                .with_query("apikey", api_key)
                .with_query("q", trimmed)
                .with_query("language", self.config.language.clone())
                .with_query("country", self.config.country.clone())
                .with_timeout(self.config.timeout)
        };

        self.fetch_articles("news.search", &cache_key, request, max_results)
            .await
    }

    /// Top headlines for a category.
    pub async fn top_headlines(&self, category: &str, max_results: usize) -> Vec<NewsArticle> {
        let category = category.trim().to_lowercase();
        if category.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let cache_key = format!("headlines:{category}");
        let request = |api_key: &str| {
            HttpRequest::get(self.config.base_url.clone())
                .with_query("apikey", api_key)
                .with_query("category", category.clone())
                .with_query("language", self.config.language.clone())
                .with_query("country", self.config.country.clone())
                .with_timeout(self.config.timeout)
        };

        self.fetch_articles("news.headlines", &cache_key, request, max_results)
            .await
    }

    async fn fetch_articles<F>(
        &self,
        op_name: &str,
        cache_key: &str,
        build_request: F,
        max_results: usize,
    ) -> Vec<NewsArticle>
    where
        F: Fn(&str) -> HttpRequest,
    {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::debug!(op = op_name, "news provider disabled (no API key)");
            return Vec::new();
        };

        if let Some(cached) = self.cache.get(cache_key) {
            return cached.into_iter().take(max_results).collect();
        }

        if !self.limiter.acquire() {
            tracing::warn!(op = op_name, "news call budget exhausted");
            return Vec::new();
        }

        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let request = build_request(api_key);
        let result = self
            .config
            .retry
            .run(op_name, || async {
                let response = self.http.execute(request.clone()).await?;
                if response.is_rate_limited() {
                    // Provider-side 429 counts as transient here; the
                    // retry ceiling bounds how long we keep trying.
                    return Err(HttpError::rate_limited("news provider rate limited"));
                }
                Ok(response)
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(op = op_name, %error, "news fetch failed");
                return Vec::new();
            }
        };

        if !response.is_success() {
            tracing::warn!(
                op = op_name,
                status = response.status,
                "news endpoint returned non-success status"
            );
            return Vec::new();
        }

        let parsed: NewsResponse = match serde_json::from_str(&response.body) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(op = op_name, %error, "unparseable news payload");
                return Vec::new();
            }
        };

        let articles = format_articles(parsed.results);
        self.cache.set(cache_key, articles.clone());
        articles.into_iter().take(max_results).collect()
    }
}

fn one() -> NonZeroU32 {
    NonZeroU32::MIN
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date_camel: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
}

fn format_articles(raw: Vec<RawArticle>) -> Vec<NewsArticle> {
    raw.into_iter()
        .map(|article| {
            let description = article
                .description
                .or(article.content)
                .unwrap_or_default();

            NewsArticle {
                title: article.title.unwrap_or_default(),
                description: truncate_chars(&description, MAX_DESCRIPTION_CHARS),
                url: article.link.unwrap_or_default(),
                source: article
                    .source_id
                    .unwrap_or_else(|| String::from("Unknown")),
                published_at: article
                    .pub_date_camel
                    .or(article.pub_date)
                    .unwrap_or_default(),
                image: article.image_url,
            }
        })
        .collect()
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_owned();
    }
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_descriptions_on_char_boundaries() {
        let long = "x".repeat(450);
        assert_eq!(truncate_chars(&long, 200).chars().count(), 200);

        let short = "market update";
        assert_eq!(truncate_chars(short, 200), "market update");

        let devanagari = "बाज़ार".repeat(60);
        assert_eq!(truncate_chars(&devanagari, 200).chars().count(), 200);
    }

    #[test]
    fn missing_fields_degrade_to_empty_strings() {
        let formatted = format_articles(vec![RawArticle {
            title: None,
            description: None,
            content: Some(String::from("fallback body")),
            link: None,
            image_url: None,
            pub_date: None,
            pub_date_camel: None,
            source_id: None,
        }]);

        let article = &formatted[0];
        assert_eq!(article.title, "");
        assert_eq!(article.description, "fallback body");
        assert_eq!(article.url, "");
        assert_eq!(article.source, "Unknown");
        assert_eq!(article.published_at, "");
        assert!(article.image.is_none());
    }

    #[tokio::test]
    async fn disabled_client_returns_empty_without_network() {
        let client = NewsClient::new(
            Arc::new(crate::http::NoopHttpClient),
            Arc::new(TokenBucketLimiter::news_default()),
            NewsConfig::default(),
        );

        assert!(!client.is_enabled());
        assert!(client.search_news("reliance", 5).await.is_empty());
        assert!(client.top_headlines("business", 5).await.is_empty());
    }
}
