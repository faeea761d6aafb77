//! Token-bucket admission control for free-tier upstream budgets.
//!
//! Each upstream service gets one [`TokenBucketLimiter`] enforcing a
//! daily and an hourly ceiling. The daily window resets at the next
//! UTC midnight, the hourly window 3600 seconds after it opened; both
//! resets are applied lazily under the counter lock. `acquire` never
//! fails — a `false` simply tells the caller to use its fallback
//! (stale cache, or decline).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use time::OffsetDateTime;

const HOURLY_WINDOW: Duration = Duration::from_secs(3600);

/// Per-service call budget defaults, matching each provider's real
/// free tier.
pub const MARKET_DATA_SERVICE: &str = "market-data";
pub const NEWS_SERVICE: &str = "news";

/// Snapshot of a limiter's windows for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimiterStatus {
    pub name: String,
    pub daily_used: u32,
    pub daily_limit: u32,
    pub daily_remaining: u32,
    pub hourly_used: u32,
    pub hourly_limit: u32,
    pub hourly_remaining: u32,
}

#[derive(Debug)]
struct WindowCounters {
    daily_count: u32,
    hourly_count: u32,
    daily_reset: OffsetDateTime,
    hourly_reset: Instant,
}

/// Dual-window (daily + hourly) token bucket for one upstream service.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    name: String,
    max_daily: u32,
    max_hourly: u32,
    inner: Mutex<WindowCounters>,
}

impl TokenBucketLimiter {
    pub fn new(name: impl Into<String>, max_daily: u32, max_hourly: u32) -> Self {
        Self {
            name: name.into(),
            max_daily,
            max_hourly,
            inner: Mutex::new(WindowCounters {
                daily_count: 0,
                hourly_count: 0,
                daily_reset: next_utc_midnight(OffsetDateTime::now_utc()),
                hourly_reset: Instant::now() + HOURLY_WINDOW,
            }),
        }
    }

    /// Market-data provider budget (generous free tier).
    pub fn market_data_default() -> Self {
        Self::new(MARKET_DATA_SERVICE, 500, 100)
    }

    /// News provider budget (tight free tier).
    pub fn news_default() -> Self {
        Self::new(NEWS_SERVICE, 180, 30)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn max_daily(&self) -> u32 {
        self.max_daily
    }

    pub const fn max_hourly(&self) -> u32 {
        self.max_hourly
    }

    /// Try to take one token from both windows.
    ///
    /// Returns `false` when either ceiling is reached; counters are
    /// only incremented on a grant.
    pub fn acquire(&self) -> bool {
        let mut inner = self.lock();
        Self::maybe_reset(&mut inner);

        if inner.daily_count >= self.max_daily {
            tracing::warn!(
                service = %self.name,
                used = inner.daily_count,
                limit = self.max_daily,
                "daily call budget exhausted"
            );
            return false;
        }

        if inner.hourly_count >= self.max_hourly {
            tracing::warn!(
                service = %self.name,
                used = inner.hourly_count,
                limit = self.max_hourly,
                "hourly call budget exhausted"
            );
            return false;
        }

        inner.daily_count += 1;
        inner.hourly_count += 1;
        true
    }

    /// Window usage snapshot. Applies lazy resets but never consumes.
    pub fn status(&self) -> LimiterStatus {
        let mut inner = self.lock();
        Self::maybe_reset(&mut inner);

        LimiterStatus {
            name: self.name.clone(),
            daily_used: inner.daily_count,
            daily_limit: self.max_daily,
            daily_remaining: self.max_daily.saturating_sub(inner.daily_count),
            hourly_used: inner.hourly_count,
            hourly_limit: self.max_hourly,
            hourly_remaining: self.max_hourly.saturating_sub(inner.hourly_count),
        }
    }

    fn maybe_reset(inner: &mut WindowCounters) {
        let now_utc = OffsetDateTime::now_utc();
        if now_utc >= inner.daily_reset {
            inner.daily_count = 0;
            inner.daily_reset = next_utc_midnight(now_utc);
        }

        let now = Instant::now();
        if now >= inner.hourly_reset {
            inner.hourly_count = 0;
            inner.hourly_reset = now + HOURLY_WINDOW;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WindowCounters> {
        self.inner.lock().expect("limiter lock is not poisoned")
    }

    #[cfg(test)]
    fn force_hourly_window_elapsed(&self) {
        self.lock().hourly_reset = Instant::now();
    }

    #[cfg(test)]
    fn force_daily_window_elapsed(&self) {
        self.lock().daily_reset = OffsetDateTime::now_utc();
    }
}

fn next_utc_midnight(now: OffsetDateTime) -> OffsetDateTime {
    now.date()
        .next_day()
        .map(|date| date.midnight().assume_utc())
        // Only reachable at the end of the representable calendar.
        .unwrap_or(now + time::Duration::days(1))
}

/// Explicit per-service limiter map, built once by the composition
/// root and shared by handle.
///
/// Repeated lookups for the same service name always return the same
/// counters.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: HashMap<String, Arc<TokenBucketLimiter>>,
}

impl LimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the market-data and news budgets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TokenBucketLimiter::market_data_default());
        registry.register(TokenBucketLimiter::news_default());
        registry
    }

    pub fn register(&mut self, limiter: TokenBucketLimiter) -> Arc<TokenBucketLimiter> {
        let handle = Arc::new(limiter);
        self.limiters
            .insert(handle.name().to_owned(), Arc::clone(&handle));
        handle
    }

    pub fn handle(&self, name: &str) -> Option<Arc<TokenBucketLimiter>> {
        self.limiters.get(name).cloned()
    }

    /// Status of every registered limiter, sorted by service name.
    pub fn statuses(&self) -> Vec<LimiterStatus> {
        let mut statuses = self
            .limiters
            .values()
            .map(|limiter| limiter.status())
            .collect::<Vec<_>>();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_until_hourly_ceiling_then_rejects() {
        let limiter = TokenBucketLimiter::new("test-hourly", 100, 3);

        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire(), "4th call within the hour must fail");
    }

    #[test]
    fn daily_ceiling_rejects_even_with_hourly_budget_left() {
        let limiter = TokenBucketLimiter::new("test-daily", 3, 100);

        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(!limiter.acquire(), "daily ceiling must win");

        let status = limiter.status();
        assert_eq!(status.hourly_remaining, 97);
        assert_eq!(status.daily_remaining, 0);
    }

    #[test]
    fn hourly_window_elapse_restores_budget() {
        let limiter = TokenBucketLimiter::new("test-window", 100, 1);

        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        limiter.force_hourly_window_elapsed();
        assert!(limiter.acquire(), "new hourly window must grant again");
    }

    #[test]
    fn daily_window_elapse_resets_daily_count() {
        let limiter = TokenBucketLimiter::new("test-day-window", 1, 100);

        assert!(limiter.acquire());
        assert!(!limiter.acquire());

        limiter.force_daily_window_elapsed();
        assert!(limiter.acquire());
    }

    #[test]
    fn status_reports_without_consuming() {
        let limiter = TokenBucketLimiter::new("test-status", 10, 5);
        assert!(limiter.acquire());
        assert!(limiter.acquire());

        let status = limiter.status();
        assert_eq!(status.daily_used, 2);
        assert_eq!(status.daily_remaining, 8);
        assert_eq!(status.hourly_used, 2);
        assert_eq!(status.hourly_remaining, 3);
        assert_eq!(status.name, "test-status");

        // Reading status twice changes nothing.
        assert_eq!(limiter.status(), status);
    }

    #[test]
    fn registry_returns_the_same_counters_per_name() {
        let registry = LimiterRegistry::with_defaults();

        let a = registry.handle(MARKET_DATA_SERVICE).expect("registered");
        let b = registry.handle(MARKET_DATA_SERVICE).expect("registered");
        assert!(Arc::ptr_eq(&a, &b));

        assert!(a.acquire());
        assert_eq!(b.status().daily_used, 1);
    }

    #[test]
    fn default_budgets_match_free_tiers() {
        let registry = LimiterRegistry::with_defaults();

        let market = registry.handle(MARKET_DATA_SERVICE).expect("registered");
        assert_eq!(market.max_daily(), 500);
        assert_eq!(market.max_hourly(), 100);

        let news = registry.handle(NEWS_SERVICE).expect("registered");
        assert_eq!(news.max_daily(), 180);
        assert_eq!(news.max_hourly(), 30);
    }
}
