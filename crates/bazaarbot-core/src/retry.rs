//! Retry policy with exponential backoff and additive jitter.

use std::future::Future;
use std::time::Duration;

use crate::http::HttpError;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed { delay: Duration },
    /// Exponential delay: `base * factor^attempt`, capped at `max`,
    /// plus (when `jitter` is set) a uniform random extra in
    /// `[0, 0.5 * delay]`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before re-attempting after failure number `attempt`
    /// (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let capped = (base.as_secs_f64() * scale).min(max.as_secs_f64());

                let jittered = if jitter {
                    capped + fastrand::f64() * capped * 0.5
                } else {
                    capped
                };

                Duration::from_secs_f64(jittered)
            }
        }
    }
}

/// Retry configuration for transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            enabled: true,
            max_retries,
            backoff: Backoff::Exponential {
                base,
                factor: 2.0,
                max: Duration::from_secs(30),
                jitter: true,
            },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            backoff: Backoff::default(),
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Run `op`, re-attempting on transient failures only.
    ///
    /// Non-transient failures propagate immediately; after exhausting
    /// all attempts the last transient failure is returned. Each
    /// retry is logged with its attempt number and computed wait.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, HttpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let retries_allowed = if self.enabled { self.max_retries } else { 0 };
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < retries_allowed => {
                    let wait = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        op = op_name,
                        attempt = attempt + 1,
                        max_retries = retries_allowed,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_transient() {
                        tracing::warn!(
                            op = op_name,
                            attempts = attempt + 1,
                            error = %error,
                            "giving up after exhausting retries"
                        );
                    }
                    return Err(error);
                }
            }
        }
    }
}
