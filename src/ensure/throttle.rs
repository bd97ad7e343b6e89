//! Request pacing
//!
//! Two modes are supported: a fixed pause after every request, and a token
//! bucket modelled on Shopify's REST leaky bucket. Both honour a server
//! supplied `Retry-After`; the bucket also adopts the server's view of
//! remaining capacity from the call-limit header.

use super::RateFeedback;
use crate::shopify::http::MAX_RETRY_AFTER;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Pause used when nothing is configured
pub const DEFAULT_DELAY_MS: u64 = 3000;

/// Lowest refill rate accepted for a token bucket (tokens per second)
const MIN_REFILL_PER_SEC: f64 = 0.01;

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

fn default_capacity() -> u32 {
    40
}

fn default_refill_per_sec() -> f64 {
    2.0
}

/// Throttle settings as stored in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThrottleConfig {
    /// Constant pause after each request
    Fixed {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    /// Burst up to `capacity`, then `refill_per_sec` requests per second
    TokenBucket {
        #[serde(default = "default_capacity")]
        capacity: u32,
        #[serde(default = "default_refill_per_sec")]
        refill_per_sec: f64,
    },
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.refilled_at = now;
    }

    /// Time until one whole token is available
    fn wait_for_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_per_sec)
        }
    }
}

#[derive(Debug)]
enum Mode {
    Fixed {
        delay: Duration,
        last_finished: Option<Instant>,
    },
    Bucket(TokenBucket),
}

/// Paces successive requests; call [`Throttle::acquire`] before each request
/// and [`Throttle::observe`] after it.
#[derive(Debug)]
pub struct Throttle {
    mode: Mode,
    deferred_until: Option<Instant>,
}

impl Throttle {
    pub fn new(config: &ThrottleConfig) -> Self {
        let mode = match config {
            ThrottleConfig::Fixed { delay_ms } => Mode::Fixed {
                delay: Duration::from_millis(*delay_ms),
                last_finished: None,
            },
            ThrottleConfig::TokenBucket {
                capacity,
                refill_per_sec,
            } => {
                let capacity = f64::from((*capacity).max(1));
                Mode::Bucket(TokenBucket {
                    capacity,
                    tokens: capacity,
                    refill_per_sec: refill_per_sec.max(MIN_REFILL_PER_SEC),
                    refilled_at: Instant::now(),
                })
            }
        };

        Self {
            mode,
            deferred_until: None,
        }
    }

    /// No pacing at all
    pub fn unthrottled() -> Self {
        Self::new(&ThrottleConfig::Fixed { delay_ms: 0 })
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&mut self) {
        if let Some(until) = self.deferred_until.take() {
            if until > Instant::now() {
                tracing::debug!("Honouring server Retry-After");
                tokio::time::sleep_until(until).await;
            }
        }

        match &mut self.mode {
            Mode::Fixed {
                delay,
                last_finished,
            } => {
                if let Some(finished) = last_finished {
                    tokio::time::sleep_until(*finished + *delay).await;
                }
            }
            Mode::Bucket(bucket) => {
                bucket.refill(Instant::now());
                let wait = bucket.wait_for_token();
                if !wait.is_zero() {
                    tracing::debug!("Token bucket empty, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                    bucket.refill(Instant::now());
                }
                bucket.tokens = (bucket.tokens - 1.0).max(0.0);
            }
        }
    }

    /// Record that a request finished, with whatever the server told us
    pub fn observe(&mut self, feedback: &RateFeedback) {
        let now = Instant::now();

        if let Some(retry_after) = feedback.retry_after {
            let retry_after = retry_after.min(MAX_RETRY_AFTER);
            self.deferred_until = now.checked_add(retry_after).or(self.deferred_until);
        }

        match &mut self.mode {
            Mode::Fixed { last_finished, .. } => *last_finished = Some(now),
            Mode::Bucket(bucket) => {
                if let Some(limit) = feedback.call_limit {
                    bucket.refill(now);
                    bucket.tokens = bucket.tokens.min(f64::from(limit.remaining()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::http::CallLimit;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_first_request_is_immediate() {
        let mut throttle = Throttle::new(&ThrottleConfig::Fixed { delay_ms: 3000 });
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_waits_delay_after_previous_request() {
        let mut throttle = Throttle::new(&ThrottleConfig::Fixed { delay_ms: 3000 });
        throttle.acquire().await;
        throttle.observe(&RateFeedback::default());

        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_extends_wait() {
        let mut throttle = Throttle::new(&ThrottleConfig::Fixed { delay_ms: 1000 });
        throttle.acquire().await;
        throttle.observe(&RateFeedback {
            retry_after: Some(Duration::from_secs(5)),
            call_limit: None,
        });

        let start = Instant::now();
        throttle.acquire().await;
        // Retry-After (5s) already covers the fixed 1s pause
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_retry_after_is_capped() {
        let mut throttle = Throttle::new(&ThrottleConfig::Fixed { delay_ms: 0 });
        throttle.acquire().await;
        throttle.observe(&RateFeedback {
            retry_after: Some(Duration::from_secs(u64::MAX / 2)),
            call_limit: None,
        });

        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), MAX_RETRY_AFTER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_honours_retry_after() {
        let mut throttle = Throttle::new(&ThrottleConfig::TokenBucket {
            capacity: 40,
            refill_per_sec: 2.0,
        });
        throttle.acquire().await;
        throttle.observe(&RateFeedback {
            retry_after: Some(Duration::from_secs(2)),
            call_limit: None,
        });

        // Tokens remain, but the server asked us to back off
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_allows_burst_then_paces() {
        let mut throttle = Throttle::new(&ThrottleConfig::TokenBucket {
            capacity: 2,
            refill_per_sec: 1.0,
        });

        let start = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_adopts_server_call_limit() {
        let mut throttle = Throttle::new(&ThrottleConfig::TokenBucket {
            capacity: 40,
            refill_per_sec: 2.0,
        });

        throttle.acquire().await;
        throttle.observe(&RateFeedback {
            retry_after: None,
            call_limit: Some(CallLimit { used: 40, limit: 40 }),
        });

        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_defaults() {
        let config: ThrottleConfig = serde_json::from_str(r#"{"mode":"token_bucket"}"#).unwrap();
        assert_eq!(
            config,
            ThrottleConfig::TokenBucket {
                capacity: 40,
                refill_per_sec: 2.0
            }
        );
        assert_eq!(
            ThrottleConfig::default(),
            ThrottleConfig::Fixed {
                delay_ms: DEFAULT_DELAY_MS
            }
        );
    }
}
