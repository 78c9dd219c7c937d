#![doc = include_str!("../README.md")]

//! The Retry Engine (C2): wraps a fallible async provider call with
//! exponential backoff, jitter, `Retry-After` honoring, and a
//! two-consecutive-quota-error model-fallback path.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use relay_types::{DurationMs, ProviderError, RetryError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backoff shape between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// `delay *= backoff_multiplier` after every attempt.
    ExpBackoff,
    /// Same delay every attempt.
    FixedDelay,
    /// `delay = initial_delay * attempt_number`.
    LinearBackoff,
}

/// Model-fallback behavior on persistent quota failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFallbackConfig {
    /// Whether fallback is enabled at all.
    pub enabled: bool,
    /// The model to switch to once triggered.
    pub fallback_model: Option<String>,
}

/// Retry Engine configuration (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Backoff shape.
    pub strategy: RetryStrategy,
    /// Multiplier applied each attempt under `ExpBackoff`.
    pub backoff_multiplier: f64,
    /// Whether to apply jitter to computed delays.
    pub jitter_enabled: bool,
    /// Jitter fraction: delay is perturbed by `± delay * jitter_range`.
    pub jitter_range: f64,
    /// Whether a `Retry-After` header takes precedence over the computed delay.
    pub respect_retry_after: bool,
    /// Model-fallback behavior.
    pub model_fallback: ModelFallbackConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            strategy: RetryStrategy::ExpBackoff,
            backoff_multiplier: 2.0,
            jitter_enabled: true,
            jitter_range: 0.1,
            respect_retry_after: true,
            model_fallback: ModelFallbackConfig::default(),
        }
    }
}

/// Aggregate statistics for one `retry` invocation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Attempts made (successful or not).
    pub attempts: usize,
    /// 1 if the call eventually succeeded, else 0.
    pub successes: usize,
    /// 1 if the call ultimately failed, else 0.
    pub failures: usize,
    /// Sum of all delays actually slept.
    pub total_delay: DurationMs,
    /// Count of each error kind encountered, keyed by `Display` string.
    pub error_histogram: HashMap<String, usize>,
    /// Whether model fallback was triggered.
    pub fallback_used: bool,
}

/// How the caller's fallback callback decides whether to switch models.
///
/// Returns `true` to accept the fallback model, `false` to keep retrying
/// the current one. If no callback is supplied, fallback auto-accepts
/// (matching the source's "no callback registered" behavior).
pub trait FallbackDecider {
    /// Decide whether to accept switching from `current_model` to `fallback_model`.
    fn decide(
        &mut self,
        current_model: &str,
        fallback_model: &str,
    ) -> impl Future<Output = bool> + Send;
}

impl<F, Fut> FallbackDecider for F
where
    F: FnMut(&str, &str) -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    fn decide(&mut self, current_model: &str, fallback_model: &str) -> impl Future<Output = bool> + Send {
        self(current_model, fallback_model)
    }
}

/// Drive `call` to completion, retrying per `config`.
///
/// `model` is mutable so a triggered fallback can swap it in place; the
/// caller's `call` closure receives the current model name on every
/// attempt so it can target the right endpoint.
pub async fn retry<F, Fut, T, D>(
    config: &RetryConfig,
    model: &mut String,
    mut call: F,
    mut fallback: Option<D>,
) -> Result<(T, RetryStats), RetryError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    D: FallbackDecider,
{
    let mut stats = RetryStats::default();
    let mut delay_ms = config.initial_delay_ms;
    let mut consecutive_quota_errors = 0usize;
    let mut last_err: Option<ProviderError> = None;

    let mut attempt = 0usize;
    while attempt < config.max_attempts {
        attempt += 1;
        stats.attempts = attempt;

        match call(model.clone()).await {
            Ok(value) => {
                stats.successes = 1;
                return Ok((value, stats));
            }
            Err(err) => {
                let kind = err.kind();
                *stats.error_histogram.entry(format!("{kind:?}")).or_insert(0) += 1;
                debug!(attempt, ?kind, "provider call failed");

                if !kind.is_retryable() {
                    stats.failures = 1;
                    return Err(RetryError::NonRetryable(err));
                }

                if matches!(kind, relay_types::ErrorKind::QuotaExceeded) {
                    consecutive_quota_errors += 1;
                } else {
                    consecutive_quota_errors = 0;
                }

                if consecutive_quota_errors >= 2 && config.model_fallback.enabled {
                    if let Some(fallback_model) = config.model_fallback.fallback_model.clone() {
                        let accepted = match fallback.as_mut() {
                            Some(decider) => decider.decide(model, &fallback_model).await,
                            None => true,
                        };
                        if accepted {
                            warn!(from = %model, to = %fallback_model, "switching model after repeated quota errors");
                            *model = fallback_model;
                            stats.fallback_used = true;
                            delay_ms = config.initial_delay_ms;
                            consecutive_quota_errors = 0;
                            last_err = Some(err);
                            continue;
                        }
                    }
                }

                if attempt >= config.max_attempts {
                    stats.failures = 1;
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }

                let wait = resolve_delay(config, &err, delay_ms);
                stats.total_delay = DurationMs(stats.total_delay.0 + wait.as_millis() as u64);
                tokio::time::sleep(wait).await;

                delay_ms = next_delay_ms(config, delay_ms, attempt);
                last_err = Some(err);
            }
        }
    }

    stats.failures = 1;
    Err(match last_err {
        Some(err) => RetryError::Exhausted {
            attempts: stats.attempts,
            source: err,
        },
        None => RetryError::Exhausted {
            attempts: stats.attempts,
            source: ProviderError::Other("retry loop exited with no recorded error".into()),
        },
    })
}

fn resolve_delay(config: &RetryConfig, err: &ProviderError, current_delay_ms: u64) -> Duration {
    if config.respect_retry_after {
        if let Some(retry_after) = err.retry_after() {
            return retry_after;
        }
    }
    apply_jitter(config, current_delay_ms)
}

fn apply_jitter(config: &RetryConfig, delay_ms: u64) -> Duration {
    let delay_ms = if config.jitter_enabled {
        let jitter = (delay_ms as f64) * config.jitter_range;
        let offset = rand::thread_rng().gen_range(-jitter..=jitter);
        ((delay_ms as f64) + offset).max(0.0) as u64
    } else {
        delay_ms
    };
    Duration::from_millis(delay_ms.min(config.max_delay_ms))
}

fn next_delay_ms(config: &RetryConfig, current_delay_ms: u64, attempt: usize) -> u64 {
    match config.strategy {
        RetryStrategy::FixedDelay => config.initial_delay_ms,
        RetryStrategy::LinearBackoff => {
            (config.initial_delay_ms.saturating_mul(attempt as u64)).min(config.max_delay_ms)
        }
        RetryStrategy::ExpBackoff => {
            let next = (current_delay_ms as f64) * config.backoff_multiplier;
            (next as u64).min(config.max_delay_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_config(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            jitter_enabled: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let config = fast_config(5);
        let mut model = "model-a".to_string();
        let (value, stats) = retry::<_, _, _, fn(&str, &str) -> std::future::Ready<bool>>(
            &config,
            &mut model,
            |_m| async { Ok::<_, ProviderError>(42) },
            None,
        )
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.successes, 1);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let config = fast_config(5);
        let mut model = "model-a".to_string();
        let result = retry::<_, _, i32, fn(&str, &str) -> std::future::Ready<bool>>(
            &config,
            &mut model,
            |_m| async { Err(ProviderError::Authentication("bad key".into())) },
            None,
        )
        .await;
        assert!(matches!(result, Err(RetryError::NonRetryable(_))));
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_exhausts() {
        let config = fast_config(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut model = "model-a".to_string();
        let calls_clone = Arc::clone(&calls);
        let result = retry::<_, _, i32, fn(&str, &str) -> std::future::Ready<bool>>(
            &config,
            &mut model,
            move |_m| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::ServiceUnavailable("down".into())) }
            },
            None,
        )
        .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn two_consecutive_quota_errors_trigger_fallback_and_succeed() {
        let mut config = fast_config(5);
        config.model_fallback = ModelFallbackConfig {
            enabled: true,
            fallback_model: Some("model-b".to_string()),
        };
        let mut model = "model-a".to_string();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let (value, stats) = retry(
            &config,
            &mut model,
            move |m| {
                let n = calls_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::RateLimit {
                            retry_after: Some(Duration::from_millis(1)),
                        })
                    } else {
                        assert_eq!(m, "model-b");
                        Ok(7)
                    }
                }
            },
            Some(|_cur: &str, _fb: &str| async { true }),
        )
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(model, "model-b");
        assert!(stats.fallback_used);
        assert_eq!(stats.attempts, 3);
    }

    #[tokio::test]
    async fn retry_after_header_is_honored_over_computed_delay() {
        let mut config = fast_config(3);
        config.initial_delay_ms = 10_000;
        let mut model = "model-a".to_string();
        let start = std::time::Instant::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let _ = retry::<_, _, i32, fn(&str, &str) -> std::future::Ready<bool>>(
            &config,
            &mut model,
            move |_m| {
                let n = calls_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ProviderError::RateLimit {
                            retry_after: Some(Duration::from_millis(5)),
                        })
                    } else {
                        Ok(1)
                    }
                }
            },
            None,
        )
        .await;

        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn exp_backoff_doubles_and_clamps() {
        let config = RetryConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 3000,
            backoff_multiplier: 2.0,
            strategy: RetryStrategy::ExpBackoff,
            ..Default::default()
        };
        assert_eq!(next_delay_ms(&config, 1000, 1), 2000);
        assert_eq!(next_delay_ms(&config, 2000, 2), 3000); // clamped from 4000
    }

    #[test]
    fn linear_backoff_scales_with_attempt_number() {
        let config = RetryConfig {
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            strategy: RetryStrategy::LinearBackoff,
            ..Default::default()
        };
        assert_eq!(next_delay_ms(&config, 0, 3), 1500);
    }

    #[test]
    fn retry_config_round_trips_through_json() {
        let config = RetryConfig {
            model_fallback: ModelFallbackConfig { enabled: true, fallback_model: Some("model-b".to_string()) },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.strategy, config.strategy);
        assert_eq!(parsed.model_fallback.fallback_model, Some("model-b".to_string()));
    }

    #[test]
    fn fixed_delay_never_changes() {
        let config = RetryConfig {
            initial_delay_ms: 250,
            strategy: RetryStrategy::FixedDelay,
            ..Default::default()
        };
        assert_eq!(next_delay_ms(&config, 9999, 4), 250);
    }
}
