use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryConfig {
    /// Short budget for history reads: a request should not wait long on a
    /// datastore that is down, it degrades to an empty history instead.
    pub fn datastore() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(200),
            jitter_max: Some(Duration::from_millis(25)),
        }
    }

    fn wait_for(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) if !jitter_max.is_zero() => {
                let jitter_ms = jitter_max.as_millis() as u64;
                backoff + Duration::from_millis(rand::random_range(0..=jitter_ms))
            }
            _ => backoff,
        }
    }
}

/// Exponential backoff with jitter. Returns the last error once
/// `max_attempts` calls have failed.
pub async fn retry_async_with_config<F, Fut, T, E>(config: RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    let mut backoff = config.base_backoff;

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= config.max_attempts => return Err(e),
            Err(e) => {
                let wait = config.wait_for(backoff);
                tracing::debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "retrying after failure"
                );
                tokio::time::sleep(wait).await;

                attempt += 1;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
