use crate::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff around a provider call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        label, attempt, max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() && max_attempts > 1 => {
                    return Err(ProviderError::RetriesExhausted {
                        label: label.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}
