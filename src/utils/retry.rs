use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Bounded retry with a uniformly random delay between attempts.
///
/// An operation is invoked at most `attempts` times and the first
/// success short-circuits. Terminal failures are returned to the caller,
/// who decides whether to propagate or swallow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5), Duration::from_secs(10))
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            min_delay,
            max_delay,
        }
    }

    /// A single attempt, no delays.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    fn random_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }

    /// Run `op` under this policy, sleeping a random duration between
    /// failed attempts.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts => {
                    error!("{} failed after {} attempt(s): {}", label, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        label, attempt, self.attempts, e
                    );
                    let delay = self.random_delay();
                    info!("retrying {} in {:.2}s", label, delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
