/// Polling utilities for waiting on conditions with a bounded number of checks
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Why a poll ended without the condition being met
#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("gave up after {attempts} checks: {description}")]
    Exhausted { attempts: u32, description: String },

    #[error(transparent)]
    Condition(E),
}

/// Configuration for polling operations
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    /// Create a new polling configuration
    pub fn new(max_attempts: u32, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            max_attempts,
            interval,
            description: description.into(),
        }
    }

    /// Poll until condition is met or the attempts run out
    ///
    /// The interval elapses before every check. The condition function should return:
    /// - Ok(Some(T)) when condition is met (returns T)
    /// - Ok(None) when condition is not yet met (continues polling)
    /// - Err(e) when an error occurs (stops polling and returns error)
    pub async fn poll<F, Fut, T, E>(&self, condition: F) -> Result<T, PollError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        info!("{}...", self.description);

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            match condition().await {
                Ok(Some(value)) => {
                    info!("✓ {}", self.description);
                    return Ok(value);
                }
                Ok(None) => {
                    debug!(
                        "{}: check {}/{} not satisfied",
                        self.description, attempt, self.max_attempts
                    );
                }
                Err(e) => return Err(PollError::Condition(e)),
            }
        }

        Err(PollError::Exhausted {
            attempts: self.max_attempts,
            description: self.description.clone(),
        })
    }

    /// Poll until condition returns Ok(true) or the attempts run out
    ///
    /// Simplified version for boolean conditions
    pub async fn poll_until<F, Fut, E>(&self, condition: F) -> Result<(), PollError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        self.poll(|| {
            let check = condition();
            async move {
                match check.await {
                    Ok(true) => Ok(Some(())),
                    Ok(false) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        })
        .await
    }
}
