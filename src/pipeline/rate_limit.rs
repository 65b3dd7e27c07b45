use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

/// Pacing policy for consecutive upstream requests.
///
/// `wait` is awaited before every request of a run.
#[async_trait]
pub trait RateLimiter: Send {
    async fn wait(&mut self);
}

/// Sleeps a fixed interval before every request except the first one.
///
/// Not adaptive: the pause does not change with upstream responses.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    interval: Duration,
    primed: bool,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            primed: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateLimiter for FixedInterval {
    async fn wait(&mut self) {
        if self.primed && !self.interval.is_zero() {
            sleep(self.interval).await;
        }
        self.primed = true;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl RateLimiter for NoDelay {
    async fn wait(&mut self) {}
}
