use std::time::Duration;

/// Decides how long to sleep after a poll round that returned nothing.
pub trait Waiter: Send + Sync {
    /// `left` is the time remaining until the long-poll deadline.
    fn calculate_sleep(&self, left: Duration) -> Duration;
}

/// Always sleeps `max`, or less when the deadline is closer.
#[derive(Debug, Clone, Copy)]
pub struct StaticWaiter {
    pub max: Duration,
}

impl StaticWaiter {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }
}

impl Waiter for StaticWaiter {
    fn calculate_sleep(&self, left: Duration) -> Duration {
        self.max.min(left)
    }
}
