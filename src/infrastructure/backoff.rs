//! Exponential backoff for notification listener reconnects.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// First delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds.
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Relative jitter applied to every delay (0.0 to 1.0).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Stateful delay sequence. Call [`reset`](Self::reset) once a connection
/// succeeds.
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    next_base_ms: f64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        let initial = config.initial_delay_ms as f64;
        Self {
            config,
            next_base_ms: initial,
            attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = self.next_base_ms.min(self.config.max_delay_ms as f64);
        self.next_base_ms = (base * self.config.multiplier).min(self.config.max_delay_ms as f64);

        let delay = if self.config.jitter_factor > 0.0 {
            let spread = base * self.config.jitter_factor;
            base + rand::rng().random_range(-spread..=spread)
        } else {
            base
        };

        Duration::from_millis(delay.clamp(1.0, self.config.max_delay_ms as f64) as u64)
    }

    pub fn reset(&mut self) {
        self.next_base_ms = self.config.initial_delay_ms as f64;
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
