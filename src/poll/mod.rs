//! Long polling on top of single-shot queue claims.
//!
//! [`long_poll`] repeats [`Queue::poll`](crate::backends::Queue::poll) until
//! it has collected `limit` messages or the timeout elapses. A claim that
//! runs out of time counts as an empty round. Any other error stops the loop
//! and is returned together with the messages claimed so far, since those
//! are already hidden from other pollers.

mod waiter;

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::backends::Queue;
use crate::domain::{BrokerError, Message, PollRequest};

pub use waiter::{StaticWaiter, Waiter};

#[derive(Debug, Clone, Copy)]
pub struct LongPoll {
    pub limit: usize,
    pub timeout: Duration,
    pub visibility: Duration,
}

#[derive(Debug, Error)]
#[error("long poll failed after {} messages: {source}", .collected.len())]
pub struct LongPollError {
    pub collected: Vec<Message>,
    #[source]
    pub source: BrokerError,
}

pub async fn long_poll(
    queue: &dyn Queue,
    params: LongPoll,
    waiter: &dyn Waiter,
) -> Result<Vec<Message>, LongPollError> {
    let deadline = Instant::now() + params.timeout;
    let mut collected: Vec<Message> = Vec::with_capacity(params.limit);
    let mut rounds = 0u32;

    while collected.len() < params.limit {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        rounds += 1;

        let request = PollRequest {
            limit: params.limit - collected.len(),
            deadline,
            visibility: params.visibility,
        };
        let claimed = match queue.poll(&request).await {
            Ok(claimed) => claimed,
            Err(BrokerError::DeadlineExceeded) => Vec::new(),
            Err(source) => return Err(LongPollError { collected, source }),
        };

        if claimed.is_empty() {
            let left = deadline.saturating_duration_since(Instant::now());
            let sleep = waiter.calculate_sleep(left).min(left);
            if sleep.is_zero() {
                // Avoid spinning on a zero-sleep waiter.
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(sleep).await;
            }
            continue;
        }
        collected.extend(claimed);
    }

    tracing::trace!(rounds, collected = collected.len(), "Long poll finished");
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    use crate::domain::{EnqueueMessageRequest, MessageId, Result};

    /// Serves scripted poll outcomes, then empty rounds.
    struct ScriptedQueue {
        script: Mutex<Vec<Result<Vec<Message>>>>,
        polls: AtomicUsize,
    }

    impl ScriptedQueue {
        fn new(mut script: Vec<Result<Vec<Message>>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Queue for ScriptedQueue {
        async fn add(&self, _: &EnqueueMessageRequest) -> Result<MessageId> {
            unreachable!()
        }

        async fn poll(&self, request: &PollRequest) -> Result<Vec<Message>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop();
            match next {
                Some(Ok(mut messages)) => {
                    messages.truncate(request.limit);
                    Ok(messages)
                }
                Some(Err(e)) => Err(e),
                None => Ok(Vec::new()),
            }
        }

        async fn ack(&self, _: &str) -> Result<()> {
            unreachable!()
        }
    }

    fn messages(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| Message {
                id: MessageId::from_storage(i as i64),
                created_at: Utc::now(),
                scheduled_at: Utc::now(),
                data: String::new(),
                ack_key: format!("{i}/tok"),
            })
            .collect()
    }

    fn params(limit: usize, timeout_secs: u64) -> LongPoll {
        LongPoll {
            limit,
            timeout: Duration::from_secs(timeout_secs),
            visibility: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_waits_out_the_timeout() {
        let queue = ScriptedQueue::new(vec![]);
        let waiter = StaticWaiter::new(Duration::from_millis(500));

        let started = Instant::now();
        let result = long_poll(&queue, params(5, 2), &waiter).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(queue.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_as_soon_as_limit_is_reached() {
        let queue = ScriptedQueue::new(vec![Ok(messages(2)), Ok(vec![]), Ok(messages(3))]);
        let waiter = StaticWaiter::new(Duration::from_millis(500));

        let started = Instant::now();
        let result = long_poll(&queue, params(5, 10), &waiter).await.unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_counts_as_empty_round() {
        let queue = ScriptedQueue::new(vec![Err(BrokerError::DeadlineExceeded), Ok(messages(1))]);
        let waiter = StaticWaiter::new(Duration::from_millis(100));

        let result = assert_ok!(long_poll(&queue, params(1, 1), &waiter).await);
        assert_eq!(result.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_keeps_partial_results() {
        let queue = ScriptedQueue::new(vec![
            Ok(messages(2)),
            Err(BrokerError::Validation("boom".into())),
        ]);
        let waiter = StaticWaiter::new(Duration::from_millis(100));

        let err = assert_err!(long_poll(&queue, params(5, 1), &waiter).await);
        assert_eq!(err.collected.len(), 2);
        assert!(matches!(err.source, BrokerError::Validation(_)));
    }
}
