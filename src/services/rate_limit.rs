// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-interval pacing for outbound API calls.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Runs calls one at a time with a fixed pause between the end of one call
/// and the start of the next.
///
/// The lock is held for the whole call, so two calls through the same
/// limiter never overlap even when issued from different tasks.
pub struct FixedIntervalLimiter {
    interval: Duration,
    last_completed: Mutex<Option<Instant>>,
}

impl FixedIntervalLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_completed: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next slot, then run `call`.
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last_completed.lock().await;

        if let Some(done) = *last {
            let ready_at = done + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let result = call().await;
        *last = Some(Instant::now());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let limiter = FixedIntervalLimiter::new(Duration::from_millis(250));
        let start = Instant::now();
        limiter.run(|| async {}).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_measured_from_completion() {
        let limiter = FixedIntervalLimiter::new(Duration::from_millis(250));

        let start = Instant::now();
        limiter
            .run(|| tokio::time::sleep(Duration::from_millis(100)))
            .await;
        let first_done = start.elapsed();
        assert!(first_done >= Duration::from_millis(100));

        let second_start = limiter.run(|| async { start.elapsed() }).await;
        assert!(
            second_start >= first_done + Duration::from_millis(250),
            "second call started at {:?}",
            second_start
        );
        assert!(second_start < Duration::from_millis(360));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_from_different_tasks_never_overlap() {
        let limiter = Arc::new(FixedIntervalLimiter::new(Duration::from_millis(200)));
        let in_flight = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(|| async {
                        let now = in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        assert_eq!(now, 0, "calls overlapped");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                    })
                    .await
            }));
        }

        let start = Instant::now();
        for handle in handles {
            handle.await.unwrap();
        }
        // 3 calls of 10ms, 2 pauses of 200ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(430), "took {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(450), "took {:?}", elapsed);
    }
}
