use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Time source for the poll loop.
///
/// Polling only ever suspends inside [`Clock::sleep`], so swapping the clock
/// lets tests drive hours of backoff instantly.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time, used to measure the wait budget.
    fn now(&self) -> Instant;

    /// Wall-clock time, recorded on jobs and handles.
    fn timestamp(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// The real clock, built on `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[cfg(test)]
pub(crate) mod manual {
    use std::sync::Mutex;
    use super::*;

    /// A clock whose `sleep` returns immediately after advancing virtual time.
    /// Every requested sleep is recorded.
    pub(crate) struct ManualClock {
        start: Instant,
        wall_start: DateTime<Utc>,
        elapsed: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                wall_start: Utc::now(),
                elapsed: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(vec![]),
            }
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }

        pub fn elapsed(&self) -> Duration {
            *self.elapsed.lock().unwrap()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.elapsed()
        }

        fn timestamp(&self) -> DateTime<Utc> {
            self.wall_start + chrono::Duration::from_std(self.elapsed()).unwrap_or_default()
        }

        async fn sleep(&self, duration: Duration) {
            *self.elapsed.lock().unwrap() += duration;
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let before = clock.now();
        futures::executor::block_on(clock.sleep(Duration::from_secs(90)));
        assert_eq!(clock.now() - before, Duration::from_secs(90));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(90)]);
    }
}
