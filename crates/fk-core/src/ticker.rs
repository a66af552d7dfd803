//! Countdown pulse sources
//!
//! While an exemption is open the controller needs a periodic nudge to
//! recompute the time left and notice expiry. A [`TickSource`] only produces
//! the nudges; all decisions stay in the controller, which starts the source
//! on entering the countdown and stops it on every other state.
//!
//! - [`Ticker`]: a tokio interval task, cancelled on `stop()` and on drop
//!   (feature `runtime`).
//! - [`ManualTicker`]: a flag for embeddings that own their own timer (a
//!   page's `setInterval`) and call `tick()` while `is_running()` holds.

use std::time::Duration;

/// Something that can pulse the controller periodically.
pub trait TickSource {
    /// Begin pulsing every `period`, replacing any running schedule.
    fn start(&mut self, period: Duration);

    /// Cancel pending pulses. No-op when idle.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Host-driven pulse source.
#[derive(Debug, Default, Clone)]
pub struct ManualTicker {
    period: Option<Duration>,
    starts: u32,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Period the host should call `tick()` at, while running.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// How many times a schedule was started.
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

impl TickSource for ManualTicker {
    fn start(&mut self, period: Duration) {
        self.period = Some(period);
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.period = None;
    }

    fn is_running(&self) -> bool {
        self.period.is_some()
    }
}

#[cfg(feature = "runtime")]
pub use runtime::Ticker;

#[cfg(feature = "runtime")]
mod runtime {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::{interval_at, Instant, MissedTickBehavior};

    use super::TickSource;

    /// Interval task feeding a bounded channel.
    ///
    /// Must be started from within a tokio runtime.
    #[derive(Debug, Default)]
    pub struct Ticker {
        task: Option<JoinHandle<()>>,
        pulses: Option<mpsc::Receiver<()>>,
    }

    impl Ticker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Wait for the next pulse. `None` once stopped.
        pub async fn pulse(&mut self) -> Option<()> {
            match self.pulses.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        }
    }

    impl TickSource for Ticker {
        fn start(&mut self, period: Duration) {
            self.stop();

            let (tx, rx) = mpsc::channel(1);
            let task = tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
            });

            self.task = Some(task);
            self.pulses = Some(rx);
            log::debug!("ticker started ({period:?})");
        }

        fn stop(&mut self) {
            if let Some(task) = self.task.take() {
                task.abort();
                log::debug!("ticker stopped");
            }
            self.pulses = None;
        }

        fn is_running(&self) -> bool {
            self.task.as_ref().is_some_and(|task| !task.is_finished())
        }
    }

    impl Drop for Ticker {
        fn drop(&mut self) {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_ticker() {
        let mut ticker = ManualTicker::new();
        assert!(!ticker.is_running());

        ticker.start(Duration::from_secs(1));
        assert!(ticker.is_running());
        assert_eq!(ticker.period(), Some(Duration::from_secs(1)));

        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
        assert_eq!(ticker.starts(), 1);
    }

    #[cfg(feature = "runtime")]
    #[tokio::test(start_paused = true)]
    async fn test_ticker_pulses_every_period() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        for expected in 1..=3u64 {
            assert_eq!(ticker.pulse().await, Some(()));
            assert_eq!(started.elapsed(), Duration::from_secs(expected));
        }
        assert!(ticker.is_running());
    }

    #[cfg(feature = "runtime")]
    #[tokio::test(start_paused = true)]
    async fn test_ticker_stop_cancels() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_secs(1));
        ticker.stop();

        assert!(!ticker.is_running());
        assert_eq!(ticker.pulse().await, None);
    }

    #[cfg(feature = "runtime")]
    #[tokio::test(start_paused = true)]
    async fn test_ticker_restart_replaces_schedule() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_secs(10));
        ticker.start(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        assert_eq!(ticker.pulse().await, Some(()));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }
}
