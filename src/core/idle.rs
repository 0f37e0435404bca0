//! Idle gap accounting.
//!
//! Input callbacks on any thread refresh an atomic last-input timestamp. The
//! idle watcher polls it and emits one event per idle episode: after emitting,
//! the baseline is reset to the detection time, so an idle period that keeps
//! going is measured again from that point instead of re-firing every poll.

use crate::core::shutdown::ShutdownSignal;
use crate::storage::{IdleEvent, SharedSink};
use crate::transparency::SharedTransparencyLog;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Last-input timestamp shared between input callbacks and the idle watcher.
///
/// Stored as milliseconds since a fixed monotonic origin.
#[derive(Debug)]
pub struct IdleClock {
    origin: Instant,
    last_input_ms: AtomicU64,
}

impl IdleClock {
    /// Create a clock whose last input is "now".
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self {
            origin,
            last_input_ms: AtomicU64::new(0),
        }
    }

    /// Record input activity now. Never blocks.
    pub fn touch(&self) {
        self.touch_at(Instant::now());
    }

    /// Record input activity at `at`. An earlier instant never moves the
    /// timestamp backwards.
    pub fn touch_at(&self, at: Instant) {
        self.last_input_ms.fetch_max(self.offset_ms(at), Ordering::Relaxed);
    }

    pub fn last_input(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_input_ms.load(Ordering::Relaxed))
    }

    /// Time elapsed since the last input.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_input())
    }

    /// Return the idle gap if it exceeds `threshold`, resetting the baseline
    /// to `now` when it does.
    pub fn check(&self, now: Instant, threshold: Duration) -> Option<Duration> {
        let gap = self.idle_for(now);
        if gap > threshold {
            self.touch_at(now);
            Some(gap)
        } else {
            None
        }
    }

    fn offset_ms(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.origin).as_millis() as u64
    }
}

impl Default for IdleClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the idle clock and writes idle events to the sink.
pub struct IdleMonitor {
    clock: Arc<IdleClock>,
    sink: SharedSink,
    stats: SharedTransparencyLog,
    threshold: Duration,
    poll_interval: Duration,
}

impl IdleMonitor {
    pub fn new(
        clock: Arc<IdleClock>,
        sink: SharedSink,
        stats: SharedTransparencyLog,
        threshold: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            clock,
            sink,
            stats,
            threshold,
            poll_interval,
        }
    }

    /// Check once at `now`; returns the event if one was emitted.
    pub fn poll(&self, now: Instant) -> Option<IdleEvent> {
        let gap = self.clock.check(now, self.threshold)?;
        let event = IdleEvent {
            detected_at: Utc::now(),
            duration_secs: gap.as_secs_f64(),
        };

        match self.sink.append_idle(&event) {
            Ok(()) => {
                self.stats.record_idle_event();
                info!("user idle for {}s", gap.as_secs());
            }
            Err(e) => warn!("failed to record idle event: {e}"),
        }
        Some(event)
    }

    /// Run the idle watcher loop until shutdown.
    pub fn run(self, shutdown: ShutdownSignal) {
        info!(
            threshold_secs = self.threshold.as_secs(),
            "idle watcher started"
        );
        shutdown.run_every(self.poll_interval, || {
            self.poll(Instant::now());
        });
        info!("idle watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;
    use crate::transparency::create_shared_log;

    const THRESHOLD: Duration = Duration::from_secs(300);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_no_event_at_or_below_threshold() {
        let origin = Instant::now();
        let clock = IdleClock::starting_at(origin);

        assert_eq!(clock.check(origin + secs(299), THRESHOLD), None);
        assert_eq!(clock.check(origin + secs(300), THRESHOLD), None);
    }

    #[test]
    fn test_one_event_per_episode() {
        let origin = Instant::now();
        let clock = IdleClock::starting_at(origin);

        assert_eq!(clock.check(origin + secs(301), THRESHOLD), Some(secs(301)));
        // Baseline was reset at detection: the next poll sees a short gap.
        assert_eq!(clock.check(origin + secs(306), THRESHOLD), None);
        // Still idle long after: a new episode measured from detection.
        assert_eq!(
            clock.check(origin + secs(302 + 300), THRESHOLD),
            Some(secs(301))
        );
    }

    #[test]
    fn test_input_resets_gap() {
        let origin = Instant::now();
        let clock = IdleClock::starting_at(origin);

        clock.touch_at(origin + secs(200));
        assert_eq!(clock.check(origin + secs(400), THRESHOLD), None);
        assert_eq!(clock.idle_for(origin + secs(400)), secs(200));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let origin = Instant::now();
        let clock = IdleClock::starting_at(origin);

        clock.touch_at(origin + secs(50));
        clock.touch_at(origin + secs(10));
        assert_eq!(clock.last_input(), origin + secs(50));
    }

    #[test]
    fn test_monitor_writes_event_with_observed_gap() {
        let origin = Instant::now();
        let sink = Arc::new(MemorySink::new());
        let stats = create_shared_log();
        let monitor = IdleMonitor::new(
            Arc::new(IdleClock::starting_at(origin)),
            sink.clone(),
            stats.clone(),
            THRESHOLD,
            secs(5),
        );

        assert!(monitor.poll(origin + secs(295)).is_none());
        let event = monitor.poll(origin + secs(305)).unwrap();
        assert_eq!(event.duration_secs, 305.0);
        assert!(monitor.poll(origin + secs(310)).is_none());

        assert_eq!(sink.idle().len(), 1);
        assert_eq!(stats.stats().idle_events, 1);
    }
}
