//! Foreground window tracking.
//!
//! The monitor polls the foreground window and closes an [`ActivitySpan`] for
//! the previous window whenever the (app, title) pair changes. The first
//! observed window only opens a span.

use crate::core::shutdown::ShutdownSignal;
use crate::foreground::{SharedForeground, WindowSnapshot};
use crate::storage::{ActivitySpan, SharedSink};
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The span currently accumulating foreground time.
#[derive(Debug, Clone)]
struct OpenSpan {
    window: WindowSnapshot,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl OpenSpan {
    fn close(self, session_id: Uuid, now: Instant) -> ActivitySpan {
        let elapsed = now.saturating_duration_since(self.started);
        let end = self.started_at
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        ActivitySpan {
            session_id,
            app: self.window.app,
            title: self.window.title,
            start: self.started_at,
            end,
            duration_secs: elapsed.as_secs_f64(),
        }
    }
}

/// Pure span bookkeeping, separated from polling so it can be driven with
/// explicit instants.
#[derive(Debug)]
pub struct SpanTracker {
    session_id: Uuid,
    current: Option<OpenSpan>,
}

impl SpanTracker {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            current: None,
        }
    }

    /// Observe the foreground window at `now`.
    ///
    /// Returns the closed span of the previous window if the window changed.
    pub fn observe(&mut self, window: WindowSnapshot, now: Instant) -> Option<ActivitySpan> {
        if let Some(open) = &self.current {
            if open.window == window {
                return None;
            }
        }

        let opened = OpenSpan {
            window,
            started: now,
            started_at: Utc::now(),
        };
        self.current
            .replace(opened)
            .map(|previous| previous.close(self.session_id, now))
    }

    /// Close the open span, if any.
    pub fn close(&mut self, now: Instant) -> Option<ActivitySpan> {
        self.current
            .take()
            .map(|open| open.close(self.session_id, now))
    }

    pub fn current_window(&self) -> Option<&WindowSnapshot> {
        self.current.as_ref().map(|open| &open.window)
    }
}

/// Polls the foreground window and persists activity spans.
pub struct WindowMonitor {
    foreground: SharedForeground,
    sink: SharedSink,
    stats: SharedTransparencyLog,
    spans: SpanTracker,
    poll_interval: Duration,
}

impl WindowMonitor {
    pub fn new(
        session_id: Uuid,
        foreground: SharedForeground,
        sink: SharedSink,
        stats: SharedTransparencyLog,
        poll_interval: Duration,
    ) -> Self {
        Self {
            foreground,
            sink,
            stats,
            spans: SpanTracker::new(session_id),
            poll_interval,
        }
    }

    /// Poll the foreground window once.
    pub fn poll(&mut self, now: Instant) {
        let window = match self.foreground.query() {
            Ok(window) => window,
            Err(e) => {
                debug!("foreground lookup failed: {e}");
                WindowSnapshot::unknown()
            }
        };

        if let Some(span) = self.spans.observe(window, now) {
            self.record(span);
        }
    }

    fn record(&self, span: ActivitySpan) {
        match self.sink.append_activity(&span) {
            Ok(()) => {
                self.stats.record_span();
                info!(
                    app = %span.app,
                    duration_secs = span.duration_secs,
                    "window switched"
                );
            }
            Err(e) => warn!(app = %span.app, "failed to record activity span: {e}"),
        }
    }

    /// Run the polling loop until shutdown, then close the open span.
    pub fn run(mut self, shutdown: ShutdownSignal) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "window monitor started"
        );
        let interval = self.poll_interval;
        shutdown.run_every(interval, || self.poll(Instant::now()));

        if let Some(span) = self.spans.close(Instant::now()) {
            self.record(span);
        }
        info!("window monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreground::ManualForeground;
    use crate::storage::MemorySink;
    use crate::transparency::create_shared_log;
    use std::sync::Arc;

    fn window(app: &str, title: &str) -> WindowSnapshot {
        WindowSnapshot::new(app, title)
    }

    #[test]
    fn test_first_window_emits_nothing() {
        let mut tracker = SpanTracker::new(Uuid::new_v4());
        assert!(tracker
            .observe(window("code", "main.rs"), Instant::now())
            .is_none());
        assert_eq!(tracker.current_window(), Some(&window("code", "main.rs")));
    }

    #[test]
    fn test_change_closes_previous_window() {
        let start = Instant::now();
        let mut tracker = SpanTracker::new(Uuid::new_v4());

        tracker.observe(window("code", "main.rs"), start);
        assert!(tracker
            .observe(window("code", "main.rs"), start + Duration::from_secs(3))
            .is_none());

        let span = tracker
            .observe(window("firefox", "docs"), start + Duration::from_secs(7))
            .unwrap();
        assert_eq!(span.app, "code");
        assert_eq!(span.title, "main.rs");
        assert_eq!(span.duration_secs, 7.0);
        assert_eq!(span.end - span.start, chrono::Duration::seconds(7));
    }

    #[test]
    fn test_title_change_alone_is_a_transition() {
        let start = Instant::now();
        let mut tracker = SpanTracker::new(Uuid::new_v4());

        tracker.observe(window("code", "main.rs"), start);
        let span = tracker
            .observe(window("code", "lib.rs"), start + Duration::from_secs(2))
            .unwrap();
        assert_eq!(span.title, "main.rs");
    }

    #[test]
    fn test_close_without_window_is_empty() {
        let mut tracker = SpanTracker::new(Uuid::new_v4());
        assert!(tracker.close(Instant::now()).is_none());
    }

    #[test]
    fn test_lookup_failure_records_unknown() {
        let foreground = Arc::new(ManualForeground::with_window("code", "main.rs"));
        let sink = Arc::new(MemorySink::new());
        let mut monitor = WindowMonitor::new(
            Uuid::new_v4(),
            foreground.clone(),
            sink.clone(),
            create_shared_log(),
            Duration::from_secs(1),
        );

        let start = Instant::now();
        monitor.poll(start);
        foreground.clear();
        monitor.poll(start + Duration::from_secs(1));
        foreground.set("code", "main.rs");
        monitor.poll(start + Duration::from_secs(2));

        let spans = sink.activity();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].app, "code");
        assert_eq!(spans[1].app, "Unknown");
        assert_eq!(spans[1].title, "");
    }
}
