//! Transparency log.
//!
//! Tracks what the agent captured, redacted, persisted and dropped, without
//! storing any content. Counters are atomics so every pipeline thread can
//! record into the same shared log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Transparency statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Key events accepted into the queue
    keys_captured: AtomicU64,
    /// Key events dropped because the queue was full
    keys_dropped: AtomicU64,
    /// Key events classified by the consumer
    keys_processed: AtomicU64,
    /// Keys stored as the redaction token
    keys_redacted: AtomicU64,
    mouse_events: AtomicU64,
    batches_flushed: AtomicU64,
    /// Tokens lost to failed flushes
    tokens_lost: AtomicU64,
    flush_failures: AtomicU64,
    spans_recorded: AtomicU64,
    idle_events: AtomicU64,
    credentials_sealed: AtomicU64,
    credential_failures: AtomicU64,
    summaries_requested: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            keys_captured: AtomicU64::new(0),
            keys_dropped: AtomicU64::new(0),
            keys_processed: AtomicU64::new(0),
            keys_redacted: AtomicU64::new(0),
            mouse_events: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            tokens_lost: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            spans_recorded: AtomicU64::new(0),
            idle_events: AtomicU64::new(0),
            credentials_sealed: AtomicU64::new(0),
            credential_failures: AtomicU64::new(0),
            summaries_requested: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    ///
    /// Counters continue from the previously saved totals, if any.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            debug!("could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_key_captured(&self) {
        self.keys_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_dropped(&self) {
        self.keys_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_processed(&self) {
        self.keys_processed.fetch_add(1, Ordering::Release);
    }

    pub fn record_key_redacted(&self) {
        self.keys_redacted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mouse_event(&self) {
        self.mouse_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed flush that discarded `tokens` buffered keystrokes.
    pub fn record_flush_failure(&self, tokens: u64) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
        self.tokens_lost.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn record_span(&self) {
        self.spans_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_event(&self) {
        self.idle_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_credential_sealed(&self) {
        self.credentials_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_credential_failure(&self) {
        self.credential_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_summary_request(&self) {
        self.summaries_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of key events the consumer has finished classifying.
    pub fn keys_processed(&self) -> u64 {
        self.keys_processed.load(Ordering::Acquire)
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            keys_captured: self.keys_captured.load(Ordering::Relaxed),
            keys_dropped: self.keys_dropped.load(Ordering::Relaxed),
            keys_processed: self.keys_processed.load(Ordering::Acquire),
            keys_redacted: self.keys_redacted.load(Ordering::Relaxed),
            mouse_events: self.mouse_events.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            tokens_lost: self.tokens_lost.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            spans_recorded: self.spans_recorded.load(Ordering::Relaxed),
            idle_events: self.idle_events.load(Ordering::Relaxed),
            credentials_sealed: self.credentials_sealed.load(Ordering::Relaxed),
            credential_failures: self.credential_failures.load(Ordering::Relaxed),
            summaries_requested: self.summaries_requested.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        self.stats().summary()
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                stats: self.stats(),
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(stats) = self.persist_path.as_ref().map(load_stats).transpose()?.flatten() {
            self.keys_captured.store(stats.keys_captured, Ordering::Relaxed);
            self.keys_dropped.store(stats.keys_dropped, Ordering::Relaxed);
            self.keys_redacted.store(stats.keys_redacted, Ordering::Relaxed);
            self.mouse_events.store(stats.mouse_events, Ordering::Relaxed);
            self.batches_flushed
                .store(stats.batches_flushed, Ordering::Relaxed);
            self.tokens_lost.store(stats.tokens_lost, Ordering::Relaxed);
            self.flush_failures
                .store(stats.flush_failures, Ordering::Relaxed);
            self.spans_recorded
                .store(stats.spans_recorded, Ordering::Relaxed);
            self.idle_events.store(stats.idle_events, Ordering::Relaxed);
            self.credentials_sealed
                .store(stats.credentials_sealed, Ordering::Relaxed);
            self.credential_failures
                .store(stats.credential_failures, Ordering::Relaxed);
            self.summaries_requested
                .store(stats.summaries_requested, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub keys_captured: u64,
    pub keys_dropped: u64,
    /// Per-session progress counter, not carried across sessions
    #[serde(default)]
    pub keys_processed: u64,
    pub keys_redacted: u64,
    pub mouse_events: u64,
    pub batches_flushed: u64,
    pub tokens_lost: u64,
    pub flush_failures: u64,
    pub spans_recorded: u64,
    pub idle_events: u64,
    pub credentials_sealed: u64,
    pub credential_failures: u64,
    pub summaries_requested: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl TransparencyStats {
    pub fn summary(&self) -> String {
        format!(
            "Session Statistics:\n\
             - Keystrokes captured: {}\n\
             - Keystrokes redacted: {}\n\
             - Keystrokes dropped (queue full): {}\n\
             - Keystroke batches flushed: {}\n\
             - Failed flushes: {} ({} keystrokes lost)\n\
             - Mouse events: {}\n\
             - Activity spans recorded: {}\n\
             - Idle events recorded: {}\n\
             - Credential entries sealed: {} ({} failed)\n\
             - Summaries requested: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - Keys typed into sign-in windows are stored as [REDACTED]\n\
             - Passwords are never stored\n\
             - Credential entries are sealed before they touch disk",
            self.keys_captured,
            self.keys_redacted,
            self.keys_dropped,
            self.batches_flushed,
            self.flush_failures,
            self.tokens_lost,
            self.mouse_events,
            self.spans_recorded,
            self.idle_events,
            self.credentials_sealed,
            self.credential_failures,
            self.summaries_requested,
            self.session_duration_secs
        )
    }
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(flatten)]
    stats: TransparencyStats,
    last_updated: DateTime<Utc>,
}

/// Read persisted stats, if the file exists.
pub fn load_stats(path: &PathBuf) -> Result<Option<TransparencyStats>, std::io::Error> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let persisted: PersistedStats =
        serde_json::from_str(&content).map_err(std::io::Error::other)?;
    Ok(Some(persisted.stats))
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
