//! Desktop Activity Tracker - background activity tracking with
//! sensitive-input redaction.
//!
//! This library records which application window holds focus and for how
//! long, which keys are typed, and when the user goes idle. Keys typed while
//! a sign-in style window is focused are replaced with a redaction token, and
//! the username typed there is sealed into an encrypted credential store.
//!
//! # Privacy Guarantees
//!
//! - **Redaction**: Keys typed into sensitive windows are stored as `[REDACTED]`
//! - **No passwords**: Credential records carry a fixed password placeholder
//! - **Sealed credentials**: Usernames are encrypted before they touch disk
//! - **Transparency**: All collection is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Desktop Activity Tracker                      │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌───────────┐  │
//! │  │ InputHook │──▶│ Key queue │──▶│ Sensitive  │──▶│ Keystroke │  │
//! │  │           │   │ (bounded) │   │  tracker   │   │  batcher  │  │
//! │  └───────────┘   └───────────┘   └────────────┘   └───────────┘  │
//! │        │                               │                │        │
//! │        ▼                               ▼                ▼        │
//! │  ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌───────────┐  │
//! │  │   Idle    │   │  Window   │──▶│   Sealed   │   │   JSONL   │  │
//! │  │  monitor  │   │  monitor  │   │   store    │   │   sink    │  │
//! │  └───────────┘   └───────────┘   └────────────┘   └───────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use desktop_activity_tracker::{
//!     collector::Key, config::Config, core::{Collaborators, LoggingSummarizer, Pipeline},
//!     foreground::system_foreground, storage::{JsonlSink, SealedFileStore},
//!     transparency::create_shared_log,
//! };
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let collaborators = Collaborators {
//!     foreground: system_foreground(),
//!     sink: Arc::new(JsonlSink::open(&config.data_path).expect("sink")),
//!     store: Arc::new(SealedFileStore::open(&config.data_path).expect("store")),
//!     summarizer: Arc::new(LoggingSummarizer),
//!     stats: create_shared_log(),
//! };
//!
//! let pipeline = Pipeline::start(&config, collaborators).expect("pipeline");
//! let hook = pipeline.input_hook();
//! hook.on_key(Key::Char('a')).ok();
//! let stats = pipeline.stop();
//! println!("{}", stats.summary());
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod foreground;
pub mod replay;
pub mod storage;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorError, InputHook, Key, KeyEvent, NamedKey};
pub use config::{Config, ConfigError};
pub use core::{Collaborators, Command, Pipeline, PipelineError, Summarizer};
pub use foreground::{ForegroundWindow, ManualForeground, WindowSnapshot};
pub use storage::{JsonlSink, PersistenceSink, SealedFileStore, SecureStore, StorageError};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║          DESKTOP ACTIVITY TRACKER - PRIVACY DECLARATION          ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tracker records your own desktop activity locally.         ║
║                                                                  ║
║  ✓ WHAT WE RECORD:                                               ║
║    • Which application window is focused, and for how long       ║
║    • Keys typed in ordinary windows                              ║
║    • When you stop using the keyboard and mouse (idle periods)   ║
║                                                                  ║
║  ✗ WHAT WE NEVER RECORD:                                         ║
║    • Keys typed into sign-in windows (stored as [REDACTED])      ║
║    • Passwords (credential records carry a placeholder only)     ║
║    • Cursor position or screen content                           ║
║                                                                  ║
║  Usernames typed into sign-in windows are encrypted before       ║
║  they are written. All data stays on this machine.               ║
║                                                                  ║
║  You can view collection statistics anytime with:                ║
║    activity-tracker status                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER RECORD"));
        assert!(PRIVACY_DECLARATION.contains(storage::REDACTION_TOKEN));
    }
}
