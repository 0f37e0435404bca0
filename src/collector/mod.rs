//! Input capture for the activity tracker.
//!
//! Platform hooks deliver events through an [`InputHook`]; the hook pushes key
//! events into an ordered, bounded queue drained by a single consumer thread.
//! On Windows a [`Collector`] installs low-level keyboard and mouse hooks that
//! feed it.

pub mod hook;
pub mod keymap;
pub mod types;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod noop;

// Re-export commonly used types
pub use hook::{key_queue, CollectorError, InputHook};
pub use keymap::{key_from_virtual_key, Modifiers};
pub use types::{Key, KeyEvent, NamedKey, ParseKeyError};

#[cfg(target_os = "windows")]
pub use self::windows::WindowsCollector;

/// Platform-agnostic collector type alias
#[cfg(target_os = "windows")]
pub type Collector = WindowsCollector;

#[cfg(not(target_os = "windows"))]
pub use noop::NoopCollector;

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "windows"))]
pub type Collector = NoopCollector;
