//! Foreground window queries.
//!
//! Both the window monitor and the sensitive-context tracker look up the
//! foreground window independently through a shared [`ForegroundWindow`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod manual;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod unavailable;

pub use manual::ManualForeground;

#[cfg(target_os = "windows")]
pub use self::windows::Win32Foreground;

#[cfg(not(target_os = "windows"))]
pub use unavailable::UnavailableForeground;

/// App label used when the owning process cannot be resolved.
pub const UNKNOWN_APP: &str = "Unknown";

/// Process name and title of a foreground window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub app: String,
    pub title: String,
}

impl WindowSnapshot {
    pub fn new(app: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            title: title.into(),
        }
    }

    /// Placeholder for a window that could not be queried.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_APP, "")
    }
}

/// Errors from a foreground window query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No window currently holds focus
    NoForegroundWindow,
    /// Foreground queries are not supported on this platform
    Unsupported,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::NoForegroundWindow => write!(f, "No foreground window"),
            LookupError::Unsupported => {
                write!(f, "Foreground window queries are not supported on this platform")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Source of the current foreground window.
pub trait ForegroundWindow: Send + Sync {
    fn query(&self) -> Result<WindowSnapshot, LookupError>;
}

/// Shared handle to a foreground window source.
pub type SharedForeground = Arc<dyn ForegroundWindow>;

/// The foreground source for the current platform.
#[cfg(target_os = "windows")]
pub fn system_foreground() -> SharedForeground {
    Arc::new(Win32Foreground)
}

/// The foreground source for the current platform.
#[cfg(not(target_os = "windows"))]
pub fn system_foreground() -> SharedForeground {
    Arc::new(UnavailableForeground)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_snapshot() {
        let snapshot = WindowSnapshot::unknown();
        assert_eq!(snapshot.app, "Unknown");
        assert!(snapshot.title.is_empty());
    }

    #[test]
    fn test_snapshot_equality_uses_app_and_title() {
        assert_eq!(
            WindowSnapshot::new("code.exe", "main.rs"),
            WindowSnapshot::new("code.exe", "main.rs")
        );
        assert_ne!(
            WindowSnapshot::new("code.exe", "main.rs"),
            WindowSnapshot::new("code.exe", "lib.rs")
        );
    }
}
