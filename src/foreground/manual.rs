//! A foreground source driven by the caller.
//!
//! Used by the replay driver and by tests to script window changes.

use super::{ForegroundWindow, LookupError, WindowSnapshot};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct ManualForeground {
    current: Mutex<Option<WindowSnapshot>>,
}

impl ManualForeground {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(app: impl Into<String>, title: impl Into<String>) -> Self {
        let foreground = Self::new();
        foreground.set(app, title);
        foreground
    }

    /// Bring a window to the foreground.
    pub fn set(&self, app: impl Into<String>, title: impl Into<String>) {
        *self.current.lock() = Some(WindowSnapshot::new(app, title));
    }

    /// Simulate no window holding focus.
    pub fn clear(&self) {
        *self.current.lock() = None;
    }
}

impl ForegroundWindow for ManualForeground {
    fn query(&self) -> Result<WindowSnapshot, LookupError> {
        self.current
            .lock()
            .clone()
            .ok_or(LookupError::NoForegroundWindow)
    }
}
