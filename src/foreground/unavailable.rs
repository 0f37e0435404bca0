//! Non-Windows foreground source.
//!
//! This exists so the crate (and binary) can compile on targets without a
//! supported window query. Every lookup fails, so the window monitor records
//! `Unknown` and the tracker treats all keys as non-sensitive.

use super::{ForegroundWindow, LookupError, WindowSnapshot};

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableForeground;

impl ForegroundWindow for UnavailableForeground {
    fn query(&self) -> Result<WindowSnapshot, LookupError> {
        Err(LookupError::Unsupported)
    }
}
