//! Producer-side handle fed by platform input hooks.
//!
//! Hook callbacks run on the OS input thread and must never block: key events
//! go into a bounded queue with `try_send`, and every event (key or mouse)
//! refreshes the shared idle clock.

use crate::collector::types::{Key, KeyEvent};
use crate::core::idle::IdleClock;
use crate::transparency::SharedTransparencyLog;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;

/// Errors that can occur when pushing an input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    /// The key queue is full; the event was dropped
    QueueFull,
    /// The consumer has shut down
    Stopped,
    /// The system input hook is already installed
    AlreadyRunning,
    /// The system input hook could not be installed
    HookInstallationFailed(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::QueueFull => write!(f, "Key queue is full, event dropped"),
            CollectorError::Stopped => write!(f, "Capture pipeline has stopped"),
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::HookInstallationFailed(e) => {
                write!(f, "Failed to install input hook: {e}")
            }
        }
    }
}

impl std::error::Error for CollectorError {}

/// Create the ordered key queue shared by the hook and the consumer thread.
pub fn key_queue(capacity: usize) -> (Sender<KeyEvent>, Receiver<KeyEvent>) {
    bounded(capacity)
}

/// Cloneable, non-blocking entry point for input hooks.
#[derive(Clone)]
pub struct InputHook {
    sender: Sender<KeyEvent>,
    idle: Arc<IdleClock>,
    stats: SharedTransparencyLog,
}

impl InputHook {
    pub fn new(sender: Sender<KeyEvent>, idle: Arc<IdleClock>, stats: SharedTransparencyLog) -> Self {
        Self {
            sender,
            idle,
            stats,
        }
    }

    /// Deliver a key-down event.
    pub fn on_key(&self, key: Key) -> Result<(), CollectorError> {
        self.idle.touch();

        match self.sender.try_send(KeyEvent::new(key)) {
            Ok(()) => {
                self.stats.record_key_captured();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_key_dropped();
                Err(CollectorError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(CollectorError::Stopped),
        }
    }

    /// Deliver a mouse activity ping. Only the idle clock cares about these.
    pub fn on_mouse(&self) {
        self.idle.touch();
        self.stats.record_mouse_event();
    }

    /// Number of key events waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}
