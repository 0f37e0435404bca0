//! Input capture on platforms without a system hook implementation.
//!
//! Keys and mouse activity only arrive through the [`InputHook`] (replays and
//! embedding applications), so this collector just tracks its running state.

use crate::collector::hook::{CollectorError, InputHook};
use tracing::warn;

/// A collector that installs nothing.
pub struct NoopCollector {
    _hook: InputHook,
    running: bool,
}

impl NoopCollector {
    pub fn new(hook: InputHook) -> Self {
        Self {
            _hook: hook,
            running: false,
        }
    }

    /// Start capturing events.
    ///
    /// On this platform it only marks the collector as running.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running {
            return Err(CollectorError::AlreadyRunning);
        }
        warn!("no system input hook on this platform; keystrokes are not captured");
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::key_queue;
    use crate::core::IdleClock;
    use crate::transparency::create_shared_log;
    use std::sync::Arc;

    #[test]
    fn test_collector_lifecycle() {
        let (tx, _rx) = key_queue(4);
        let hook = InputHook::new(tx, Arc::new(IdleClock::new()), create_shared_log());
        let mut collector = NoopCollector::new(hook);
        assert!(!collector.is_running());

        collector.start().unwrap();
        assert!(collector.is_running());
        assert_eq!(collector.start(), Err(CollectorError::AlreadyRunning));

        collector.stop();
        assert!(!collector.is_running());
    }
}
