//! Shutdown signal shared by every pipeline loop.
//!
//! The signal is a zero-capacity channel that never carries a message. Once the
//! trigger drops its sender, every receiver observes the disconnection, so a
//! loop blocked in `select!` on its ticker wakes immediately.

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TryRecvError};
use std::time::Duration;

/// Owner side of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: Option<Sender<()>>,
}

impl ShutdownTrigger {
    /// Signal every loop to stop. Idempotent.
    pub fn trigger(&mut self) {
        self.sender.take();
    }
}

/// Observer side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    /// Receiver that becomes ready (disconnected) on shutdown.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Run `f` on a monotonic ticker until shutdown.
    ///
    /// The first call happens one `interval` after start.
    pub fn run_every(&self, interval: Duration, mut f: impl FnMut()) {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => f(),
                recv(self.receiver) -> _ => break,
            }
        }
    }
}

/// Create a linked trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = bounded(0);
    (
        ShutdownTrigger {
            sender: Some(sender),
        },
        ShutdownSignal { receiver },
    )
}
