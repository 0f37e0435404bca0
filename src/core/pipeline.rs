//! The capture pipeline.
//!
//! [`Pipeline::start`] spawns one thread per loop:
//!
//! ```text
//!  InputHook ──▶ key queue ──▶ consumer (SensitiveContextTracker) ──▶ KeystrokeBatcher ──▶ sink
//!      │                              │                                     ▲
//!      ▼                              ▼                                     │
//!  IdleClock ◀── idle watcher ──▶ sink    SecureStore          flush timer ─┘
//!
//!  window monitor ──▶ sink             commands ──▶ Summarizer
//! ```
//!
//! Every loop observes the same shutdown signal. [`Pipeline::stop`] triggers
//! it, joins every thread, then runs a final forced flush of the batcher so
//! the last partial batch is persisted.

use crate::collector::{key_queue, InputHook, KeyEvent};
use crate::config::{Config, ConfigError};
use crate::core::batcher::KeystrokeBatcher;
use crate::core::command::{Command, Summarizer};
use crate::core::idle::{IdleClock, IdleMonitor};
use crate::core::sensitive::{SensitiveContextTracker, SensitivityMatcher};
use crate::core::shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
use crate::core::window_monitor::WindowMonitor;
use crate::foreground::SharedForeground;
use crate::storage::{FlushTrigger, SharedSecureStore, SharedSink};
use crate::transparency::{SharedTransparencyLog, TransparencyStats};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

type LoopBody = Box<dyn FnOnce() + Send>;

/// External collaborators injected into the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub foreground: SharedForeground,
    pub sink: SharedSink,
    pub store: SharedSecureStore,
    pub summarizer: Arc<dyn Summarizer>,
    pub stats: SharedTransparencyLog,
}

/// Errors that prevent the pipeline from starting.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    Spawn(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "{e}"),
            PipelineError::Spawn(e) => write!(f, "Failed to spawn pipeline thread: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

/// A running capture pipeline.
pub struct Pipeline {
    session_id: Uuid,
    hook: InputHook,
    commands: Sender<Command>,
    batcher: Arc<KeystrokeBatcher>,
    stats: SharedTransparencyLog,
    trigger: ShutdownTrigger,
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl Pipeline {
    /// Validate `config` and spawn every loop.
    ///
    /// Nothing is left running if any step fails.
    pub fn start(config: &Config, collaborators: Collaborators) -> Result<Self, PipelineError> {
        config.validate()?;

        let Collaborators {
            foreground,
            sink,
            store,
            summarizer,
            stats,
        } = collaborators;

        let session_id = Uuid::new_v4();
        let (trigger, shutdown) = shutdown_channel();
        let (key_tx, key_rx) = key_queue(config.queue_capacity);
        let (command_tx, command_rx) = unbounded();
        let idle_clock = Arc::new(IdleClock::new());

        let batcher = Arc::new(KeystrokeBatcher::new(
            session_id,
            config.batch_size,
            sink.clone(),
            stats.clone(),
        ));

        let mut pipeline = Self {
            session_id,
            hook: InputHook::new(key_tx, idle_clock.clone(), stats.clone()),
            commands: command_tx,
            batcher: batcher.clone(),
            stats: stats.clone(),
            trigger,
            threads: Vec::new(),
        };

        let tracker = SensitiveContextTracker::new(
            SensitivityMatcher::new(config.sensitive_keywords.as_slice()),
            foreground.clone(),
            batcher.clone(),
            store,
            stats.clone(),
        );
        let window_monitor = WindowMonitor::new(
            session_id,
            foreground,
            sink.clone(),
            stats.clone(),
            config.poll_interval,
        );
        let idle_monitor = IdleMonitor::new(
            idle_clock,
            sink,
            stats.clone(),
            config.idle_threshold(),
            config.idle_poll_interval,
        );
        let flush_interval = config.flush_interval;

        let loops: Vec<(&'static str, LoopBody)> = vec![
            ("key-consumer", {
                let shutdown = shutdown.clone();
                Box::new(move || run_consumer(tracker, key_rx, shutdown)) as LoopBody
            }),
            ("flush-timer", {
                let shutdown = shutdown.clone();
                Box::new(move || batcher.run_flush_timer(flush_interval, shutdown)) as LoopBody
            }),
            ("window-monitor", {
                let shutdown = shutdown.clone();
                Box::new(move || window_monitor.run(shutdown)) as LoopBody
            }),
            ("idle-watcher", {
                let shutdown = shutdown.clone();
                Box::new(move || idle_monitor.run(shutdown)) as LoopBody
            }),
            ("commands", {
                let stats = stats.clone();
                Box::new(move || {
                    run_commands(command_rx, summarizer, stats, session_id, shutdown)
                }) as LoopBody
            }),
        ];

        for (name, body) in loops {
            if let Err(e) = pipeline.spawn(name, body) {
                error!("pipeline startup failed: {e}");
                pipeline.shutdown();
                return Err(e);
            }
        }

        info!(%session_id, "capture pipeline started");
        Ok(pipeline)
    }

    fn spawn(
        &mut self,
        name: &'static str,
        body: LoopBody,
    ) -> Result<(), PipelineError> {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|e| PipelineError::Spawn(format!("{name}: {e}")))?;
        self.threads.push((name, handle));
        Ok(())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Handle for platform input hooks.
    pub fn input_hook(&self) -> InputHook {
        self.hook.clone()
    }

    /// Sender for inbound commands.
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    pub fn stats(&self) -> SharedTransparencyLog {
        self.stats.clone()
    }

    /// Stop every loop, flush the remaining keystrokes and persist stats.
    pub fn stop(mut self) -> TransparencyStats {
        self.shutdown();
        self.stats.stats()
    }

    fn shutdown(&mut self) {
        if self.threads.is_empty() {
            return;
        }

        self.trigger.trigger();
        for (name, handle) in self.threads.drain(..) {
            if handle.join().is_err() {
                error!(thread = name, "pipeline thread panicked");
            }
        }

        self.batcher.flush(FlushTrigger::Shutdown);

        if let Err(e) = self.stats.save() {
            warn!("could not save transparency log: {e}");
        }
        info!(session_id = %self.session_id, "capture pipeline stopped");
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drain the key queue in arrival order until shutdown.
///
/// Keys already queued when shutdown fires are still classified.
fn run_consumer(
    mut tracker: SensitiveContextTracker,
    keys: Receiver<KeyEvent>,
    shutdown: ShutdownSignal,
) {
    info!("key consumer started");
    loop {
        select! {
            recv(keys) -> event => match event {
                Ok(event) => {
                    tracker.handle(event.key);
                }
                Err(_) => break,
            },
            recv(shutdown.receiver()) -> _ => break,
        }
    }

    for event in keys.try_iter() {
        tracker.handle(event.key);
    }
    info!("key consumer stopped");
}

fn run_commands(
    commands: Receiver<Command>,
    summarizer: Arc<dyn Summarizer>,
    stats: SharedTransparencyLog,
    session_id: Uuid,
    shutdown: ShutdownSignal,
) {
    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(Command::Summarize) => {
                    stats.record_summary_request();
                    if let Err(e) = summarizer.summarize(session_id) {
                        warn!("{e}");
                    }
                }
                Err(_) => break,
            },
            recv(shutdown.receiver()) -> _ => break,
        }
    }
}
