//! Core capture-and-buffering pipeline.
//!
//! This module contains:
//! - Window and idle monitors writing directly to the persistence sink
//! - The sensitive-context tracker classifying each dequeued key
//! - The keystroke batcher flushing by size or time
//! - The pipeline owning every thread and the shutdown signal

pub mod batcher;
pub mod command;
pub mod idle;
pub mod pipeline;
pub mod sensitive;
pub mod shutdown;
pub mod window_monitor;

// Re-export commonly used types
pub use batcher::{FlushOutcome, KeystrokeBatcher};
pub use command::{Command, LoggingSummarizer, Summarizer, SummaryError, UnknownCommand};
pub use idle::{IdleClock, IdleMonitor};
pub use pipeline::{Collaborators, Pipeline, PipelineError};
pub use sensitive::{CommitOutcome, InputMode, SensitiveContextTracker, SensitivityMatcher};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use window_monitor::{SpanTracker, WindowMonitor};
