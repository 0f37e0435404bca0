//! Transparency module for the activity tracker.
//!
//! This module provides tools for tracking and exposing what data the agent
//! collects and what it redacts.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, load_stats, SharedTransparencyLog,
    TransparencyLog, TransparencyStats,
};
