//! Inbound commands and the summarization hand-off.
//!
//! The pipeline accepts commands on a channel and forwards `summarize`
//! verbatim to a [`Summarizer`]. Producing the summary itself happens outside
//! this crate.

use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Commands accepted by a running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Summarize,
}

/// Error parsing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown command: {:?}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" => Ok(Command::Summarize),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Error reported by a summarizer.
#[derive(Debug, Clone)]
pub struct SummaryError(pub String);

impl std::fmt::Display for SummaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Summary failed: {}", self.0)
    }
}

impl std::error::Error for SummaryError {}

/// Collaborator producing a summary of stored activity.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, session_id: Uuid) -> Result<(), SummaryError>;
}

/// Summarizer that only logs the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSummarizer;

impl Summarizer for LoggingSummarizer {
    fn summarize(&self, session_id: Uuid) -> Result<(), SummaryError> {
        info!(%session_id, "summary requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!("summarize".parse::<Command>().unwrap(), Command::Summarize);
        assert_eq!(" Summarize\n".parse::<Command>().unwrap(), Command::Summarize);
        assert!("shutdown".parse::<Command>().is_err());
    }
}
