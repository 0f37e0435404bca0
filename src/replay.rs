//! Scripted input replay.
//!
//! A replay script is JSON Lines, one step per line. Blank lines and lines
//! starting with `#` are ignored:
//!
//! ```text
//! {"window": {"app": "firefox.exe", "title": "Sign in - Example"}}
//! {"text": "alice"}
//! {"key": "<enter>"}
//! "mouse"
//! {"pause_ms": 1500}
//! "no_window"
//! "summarize"
//! ```
//!
//! Steps drive a live pipeline through its [`InputHook`] and a
//! [`ManualForeground`]. Before each window change the replayer waits for the
//! consumer to classify every key already sent, so keys are judged against
//! the window they were typed into.

use crate::collector::{InputHook, Key};
use crate::core::Command;
use crate::foreground::ManualForeground;
use crate::transparency::SharedTransparencyLog;
use crossbeam_channel::Sender;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::warn;

/// One step of a replay script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    /// Bring a window to the foreground
    Window { app: String, title: String },
    /// No window holds focus
    NoWindow,
    /// Press a single key
    Key(Key),
    /// Type each character of a string
    Text(String),
    /// Mouse activity ping
    Mouse,
    /// Wait before the next step
    PauseMs(u64),
    /// Send the summarize command
    Summarize,
}

/// Errors reading a replay script.
#[derive(Debug)]
pub enum ReplayError {
    IoError(String),
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::IoError(e) => write!(f, "IO error: {e}"),
            ReplayError::ParseError { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ReplayError {}

/// Parse a replay script.
pub fn parse_script(script: &str) -> Result<Vec<ReplayStep>, ReplayError> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| ReplayError::ParseError {
                line: index + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Read and parse a replay script from disk.
pub fn load_script(path: &std::path::Path) -> Result<Vec<ReplayStep>, ReplayError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ReplayError::IoError(e.to_string()))?;
    parse_script(&content)
}

/// What a replay delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub keys_sent: u64,
    pub keys_dropped: u64,
    pub window_changes: u64,
    pub summaries: u64,
}

pub struct Replayer<'a> {
    foreground: &'a ManualForeground,
    hook: InputHook,
    commands: Sender<Command>,
    stats: SharedTransparencyLog,
    settle_timeout: Duration,
}

impl<'a> Replayer<'a> {
    pub fn new(
        foreground: &'a ManualForeground,
        hook: InputHook,
        commands: Sender<Command>,
        stats: SharedTransparencyLog,
    ) -> Self {
        Self {
            foreground,
            hook,
            commands,
            stats,
            settle_timeout: Duration::from_secs(5),
        }
    }

    /// Play every step, returning once all sent keys have been classified.
    pub fn play(&self, steps: &[ReplayStep]) -> ReplayReport {
        let baseline = self.stats.keys_processed();
        let mut report = ReplayReport::default();

        for step in steps {
            match step {
                ReplayStep::Window { app, title } => {
                    self.settle(baseline + report.keys_sent);
                    self.foreground.set(app.as_str(), title.as_str());
                    report.window_changes += 1;
                }
                ReplayStep::NoWindow => {
                    self.settle(baseline + report.keys_sent);
                    self.foreground.clear();
                    report.window_changes += 1;
                }
                ReplayStep::Key(key) => self.press(key.clone(), &mut report),
                ReplayStep::Text(text) => {
                    for c in text.chars() {
                        self.press(Key::Char(c), &mut report);
                    }
                }
                ReplayStep::Mouse => self.hook.on_mouse(),
                ReplayStep::PauseMs(millis) => std::thread::sleep(Duration::from_millis(*millis)),
                ReplayStep::Summarize => {
                    if self.commands.send(Command::Summarize).is_ok() {
                        report.summaries += 1;
                    }
                }
            }
        }

        self.settle(baseline + report.keys_sent);
        report
    }

    fn press(&self, key: Key, report: &mut ReplayReport) {
        match self.hook.on_key(key) {
            Ok(()) => report.keys_sent += 1,
            Err(e) => {
                report.keys_dropped += 1;
                warn!("replayed key not delivered: {e}");
            }
        }
    }

    /// Wait until the consumer has processed `target` keys.
    fn settle(&self, target: u64) -> bool {
        let deadline = Instant::now() + self.settle_timeout;
        while self.stats.keys_processed() < target {
            if Instant::now() >= deadline {
                warn!(
                    processed = self.stats.keys_processed(),
                    target, "timed out waiting for key consumer"
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::NamedKey;

    #[test]
    fn test_parse_script() {
        let script = r#"
# sign in, then go back to work
{"window": {"app": "firefox", "title": "Sign in"}}
{"text": "alice"}
{"key": "<enter>"}
"mouse"
{"pause_ms": 10}
"no_window"
"summarize"
"#;
        let steps = parse_script(script).unwrap();
        assert_eq!(
            steps,
            vec![
                ReplayStep::Window {
                    app: "firefox".into(),
                    title: "Sign in".into()
                },
                ReplayStep::Text("alice".into()),
                ReplayStep::Key(Key::Named(NamedKey::Enter)),
                ReplayStep::Mouse,
                ReplayStep::PauseMs(10),
                ReplayStep::NoWindow,
                ReplayStep::Summarize,
            ]
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse_script("\"mouse\"\n{\"bogus\": 1}\n").unwrap_err();
        match err {
            ReplayError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
