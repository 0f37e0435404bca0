//! Demonstration of sensitive-input redaction.
//!
//! This example shows how to:
//! 1. Start a pipeline against an in-memory sink and credential store
//! 2. Drive it with a scripted foreground window and keystrokes
//! 3. Inspect what was persisted and what was sealed
//!
//! Run with: cargo run --example redaction_demo

use std::sync::Arc;
use std::time::Duration;

use desktop_activity_tracker::{
    config::Config,
    core::{Collaborators, LoggingSummarizer, Pipeline},
    foreground::ManualForeground,
    replay::{parse_script, Replayer},
    storage::{MemorySink, MemoryStore},
    transparency::create_shared_log,
    PRIVACY_DECLARATION,
};

const SCRIPT: &str = r#"
{"window": {"app": "notepad.exe", "title": "todo.txt"}}
{"text": "buy milk"}
{"key": "<enter>"}
{"window": {"app": "chrome.exe", "title": "Sign in - Example Mail"}}
{"text": "alice@example.com"}
{"key": "<enter>"}
{"window": {"app": "notepad.exe", "title": "todo.txt"}}
{"text": "done"}
"#;

fn main() {
    println!("Desktop Activity Tracker - Redaction Demo");
    println!("=========================================");
    println!();
    println!("{PRIVACY_DECLARATION}");

    let steps = match parse_script(SCRIPT) {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("Error parsing script: {e}");
            return;
        }
    };

    let config = Config {
        batch_size: 8,
        poll_interval: Duration::from_millis(50),
        ..Config::default()
    };

    let foreground = Arc::new(ManualForeground::new());
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStore::new());
    let stats = create_shared_log();

    let pipeline = match Pipeline::start(
        &config,
        Collaborators {
            foreground: foreground.clone(),
            sink: sink.clone(),
            store: store.clone(),
            summarizer: Arc::new(LoggingSummarizer),
            stats: stats.clone(),
        },
    ) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error starting pipeline: {e}");
            return;
        }
    };

    let report = Replayer::new(&foreground, pipeline.input_hook(), pipeline.commands(), stats)
        .play(&steps);
    let summary = pipeline.stop();

    println!("Sent {} keys", report.keys_sent);
    println!();
    println!("Persisted keystroke batches:");
    for batch in sink.keystrokes() {
        let text: Vec<&str> = batch.tokens.iter().map(|t| t.as_str()).collect();
        println!("  [{:?}] {}", batch.trigger, text.join(" "));
    }

    println!();
    println!("Sealed credential entries:");
    for record in store.records() {
        println!(
            "  {} ({}): username={} password={}",
            record.app, record.title, record.username, record.password
        );
    }

    println!();
    println!("{}", summary.summary());
}
