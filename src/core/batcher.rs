//! Keystroke batching.
//!
//! Tokens are buffered behind a mutex shared by the consumer thread (append)
//! and the flush timer. Reaching capacity flushes synchronously, while the
//! lock is still held, so the buffer never holds `capacity` tokens once an
//! append has returned.
//!
//! Flushing is lossy: a batch the sink rejects is logged and discarded.

use crate::core::shutdown::ShutdownSignal;
use crate::storage::{FlushTrigger, KeystrokeBatch, KeystrokeToken, SharedSink};
use crate::transparency::SharedTransparencyLog;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered
    Empty,
    /// The sink accepted this many tokens
    Flushed(usize),
    /// The sink failed; this many tokens were discarded
    Dropped(usize),
}

pub struct KeystrokeBatcher {
    session_id: Uuid,
    buffer: Mutex<Vec<KeystrokeToken>>,
    capacity: usize,
    sink: SharedSink,
    stats: SharedTransparencyLog,
}

impl KeystrokeBatcher {
    /// Create a batcher flushing every `capacity` tokens. A zero capacity is
    /// treated as one.
    pub fn new(
        session_id: Uuid,
        capacity: usize,
        sink: SharedSink,
        stats: SharedTransparencyLog,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            session_id,
            buffer: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            sink,
            stats,
        }
    }

    /// Append a token, flushing before returning if the buffer is full.
    pub fn append(&self, token: KeystrokeToken) -> Option<FlushOutcome> {
        let mut buffer = self.buffer.lock();
        buffer.push(token);
        if buffer.len() >= self.capacity {
            Some(self.flush_locked(&mut buffer, FlushTrigger::Size))
        } else {
            None
        }
    }

    /// Flush whatever is buffered.
    pub fn flush(&self, trigger: FlushTrigger) -> FlushOutcome {
        let mut buffer = self.buffer.lock();
        self.flush_locked(&mut buffer, trigger)
    }

    fn flush_locked(&self, buffer: &mut Vec<KeystrokeToken>, trigger: FlushTrigger) -> FlushOutcome {
        if buffer.is_empty() {
            return FlushOutcome::Empty;
        }

        let batch = KeystrokeBatch {
            session_id: self.session_id,
            flushed_at: Utc::now(),
            trigger,
            tokens: std::mem::replace(buffer, Vec::with_capacity(self.capacity)),
        };
        let count = batch.len();

        match self.sink.append_keystrokes(&batch) {
            Ok(()) => {
                self.stats.record_batch_flushed();
                debug!(count, ?trigger, "flushed keystrokes");
                FlushOutcome::Flushed(count)
            }
            Err(e) => {
                self.stats.record_flush_failure(count as u64);
                warn!(count, ?trigger, "failed to flush keystrokes, batch discarded: {e}");
                FlushOutcome::Dropped(count)
            }
        }
    }

    /// Number of buffered tokens.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run the periodic flush loop until shutdown.
    ///
    /// The final flush is left to the owner, which runs it once every producer
    /// has stopped.
    pub fn run_flush_timer(self: Arc<Self>, interval: Duration, shutdown: ShutdownSignal) {
        info!(interval_ms = interval.as_millis() as u64, "flush timer started");
        shutdown.run_every(interval, || {
            self.flush(FlushTrigger::Timer);
        });
        info!("flush timer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        ActivitySpan, IdleEvent, MemorySink, PersistenceSink, StorageError,
    };
    use crate::transparency::create_shared_log;

    struct FailingSink;

    impl PersistenceSink for FailingSink {
        fn append_activity(&self, _span: &ActivitySpan) -> Result<(), StorageError> {
            Ok(())
        }

        fn append_keystrokes(&self, _batch: &KeystrokeBatch) -> Result<(), StorageError> {
            Err(StorageError::IoError("disk full".to_string()))
        }

        fn append_idle(&self, _event: &IdleEvent) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn literal(c: &str) -> KeystrokeToken {
        KeystrokeToken::Literal(c.to_string())
    }

    #[test]
    fn test_flushes_at_capacity_before_returning() {
        let sink = Arc::new(MemorySink::new());
        let batcher = KeystrokeBatcher::new(Uuid::new_v4(), 3, sink.clone(), create_shared_log());

        assert_eq!(batcher.append(literal("a")), None);
        assert_eq!(batcher.append(literal("b")), None);
        assert_eq!(batcher.append(literal("c")), Some(FlushOutcome::Flushed(3)));
        assert!(batcher.is_empty());

        batcher.append(literal("d"));
        assert_eq!(batcher.len(), 1);

        let batches = sink.keystrokes();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].trigger, FlushTrigger::Size);
        assert_eq!(sink.flushed_tokens(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_length_stays_below_capacity() {
        let sink = Arc::new(MemorySink::new());
        let batcher = KeystrokeBatcher::new(Uuid::new_v4(), 4, sink.clone(), create_shared_log());

        for i in 0..25 {
            batcher.append(literal(&i.to_string()));
            assert!(batcher.len() < batcher.capacity());
        }
        assert_eq!(sink.keystrokes().len(), 6);
        assert_eq!(batcher.len(), 1);
    }

    #[test]
    fn test_flush_on_empty_buffer_writes_nothing() {
        let sink = Arc::new(MemorySink::new());
        let batcher = KeystrokeBatcher::new(Uuid::new_v4(), 3, sink.clone(), create_shared_log());

        assert_eq!(batcher.flush(FlushTrigger::Timer), FlushOutcome::Empty);
        assert!(sink.keystrokes().is_empty());
    }

    #[test]
    fn test_failed_flush_discards_buffer() {
        let stats = create_shared_log();
        let batcher = KeystrokeBatcher::new(Uuid::new_v4(), 10, Arc::new(FailingSink), stats.clone());

        batcher.append(literal("a"));
        batcher.append(KeystrokeToken::Redacted);
        assert_eq!(batcher.flush(FlushTrigger::Timer), FlushOutcome::Dropped(2));
        assert!(batcher.is_empty());

        let snapshot = stats.stats();
        assert_eq!(snapshot.flush_failures, 1);
        assert_eq!(snapshot.tokens_lost, 2);
        assert_eq!(snapshot.batches_flushed, 0);
    }

    #[test]
    fn test_timer_flushes_pending_tokens() {
        let sink = Arc::new(MemorySink::new());
        let batcher = Arc::new(KeystrokeBatcher::new(
            Uuid::new_v4(),
            100,
            sink.clone(),
            create_shared_log(),
        ));
        let (mut trigger, signal) = crate::core::shutdown::shutdown_channel();

        batcher.append(literal("a"));
        batcher.append(literal("b"));

        let timer = {
            let batcher = batcher.clone();
            std::thread::spawn(move || batcher.run_flush_timer(Duration::from_millis(50), signal))
        };

        std::thread::sleep(Duration::from_millis(400));
        trigger.trigger();
        timer.join().unwrap();

        let batches = sink.keystrokes();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].trigger, FlushTrigger::Timer);
        assert_eq!(batches[0].len(), 2);
    }
}
