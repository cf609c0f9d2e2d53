//! Structured event stream for `honorfx`.
//!
//! Discrete, typed events emitted by the cache and the schedulers. Events
//! are serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number. This stream is also the side channel through
//! which dangling honor references are reported.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during operation.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The effect cache published a new snapshot.
    CacheRefreshed {
        /// When the refresh completed.
        timestamp: DateTime<Utc>,
        /// Number of groups loaded.
        loaded: usize,
        /// Number of groups skipped as malformed.
        skipped: usize,
    },

    /// A session's effect scheduler started.
    SessionStarted {
        /// When the scheduler started.
        timestamp: DateTime<Utc>,
        /// Session id.
        session: String,
    },

    /// A session's effect scheduler stopped.
    SessionStopped {
        /// When the scheduler stopped.
        timestamp: DateTime<Utc>,
        /// Session id.
        session: String,
    },

    /// A firing applied a group's effects to a session.
    EffectsApplied {
        /// When the firing completed.
        timestamp: DateTime<Utc>,
        /// Session id.
        session: String,
        /// Selected honor.
        honor: String,
        /// Effect group that was applied.
        group: String,
        /// Status effects applied.
        effects: usize,
        /// Halo effects applied.
        halo_effects: usize,
        /// Delay until the next firing, in ticks.
        next_delay_ticks: u32,
    },

    /// A session's honor references an effect group that is not cached.
    DanglingReference {
        /// When the firing noticed it.
        timestamp: DateTime<Utc>,
        /// Session id.
        session: String,
        /// Honor holding the stale reference.
        honor: String,
        /// Missing group id.
        group: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are silently dropped;
/// event output must never stop a scheduler.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn dangling_event() -> Event {
        Event::DanglingReference {
            timestamp: DateTime::parse_from_rfc3339("2025-02-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            session: "alice".to_owned(),
            honor: "vip".to_owned(),
            group: "vip_effects".to_owned(),
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&dangling_event()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "DanglingReference");
        assert_eq!(parsed["group"], "vip_effects");
    }

    #[test]
    fn emitter_writes_valid_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(dangling_event());

        let output = tw.contents();
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["type"], "DanglingReference");
        assert_eq!(parsed["session"], "alice");
        assert_eq!(parsed["honor"], "vip");
        assert_eq!(parsed["sequence"], 0);
        assert!(parsed.get("event").is_none(), "event field should be flattened");
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            session: "alice".to_owned(),
        });
        emitter.emit(Event::EffectsApplied {
            timestamp: Utc::now(),
            session: "alice".to_owned(),
            honor: "vip".to_owned(),
            group: "vip".to_owned(),
            effects: 2,
            halo_effects: 0,
            next_delay_ticks: 7,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["next_delay_ticks"], 7);
    }

    #[test]
    fn noop_emitter_counts_but_discards() {
        let emitter = EventEmitter::noop();
        emitter.emit(Event::CacheRefreshed {
            timestamp: Utc::now(),
            loaded: 3,
            skipped: 1,
        });
        assert_eq!(emitter.event_count(), 1);
    }
}
