#![forbid(unsafe_code)]

//! JSONL recording sink.
//!
//! Emits one record per line to any `io::Write`:
//! - connect (event="connect"): initial state plus the options the bridge
//!   was configured with, written once when the bridge comes up.
//! - send (event="send"): action kind and the state it produced, one per
//!   dispatch, numbered by a monotonically increasing `seq`.
//!
//! The sink sits on the devtools path, which is purely observational, so a
//! write failure is logged and the record dropped; it never propagates into
//! `dispatch`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;

use keyhole_core::{DevtoolsOptions, DevtoolsSink};
use serde_json::{Value, json};

/// Devtools sink writing JSON Lines to a caller-supplied writer.
pub struct JsonlSink<W: Write> {
    writer: RefCell<W>,
    flush_on_write: bool,
    seq: Cell<u64>,
}

impl<W: Write> JsonlSink<W> {
    /// Sink flushing after every record.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
            flush_on_write: true,
            seq: Cell::new(0),
        }
    }

    /// Toggle flush-on-write (on by default).
    #[must_use]
    pub fn with_flush_on_write(mut self, enabled: bool) -> Self {
        self.flush_on_write = enabled;
        self
    }

    /// Number of send records written so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.seq.get()
    }

    /// Recover the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_record(&self, record: &Value) {
        let mut writer = self.writer.borrow_mut();
        let result = writeln!(writer, "{record}").and_then(|()| {
            if self.flush_on_write {
                writer.flush()
            } else {
                Ok(())
            }
        });
        if let Err(error) = result {
            tracing::warn!(%error, "devtools jsonl write failed; record dropped");
        }
    }
}

impl<W: Write> fmt::Debug for JsonlSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonlSink")
            .field("flush_on_write", &self.flush_on_write)
            .field("seq", &self.seq.get())
            .finish_non_exhaustive()
    }
}

impl<W: Write> DevtoolsSink for JsonlSink<W> {
    fn init(&self, initial_state: &Value, options: &DevtoolsOptions) {
        self.write_record(&json!({
            "event": "connect",
            "state": initial_state,
            "options": {
                "name": options.name,
                "max_age": options.max_age,
            },
        }));
    }

    fn send(&self, action_kind: &str, state: &Value) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.write_record(&json!({
            "event": "send",
            "seq": seq,
            "kind": action_kind,
            "state": state,
        }));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_test::traced_test;

    fn lines(bytes: &[u8]) -> Vec<Value> {
        std::str::from_utf8(bytes)
            .expect("jsonl output is utf-8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line parses as json"))
            .collect()
    }

    #[test]
    fn connect_then_sends_form_a_parseable_log() {
        let sink = JsonlSink::new(Vec::new());
        let options = DevtoolsOptions::new().with_name("app").with_max_age(10);
        sink.init(&json!({"n": 0}), &options);
        sink.send("inc", &json!({"n": 1}));
        sink.send("inc", &json!({"n": 2}));
        assert_eq!(sink.sent(), 2);

        let records = lines(&sink.into_inner());
        assert_eq!(
            records[0],
            json!({
                "event": "connect",
                "state": {"n": 0},
                "options": {"name": "app", "max_age": 10},
            })
        );
        assert_eq!(
            records[1],
            json!({"event": "send", "seq": 0, "kind": "inc", "state": {"n": 1}})
        );
        assert_eq!(
            records[2],
            json!({"event": "send", "seq": 1, "kind": "inc", "state": {"n": 2}})
        );
    }

    #[test]
    fn absent_options_serialize_as_null() {
        let sink = JsonlSink::new(Vec::new());
        sink.init(&json!({}), &DevtoolsOptions::new());
        let records = lines(&sink.into_inner());
        assert_eq!(records[0]["options"], json!({"name": null, "max_age": null}));
    }

    /// Writer that fails every operation.
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[traced_test]
    #[test]
    fn write_failure_is_logged_not_propagated() {
        let sink = JsonlSink::new(BrokenWriter);
        sink.init(&json!({}), &DevtoolsOptions::new());
        sink.send("tick", &json!({"n": 1})); // must not panic
        assert!(logs_contain("devtools jsonl write failed"));
        assert_eq!(sink.sent(), 1, "seq advances even when the record is dropped");
    }

    #[test]
    fn unflushed_sink_buffers_until_recovered() {
        let sink = JsonlSink::new(Vec::new()).with_flush_on_write(false);
        sink.send("tick", &json!(1));
        let records = lines(&sink.into_inner());
        assert_eq!(records.len(), 1);
    }
}
