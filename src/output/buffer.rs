//! In-memory sink keeping a bounded buffer of records per process.
//!
//! Used by tests and by embedders that want to inspect output after the
//! fact instead of streaming it.

use super::{EventKind, OutputEvent, OutputLine, OutputSink};
use crate::config::ProcessKey;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum BufferRecord {
    Line(OutputLine),
    Event(OutputEvent),
}

pub struct BufferSink {
    capacity: usize,
    buffers: Mutex<HashMap<ProcessKey, VecDeque<BufferRecord>>>,
}

impl BufferSink {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// `capacity` bounds the records retained per process; the oldest are
    /// dropped first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    fn push(&self, key: ProcessKey, record: BufferRecord) {
        let mut buffers = self.buffers.lock().unwrap();
        let buffer = buffers.entry(key).or_default();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(record);
    }

    /// All retained records for one process, oldest first.
    pub fn records(&self, key: &ProcessKey) -> Vec<BufferRecord> {
        self.buffers
            .lock()
            .unwrap()
            .get(key)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn lines(&self, key: &ProcessKey) -> Vec<String> {
        self.records(key)
            .into_iter()
            .filter_map(|record| match record {
                BufferRecord::Line(line) => Some(line.line),
                BufferRecord::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self, key: &ProcessKey) -> Vec<OutputEvent> {
        self.records(key)
            .into_iter()
            .filter_map(|record| match record {
                BufferRecord::Event(event) => Some(event),
                BufferRecord::Line(_) => None,
            })
            .collect()
    }

    pub fn events_of_kind(&self, key: &ProcessKey, kind: EventKind) -> Vec<OutputEvent> {
        self.events(key)
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }

    pub fn keys(&self) -> Vec<ProcessKey> {
        let mut keys: Vec<_> = self.buffers.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for BufferSink {
    fn write(&self, line: OutputLine) {
        self.push(line.key.clone(), BufferRecord::Line(line));
    }

    fn write_event(&self, event: OutputEvent) {
        self.push(event.key.clone(), BufferRecord::Event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputStream;

    #[test]
    fn records_are_kept_per_process_in_order() {
        let sink = BufferSink::new();
        let a = ProcessKey::new("core", "a");
        let b = ProcessKey::new("core", "b");

        sink.write_event(OutputEvent::starting(&a, "bin/a"));
        sink.write(OutputLine::new(a.clone(), "bin/a", OutputStream::StdOut, "one"));
        sink.write(OutputLine::new(b.clone(), "bin/b", OutputStream::StdOut, "other"));
        sink.write_event(OutputEvent::exited(&a, "bin/a", Some(0)));

        assert_eq!(sink.lines(&a), ["one"]);
        assert_eq!(sink.lines(&b), ["other"]);
        let events = sink.events(&a);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Starting);
        assert_eq!(events[1].kind, EventKind::Exited);
        assert_eq!(events[1].exit_code, Some(0));
        assert_eq!(sink.keys(), [a, b]);
    }

    #[test]
    fn capacity_evicts_oldest_records() {
        let sink = BufferSink::with_capacity(2);
        let key = ProcessKey::new("core", "a");

        for i in 0..4 {
            sink.write(OutputLine::new(
                key.clone(),
                "bin/a",
                OutputStream::StdOut,
                format!("line {i}"),
            ));
        }

        assert_eq!(sink.lines(&key), ["line 2", "line 3"]);
    }

    #[test]
    fn unknown_key_yields_empty() {
        let sink = BufferSink::new();
        assert!(sink.records(&ProcessKey::new("none", "none")).is_empty());
    }
}
