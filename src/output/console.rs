//! Console sink: renders records as single text lines on stdout, one color
//! per process.

use super::{OutputEvent, OutputLine, OutputSink};
use crate::config::ProcessKey;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;
use yansi::{Color, Paint};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Palette cycled over processes in order of first appearance.
const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

pub struct ConsoleSink {
    stdout: Mutex<io::Stdout>,
    colors: Mutex<ColorAssignments>,
}

#[derive(Default)]
struct ColorAssignments {
    by_key: HashMap<ProcessKey, Color>,
    next: usize,
}

impl ColorAssignments {
    fn color_for(&mut self, key: &ProcessKey) -> Color {
        *self.by_key.entry(key.clone()).or_insert_with(|| {
            let color = PALETTE[self.next % PALETTE.len()];
            self.next += 1;
            color
        })
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(io::stdout()),
            colors: Mutex::new(ColorAssignments::default()),
        }
    }

    fn prefix(&self, key: &ProcessKey, display_path: &str, timestamp: &str) -> String {
        let color = self.colors.lock().unwrap().color_for(key);
        format!(
            "[{timestamp}] {} {} [path:{display_path}]",
            format!("[group:{}]", key.group()).fg(color),
            format!("[proc:{}]", key.process()).fg(color),
        )
    }

    fn print(&self, rendered: String) {
        let mut stdout = self.stdout.lock().unwrap();
        // Console write failures (e.g. a closed pipe) must not take the
        // supervisor down.
        let _ = writeln!(stdout, "{rendered}");
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleSink {
    fn write(&self, line: OutputLine) {
        let prefix = self.prefix(
            &line.key,
            &line.display_path,
            &line.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
        self.print(format!("{prefix} [{}] {}", line.stream, line.line));
    }

    fn write_event(&self, event: OutputEvent) {
        let prefix = self.prefix(
            &event.key,
            &event.display_path,
            &event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
        self.print(format!("{prefix} {}", event_fields(&event)));
    }
}

/// The event-specific tail of a rendered event line.
fn event_fields(event: &OutputEvent) -> String {
    let mut rendered = format!("[event:{}]", event.kind);
    if let Some(code) = event.exit_code {
        rendered.push_str(&format!(" [code:{code}]"));
    }
    if let Some(message) = &event.message {
        rendered.push_str(&format!(" {message}"));
    }
    rendered
}
