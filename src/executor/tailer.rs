//! Polling tailer that republishes a log file's growth as output records.

use crate::config::ProcessKey;
use crate::event::cancellation::CancelToken;
use crate::output::{OutputEvent, OutputLine, OutputSink, OutputStream};
use crate::utils::threads::spawn_named_thread;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const READ_CHUNK: usize = 8 * 1024;

/// Follows a log file from a starting position, emitting every appended
/// line as an [`OutputLine`] on the stdout stream.
///
/// The tailer ends once the owning process is done (`process_done`) and the
/// file has been read to its end; a held partial line is flushed at that
/// point. Cancellation only shortens the poll sleep: the final drain still
/// happens so no output is lost. I/O trouble surfaces as a `Failed` event
/// and a clean thread exit, never a panic.
pub struct FileTailer {
    path: PathBuf,
    key: ProcessKey,
    display_path: String,
    position: u64,
    poll_interval: Duration,
    process_done: Arc<AtomicBool>,
    cancel: CancelToken,
    sink: Arc<dyn OutputSink>,
}

impl FileTailer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: PathBuf,
        key: ProcessKey,
        display_path: String,
        position: u64,
        process_done: Arc<AtomicBool>,
        cancel: CancelToken,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            path,
            key,
            display_path,
            position,
            poll_interval: DEFAULT_POLL_INTERVAL,
            process_done,
            cancel,
            sink,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        spawn_named_thread(format!("tail {}", self.key), move || self.run())
    }

    fn run(self) {
        if let Err(err) = self.follow() {
            self.sink.write_event(OutputEvent::failed(
                &self.key,
                &self.display_path,
                format!("log tailer error: {err}"),
            ));
        }
    }

    fn follow(&self) -> io::Result<()> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.position))?;

        let mut pending: Vec<u8> = Vec::new();
        let mut bom_checked = self.position != 0;
        let mut buf = [0u8; READ_CHUNK];
        let mut cancelled = false;

        loop {
            let mut read_any = false;
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                read_any = true;
                pending.extend_from_slice(&buf[..n]);
                self.emit_complete_lines(&mut pending, &mut bom_checked);
            }
            if read_any {
                // Keep pace with the writer before considering sleep.
                continue;
            }
            if self.process_done.load(Ordering::Acquire) {
                if !pending.is_empty() {
                    self.strip_bom(&mut pending, &mut bom_checked);
                    self.emit_line(&pending);
                }
                return Ok(());
            }
            if cancelled {
                thread::sleep(self.poll_interval);
            } else {
                cancelled = self.cancel.wait(self.poll_interval);
            }
        }
    }

    fn emit_complete_lines(&self, pending: &mut Vec<u8>, bom_checked: &mut bool) {
        self.strip_bom(pending, bom_checked);
        while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.emit_line(&line);
        }
    }

    /// Only the very first bytes of the file can carry a BOM; once anything
    /// else has been seen the check is settled for good.
    fn strip_bom(&self, pending: &mut Vec<u8>, bom_checked: &mut bool) {
        if *bom_checked || pending.is_empty() {
            return;
        }
        if pending[0] != UTF8_BOM[0] {
            *bom_checked = true;
            return;
        }
        if pending.len() >= UTF8_BOM.len() {
            if pending.starts_with(&UTF8_BOM) {
                pending.drain(..UTF8_BOM.len());
            }
            *bom_checked = true;
        }
    }

    fn emit_line(&self, bytes: &[u8]) {
        self.sink.write(OutputLine::new(
            self.key.clone(),
            self.display_path.as_str(),
            OutputStream::StdOut,
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }
}
