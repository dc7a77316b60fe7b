//! Progress bars and log writers that keep progress bars pinned.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

/// Shared bar set drawn on stderr
fn multi_progress() -> &'static MultiProgress {
    BARS.get_or_init(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(10)))
}

/// Start a bar for `len` units of work; `None` when there is nothing to track
pub fn start_progress_bar(len: usize, message: &str) -> Option<ProgressBar> {
    if len == 0 {
        return None;
    }

    let pb = multi_progress().add(ProgressBar::new(len as u64));
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn advance_progress(pb: &Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Open the append-only crawl log, creating its directory if needed.
///
/// The returned mutex is itself a `MakeWriter`, so it can back a second
/// `fmt` layer next to the terminal one.
pub fn open_log_file(path: &Path) -> io::Result<Mutex<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Mutex::new(file))
}

/// `MakeWriter` for the terminal layer: every log line is printed above the
/// live progress bars instead of tearing through them.
#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Line-buffered writer handed out per event
#[derive(Default)]
pub struct LogWriter {
    pending: Vec<u8>,
}

impl LogWriter {
    fn print_complete_lines(&mut self) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            print_above_bars(&line);
        }
    }
}

fn print_above_bars(raw: &[u8]) {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);
    let _ = multi_progress().println(line);
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.print_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.print_complete_lines();
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            print_above_bars(&rest);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::default()
    }
}
