/**
 * ============================================================================
 * DURABLE QUEUE MODULE
 * ============================================================================
 *
 * PURPOSE: Persist undelivered events to disk for offline resilience
 *
 * STORAGE STRUCTURE:
 * ~/.pocketlife-queue.json   (one serialized event per line)
 *
 * QUEUE BEHAVIOR:
 * - FIFO (First In First Out) ordering
 * - Append-only during normal operation
 * - Drain rewrites the file with the remaining backlog (temp file + rename)
 * - Entries are opaque; they are replayed verbatim, never re-validated
 * - Lines that are not valid UTF-8 cannot be replayed; they are kept
 *   byte-for-byte in place and never block the entries around them
 * - A missing file is an empty queue
 *
 * Not safe to share between processes: no file locks are taken.
 *
 * ============================================================================
 */

use crate::delivery::types::Outcome;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/**
 * One non-blank line of the queue file
 */
#[derive(Debug, Clone, PartialEq, Eq)]
enum QueuedLine {
    Entry(String),

    /// Torn or corrupt line, carried through rewrites untouched
    Undecodable(Vec<u8>),
}

/**
 * Line-delimited backlog of serialized events
 */
#[derive(Debug, Clone)]
pub struct DurableQueue {
    path: PathBuf,
}

impl DurableQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
     * Append one entry to the end of the queue
     * Creates the parent directory and the file when missing
     */
    pub fn append(&self, entry: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry)?;

        log::debug!("Data appended to queue file {}", self.path.display());
        Ok(())
    }

    /**
     * Current backlog entries in file order
     * Blank lines are skipped and surrounding whitespace is trimmed;
     * lines that are not valid UTF-8 are left out
     */
    pub fn entries(&self) -> io::Result<Vec<String>> {
        Ok(self
            .read_lines()?
            .into_iter()
            .filter_map(|line| match line {
                QueuedLine::Entry(entry) => Some(entry),
                QueuedLine::Undecodable(_) => None,
            })
            .collect())
    }

    /**
     * Number of lines awaiting delivery, undecodable ones included
     */
    pub fn len(&self) -> io::Result<usize> {
        Ok(self.read_lines()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_lines(&self) -> io::Result<Vec<QueuedLine>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut lines = Vec::new();
        for line in raw.split(|byte| *byte == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match std::str::from_utf8(line) {
                Ok(entry) => lines.push(QueuedLine::Entry(entry.to_string())),
                Err(e) => {
                    log::error!(
                        "Undecodable line in queue file {} ({} bytes): {}",
                        self.path.display(),
                        line.len(),
                        e
                    );
                    lines.push(QueuedLine::Undecodable(line.to_vec()));
                }
            }
        }
        Ok(lines)
    }

    /**
     * Replay every queued entry through `deliver`, in order
     *
     * Entries whose outcome is not Delivered are kept; the file is then
     * atomically replaced with exactly those entries in their original
     * order. Returns the remaining backlog size. A missing file is a no-op.
     */
    pub fn drain_and_replay<F>(&self, mut deliver: F) -> io::Result<usize>
    where
        F: FnMut(&str) -> Outcome,
    {
        if !self.path.exists() {
            return Ok(0);
        }

        let lines = self.read_lines()?;
        if lines.is_empty() {
            return Ok(0);
        }

        log::info!("Draining {} queued events from {}", lines.len(), self.path.display());

        let total = lines.len();
        let remaining: Vec<QueuedLine> = lines
            .into_iter()
            .filter(|line| match line {
                QueuedLine::Entry(entry) => !deliver(entry.as_str()).is_delivered(),
                QueuedLine::Undecodable(_) => true,
            })
            .collect();

        self.rewrite(&remaining)?;

        log::info!(
            "Queue drain delivered {} events ({} remaining)",
            total - remaining.len(),
            remaining.len()
        );
        Ok(remaining.len())
    }

    /**
     * Replace the queue contents atomically
     * Uses temporary file + rename to prevent a torn backlog
     */
    fn rewrite(&self, lines: &[QueuedLine]) -> io::Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        let mut contents = Vec::new();
        for line in lines {
            match line {
                QueuedLine::Entry(entry) => contents.extend_from_slice(entry.as_bytes()),
                QueuedLine::Undecodable(bytes) => contents.extend_from_slice(bytes),
            }
            contents.push(b'\n');
        }

        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)
    }
}
