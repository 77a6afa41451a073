//! Persisted conversation history.
//!
//! The file is line-oriented JSON, one `{"user", "model"}` object per run.
//! It is read whole at session start and only ever appended to.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::HistoryEntry;
use crate::error::WrapperResult;

/// Trait for durable history backends.
pub trait HistoryLog: Send + Sync {
    /// Read every stored entry, oldest first.
    fn load(&self) -> WrapperResult<Vec<HistoryEntry>>;

    /// Durably append one entry.
    fn append(&self, entry: &HistoryEntry) -> WrapperResult<()>;
}

/// History stored in a JSONL file.
pub struct JsonlHistoryLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryLog for JsonlHistoryLog {
    /// A missing file is an empty history. Lines that fail to parse are
    /// skipped with a warning; the rest of the file still loads.
    fn load(&self) -> WrapperResult<Vec<HistoryEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            // Raw bytes: a line that is not UTF-8 is just another bad record.
            match serde_json::from_slice::<HistoryEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        error = %e,
                        "Skipping malformed history record"
                    );
                }
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            loaded = entries.len(),
            skipped,
            "History loaded"
        );

        Ok(entries)
    }

    fn append(&self, entry: &HistoryEntry) -> WrapperResult<()> {
        let line = serde_json::to_string(entry)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        append_line(&self.path, &line)
    }
}

/// Append `line` plus a newline, creating the file and its parents.
pub(crate) fn append_line(path: &Path, line: &str) -> WrapperResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// History kept in memory only.
#[derive(Default)]
pub struct MemoryHistoryLog {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl HistoryLog for MemoryHistoryLog {
    fn load(&self) -> WrapperResult<Vec<HistoryEntry>> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn append(&self, entry: &HistoryEntry) -> WrapperResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(())
    }
}
