//! Durable destinations for flushed batches.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage;

/// Append-only destination for drained log lines.
///
/// Only the flush path calls `append`; producers never touch a sink.
pub trait LogSink: Send + Sync {
    /// Append `lines` in order.
    fn append(&self, lines: &[String]) -> Result<()>;
}

/// Appends to a text file, one line per payload, creating it if absent.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, lines: &[String]) -> Result<()> {
        storage::append_lines(&self.path, lines)
    }
}
