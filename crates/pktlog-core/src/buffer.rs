//! Closeable staging buffer between packet producers and the flush job.
//!
//! `offer()` is a short critical section over a `VecDeque`, so producers never
//! wait on disk. The flush job takes the whole queue with `drain()`, and the
//! "empty + closed" case doubles as its end-of-life signal.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{PktlogError, Result};

#[derive(Default)]
struct Inner {
    pending: VecDeque<String>,
    closed: bool,
}

/// Thread-safe FIFO of pending log lines with a one-way closed state.
#[derive(Default)]
pub struct LogBuffer {
    inner: Mutex<Inner>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the buffer. Idempotent; lines already queued can still be drained.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Append a line to the end of the queue.
    ///
    /// Fails with [`PktlogError::BufferClosed`] once [`close`](Self::close) has
    /// been called; the line is discarded.
    pub fn offer(&self, content: impl Into<String>) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(PktlogError::BufferClosed);
        }
        inner.pending.push_back(content.into());
        Ok(())
    }

    /// Take every queued line, leaving the buffer empty.
    ///
    /// Returns what is queued even if the buffer is closed. An empty, open
    /// buffer yields an empty vec. An empty, closed buffer fails with
    /// [`PktlogError::BufferClosed`], and keeps failing on every later call.
    pub fn drain(&self) -> Result<Vec<String>> {
        let mut inner = self.lock();
        if inner.pending.is_empty() {
            if inner.closed {
                return Err(PktlogError::BufferClosed);
            }
            return Ok(Vec::new());
        }
        Ok(std::mem::take(&mut inner.pending).into())
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // A panic while holding the lock cannot leave `Inner` half-updated, so a
    // poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
