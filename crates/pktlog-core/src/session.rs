//! Per-session packet logger: the buffer's producer side plus its flush job.
//!
//! `log_packet()` only takes the buffer lock, so a proxy thread never waits on
//! disk. A periodic job on the shared [`Scheduler`] drains the buffer and
//! appends each batch to the session's sink.
//!
//! Stopping is cooperative: `stop()` closes the buffer and nothing else. The
//! next tick writes whatever is left, and the tick after that sees the buffer
//! closed and empty and cancels the job itself.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, error, info, trace};

use crate::buffer::LogBuffer;
use crate::config::LoggingConfig;
use crate::error::{PktlogError, Result};
use crate::packet::{Direction, LoggablePacket};
use crate::scheduler::{JobHandle, Scheduler};
use crate::sink::{FileSink, LogSink};
use crate::storage;

/// State shared between the logger and its flush job.
struct FlushState {
    buffer: LogBuffer,
    /// The scheduled job, cleared by the tick that observes closure.
    task: Mutex<Option<JobHandle>>,
    /// Serializes drain + append so batches reach the sink in order.
    flush_lock: Mutex<()>,
}

impl FlushState {
    fn task(&self) -> MutexGuard<'_, Option<JobHandle>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SessionLogger {
    config: Arc<LoggingConfig>,
    scheduler: Scheduler,
    display_name: String,
    data_path: PathBuf,
    log_path: PathBuf,
    /// `None` when file logging is off: drained lines are discarded.
    sink: Option<Arc<dyn LogSink>>,
    state: Arc<FlushState>,
    started: AtomicBool,
}

impl SessionLogger {
    /// Create a logger for the session `<display_name>-<timestamp>`.
    ///
    /// Nothing touches the disk until [`start`](Self::start).
    pub fn new(
        config: Arc<LoggingConfig>,
        scheduler: Scheduler,
        display_name: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        let display_name = display_name.into();
        let data_path = config
            .sessions_dir
            .join(format!("{}-{}", display_name, timestamp));
        let log_path = data_path.join(storage::PACKET_LOG);
        let sink = config
            .log_to
            .file
            .then(|| Arc::new(FileSink::new(&log_path)) as Arc<dyn LogSink>);

        Self {
            config,
            scheduler,
            display_name,
            data_path,
            log_path,
            sink,
            state: Arc::new(FlushState {
                buffer: LogBuffer::new(),
                task: Mutex::new(None),
                flush_lock: Mutex::new(()),
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Like [`new`](Self::new), stamped with the current time in milliseconds.
    pub fn starting_now(
        config: Arc<LoggingConfig>,
        scheduler: Scheduler,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(config, scheduler, display_name, Utc::now().timestamp_millis())
    }

    /// Send flushed batches to `sink` instead of the session's packet log.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Begin periodic flushing if packet logging is enabled.
    ///
    /// Creates the session directory when logging to file. With packet
    /// logging disabled this is a no-op and the buffer is never used.
    pub fn start(&self) -> Result<()> {
        if !self.config.log_packets {
            debug!(session = %self.display_name, "Packet logging disabled");
            return Ok(());
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PktlogError::AlreadyStarted);
        }

        let result = self.schedule_flush();
        if result.is_err() {
            self.started.store(false, Ordering::SeqCst);
        }
        result
    }

    fn schedule_flush(&self) -> Result<()> {
        if self.config.log_to.file {
            debug!("Packets will be logged under {}", self.log_path.display());
            storage::ensure_dir(&self.data_path)?;
        }

        // Hold the slot while scheduling so a tick can never clear it first.
        let mut task = self.state.task();
        let state = Arc::clone(&self.state);
        let sink = self.sink.clone();
        let handle = self
            .scheduler
            .schedule_at_fixed_rate(self.config.flush_interval(), move || {
                flush_tick(&state, sink.as_deref())
            })?;
        *task = Some(handle);

        info!(
            session = %self.display_name,
            interval_ms = self.config.flush_interval_ms,
            "Session logging started"
        );
        Ok(())
    }

    /// Close the buffer. The flush job writes what remains and stops itself
    /// within two flush periods.
    pub fn stop(&self) {
        self.state.buffer.close();
    }

    /// Close the buffer, write everything still queued, and cancel the flush
    /// job without waiting for its next tick.
    ///
    /// Unlike scheduled ticks, a sink failure here is returned to the caller.
    pub fn stop_and_flush(&self) -> Result<()> {
        self.state.buffer.close();

        let result = {
            let _flush = self
                .state
                .flush_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match self.state.buffer.drain() {
                Ok(lines) => match &self.sink {
                    Some(sink) if !lines.is_empty() => sink.append(&lines),
                    _ => Ok(()),
                },
                Err(PktlogError::BufferClosed) => Ok(()),
                Err(e) => Err(e),
            }
        };

        if let Some(handle) = self.state.task().take() {
            handle.cancel();
        }
        result
    }

    /// Log one packet travelling in `direction`.
    ///
    /// Ignored kinds are skipped entirely. Packets logged after `stop()` are
    /// dropped.
    pub fn log_packet<P>(&self, packet: &P, direction: Direction)
    where
        P: LoggablePacket + ?Sized,
    {
        if self.config.is_ignored(packet.kind()) {
            return;
        }
        let prefix = direction.prefix();
        trace!("{} {}: {}", prefix, self.display_name, packet);

        if !self.config.log_packets {
            return;
        }
        let line = format!("{}{}", prefix, packet);
        if self.config.log_to.console {
            println!("{}", line);
        }
        // BufferClosed: the session is already shutting down.
        let _ = self.state.buffer.offer(line);
    }

    /// Write `value` as pretty JSON to `<session dir>/<name>.json`.
    pub fn save_json<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        storage::ensure_dir(&self.data_path)?;
        storage::write_json_pretty(&self.data_path.join(format!("{name}.json")), value)
    }

    /// Write already-encoded JSON to `<session dir>/<name>.json`.
    pub fn save_json_bytes(&self, name: &str, encoded: &[u8]) -> Result<()> {
        self.save_blob(name, "json", encoded)
    }

    /// Write a binary artifact (e.g. a skin image) to `<session dir>/<name>.<ext>`.
    pub fn save_blob(&self, name: &str, ext: &str, bytes: &[u8]) -> Result<()> {
        storage::ensure_dir(&self.data_path)?;
        storage::write_bytes(&self.data_path.join(format!("{name}.{ext}")), bytes)
    }

    /// True while the periodic flush job is registered and running.
    pub fn is_flushing(&self) -> bool {
        self.state
            .task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The session's staging buffer, for producers that already hold text.
    pub fn buffer(&self) -> &LogBuffer {
        &self.state.buffer
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        // The job holds its own reference to the buffer and finishes the flush.
        self.state.buffer.close();
    }
}

// ─── Flush job ────────────────────────────────────────────────────────────────

fn flush_tick(state: &FlushState, sink: Option<&dyn LogSink>) -> ControlFlow<()> {
    let _flush = state
        .flush_lock
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    match state.buffer.drain() {
        Ok(lines) => {
            if let Some(sink) = sink.filter(|_| !lines.is_empty()) {
                if let Err(e) = sink.append(&lines) {
                    error!("Unable to flush packet log: {}", e);
                }
            }
            ControlFlow::Continue(())
        }
        Err(PktlogError::BufferClosed) => {
            // Drained everything; release the handle and stop ticking.
            state.task().take();
            ControlFlow::Break(())
        }
        Err(e) => {
            error!("Unable to drain packet log: {}", e);
            ControlFlow::Continue(())
        }
    }
}
