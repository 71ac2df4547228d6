//! Shared scheduling service for periodic flush jobs.
//!
//! One `Scheduler` backs every session in the process. It owns a dedicated
//! tokio runtime with a single worker thread, so jobs from different sessions
//! never run at the same time, while producers on other threads keep going.
//! Each job is an interval loop guarded by a `CancellationToken`; a job stops
//! when it returns `ControlFlow::Break`, when its handle is cancelled, or when
//! the scheduler shuts down.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{PktlogError, Result};

struct Inner {
    runtime: Mutex<Option<Runtime>>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            // Safe from any context, unlike dropping the runtime directly.
            runtime.shutdown_background();
        }
    }
}

/// Cloneable handle to the process-wide flush scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Start the scheduler and its worker thread.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pktlog-flush")
            .enable_all()
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                runtime: Mutex::new(Some(runtime)),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Run `job` every `period`, starting one `period` from now.
    ///
    /// Fails with [`PktlogError::SchedulerShutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule_at_fixed_rate<F>(&self, period: Duration, job: F) -> Result<JobHandle>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(PktlogError::Other("flush period must be non-zero".to_string()));
        }

        let guard = self
            .inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let runtime = guard.as_ref().ok_or(PktlogError::SchedulerShutdown)?;

        let token = self.inner.shutdown.child_token();
        let task = runtime.spawn(run_periodic(period, token.clone(), job));
        debug!(period_ms = period.as_millis() as u64, "Periodic job scheduled");

        Ok(JobHandle { token, task })
    }

    /// Cancel every job and stop the worker thread, waiting up to `timeout`
    /// for a tick in progress. Must not be called from inside an async context.
    pub fn shutdown_timeout(&self, timeout: Duration) {
        self.inner.shutdown.cancel();
        let runtime = self
            .inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(timeout);
            info!("Flush scheduler shut down");
        }
    }

    pub fn shutdown(&self) {
        self.shutdown_timeout(Duration::from_secs(5));
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

/// Handle to one scheduled periodic job.
#[derive(Debug)]
pub struct JobHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Stop future ticks. A tick already running completes.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the job's loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_periodic<F>(period: Duration, token: CancellationToken, mut job: F)
where
    F: FnMut() -> ControlFlow<()>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            _ = ticker.tick() => {
                if job().is_break() {
                    token.cancel();
                    break;
                }
            }
        }
    }
}
