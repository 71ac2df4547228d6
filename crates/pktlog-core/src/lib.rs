//! pktlog-core: staged packet logging for proxy sessions.
//!
//! The central design principle: logging a packet is a short, lock-protected
//! push into a per-session [`LogBuffer`], never a disk write. A periodic job on
//! the shared [`Scheduler`] drains each buffer and appends the batch to disk.

pub mod buffer;
pub mod config;
pub mod error;
pub mod packet;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod storage;

pub use buffer::LogBuffer;
pub use config::{LogTo, LoggingConfig};
pub use error::{PktlogError, Result};
pub use packet::{Direction, LoggablePacket, TextPacket};
pub use scheduler::{JobHandle, Scheduler};
pub use session::SessionLogger;
pub use sink::{FileSink, LogSink};
