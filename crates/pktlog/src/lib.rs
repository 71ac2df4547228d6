//! pktlog: non-blocking packet logging for proxy sessions.
//!
//! This crate re-exports the core library used by the `pktlog` command-line
//! tool and by proxies embedding session logging.

pub use pktlog_core::*;
