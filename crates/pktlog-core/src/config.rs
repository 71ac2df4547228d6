//! Logging configuration, read once at startup and shared by every session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage;

/// Where flushed packet lines end up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTo {
    /// Append flushed batches to `<session>/packets.log`.
    pub file: bool,
    /// Echo every logged packet to stdout.
    pub console: bool,
}

impl Default for LogTo {
    fn default() -> Self {
        Self {
            file: true,
            console: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Master switch for packet logging (default: true)
    pub log_packets: bool,
    pub log_to: LogTo,
    /// Flush the session buffer every N milliseconds (default: 5000)
    pub flush_interval_ms: u64,
    /// Root directory holding one subdirectory per session
    pub sessions_dir: PathBuf,
    /// Packet kinds never logged
    pub ignored_packets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_packets: true,
            log_to: LogTo::default(),
            flush_interval_ms: 5000,
            sessions_dir: PathBuf::from("sessions"),
            ignored_packets: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Load from a YAML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        storage::load_yaml(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::save_yaml(path, self)
    }

    pub fn with_sessions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sessions_dir = dir.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_log_packets(mut self, enabled: bool) -> Self {
        self.log_packets = enabled;
        self
    }

    pub fn with_log_to(mut self, file: bool, console: bool) -> Self {
        self.log_to = LogTo { file, console };
        self
    }

    pub fn with_ignored(mut self, kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignored_packets.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn is_ignored(&self, kind: &str) -> bool {
        self.ignored_packets.iter().any(|k| k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = LoggingConfig::load(&tmp.path().join("pktlog.yaml")).unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.flush_interval(), Duration::from_secs(5));
        assert!(config.log_to.file);
        assert!(!config.log_to.console);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pktlog.yaml");
        std::fs::write(
            &path,
            "log_to:\n  console: true\nignored_packets:\n  - MovePlayer\n",
        )
        .unwrap();

        let config = LoggingConfig::load(&path).unwrap();
        assert!(config.log_packets);
        assert!(config.log_to.file);
        assert!(config.log_to.console);
        assert!(config.is_ignored("MovePlayer"));
        assert!(!config.is_ignored("Text"));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pktlog.yaml");
        let config = LoggingConfig::default()
            .with_log_packets(false)
            .with_flush_interval(Duration::from_millis(250))
            .with_sessions_dir("/var/log/proxy");
        config.save(&path).unwrap();

        let loaded = LoggingConfig::load(&path).unwrap();
        assert_eq!(loaded.flush_interval_ms, 250);
        assert!(!loaded.log_packets);
        assert_eq!(loaded.sessions_dir, PathBuf::from("/var/log/proxy"));
    }

    #[test]
    fn test_invalid_yaml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pktlog.yaml");
        std::fs::write(&path, "flush_interval_ms: [not, a, number]\n").unwrap();
        assert!(LoggingConfig::load(&path).is_err());
    }
}
