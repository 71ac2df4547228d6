//! Storage layer: packet log appends, JSON/blob artifacts, YAML config, session listing.

use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Name of the packet log inside a session directory.
pub const PACKET_LOG: &str = "packets.log";

// ─── Directory helpers ────────────────────────────────────────────────────────

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Summary of one recorded session directory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub name: String,
    /// Number of lines in `packets.log` (0 if absent).
    pub lines: usize,
    /// Size of `packets.log` in bytes.
    pub size: u64,
}

/// List session directories under `sessions_dir`, newest name first.
pub fn list_sessions(sessions_dir: &Path) -> Result<Vec<SessionInfo>> {
    if !sessions_dir.exists() {
        return Ok(vec![]);
    }
    let mut sessions = vec![];
    for entry in fs::read_dir(sessions_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let log_path = entry.path().join(PACKET_LOG);
        let (lines, size) = if log_path.exists() {
            let size = log_path.metadata()?.len();
            let lines = BufReader::new(fs::File::open(&log_path)?).lines().count();
            (lines, size)
        } else {
            (0, 0)
        };
        sessions.push(SessionInfo { name, lines, size });
    }
    sessions.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(sessions)
}

// ─── Packet log I/O ──────────────────────────────────────────────────────────

/// Append `lines` to `path`, one per line, creating the file if absent.
pub fn append_lines(path: &Path, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the last `n` lines of a log file.
pub fn read_log_tail(path: &Path, n: usize) -> Result<Vec<String>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut tail = VecDeque::with_capacity(n.min(1024));
    for line in reader.lines() {
        let line = line?;
        if n == 0 {
            continue;
        }
        if tail.len() == n {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(tail.into())
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

/// Write `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json_pretty<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    Ok(())
}

// ─── YAML config I/O ─────────────────────────────────────────────────────────

pub fn save_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = serde_yaml::to_string(data)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T>
where
    T: Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    let val = serde_yaml::from_str(&content)?;
    Ok(val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_lines_creates_and_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(PACKET_LOG);

        append_lines(&path, &["a".to_string(), "b".to_string()]).unwrap();
        append_lines(&path, &["c".to_string()]).unwrap();
        append_lines(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn test_append_lines_missing_dir_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join(PACKET_LOG);
        assert!(append_lines(&path, &["x".to_string()]).is_err());
    }

    #[test]
    fn test_read_log_tail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(PACKET_LOG);
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        append_lines(&path, &lines).unwrap();

        assert_eq!(read_log_tail(&path, 3).unwrap(), vec!["7", "8", "9"]);
        assert_eq!(read_log_tail(&path, 50).unwrap().len(), 10);
        assert!(read_log_tail(&path, 0).unwrap().is_empty());
    }

    #[test]
    fn test_list_sessions_counts_lines() {
        let tmp = TempDir::new().unwrap();
        let older = tmp.path().join("alice-1000");
        let newer = tmp.path().join("bob-2000");
        ensure_dir(&older).unwrap();
        ensure_dir(&newer).unwrap();
        append_lines(&older.join(PACKET_LOG), &["x".to_string(), "y".to_string()]).unwrap();
        fs::write(tmp.path().join("stray.txt"), "not a session").unwrap();

        let sessions = list_sessions(tmp.path()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name, "bob-2000");
        assert_eq!(sessions[0].lines, 0);
        assert_eq!(sessions[1].lines, 2);
        assert_eq!(sessions[1].size, 4);
    }

    #[test]
    fn test_list_sessions_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_sessions(&tmp.path().join("nope")).unwrap().is_empty());
    }
}
