//! pktlog CLI: record, list and inspect packet logging sessions.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pktlog::{storage, Direction, LoggingConfig, Scheduler, SessionLogger, TextPacket};

#[derive(Parser)]
#[command(
    name = "pktlog",
    about = "pktlog: staged packet logging for proxy sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record packets read from stdin into a new session
    ///
    /// Each line is `> Kind body` (server bound) or `< Kind body` (client bound).
    Record {
        /// Display name of the session (e.g. the client address)
        name: String,
        /// Sessions directory (overrides the config file)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// YAML logging config
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Also echo every logged packet to stdout
        #[arg(long)]
        console: bool,
        /// Flush period in milliseconds (overrides the config file)
        #[arg(long)]
        flush_ms: Option<u64>,
        /// Packet kinds to skip (repeatable)
        #[arg(long)]
        ignore: Vec<String>,
    },
    /// List recorded sessions
    List {
        /// Path to sessions directory
        #[arg(default_value = "./sessions")]
        dir: PathBuf,
    },
    /// Show the last lines of a session's packet log
    Inspect {
        /// Path to the session directory
        session_dir: PathBuf,
        /// Number of lines to show
        #[arg(long, short = 'n', default_value_t = 20)]
        tail: usize,
    },
    /// Write a default YAML logging config
    InitConfig {
        /// Output file
        #[arg(default_value = "pktlog.yaml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record { name, dir, config, console, flush_ms, ignore } => {
            cmd_record(name, dir, config, console, flush_ms, ignore)?;
        }
        Commands::List { dir } => {
            cmd_list(dir)?;
        }
        Commands::Inspect { session_dir, tail } => {
            cmd_inspect(session_dir, tail)?;
        }
        Commands::InitConfig { path, force } => {
            cmd_init_config(path, force)?;
        }
    }

    Ok(())
}

// ─── Command implementations ──────────────────────────────────────────────────

fn cmd_record(
    name: String,
    dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    console: bool,
    flush_ms: Option<u64>,
    ignore: Vec<String>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => LoggingConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LoggingConfig::default(),
    };
    if let Some(dir) = dir {
        config = config.with_sessions_dir(dir);
    }
    if console {
        config.log_to.console = true;
    }
    if let Some(ms) = flush_ms {
        config = config.with_flush_interval(Duration::from_millis(ms));
    }
    config = config.with_ignored(ignore);

    let scheduler = Scheduler::new()?;
    let logger = SessionLogger::starting_now(Arc::new(config), scheduler.clone(), name);
    logger.start()?;

    let mut processed = 0usize;
    for (lineno, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Some(Ok((direction, packet))) => {
                logger.log_packet(&packet, direction);
                processed += 1;
            }
            Some(Err(reason)) => warn!("Skipping line {}: {}", lineno + 1, reason),
            None => {}
        }
    }

    logger.stop_and_flush()?;
    scheduler.shutdown();

    eprintln!(
        "Processed {} packet(s) for {}",
        processed,
        logger.data_path().display()
    );
    Ok(())
}

fn cmd_list(dir: PathBuf) -> Result<()> {
    let sessions = storage::list_sessions(&dir)?;

    if sessions.is_empty() {
        println!("No sessions found in '{}'", dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Session", "Packets", "Size"]);

    for session in &sessions {
        table.add_row([
            session.name.as_str(),
            &session.lines.to_string(),
            &format_size(session.size),
        ]);
    }

    println!("Sessions in: {}", dir.display());
    println!("{}", table);
    Ok(())
}

fn cmd_inspect(session_dir: PathBuf, tail: usize) -> Result<()> {
    if !session_dir.exists() {
        anyhow::bail!("Session directory not found: {}", session_dir.display());
    }

    let log_path = session_dir.join(storage::PACKET_LOG);
    if !log_path.exists() {
        anyhow::bail!("No {} found in {}", storage::PACKET_LOG, session_dir.display());
    }

    for line in storage::read_log_tail(&log_path, tail)? {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    LoggingConfig::default().save(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

// ─── Utilities ────────────────────────────────────────────────────────────────

/// Parse `> Kind body` / `< Kind body`. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Option<std::result::Result<(Direction, TextPacket), String>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (direction, rest) = if let Some(rest) = line.strip_prefix('>') {
        (Direction::ServerBound, rest)
    } else if let Some(rest) = line.strip_prefix('<') {
        (Direction::ClientBound, rest)
    } else {
        return Some(Err("expected '>' or '<' direction marker".to_string()));
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Some(Err("missing packet kind".to_string()));
    }
    let (kind, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Some(Ok((direction, TextPacket::new(kind, body.trim()))))
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (direction, packet) = parse_line("> Text hello world").unwrap().unwrap();
        assert_eq!(direction, Direction::ServerBound);
        assert_eq!(packet, TextPacket::new("Text", "hello world"));

        let (direction, packet) = parse_line("<Disconnect").unwrap().unwrap();
        assert_eq!(direction, Direction::ClientBound);
        assert_eq!(packet, TextPacket::new("Disconnect", ""));

        assert!(parse_line("   ").is_none());
        assert!(parse_line("# comment").is_none());
        assert!(parse_line("Text no marker").unwrap().is_err());
        assert!(parse_line(">").unwrap().is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
