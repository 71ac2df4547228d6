//! Example of embedding pktlog-core in a proxy.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pktlog_core::{Direction, LoggingConfig, Scheduler, SessionLogger, TextPacket};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. One scheduler for the whole process
    let scheduler = Scheduler::new()?;

    // 2. Shared configuration
    let config = Arc::new(
        LoggingConfig::default()
            .with_sessions_dir("./sessions")
            .with_flush_interval(Duration::from_millis(200)),
    );

    // 3. One logger per proxied connection
    let logger = SessionLogger::starting_now(config, scheduler.clone(), "example-client");
    logger.start()?;
    println!("Logging packets to {}", logger.log_path().display());

    // 4. Simulate traffic in both directions
    for i in 0..50 {
        logger.log_packet(&TextPacket::new("Text", format!("ping {i}")), Direction::ServerBound);
        logger.log_packet(&TextPacket::new("Text", format!("pong {i}")), Direction::ClientBound);
        thread::sleep(Duration::from_millis(20));
    }

    // 5. Both ends disconnected: close the buffer, let the job drain and exit
    logger.stop();
    while logger.is_flushing() {
        thread::sleep(Duration::from_millis(50));
    }

    scheduler.shutdown();
    Ok(())
}
