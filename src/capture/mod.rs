//! Serial capture and session-segmented CSV logging
//!
//! This module provides:
//! - Line framing and `#START`/`#STOP` marker detection
//! - Session files with growing headers and padded rows
//! - The capture loop that ties a serial link to those files

pub mod csv;
pub mod engine;
pub mod line;
pub mod session;

pub use engine::{CaptureEngine, CaptureOptions, CaptureSummary, Termination};

use crate::error::CaptureResult;
use crate::serial::{PortConfig, SerialConnection};
use chrono::{DateTime, Local};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Default output file name when no `--log` path is given
pub fn default_log_name(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("power_log_{}.csv", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// Resolve the base CSV path for a run
///
/// A user-supplied name has its extension forced to `.csv`. The result is
/// placed under `log_dir` unless it is already absolute.
pub fn output_path(log: Option<&Path>, log_dir: &Path, now: DateTime<Local>) -> PathBuf {
    let name = match log {
        Some(path) => path.with_extension("csv"),
        None => default_log_name(now),
    };
    log_dir.join(name)
}

/// Open the link, wait for the board to settle, then capture until done
pub fn run(
    engine: &mut CaptureEngine,
    port_config: &PortConfig,
    interrupted: &AtomicBool,
) -> CaptureResult<Termination> {
    info!(
        "Opening {} @ {} (Ctrl-C to exit)",
        port_config.port_path, port_config.baud_rate
    );
    let connection = SerialConnection::open(port_config)?;

    // Opening the port resets most Arduino boards
    std::thread::sleep(port_config.settle_delay);

    engine.capture(connection, interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 7, 8, 9, 10).unwrap()
    }

    #[test]
    fn test_default_output_path() {
        let path = output_path(None, Path::new("./logs"), fixed_now());
        assert_eq!(path, PathBuf::from("./logs/power_log_2025-06-07_08-09-10.csv"));
    }

    #[test]
    fn test_user_log_name_forced_to_csv() {
        let path = output_path(Some(Path::new("bench.txt")), Path::new("logs"), fixed_now());
        assert_eq!(path, PathBuf::from("logs/bench.csv"));

        let path = output_path(Some(Path::new("bench")), Path::new("logs"), fixed_now());
        assert_eq!(path, PathBuf::from("logs/bench.csv"));
    }

    #[test]
    fn test_absolute_log_path_kept() {
        let path = output_path(Some(Path::new("/data/run.csv")), Path::new("logs"), fixed_now());
        assert_eq!(path, PathBuf::from("/data/run.csv"));
    }
}
