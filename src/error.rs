//! Error types for port resolution, capture, toolchain and configuration

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// A serial port observed during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    pub description: String,
}

impl std::fmt::Display for PortCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

fn format_candidates(candidates: &[PortCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("  {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while picking a serial port
#[derive(Error, Debug)]
pub enum PortError {
    /// Enumeration returned nothing
    #[error("No serial ports found.")]
    NoPortsFound,

    /// Ports exist but none looks like an Arduino
    #[error(
        "Unable to auto-detect an Arduino on serial port.\nDetected serial ports:\n{}\nSpecify the port manually with --port",
        format_candidates(.candidates)
    )]
    NoMatchFound { candidates: Vec<PortCandidate> },

    /// The OS refused to enumerate ports
    #[error("Failed to enumerate serial ports: {0}")]
    Enumeration(#[from] serialport::Error),
}

/// Errors that end a capture run
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Opening the serial link failed
    #[error("Failed to open serial port {port}: {source}")]
    StreamOpenFailed {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Reading from the link failed mid-run (device unplugged, etc.)
    #[error("Serial stream failed: {0}")]
    StreamFatal(#[source] io::Error),

    /// Creating, opening or writing an output file failed
    #[error("File system error on {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CaptureError {
    pub(crate) fn fs(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| CaptureError::FileSystem { path, source }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

/// Errors from the external firmware toolchain
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// The toolchain executable is not installed or not on PATH
    #[error("{0} not found.")]
    ToolNotFound(String),

    /// The sketch to build does not exist
    #[error("Sketch {} not found.", .0.display())]
    SketchNotFound(PathBuf),

    /// The toolchain ran but reported failure
    #[error("{command} failed with exit code {}", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },

    /// Spawning or waiting on the toolchain failed for another reason
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Errors loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_lists_every_candidate() {
        let err = PortError::NoMatchFound {
            candidates: vec![
                PortCandidate {
                    name: "/dev/ttyS0".to_string(),
                    description: "n/a".to_string(),
                },
                PortCandidate {
                    name: "/dev/ttyUSB0".to_string(),
                    description: "CP2102 USB to UART".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("  /dev/ttyS0: n/a"));
        assert!(msg.contains("  /dev/ttyUSB0: CP2102 USB to UART"));
        assert!(msg.ends_with("Specify the port manually with --port"));
    }

    #[test]
    fn test_command_failed_message() {
        let err = ToolchainError::CommandFailed {
            command: "arduino-cli compile".to_string(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "arduino-cli compile failed with exit code 2");

        let killed = ToolchainError::CommandFailed {
            command: "arduino-cli upload".to_string(),
            code: None,
        };
        assert!(killed.to_string().contains("signal"));
    }

    #[test]
    fn test_filesystem_error_names_path() {
        let err = CaptureError::fs("/tmp/out.csv")(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().contains("/tmp/out.csv"));
    }
}
