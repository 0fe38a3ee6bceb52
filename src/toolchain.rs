//! Firmware build and flash via `arduino-cli`
//!
//! Both steps shell out and block until the tool finishes. A missing
//! executable is reported separately from a failing build so the operator
//! knows whether to install the toolchain or fix the sketch.

use crate::error::ToolchainError;
use log::{debug, info};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Expand a leading `~` and make the sketch path absolute
///
/// Fails if the sketch does not exist; nothing should be compiled or
/// flashed in that case.
pub fn resolve_sketch(path: &Path) -> Result<PathBuf, ToolchainError> {
    let expanded = expand_home(path);
    expanded
        .canonicalize()
        .map_err(|_| ToolchainError::SketchNotFound(expanded))
}

/// Replace a leading `~` with the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Thin wrapper around the `arduino-cli` executable
#[derive(Debug, Clone)]
pub struct ArduinoCli {
    program: String,
    fqbn: String,
    verbose: bool,
}

impl ArduinoCli {
    pub fn new(program: impl Into<String>, fqbn: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            fqbn: fqbn.into(),
            verbose: false,
        }
    }

    /// Log full command lines at info level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn fqbn(&self) -> &str {
        &self.fqbn
    }

    /// Extra compiler flags selecting the target board and trigger mode
    pub fn build_flags(target_board: &str, ext_trigger: bool) -> String {
        let mut flags = format!("-DBOARD_{} ", target_board);
        if ext_trigger {
            flags.push_str("-DEXT_TRIGGER ");
        }
        flags
    }

    fn compile_args(&self, sketch: &Path, build_flags: &str) -> Vec<String> {
        vec![
            "compile".to_string(),
            "--fqbn".to_string(),
            self.fqbn.clone(),
            "--build-property".to_string(),
            format!("build.extra_flags={}", build_flags),
            sketch.display().to_string(),
        ]
    }

    fn upload_args(&self, sketch: &Path, port: &str) -> Vec<String> {
        vec![
            "upload".to_string(),
            "-p".to_string(),
            port.to_string(),
            "--fqbn".to_string(),
            self.fqbn.clone(),
            sketch.display().to_string(),
        ]
    }

    /// Compile the sketch with the given extra build flags
    pub fn compile(&self, sketch: &Path, build_flags: &str) -> Result<(), ToolchainError> {
        info!("Compiling {} for {}", sketch.display(), self.fqbn);
        self.execute(self.compile_args(sketch, build_flags))
    }

    /// Flash the compiled sketch to the board on `port`
    pub fn upload(&self, sketch: &Path, port: &str) -> Result<(), ToolchainError> {
        info!("Uploading {} to {}", sketch.display(), port);
        self.execute(self.upload_args(sketch, port))
    }

    fn execute(&self, args: Vec<String>) -> Result<(), ToolchainError> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        if self.verbose {
            info!("[CMD] {}", command_line);
        } else {
            debug!("[CMD] {}", command_line);
        }

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ToolchainError::ToolNotFound(self.program.clone()),
                _ => ToolchainError::Spawn {
                    command: command_line.clone(),
                    source,
                },
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolchainError::CommandFailed {
                command: command_line,
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_build_flags() {
        assert_eq!(ArduinoCli::build_flags("ZCU106", false), "-DBOARD_ZCU106 ");
        assert_eq!(
            ArduinoCli::build_flags("ZCU102", true),
            "-DBOARD_ZCU102 -DEXT_TRIGGER "
        );
    }

    #[test]
    fn test_compile_args() {
        let cli = ArduinoCli::new("arduino-cli", "arduino:mbed:nano33ble");
        let args = cli.compile_args(Path::new("/work/src/src.ino"), "-DBOARD_ZCU106 ");
        assert_eq!(
            args,
            vec![
                "compile",
                "--fqbn",
                "arduino:mbed:nano33ble",
                "--build-property",
                "build.extra_flags=-DBOARD_ZCU106 ",
                "/work/src/src.ino",
            ]
        );
    }

    #[test]
    fn test_upload_args() {
        let cli = ArduinoCli::new("arduino-cli", "arduino:mbed:nano33ble");
        let args = cli.upload_args(Path::new("/work/src/src.ino"), "/dev/ttyACM0");
        assert_eq!(
            args,
            vec![
                "upload",
                "-p",
                "/dev/ttyACM0",
                "--fqbn",
                "arduino:mbed:nano33ble",
                "/work/src/src.ino",
            ]
        );
    }

    #[test]
    fn test_missing_tool() {
        let cli = ArduinoCli::new("power-log-no-such-tool", "x:y:z");
        let err = cli.compile(Path::new("sketch.ino"), "").unwrap_err();
        assert!(matches!(err, ToolchainError::ToolNotFound(_)));
        assert_eq!(err.to_string(), "power-log-no-such-tool not found.");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_reports_exit_code() {
        // `false` ignores its arguments and exits 1
        let cli = ArduinoCli::new("false", "x:y:z");
        let err = cli.upload(Path::new("sketch.ino"), "/dev/null").unwrap_err();
        assert!(matches!(err, ToolchainError::CommandFailed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_tool() {
        let cli = ArduinoCli::new("true", "x:y:z");
        cli.compile(Path::new("sketch.ino"), "-DBOARD_ZCU106 ").unwrap();
    }

    #[test]
    fn test_resolve_sketch() {
        let dir = tempdir().unwrap();
        let sketch = dir.path().join("src.ino");
        std::fs::write(&sketch, "void setup() {}\nvoid loop() {}\n").unwrap();

        let resolved = resolve_sketch(&sketch).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("src.ino"));

        let missing = resolve_sketch(&dir.path().join("missing.ino")).unwrap_err();
        assert!(matches!(missing, ToolchainError::SketchNotFound(_)));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/src.ino")), PathBuf::from("/abs/src.ino"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/sketch")), home.join("sketch"));
        }
    }
}
