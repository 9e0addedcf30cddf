//! Subprocess helpers.
//!
//! Every external tool (ffmpeg, ffprobe) is launched through this module so
//! that console suppression on Windows and the mapping of spawn/exit failures
//! onto [`CoreError`] stay in one place.

use std::process::{Command, Output};

use crate::core::{CoreError, CoreResult};

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a std process command.
pub fn configure_std_command(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// Maps a spawn failure for `tool` onto the error taxonomy.
///
/// A binary that cannot be found is a missing dependency, not an I/O fault.
pub fn spawn_error(tool: &str, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::DependencyMissing(format!(
            "{} not found. Please install FFmpeg or set its path in the settings.",
            tool
        ))
    } else {
        CoreError::IoError(err)
    }
}

/// Runs `cmd` to completion, capturing stdout and stderr.
///
/// A non-zero exit becomes [`CoreError::DecodeFailure`] carrying the
/// captured diagnostic output.
pub fn run_captured(tool: &str, cmd: &mut Command) -> CoreResult<Output> {
    configure_std_command(cmd);
    let output = cmd.output().map_err(|e| spawn_error(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoreError::DecodeFailure(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}
