//! Platform-specific process signalling.
//!
//! Liveness probes and termination for a single pid. Tree-wide termination
//! is layered on top of these primitives in `process::terminate`.
//!
//! None of these functions reap the target: the controller's monitor thread
//! is parked in `Child::wait()` and owns the exit status. A second waiter
//! here would steal it.

// This module owns the OS/FFI boundary; each unsafe block carries a SAFETY note.
#![allow(unsafe_code)]

use crate::config::TerminationConfig;
use crate::error::{Result, ShellError};
use tracing::{debug, warn};

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: Uses `kill(pid, 0)` signal check
/// - **Windows**: Uses `OpenProcess` with `PROCESS_QUERY_LIMITED_INFORMATION`
///
/// An unreaped zombie still counts as alive; callers that hold the child's
/// waiter rely on it returning false shortly after the waiter reaps.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs only the permission/existence check and
        // delivers nothing.
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    #[cfg(windows)]
    {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        };

        // SAFETY: OpenProcess with a query-only access right; the handle is
        // closed before returning.
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if !handle.is_null() {
                CloseHandle(handle);
                true
            } else {
                false
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        warn!("Process alive check not implemented for this platform");
        true
    }
}

/// Send the graceful termination signal (SIGTERM / taskkill without /F).
///
/// A target that is already gone is success, not an error.
pub fn signal_term(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(ShellError::Terminate {
                pid,
                message: format!("SIGTERM failed: {}", e),
            }),
        }
    }

    #[cfg(windows)]
    {
        taskkill(pid, false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(ShellError::Terminate {
            pid,
            message: "process termination not implemented for this platform".into(),
        })
    }
}

/// Send the forceful kill signal (SIGKILL / taskkill /F).
pub fn signal_kill(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(ShellError::Terminate {
                pid,
                message: format!("SIGKILL failed: {}", e),
            }),
        }
    }

    #[cfg(windows)]
    {
        taskkill(pid, true)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(ShellError::Terminate {
            pid,
            message: "process termination not implemented for this platform".into(),
        })
    }
}

#[cfg(windows)]
fn taskkill(pid: u32, force: bool) -> Result<()> {
    use std::process::Command;

    let mut cmd = Command::new("taskkill");
    cmd.args(["/PID", &pid.to_string()]);
    if force {
        cmd.arg("/F");
    }

    let output = cmd.output().map_err(|e| ShellError::Terminate {
        pid,
        message: format!("failed to run taskkill: {}", e),
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    // "not found" / "not running" means the target is already gone
    if stderr.contains("not found") || stderr.contains("not running") {
        Ok(())
    } else {
        Err(ShellError::Terminate {
            pid,
            message: format!("taskkill failed: {}", stderr.trim()),
        })
    }
}

/// Terminate a single process gracefully, then forcefully if needed.
///
/// Sends the graceful signal, polls for exit up to `timeout_ms`, then
/// force-kills. Returns `true` if the process is gone when we return.
pub fn terminate_process(pid: u32, timeout_ms: u64) -> Result<bool> {
    use std::thread::sleep;

    if !is_process_alive(pid) {
        debug!("Process {} is not running", pid);
        return Ok(true);
    }

    debug!("Sending termination signal to process {}", pid);
    if let Err(e) = signal_term(pid) {
        warn!("Graceful signal to {} failed: {}", pid, e);
    }

    let poll = TerminationConfig::POLL_INTERVAL;
    let iterations = (timeout_ms / poll.as_millis() as u64).max(1);

    for _ in 0..iterations {
        sleep(poll);
        if !is_process_alive(pid) {
            debug!("Process {} terminated gracefully", pid);
            return Ok(true);
        }
    }

    debug!("Process {} still running, force killing", pid);
    signal_kill(pid)?;

    // The waiter owning the child reaps it; give that a moment to land.
    sleep(poll);

    Ok(!is_process_alive(pid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_self() {
        // Our own process should be alive
        let pid = std::process::id();
        assert!(is_process_alive(pid));
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        // A very high PID should not exist
        assert!(!is_process_alive(4_000_000_000));
    }

    #[test]
    fn test_terminate_nonexistent() {
        // Terminating a nonexistent process should succeed
        let result = terminate_process(4_000_000_000, 500);
        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    #[test]
    fn test_signal_term_nonexistent_is_ok() {
        assert!(signal_term(4_000_000_000).is_ok());
        assert!(signal_kill(4_000_000_000).is_ok());
    }
}
