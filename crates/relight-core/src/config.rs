//! Centralized configuration for the relight supervisor.
//!
//! Timeouts, default launch arguments and environment variable names used
//! across the process lifecycle.

use std::time::Duration;

/// Defaults applied when launching the shell process.
pub struct LaunchDefaults;

impl LaunchDefaults {
    /// Program launched when none is configured.
    pub const PROGRAM: &'static str = "electron";
    /// Default argv: run the app in the current directory, sandbox off
    /// (the dev build is unsigned and the sandbox rejects it).
    pub const ARGS: &'static [&'static str] = &[".", "--no-sandbox"];
    /// Environment variable through which the resolved dev-server URL is
    /// published to the launched application.
    pub const DEV_SERVER_URL_ENV: &'static str = "DEV_SERVER_URL";
}

/// Timing for process teardown.
pub struct TerminationConfig;

impl TerminationConfig {
    /// Grace period between SIGTERM and SIGKILL.
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);
    /// Poll interval while waiting for a signalled process to exit.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Grace period used on the host-exit path, where blocking long is
    /// worse than a possibly leaked process.
    pub const SHUTDOWN_STOP_TIMEOUT: Duration = Duration::from_millis(500);
}

/// Exit codes used by the host process itself.
pub struct ExitCodes;

impl ExitCodes {
    /// 128 + SIGINT, the shell convention for an interrupted process.
    pub const INTERRUPTED: i32 = 130;
    /// Reported when a child dies without an exit code on a platform
    /// where the terminating signal cannot be recovered.
    pub const UNKNOWN_CHILD_FAILURE: i32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_argv() {
        assert_eq!(LaunchDefaults::ARGS, &[".", "--no-sandbox"]);
    }

    #[test]
    fn test_stop_timeout_covers_at_least_one_poll() {
        assert!(TerminationConfig::STOP_TIMEOUT >= TerminationConfig::POLL_INTERVAL);
        assert!(TerminationConfig::SHUTDOWN_STOP_TIMEOUT >= TerminationConfig::POLL_INTERVAL);
    }
}
