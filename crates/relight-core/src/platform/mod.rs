//! Platform abstraction layer for cross-platform compatibility.
//!
//! This module centralizes all platform-specific code to make it easy to
//! find, maintain, and extend. All `#[cfg]` blocks for OS-specific process
//! behavior live here rather than scattered throughout the codebase.
//!
//! # Supported Platforms
//!
//! - **Linux**: Full support
//! - **macOS**: Full support
//! - **Windows**: Full support

pub mod process;

// Re-export commonly used items
pub use process::{is_process_alive, signal_kill, signal_term, terminate_process};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}
