//! Relight — dev-reload supervisor for desktop-shell child processes.
//!
//! Glue between a web-app bundler's dev lifecycle and an Electron-style
//! shell process. When the bundler's dev server reloads, every configured
//! bundle entry (main process, preload scripts, extra windows) is rebuilt;
//! a completion barrier waits for the full cohort; the process controller
//! then replaces the running shell — terminating the previous instance and
//! its descendants before spawning the new one.
//!
//! ```text
//!  bundler dev-reload
//!        │  build(entry) per entry
//!        ▼
//!  CompletionBarrier ── all N entries built ──► ReloadBridge
//!                                                │ startup / reload
//!                                                ▼
//!                                       ProcessController
//!                                  stop old ─► hook ─► spawn new
//!                                        │
//!                               child exit ties host lifetime
//! ```
//!
//! Bundler configuration resolution and renderer behavior stay outside
//! this crate; the bundler integration implements the [`Bundler`] and
//! [`DevServer`] traits and drives [`ShellRuntime`].
//!
//! # Example
//!
//! ```rust,ignore
//! use relight::{LaunchOptions, ShellRuntime};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> relight::Result<()> {
//!     let runtime = ShellRuntime::builder()
//!         .entry("main")
//!         .entry("preload")
//!         .launch(LaunchOptions::default())
//!         .dev_server(Arc::new(MyDevServer::connect()?))
//!         .dev_server_url("http://192.168.1.4:5173")
//!         .build()?;
//!
//!     // Per dev-reload cycle:
//!     runtime.rebuild(&my_bundler).await?;
//!     Ok(())
//! }
//! ```

pub mod barrier;
pub mod bridge;
pub mod bundler;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod runtime;

// Re-export commonly used types
pub use barrier::{BarrierReaction, CompletionBarrier};
pub use bridge::ReloadBridge;
pub use bundler::{Bundler, DevServer, DevServerMessage, Entry};
pub use config::{ExitCodes, LaunchDefaults, TerminationConfig};
pub use error::{Result, ShellError};
pub use process::{
    BeforeStartupHook, DirectTerminator, ExitHandler, LaunchOptions, ProcessController,
    TreeTerminator,
};
pub use runtime::{BuildReaction, ShellRuntime, ShellRuntimeBuilder};

#[cfg(feature = "tree-kill")]
pub use process::DescendantsTerminator;
