//! Bundler collaborator interfaces.
//!
//! The supervisor never resolves bundler configuration itself; it calls
//! `build` per entry and receives completion callbacks. These traits are
//! the seam the host bundler integration implements.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One logical build target whose artifact must be rebuilt before the
/// shell can (re)start: the main process, a preload script, one per
/// additional window.
///
/// Entries are created at plugin-configuration time from user input and
/// stay immutable for the life of a dev-server session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Position in the configured entry list.
    pub index: usize,
    /// Logical name, e.g. `"main"` or `"preload"`.
    pub name: String,
    /// Resolved build configuration, opaque to the supervisor.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Entry {
    /// Create an entry with an empty build configuration.
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            config: serde_json::Value::Null,
        }
    }

    /// Attach the resolved build configuration.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// The external build system. The supervisor hands it one entry at a time
/// and expects the artifact to be rewritten when `build` returns.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Rebuild a single entry's bundle.
    async fn build(&self, entry: &Entry) -> Result<()>;
}

/// Message sent to connected dev clients.
///
/// `FullReload` serializes as `{"type":"full-reload"}`, the wire form the
/// dev server's websocket clients understand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DevServerMessage {
    /// Ask connected renderers to reload themselves without a process
    /// restart.
    FullReload,
}

/// Handle to the host bundler's dev server, used to refresh renderers
/// without restarting the shell process.
#[async_trait]
pub trait DevServer: Send + Sync {
    /// Deliver a message to all connected clients.
    async fn send_message(&self, message: &DevServerMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_reload_wire_format() {
        let json = serde_json::to_string(&DevServerMessage::FullReload).unwrap();
        assert_eq!(json, r#"{"type":"full-reload"}"#);
    }

    #[test]
    fn test_full_reload_round_trip() {
        let msg: DevServerMessage = serde_json::from_str(r#"{"type":"full-reload"}"#).unwrap();
        assert_eq!(msg, DevServerMessage::FullReload);
    }

    #[test]
    fn test_entry_construction() {
        let entry = Entry::new(0, "main").with_config(serde_json::json!({
            "outDir": "dist-electron",
        }));
        assert_eq!(entry.index, 0);
        assert_eq!(entry.name, "main");
        assert_eq!(entry.config["outDir"], "dist-electron");
    }
}
