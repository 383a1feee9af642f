//! Shell runtime: wiring of entries, barrier, controller and bridge.
//!
//! This is the piece a bundler integration consumes. It owns the
//! configured entries, gates reactions behind the completion barrier, and
//! exposes the rebuild-then-react cycle as one object.

use crate::barrier::CompletionBarrier;
use crate::bridge::ReloadBridge;
use crate::bundler::{Bundler, DevServer, Entry};
use crate::error::{Result, ShellError};
use crate::process::{LaunchOptions, ProcessController};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Reaction invoked when all entries have rebuilt. Receives the bridge,
/// i.e. the `startup`/`reload` capabilities.
pub type BuildReaction =
    Arc<dyn Fn(Arc<ReloadBridge>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Supervisor runtime for one dev-server session.
pub struct ShellRuntime {
    entries: Vec<Entry>,
    barrier: Arc<CompletionBarrier>,
    bridge: Arc<ReloadBridge>,
    controller: Arc<ProcessController>,
}

impl ShellRuntime {
    /// Create a builder for the runtime.
    pub fn builder() -> ShellRuntimeBuilder {
        ShellRuntimeBuilder::default()
    }

    /// The configured entries, in build order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The completion barrier over the entries.
    pub fn barrier(&self) -> &Arc<CompletionBarrier> {
        &self.barrier
    }

    /// The startup/reload capabilities.
    pub fn bridge(&self) -> &Arc<ReloadBridge> {
        &self.bridge
    }

    /// The process lifecycle controller.
    pub fn controller(&self) -> &Arc<ProcessController> {
        &self.controller
    }

    /// Report one entry's finished rebuild. The bundler integration calls
    /// this from each entry's build-finished hook; the saturating call
    /// runs the reaction and propagates its error. Returns whether the
    /// reaction fired.
    pub async fn entry_built(&self) -> Result<bool> {
        self.barrier.report_completion().await
    }

    /// Run a full rebuild cycle: build each entry through the bundler,
    /// reporting completion per entry. The reaction fires inside the last
    /// report.
    pub async fn rebuild(&self, bundler: &dyn Bundler) -> Result<()> {
        for entry in &self.entries {
            bundler.build(entry).await?;
            self.entry_built().await?;
        }
        Ok(())
    }

    /// Tear down the supervised process.
    pub async fn shutdown(&self) {
        self.controller.stop().await;
    }
}

/// Builder for [`ShellRuntime`].
#[derive(Default)]
pub struct ShellRuntimeBuilder {
    entries: Vec<Entry>,
    launch: Option<LaunchOptions>,
    dev_server: Option<Arc<dyn DevServer>>,
    dev_server_url: Option<String>,
    reaction: Option<BuildReaction>,
    controller: Option<Arc<ProcessController>>,
}

impl ShellRuntimeBuilder {
    /// Set the build entries. At least one is required.
    pub fn entries(mut self, entries: Vec<Entry>) -> Self {
        self.entries = entries;
        self
    }

    /// Append one entry, indexed after the existing ones.
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        let index = self.entries.len();
        self.entries.push(Entry::new(index, name));
        self
    }

    /// Launch options used by every `startup()`. Default:
    /// [`LaunchOptions::default`].
    pub fn launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = Some(launch);
        self
    }

    /// Handle to the host bundler's dev server. Required.
    pub fn dev_server(mut self, dev_server: Arc<dyn DevServer>) -> Self {
        self.dev_server = Some(dev_server);
        self
    }

    /// Externally-reachable dev-server URL, published into the shell's
    /// environment for the launched application to read.
    pub fn dev_server_url(mut self, url: impl Into<String>) -> Self {
        self.dev_server_url = Some(url.into());
        self
    }

    /// Override the reaction run when all entries have rebuilt. Default:
    /// a full `startup()`.
    pub fn on_all_entries_built(mut self, reaction: BuildReaction) -> Self {
        self.reaction = Some(reaction);
        self
    }

    /// Use a pre-configured controller (tests inject recorders here).
    pub fn controller(mut self, controller: Arc<ProcessController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Wire everything together.
    pub fn build(self) -> Result<ShellRuntime> {
        if self.entries.is_empty() {
            return Err(ShellError::Config {
                message: "at least one build entry is required".into(),
            });
        }
        let dev_server = self.dev_server.ok_or_else(|| ShellError::Config {
            message: "a dev-server handle is required".into(),
        })?;

        let mut launch = self.launch.unwrap_or_default();
        if let Some(url) = self.dev_server_url {
            launch = launch.with_dev_server_url(url);
        }

        let controller = self
            .controller
            .unwrap_or_else(|| Arc::new(ProcessController::new()));
        let bridge = Arc::new(ReloadBridge::new(controller.clone(), dev_server, launch));

        let mut barrier = CompletionBarrier::new(self.entries.len())?;
        let reaction_bridge = bridge.clone();
        let user_reaction = self.reaction;
        barrier.set_reaction(Arc::new(move || {
            let bridge = reaction_bridge.clone();
            match &user_reaction {
                Some(reaction) => (**reaction)(bridge),
                None => Box::pin(async move { bridge.startup().await.map(|_| ()) }),
            }
        }));

        Ok(ShellRuntime {
            entries: self.entries,
            barrier: Arc::new(barrier),
            bridge,
            controller,
        })
    }
}
