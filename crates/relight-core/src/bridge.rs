//! Dev-reload bridge.
//!
//! The two capabilities handed to build reactions: `startup` relaunches
//! the shell, `reload` refreshes connected renderers — falling back to a
//! full startup when there is no live process to refresh.

use crate::bundler::{DevServer, DevServerMessage};
use crate::error::Result;
use crate::process::{LaunchOptions, ProcessController};
use std::sync::Arc;
use tracing::{debug, info};

/// Bridges barrier saturation to the process controller and the dev server.
pub struct ReloadBridge {
    controller: Arc<ProcessController>,
    dev_server: Arc<dyn DevServer>,
    launch: LaunchOptions,
}

impl ReloadBridge {
    /// Wire a bridge over the controller and dev-server handle. `launch`
    /// is the options every `startup()` uses.
    pub fn new(
        controller: Arc<ProcessController>,
        dev_server: Arc<dyn DevServer>,
        launch: LaunchOptions,
    ) -> Self {
        Self {
            controller,
            dev_server,
            launch,
        }
    }

    /// (Re)start the shell process. Any prior instance is terminated first.
    pub async fn startup(&self) -> Result<u32> {
        self.controller.start(self.launch.clone()).await
    }

    /// Refresh without a restart when possible.
    ///
    /// With a live process, connected renderers are told to reload. With
    /// none — there is no window to refresh — this falls back to a full
    /// `startup()`.
    pub async fn reload(&self) -> Result<()> {
        if self.controller.is_running() {
            debug!("Shell running; sending full-reload to dev clients");
            self.dev_server
                .send_message(&DevServerMessage::FullReload)
                .await
        } else {
            info!("No shell process held; falling back to startup");
            self.startup().await.map(|_| ())
        }
    }

    /// The controller this bridge drives.
    pub fn controller(&self) -> &Arc<ProcessController> {
        &self.controller
    }

    /// The launch options `startup()` uses.
    pub fn launch_options(&self) -> &LaunchOptions {
        &self.launch
    }
}
