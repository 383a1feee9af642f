//! Dev-loop example - rebuild two entries and (re)launch a shell process
//!
//! Pass the program to supervise as the first argument (defaults to
//! `electron`). Try `cargo run --example dev_loop -- sleep 10`.

use async_trait::async_trait;
use relight::{
    Bundler, DevServer, DevServerMessage, Entry, LaunchOptions, Result, ShellRuntime,
};
use std::sync::Arc;

/// Stand-in for the host bundler: pretends every entry rebuilds cleanly.
struct FakeBundler;

#[async_trait]
impl Bundler for FakeBundler {
    async fn build(&self, entry: &Entry) -> Result<()> {
        println!("building entry '{}'", entry.name);
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        Ok(())
    }
}

/// Stand-in for the dev server: prints instead of pushing to websockets.
struct PrintingDevServer;

#[async_trait]
impl DevServer for PrintingDevServer {
    async fn send_message(&self, message: &DevServerMessage) -> Result<()> {
        println!("dev-server -> clients: {}", serde_json::to_string(message)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relight=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let launch = match args.next() {
        Some(program) => LaunchOptions::new(program).with_args(args),
        None => LaunchOptions::default(),
    };

    let runtime = ShellRuntime::builder()
        .entry("main")
        .entry("preload")
        .launch(launch)
        .dev_server(Arc::new(PrintingDevServer))
        .dev_server_url("http://localhost:5173")
        .build()?;

    // First cycle: everything builds, then the shell starts.
    runtime.rebuild(&FakeBundler).await?;
    println!("shell pid: {:?}", runtime.controller().held_pid());

    // Renderer-only change: refresh in place, no restart.
    runtime.bridge().reload().await?;

    // Second full cycle: the running instance is replaced.
    runtime.rebuild(&FakeBundler).await?;
    println!("shell pid after relaunch: {:?}", runtime.controller().held_pid());

    runtime.shutdown().await;
    Ok(())
}
