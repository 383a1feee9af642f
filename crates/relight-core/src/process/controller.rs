//! Shell process lifecycle controller.
//!
//! Owns at most one live shell process at a time. `start()` always tears
//! down the previous instance before spawning a replacement, a monitor
//! thread ties the host's lifetime to the child's, and a lazily-installed
//! Ctrl-C hook makes sure killing the host never leaves an orphaned shell.
//!
//! The controller is a single-instance service object: state that the
//! source design kept in ambient globals (the held process handle, the
//! exit-hook latch) lives in [`ProcessController`] with exactly one
//! logical writer at a time, enforced by sequencing rather than assumed
//! atomicity.

use crate::config::{ExitCodes, TerminationConfig};
use crate::error::Result;
use crate::platform;
use crate::process::launcher::{self, LaunchOptions};
use crate::process::terminate::{self, TreeTerminator};
use futures::future::BoxFuture;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hook awaited after the previous instance is gone and strictly before
/// the replacement spawns. Receives the argv about to be launched.
pub type BeforeStartupHook =
    Box<dyn FnOnce(&[String]) -> BoxFuture<'static, Result<()>> + Send>;

/// Invoked with the child's exit code when the shell exits on its own.
/// Defaults to terminating the host with that code.
pub type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

/// The held child: pid plus the flag that stands in for listener removal.
/// The `Child` itself lives on the monitor thread, parked in `wait()`.
struct HeldChild {
    pid: u32,
    detached: Arc<AtomicBool>,
}

/// State shared with the monitor thread and the host-exit hook.
struct ControllerState {
    /// At most one live child handle (exclusive access only).
    held: Mutex<Option<HeldChild>>,
    /// Latch: the host-exit hook is installed at most once.
    exit_hook_installed: AtomicBool,
    /// Observable install count, for verifying the latch.
    exit_hook_installs: AtomicUsize,
    terminator: Arc<dyn TreeTerminator>,
    exit_handler: ExitHandler,
}

impl ControllerState {
    /// Take the held handle and detach it. Detaching comes first so the
    /// impending kill cannot re-enter the exit propagation path.
    fn take_detached(&self) -> Option<HeldChild> {
        let mut held = self.held.lock().unwrap();
        let handle = held.take()?;
        handle.detached.store(true, Ordering::SeqCst);
        Some(handle)
    }

    /// Synchronous best-effort teardown with the short shutdown grace
    /// period. Safe from signal-adjacent contexts and `Drop`.
    fn stop_blocking(&self) {
        let Some(held) = self.take_detached() else {
            return;
        };
        match self
            .terminator
            .terminate(held.pid, TerminationConfig::SHUTDOWN_STOP_TIMEOUT)
        {
            Ok(true) => debug!("Shell process {} stopped on shutdown", held.pid),
            Ok(false) => warn!("Shell process {} may have survived shutdown", held.pid),
            Err(e) => warn!("Shutdown termination advisory for {}: {}", held.pid, e),
        }
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        // The supervisor going away must not orphan the shell.
        self.stop_blocking();
    }
}

/// Lifecycle controller for the supervised shell process.
pub struct ProcessController {
    state: Arc<ControllerState>,
    /// Serializes overlapping `start()`/`stop()` calls so two starts can
    /// never both pass the "no prior instance" check.
    start_gate: tokio::sync::Mutex<()>,
    stop_timeout: Duration,
}

impl ProcessController {
    /// Create a controller with the termination strategy resolved for this
    /// build and the default exit handler (`std::process::exit`).
    pub fn new() -> Self {
        Self::assemble(
            terminate::resolve(),
            Arc::new(|code| std::process::exit(code)),
            TerminationConfig::STOP_TIMEOUT,
        )
    }

    fn assemble(
        terminator: Arc<dyn TreeTerminator>,
        exit_handler: ExitHandler,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(ControllerState {
                held: Mutex::new(None),
                exit_hook_installed: AtomicBool::new(false),
                exit_hook_installs: AtomicUsize::new(0),
                terminator,
                exit_handler,
            }),
            start_gate: tokio::sync::Mutex::new(()),
            stop_timeout,
        }
    }

    /// Override the termination strategy.
    pub fn with_terminator(self, terminator: Arc<dyn TreeTerminator>) -> Self {
        Self::assemble(terminator, self.state.exit_handler.clone(), self.stop_timeout)
    }

    /// Override the reaction to the child exiting on its own. Tests inject
    /// a recorder here; production code keeps the default.
    pub fn with_exit_handler(self, handler: ExitHandler) -> Self {
        Self::assemble(self.state.terminator.clone(), handler, self.stop_timeout)
    }

    /// Override the graceful-termination grace period.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Start the shell process, replacing any prior instance.
    ///
    /// Returns the new child's pid. Spawn failures surface synchronously
    /// and are not retried.
    pub async fn start(&self, options: LaunchOptions) -> Result<u32> {
        self.start_with_hook(options, None).await
    }

    /// Like [`start`](Self::start), with an optional hook awaited between
    /// the teardown of the old instance and the spawn of the new one.
    /// A failing hook aborts the start; nothing is spawned.
    pub async fn start_with_hook(
        &self,
        options: LaunchOptions,
        hook: Option<BeforeStartupHook>,
    ) -> Result<u32> {
        let _gate = self.start_gate.lock().await;

        // The prior instance is fully torn down before anything else; this
        // ordering is what keeps two live instances from ever coexisting.
        self.stop_inner().await;

        if let Some(hook) = hook {
            hook(&options.args).await?;
        }

        let child = launcher::spawn(&options)?;
        let pid = child.id();
        let detached = Arc::new(AtomicBool::new(false));

        {
            let mut held = self.state.held.lock().unwrap();
            *held = Some(HeldChild {
                pid,
                detached: detached.clone(),
            });
        }

        spawn_monitor(&self.state, child, detached);
        self.install_exit_hook();

        info!("Shell process started (pid {})", pid);
        Ok(pid)
    }

    /// Stop the held shell process, if any.
    ///
    /// Idempotent: with nothing held this is a no-op. Termination failures
    /// are advisory — logged, never returned — so a stuck or already-dead
    /// process can never block the next `start()`.
    pub async fn stop(&self) {
        let _gate = self.start_gate.lock().await;
        self.stop_inner().await;
    }

    /// Synchronous best-effort stop for the host shutdown path, where
    /// asynchronous work cannot be awaited.
    pub fn stop_blocking(&self) {
        self.state.stop_blocking();
    }

    /// Whether a shell process is currently held and alive.
    pub fn is_running(&self) -> bool {
        let held = self.state.held.lock().unwrap();
        held.as_ref()
            .map_or(false, |h| platform::is_process_alive(h.pid))
    }

    /// Pid of the held shell process, if any.
    pub fn held_pid(&self) -> Option<u32> {
        self.state.held.lock().unwrap().as_ref().map(|h| h.pid)
    }

    /// How many times the host-exit hook installation ran. Stays at one
    /// across any number of `start()` calls.
    pub fn exit_hook_installs(&self) -> usize {
        self.state.exit_hook_installs.load(Ordering::SeqCst)
    }

    /// Teardown shared by `stop()` and the start path. Caller holds the gate.
    async fn stop_inner(&self) {
        let Some(held) = self.state.take_detached() else {
            debug!("stop: no shell process held");
            return;
        };

        let terminator = self.state.terminator.clone();
        let timeout = self.stop_timeout;
        let pid = held.pid;
        debug!(
            "Stopping shell process {} ({} strategy)",
            pid,
            terminator.label()
        );

        let outcome =
            tokio::task::spawn_blocking(move || terminator.terminate(pid, timeout)).await;
        match outcome {
            Ok(Ok(true)) => debug!("Shell process {} stopped", pid),
            Ok(Ok(false)) => warn!("Shell process {} may still be alive", pid),
            Ok(Err(e)) => warn!("Termination advisory for {}: {}", pid, e),
            Err(e) => warn!("Termination task for {} failed: {}", pid, e),
        }
    }

    /// Install the host-exit hook, at most once per controller. A second
    /// process-wide registration (another component already owns the
    /// signal) is advisory, not fatal.
    fn install_exit_hook(&self) {
        if self.state.exit_hook_installed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.exit_hook_installs.fetch_add(1, Ordering::SeqCst);

        let state: Weak<ControllerState> = Arc::downgrade(&self.state);
        let result = ctrlc::set_handler(move || {
            if let Some(state) = state.upgrade() {
                state.stop_blocking();
            }
            std::process::exit(ExitCodes::INTERRUPTED);
        });

        if let Err(e) = result {
            warn!("Could not install host-exit handler: {}", e);
        }
    }
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new()
    }
}

/// Park a thread in `wait()` on the child. On a non-detached exit the host
/// follows the child down, mirroring its exit code.
fn spawn_monitor(state: &Arc<ControllerState>, mut child: Child, detached: Arc<AtomicBool>) {
    let exit_handler = state.exit_handler.clone();
    let state: Weak<ControllerState> = Arc::downgrade(state);

    std::thread::spawn(move || {
        let status = child.wait();

        if detached.load(Ordering::SeqCst) {
            debug!("Detached shell process reaped");
            return;
        }

        // Clear the held handle if it is still this child's.
        if let Some(state) = state.upgrade() {
            let mut held = state.held.lock().unwrap();
            if held
                .as_ref()
                .map_or(false, |h| Arc::ptr_eq(&h.detached, &detached))
            {
                *held = None;
            }
        }

        let code = match status {
            Ok(status) => exit_status_code(&status),
            Err(e) => {
                warn!("Failed to collect shell exit status: {}", e);
                ExitCodes::UNKNOWN_CHILD_FAILURE
            }
        };

        info!("Shell process exited with code {}; host follows", code);
        exit_handler(code);
    });
}

/// Map an exit status to the code the host should propagate. A child
/// killed by a signal has no code; shells report those as `128 + signo`.
fn exit_status_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    ExitCodes::UNKNOWN_CHILD_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_starts_idle() {
        let controller = ProcessController::new();
        assert!(!controller.is_running());
        assert!(controller.held_pid().is_none());
        assert_eq!(controller.exit_hook_installs(), 0);
    }

    #[tokio::test]
    async fn test_stop_with_nothing_held_is_noop() {
        let controller = ProcessController::new();
        controller.stop().await;
        controller.stop().await;
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_blocking_with_nothing_held_is_noop() {
        let controller = ProcessController::new();
        controller.stop_blocking();
        assert!(!controller.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_code_maps_signals() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(libc::SIGKILL); // killed by SIGKILL
        assert_eq!(exit_status_code(&status), 128 + libc::SIGKILL);
    }
}
