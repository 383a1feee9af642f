//! Integration tests for the process lifecycle controller and the
//! dev-reload bridge, driven against real child processes.
//!
//! Every controller gets an injected exit handler so a child exiting on
//! its own records its code instead of taking the test runner down.

#![cfg(unix)]

use relight::bundler::{DevServer, DevServerMessage};
use relight::platform;
use relight::process::DirectTerminator;
use relight::{
    ExitHandler, LaunchOptions, ProcessController, Result, ShellError, ShellRuntime,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A long-running child the tests can observe and kill.
fn sleeper() -> LaunchOptions {
    LaunchOptions::new("sleep").with_args(["30"])
}

/// Exit handler that records the propagated code instead of exiting.
fn exit_recorder() -> (ExitHandler, Arc<AtomicI32>) {
    let recorded = Arc::new(AtomicI32::new(i32::MIN));
    let handler = {
        let recorded = recorded.clone();
        Arc::new(move |code: i32| {
            recorded.store(code, Ordering::SeqCst);
        }) as ExitHandler
    };
    (handler, recorded)
}

fn test_controller() -> (Arc<ProcessController>, Arc<AtomicI32>) {
    let (handler, recorded) = exit_recorder();
    let controller = Arc::new(
        ProcessController::new()
            .with_exit_handler(handler)
            .with_stop_timeout(Duration::from_millis(500)),
    );
    (controller, recorded)
}

fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    cond()
}

#[tokio::test]
async fn test_start_and_stop() {
    let (controller, _) = test_controller();

    let pid = controller.start(sleeper()).await.unwrap();
    assert!(controller.is_running());
    assert_eq!(controller.held_pid(), Some(pid));
    assert!(platform::is_process_alive(pid));

    controller.stop().await;
    assert!(!controller.is_running());
    assert!(controller.held_pid().is_none());
    assert!(wait_until(
        || !platform::is_process_alive(pid),
        Duration::from_secs(2)
    ));
}

#[tokio::test]
async fn test_restart_terminates_previous_instance_first() {
    let (controller, _) = test_controller();

    let first = controller.start(sleeper()).await.unwrap();
    assert!(platform::is_process_alive(first));

    // The previous instance must already be gone when the before-startup
    // hook runs, and the hook runs strictly before the new spawn.
    let first_gone_in_hook = Arc::new(AtomicBool::new(false));
    let flag = first_gone_in_hook.clone();
    let hook = Box::new(move |_argv: &[String]| {
        flag.store(!platform::is_process_alive(first), Ordering::SeqCst);
        Box::pin(async { Ok(()) }) as futures::future::BoxFuture<'static, Result<()>>
    });

    let second = controller
        .start_with_hook(sleeper(), Some(hook))
        .await
        .unwrap();

    assert_ne!(first, second);
    assert!(first_gone_in_hook.load(Ordering::SeqCst));
    assert!(platform::is_process_alive(second));
    assert!(!platform::is_process_alive(first));

    controller.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let (controller, _) = test_controller();

    let pid = controller.start(sleeper()).await.unwrap();
    controller.stop().await;
    controller.stop().await;

    assert!(!controller.is_running());
    assert!(!platform::is_process_alive(pid));
}

#[tokio::test]
async fn test_exit_hook_installed_at_most_once() {
    let (controller, _) = test_controller();
    assert_eq!(controller.exit_hook_installs(), 0);

    controller.start(sleeper()).await.unwrap();
    controller.start(sleeper()).await.unwrap();
    controller.start(sleeper()).await.unwrap();

    assert_eq!(controller.exit_hook_installs(), 1);
    controller.stop().await;
}

#[tokio::test]
async fn test_child_exit_code_propagates_to_host() {
    let (controller, recorded) = test_controller();

    let options = LaunchOptions::new("sh").with_args(["-c", "exit 7"]);
    controller.start(options).await.unwrap();

    assert!(wait_until(
        || recorded.load(Ordering::SeqCst) != i32::MIN,
        Duration::from_secs(5)
    ));
    assert_eq!(recorded.load(Ordering::SeqCst), 7);

    // The handle is released once the child is gone.
    assert!(wait_until(
        || controller.held_pid().is_none(),
        Duration::from_secs(2)
    ));
}

#[tokio::test]
async fn test_stop_does_not_propagate_exit() {
    let (controller, recorded) = test_controller();

    controller.start(sleeper()).await.unwrap();
    controller.stop().await;

    // Give the monitor thread time to observe the kill; the detached
    // handle must keep it from invoking the exit handler.
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(recorded.load(Ordering::SeqCst), i32::MIN);
}

#[tokio::test]
async fn test_direct_terminator_fallback_still_stops() {
    let (handler, _) = exit_recorder();
    let controller = Arc::new(
        ProcessController::new()
            .with_exit_handler(handler)
            .with_terminator(Arc::new(DirectTerminator))
            .with_stop_timeout(Duration::from_millis(500)),
    );

    let pid = controller.start(sleeper()).await.unwrap();
    controller.stop().await;

    assert!(!controller.is_running());
    assert!(wait_until(
        || !platform::is_process_alive(pid),
        Duration::from_secs(2)
    ));
}

#[tokio::test]
async fn test_spawn_failure_surfaces_and_leaves_controller_idle() {
    let (controller, _) = test_controller();

    let err = controller
        .start(LaunchOptions::new("/nonexistent/no-such-shell"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Spawn { .. }));
    assert!(!controller.is_running());

    // A failed spawn must not poison later starts.
    let pid = controller.start(sleeper()).await.unwrap();
    assert!(platform::is_process_alive(pid));
    controller.stop().await;
}

#[tokio::test]
async fn test_failing_hook_aborts_start() {
    let (controller, _) = test_controller();

    let hook = Box::new(|_argv: &[String]| {
        Box::pin(async {
            Err(ShellError::Hook {
                message: "client not ready".into(),
            })
        }) as futures::future::BoxFuture<'static, Result<()>>
    });

    let err = controller
        .start_with_hook(sleeper(), Some(hook))
        .await
        .unwrap_err();
    assert!(matches!(err, ShellError::Hook { .. }));
    assert!(!controller.is_running());
}

/// Dev server double that records delivered messages.
struct RecordingDevServer {
    messages: Mutex<Vec<DevServerMessage>>,
}

impl RecordingDevServer {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl DevServer for RecordingDevServer {
    async fn send_message(&self, message: &DevServerMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_reload_falls_back_to_startup_when_idle() {
    let (controller, _) = test_controller();
    let dev_server = Arc::new(RecordingDevServer::new());

    let runtime = ShellRuntime::builder()
        .entry("main")
        .launch(sleeper())
        .dev_server(dev_server.clone())
        .controller(controller.clone())
        .build()
        .unwrap();

    // Nothing held: reload must start the shell, not message a
    // non-existent window.
    runtime.bridge().reload().await.unwrap();
    assert!(controller.is_running());
    assert_eq!(dev_server.count(), 0);
    let pid = controller.held_pid().unwrap();

    // With a live process, reload refreshes renderers in place.
    runtime.bridge().reload().await.unwrap();
    assert_eq!(dev_server.count(), 1);
    assert_eq!(controller.held_pid(), Some(pid));

    runtime.shutdown().await;
    assert!(!controller.is_running());
}

#[tokio::test]
async fn test_full_cycle_relaunches_shell_per_cohort() {
    struct NoopBundler;

    #[async_trait]
    impl relight::Bundler for NoopBundler {
        async fn build(&self, _entry: &relight::Entry) -> Result<()> {
            Ok(())
        }
    }

    let (controller, _) = test_controller();
    let runtime = ShellRuntime::builder()
        .entry("main")
        .entry("preload")
        .launch(sleeper())
        .dev_server(Arc::new(RecordingDevServer::new()))
        .controller(controller.clone())
        .build()
        .unwrap();

    runtime.rebuild(&NoopBundler).await.unwrap();
    let first = controller.held_pid().unwrap();
    assert!(platform::is_process_alive(first));

    // Next dev-reload cycle replaces the instance.
    runtime.rebuild(&NoopBundler).await.unwrap();
    let second = controller.held_pid().unwrap();
    assert_ne!(first, second);
    assert!(!platform::is_process_alive(first));
    assert!(platform::is_process_alive(second));

    runtime.shutdown().await;
}
