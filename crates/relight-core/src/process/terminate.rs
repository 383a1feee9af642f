//! Termination strategies for the shell process tree.
//!
//! A shell process routinely forks helpers (GPU process, renderers,
//! crashpad). Killing only the root leaks those, so the preferred strategy
//! walks the system process table and reclaims the whole descendant set.
//! That capability is optional (`tree-kill` cargo feature); without it the
//! supervisor degrades to signalling the root pid directly and says so once.

use crate::error::Result;
use crate::platform;
use std::time::Duration;
use tracing::debug;

/// Strategy for terminating the supervised process and its descendants.
///
/// Implementations must be safe to call on an already-dead pid, and must be
/// callable from the host's shutdown path — i.e. fully synchronous. The
/// controller wraps calls in `spawn_blocking` when running on the runtime.
pub trait TreeTerminator: Send + Sync {
    /// Human-readable strategy name, used in diagnostics.
    fn label(&self) -> &'static str;

    /// Terminate `pid` (and, when the strategy supports it, every
    /// descendant). Returns `true` if no targeted process remains alive.
    fn terminate(&self, pid: u32, timeout: Duration) -> Result<bool>;
}

/// Select the termination strategy for this build.
///
/// With the `tree-kill` feature (default) the process-table walker is used.
/// Without it, a single advisory warning is emitted once per process
/// lifetime recommending the feature, then the direct-signal fallback runs
/// silently.
pub fn resolve() -> std::sync::Arc<dyn TreeTerminator> {
    #[cfg(feature = "tree-kill")]
    {
        std::sync::Arc::new(DescendantsTerminator)
    }

    #[cfg(not(feature = "tree-kill"))]
    {
        static ADVISORY: std::sync::Once = std::sync::Once::new();
        ADVISORY.call_once(|| {
            tracing::warn!(
                "tree-kill feature disabled: descendant processes of the shell \
                 will not be reclaimed; enable the `tree-kill` cargo feature \
                 for process-tree termination"
            );
        });
        std::sync::Arc::new(DirectTerminator)
    }
}

/// Fallback strategy: signal only the root pid.
///
/// Always available; used when the process-table capability is compiled
/// out, and directly useful in tests.
pub struct DirectTerminator;

impl TreeTerminator for DirectTerminator {
    fn label(&self) -> &'static str {
        "direct"
    }

    fn terminate(&self, pid: u32, timeout: Duration) -> Result<bool> {
        debug!("Terminating process {} directly (no tree walk)", pid);
        platform::terminate_process(pid, timeout.as_millis() as u64)
    }
}

/// Process-table strategy: walk parent links and reclaim the whole tree.
#[cfg(feature = "tree-kill")]
pub struct DescendantsTerminator;

#[cfg(feature = "tree-kill")]
impl DescendantsTerminator {
    /// Collect the descendant pids of `root`, deepest first, so children
    /// are signalled before their parents.
    pub fn collect_descendants(root: u32) -> Vec<u32> {
        use std::collections::HashMap;
        use sysinfo::{ProcessesToUpdate, System};

        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (pid, proc) in sys.processes() {
            if let Some(parent) = proc.parent() {
                children
                    .entry(parent.as_u32())
                    .or_default()
                    .push(pid.as_u32());
            }
        }

        // Breadth-first from the root, then reversed: leaves come out first.
        let mut ordered = Vec::new();
        let mut frontier = vec![root];
        while let Some(pid) = frontier.pop() {
            if let Some(kids) = children.get(&pid) {
                for &kid in kids {
                    ordered.push(kid);
                    frontier.push(kid);
                }
            }
        }
        ordered.reverse();
        ordered
    }
}

#[cfg(feature = "tree-kill")]
impl TreeTerminator for DescendantsTerminator {
    fn label(&self) -> &'static str {
        "process-table"
    }

    fn terminate(&self, pid: u32, timeout: Duration) -> Result<bool> {
        use crate::config::TerminationConfig;
        use std::thread::sleep;

        let mut targets = Self::collect_descendants(pid);
        targets.push(pid);

        debug!(
            "Terminating process {} and {} descendant(s)",
            pid,
            targets.len() - 1
        );

        for &target in &targets {
            if let Err(e) = platform::signal_term(target) {
                debug!("Graceful signal to {} failed: {}", target, e);
            }
        }

        let poll = TerminationConfig::POLL_INTERVAL;
        let iterations = (timeout.as_millis() as u64 / poll.as_millis() as u64).max(1);

        for _ in 0..iterations {
            sleep(poll);
            if targets.iter().all(|&t| !platform::is_process_alive(t)) {
                debug!("Process tree of {} terminated gracefully", pid);
                return Ok(true);
            }
        }

        for &target in &targets {
            if platform::is_process_alive(target) {
                debug!("Force killing {}", target);
                platform::signal_kill(target)?;
            }
        }

        sleep(poll);
        Ok(targets.iter().all(|&t| !platform::is_process_alive(t)))
    }
}
