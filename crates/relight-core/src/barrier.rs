//! Entry completion barrier.
//!
//! Converts N independent, unordered "this entry finished rebuilding"
//! signals into a single "all entries finished" event, once per rebuild
//! cycle. There is no explicit cycle boundary signal from the bundler;
//! cycles are inferred purely from counting, and the counter resets the
//! moment it saturates so the next cohort starts clean.

use crate::error::{Result, ShellError};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Reaction invoked when every configured entry has reported completion.
pub type BarrierReaction = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Gates a downstream action until all configured entries have reported a
/// finished rebuild.
///
/// The contract is *exactly one reaction invocation per full cohort* of
/// `total` completions, regardless of arrival order. If `total` is
/// miscomputed — an entry that silently never reports — the reaction never
/// fires; that is a designed risk of the counting approach, not a defect,
/// and callers configuring the barrier need to be aware of it.
pub struct CompletionBarrier {
    /// Number of configured entries, fixed per dev-server session.
    total: usize,
    /// Completions seen in the current cycle.
    completed: AtomicUsize,
    reaction: Option<BarrierReaction>,
}

impl CompletionBarrier {
    /// Create a barrier over `total` entries. At least one entry is
    /// required; a zero-entry barrier could never fire.
    pub fn new(total: usize) -> Result<Self> {
        if total == 0 {
            return Err(ShellError::Config {
                message: "completion barrier requires at least one entry".into(),
            });
        }
        Ok(Self {
            total,
            completed: AtomicUsize::new(0),
            reaction: None,
        })
    }

    /// Register the reaction invoked on saturation. Called once during
    /// wiring, before the barrier is shared.
    pub fn set_reaction(&mut self, reaction: BarrierReaction) {
        self.reaction = Some(reaction);
    }

    /// Record one entry's completed rebuild.
    ///
    /// The first `total - 1` signals of a cycle are no-ops; the saturating
    /// signal resets the counter and invokes the reaction. Reaction errors
    /// propagate to the caller — the bundler hook that reported last.
    /// Returns whether the reaction fired.
    pub async fn report_completion(&self) -> Result<bool> {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed < self.total {
            debug!("Entry built ({}/{})", completed, self.total);
            return Ok(false);
        }

        // Saturated. Reset before reacting so signals arriving during the
        // reaction count toward the next cycle.
        self.completed.store(0, Ordering::SeqCst);
        debug!("All {} entries built", self.total);

        if let Some(reaction) = &self.reaction {
            (**reaction)().await?;
        }
        Ok(true)
    }

    /// Number of configured entries.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Completions seen so far in the current cycle.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}
