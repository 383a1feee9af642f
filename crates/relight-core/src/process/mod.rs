//! Shell process management: launching, supervision, termination.

pub mod controller;
pub mod launcher;
pub mod terminate;

pub use controller::{BeforeStartupHook, ExitHandler, ProcessController};
pub use launcher::LaunchOptions;
pub use terminate::{DirectTerminator, TreeTerminator};

#[cfg(feature = "tree-kill")]
pub use terminate::DescendantsTerminator;
