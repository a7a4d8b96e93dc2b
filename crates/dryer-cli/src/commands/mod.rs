//! CLI subcommand implementations.

pub mod aggregate;
pub mod classify;
pub mod perten;
pub mod pivot;
pub mod reconcile;
pub mod run;
pub mod segments;
mod util;
