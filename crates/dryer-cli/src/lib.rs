//! Grain dryer CLI library.
//!
//! This crate provides the `dryer` command-line interface: one module per
//! subcommand, the layered configuration and the argument definitions.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{AlarmConfig, Config, PivotConfig, ReconcileConfig};
