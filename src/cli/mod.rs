//! CLI module for the goldencfg tool.
//!
//! This module provides the command-line interface for listing, approving
//! and deploying config plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, FilterArgs, JobCommands, OutputFormat, PlanCommands, SecretCommands};
pub use output::{OutputFormatter, SecretCheck};
