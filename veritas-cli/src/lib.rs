//! Library side of the `veritas` binary: argument types, component setup,
//! and subcommand handlers.

pub mod args;
pub mod commands;
pub mod setup;

pub use args::{Cli, Command, GlobalArgs};
