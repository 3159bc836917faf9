//! Command line interface module
//!
//! Argument parsing and the runner that maps each subcommand onto the
//! library's inspect and push operations.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::{Runner, render_inspection};
