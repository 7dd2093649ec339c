//! Command-line interface: argument definitions and dispatch.

pub mod args;
pub mod run;

pub use args::{Cli, Commands};
pub use run::{ExitCode, run};
