//! Command-line front end

pub mod commands;

pub use commands::{cmd_mine, cmd_resolve, cmd_start, CliResult};
