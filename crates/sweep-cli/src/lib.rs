//! CLI argument model and startup validation for the threadsweep binary.

pub mod cli_args;
pub mod validation;

pub use cli_args::Cli;
pub use validation::*;
