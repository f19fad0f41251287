/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;
mod indicator;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::{handle_command, init};
pub use indicator::spawn_loading_indicator;
