/// User notification module - Gateway
mod notifier;

pub use notifier::{normalize_message, LogNotifier, Notifier, TerminalNotifier};
