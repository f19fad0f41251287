use colored::Colorize;
use tracing::warn;

use crate::constants::MSG_GENERIC_FAILURE;

/// Process-wide "show a transient message" capability (toast, alert, status line)
pub trait Notifier: Send + Sync {
    fn show(&self, message: &str);
}

/// Replace blank messages with a generic one
pub fn normalize_message(message: &str) -> &str {
    if message.trim().is_empty() {
        MSG_GENERIC_FAILURE
    } else {
        message
    }
}

/// Sends notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, message: &str) {
        warn!("{}", normalize_message(message));
    }
}

/// Prints notifications as a highlighted line on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn show(&self, message: &str) {
        eprintln!("{} {}", "[!]".red().bold(), normalize_message(message).yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_messages_are_replaced() {
        assert_eq!(normalize_message(""), MSG_GENERIC_FAILURE);
        assert_eq!(normalize_message("  "), MSG_GENERIC_FAILURE);
        assert_eq!(normalize_message("Invalid group"), "Invalid group");
    }
}
