//! Blocking user notifications.
//!
//! Workflows report outcomes through [`Notifier`] rather than printing, so the same
//! workflow can back the CLI or any other front-end.

use std::io::{self, BufRead, Write};

/// Alert and confirmation seam between workflows and the user.
pub trait Notifier: Send + Sync {
    /// Show a message the user must acknowledge.
    fn alert(&self, message: &str);

    /// Ask a yes/no question; `true` means the user agreed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Terminal notifier: alerts go to stderr, confirmations read a line from stdin.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// Interpret a typed answer; anything but an explicit yes declines.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stderr = io::stderr();
        let _ = write!(stderr, "{} [y/N] ", prompt);
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read confirmation");
                false
            }
        }
    }
}
