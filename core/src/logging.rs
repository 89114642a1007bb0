//! Quiet-aware logging for one invocation.
//!
//! Informational messages are dropped in quiet mode. Warnings always pass;
//! the terminal error is logged by the binary and is never suppressed.

use std::fmt::Display;

use log::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginLog {
    quiet: bool,
}

impl PluginLog {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Whether `info` messages are emitted.
    pub fn enabled(&self) -> bool {
        !self.quiet
    }

    pub fn info(&self, message: impl Display) {
        if self.enabled() {
            info!("{message}");
        }
    }

    pub fn warn(&self, message: impl Display) {
        warn!("{message}");
    }
}
