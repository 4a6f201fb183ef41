use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{format::LogFormat, level::LogLevel};

/// Process logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LogFormat,
    /// Level filter expression (e.g. "info", "rex_exec=debug,info").
    pub level: LogLevel,
    /// Include module targets in log lines.
    pub with_targets: bool,
    /// Colored text output (only when stdout is a terminal).
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Color only when enabled and stdout is actually a terminal; checked at
    /// init time, not at config-parse time.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
