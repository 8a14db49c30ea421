//! Progress feedback for long-running stages.
//!
//! Permutation importance is the only stage slow enough to need a bar.
//! Bars go to stderr and are hidden when:
//!
//! - `--quiet` is passed or `DEPLOYRISK_QUIET` is set
//! - stderr is not a terminal (CI, piped output)

use indicatif::{ProgressBar, ProgressStyle};

pub const TEMPLATE_IMPORTANCE: &str =
    "{spinner} {msg} [{bar:30}] {pos}/{len} features ({percent}%) - {eta}";

/// Configuration for progress display behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressConfig {
    /// Whether to suppress all progress output
    pub quiet_mode: bool,
}

impl ProgressConfig {
    /// Create progress configuration from environment and CLI arguments
    pub fn from_env(quiet: bool) -> Self {
        let env_quiet = std::env::var("DEPLOYRISK_QUIET").is_ok();
        Self {
            quiet_mode: quiet || env_quiet,
        }
    }

    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }

        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }

    /// Bar of unknown length; the stage sets it once the work is known.
    ///
    /// Returns a hidden bar if progress should not be shown
    pub fn create_bar(&self, template: &str, msg: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        let pb = ProgressBar::new(0).with_style(style);
        pb.set_message(msg.to_string());
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_quiet_flag() {
        let config = ProgressConfig::from_env(true);
        assert!(!config.should_show_progress());
    }

    #[test]
    fn test_quiet_creates_hidden_bar() {
        let config = ProgressConfig { quiet_mode: true };
        let pb = config.create_bar(TEMPLATE_IMPORTANCE, "Permutation importance");
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_invalid_template_still_builds() {
        let config = ProgressConfig { quiet_mode: true };
        let pb = config.create_bar("{unclosed", "x");
        pb.inc(1);
    }
}
