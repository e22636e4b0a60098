//! # Terminal Output
//!
//! Renders the human-facing summaries printed after a command finishes.
//! Logging goes to stderr through `log`; these summaries go to stdout.
//!
//! Emoji are only used when color output is enabled. The decision follows
//! `--color=always|never|auto` and, in auto mode, the usual environment
//! conventions:
//! - `NO_COLOR` disables colors when set (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even without a TTY
//! - `TERM=dumb` disables colors

use std::env;
use std::fmt::Write;
use std::path::Path;

use crate::sync::SyncSummary;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Build from the value of `--color` ("always", "never" or "auto").
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // presence alone disables, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Pick the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Per-addon module counts, the total, and any missing-module warnings.
pub fn render_summary(config: &OutputConfig, summary: &SyncSummary) -> String {
    let mut out = String::new();

    if let Some(core) = &summary.core {
        let _ = writeln!(
            out,
            "{} Platform core vendored at {}",
            emoji(config, "📦", "[CORE]"),
            core.display()
        );
    }

    let width = summary
        .addons
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or(0);
    for addon in &summary.addons {
        let _ = writeln!(
            out,
            "  {:<width$}  {} module(s)",
            addon.name,
            addon.modules.len(),
            width = width
        );
    }

    let _ = writeln!(
        out,
        "{} Vendored {} module(s) from {} addon(s)",
        emoji(config, "✅", "[OK]"),
        summary.total_modules(),
        summary.addons.len()
    );

    for warning in &summary.warnings {
        let _ = writeln!(out, "{} {}", emoji(config, "⚠️ ", "[WARN]"), warning);
    }
    out
}

/// One line announcing a written artifact.
pub fn render_written(config: &OutputConfig, what: &str, path: &Path) -> String {
    format!("{} {} written to {}", emoji(config, "📝", "[OK]"), what, path.display())
}
