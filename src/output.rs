//! # Output Configuration and Report Rendering
//!
//! Controls CLI output appearance and renders status and sync reports as
//! plain text. The output mode is always passed in as an [`OutputConfig`];
//! nothing in the engine looks at the terminal or the environment.
//!
//! ## Respecting User Preferences
//!
//! [`OutputConfig::from_env_and_flag`] honours:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt::Write as _;

use console::Style;

use crate::apply::ApplyReport;
use crate::conflict::Conflict;
use crate::plan::{SyncAction, SyncPlan};
use crate::status::{DriftEntry, ProjectStatus};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never" or "auto".
    /// In auto mode, colors are disabled when `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
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

    /// Create a configuration with colors always enabled.
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn ok(&self, text: &str) -> String {
        self.paint(Style::new().green(), text)
    }

    pub fn warn(&self, text: &str) -> String {
        self.paint(Style::new().yellow(), text)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(Style::new().red().bold(), text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(Style::new().dim(), text)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

fn drift_line(entry: &DriftEntry) -> String {
    let mut line = format!("{} ({})", entry.path, entry.feature);
    if let Some(detail) = &entry.detail {
        let _ = write!(line, " [{}]", detail);
    }
    if let Some(matches) = &entry.matches {
        let _ = write!(line, " appears to match {}", matches);
    }
    line
}

fn conflict_line(conflict: &Conflict) -> String {
    let mut line = format!(
        "{} {}: {}",
        conflict.kind,
        conflict.path,
        conflict.owners.join(", ")
    );
    if let Some(detail) = &conflict.detail {
        let _ = write!(line, " ({})", detail);
    }
    if let Some(resolution) = &conflict.resolution {
        let _ = write!(line, " -> {}", resolution);
    }
    line
}

/// Render one project's status as indented text.
pub fn render_status(status: &ProjectStatus, out: &OutputConfig) -> String {
    let mut text = String::new();
    if status.ok {
        let _ = writeln!(
            text,
            "{} {}: {}",
            emoji(out, "✅", "[OK]"),
            status.project,
            out.ok("up to date")
        );
        return text;
    }

    let _ = writeln!(
        text,
        "{} {}: {}",
        emoji(out, "⚠️ ", "[DRIFT]"),
        status.project,
        out.warn("drift detected")
    );
    for entry in &status.missing {
        let _ = writeln!(text, "  missing   {}", drift_line(entry));
    }
    for entry in &status.mismatches {
        let _ = writeln!(text, "  mismatch  {}", drift_line(entry));
    }
    for conflict in &status.conflicts {
        let _ = writeln!(text, "  conflict  {}", conflict_line(conflict));
    }
    for error in &status.errors {
        let _ = writeln!(text, "  {}     {}", out.error("error"), error);
    }
    text
}

/// Render a sync plan, and the apply result when there is one.
pub fn render_plan(plan: &SyncPlan, applied: Option<&ApplyReport>, out: &OutputConfig) -> String {
    let mut text = String::new();
    let header = if plan.is_blocked() {
        format!("{} {}: {}", emoji(out, "❌", "[BLOCKED]"), plan.project, out.error("blocked"))
    } else if plan.is_empty() {
        format!("{} {}: {}", emoji(out, "✅", "[OK]"), plan.project, out.ok("nothing to do"))
    } else {
        let verb = if applied.is_some() { "applied" } else { "planned" };
        format!(
            "{} {}: {} {} action(s)",
            emoji(out, "🔄", "[SYNC]"),
            plan.project,
            verb,
            plan.actions.len()
        )
    };
    let _ = writeln!(text, "{}", header);

    for action in &plan.actions {
        let marker = match action {
            SyncAction::Rename { .. } => "~",
            SyncAction::Delete { .. } => "-",
            SyncAction::Write { .. } => "+",
            SyncAction::Link { .. } => "@",
        };
        let _ = writeln!(text, "  {} {}", marker, action);
    }
    for conflict in &plan.conflicts {
        let _ = writeln!(text, "  conflict  {}", conflict_line(conflict));
    }
    for error in &plan.errors {
        let _ = writeln!(text, "  {}     {}", out.error("error"), error);
    }
    if plan.is_blocked() && !plan.actions.is_empty() {
        let _ = writeln!(text, "  {}", out.dim("no changes were written"));
    }
    text
}
