//! # Output Configuration
//!
//! Controls how the operator-facing summary looks: emoji markers and bold
//! headings on capable terminals, plain ASCII markers otherwise.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt;
use std::str::FromStr;

/// Value of the `--color` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    Always,
    Never,
    #[default]
    Auto,
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            "auto" => Ok(ColorChoice::Auto),
            other => Err(format!("invalid color choice '{}'", other)),
        }
    }
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorChoice::Always => write!(f, "always"),
            ColorChoice::Never => write!(f, "never"),
            ColorChoice::Auto => write!(f, "auto"),
        }
    }
}

/// Kinds of summary lines, each with its own marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Done,
    Warning,
    Push,
    Graph,
    Search,
}

impl Marker {
    fn emoji(self) -> &'static str {
        match self {
            Marker::Done => "✅",
            Marker::Warning => "⚠️",
            Marker::Push => "🚀",
            Marker::Graph => "🌳",
            Marker::Search => "🔍",
        }
    }

    fn plain(self) -> &'static str {
        match self {
            Marker::Done => "[OK]",
            Marker::Warning => "[WARN]",
            Marker::Push => "[PUSH]",
            Marker::Graph => "[TREE]",
            Marker::Search => "[SCAN]",
        }
    }
}

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve a `--color` choice against the environment.
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn new(choice: ColorChoice) -> Self {
        let use_color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables, even when empty.
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

    /// Marker for a summary line.
    pub fn marker(&self, marker: Marker) -> &'static str {
        if self.use_color {
            marker.emoji()
        } else {
            marker.plain()
        }
    }

    /// A section heading, bold when colors are on.
    pub fn heading(&self, text: &str) -> String {
        if self.use_color {
            console::style(text).bold().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}
