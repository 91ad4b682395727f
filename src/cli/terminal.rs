//! Colour and layout helpers for requirement reports.
//!
//! Colour is only emitted when stdout supports it.

use std::fmt;

use owo_colors::{OwoColorize, colors::css};
use reqlock::RequirementId;

/// Below this width, reports stack their columns.
const NARROW_COLUMNS: u16 = 60;

fn color_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Whether the terminal is too narrow for tabular output.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < NARROW_COLUMNS)
}

/// Styles for the states a requirement report shows.
pub trait Highlight {
    /// Completed, or in sync with the lock (green).
    fn done(&self) -> String;
    /// Outstanding work or unlocked changes (amber).
    fn pending(&self) -> String;
    /// Something that involves a critical requirement (bold red).
    fn critical(&self) -> String;
    /// Secondary text such as descriptions and hints.
    fn muted(&self) -> String;
}

impl Highlight for str {
    fn done(&self) -> String {
        paint(self, |text| text.fg::<css::Green>().to_string())
    }

    fn pending(&self) -> String {
        paint(self, |text| text.fg::<css::Orange>().to_string())
    }

    fn critical(&self) -> String {
        paint(self, |text| text.fg::<css::Red>().bold().to_string())
    }

    fn muted(&self) -> String {
        paint(self, |text| text.dimmed().to_string())
    }
}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if color_enabled() {
        style(text)
    } else {
        text.to_string()
    }
}

/// Prints a section title underlined with a muted rule.
pub fn heading(title: &str) {
    println!("{title}");
    println!("{}", "─".repeat(title.chars().count()).muted());
}

/// A requirement id, flagged and highlighted when it is critical.
pub fn label(id: &RequirementId, critical: bool) -> String {
    if critical {
        format!("{id} [critical]").critical()
    } else {
        id.to_string()
    }
}

/// The completion mark in front of a requirement in the hierarchy.
pub fn completion_mark(completed: bool) -> String {
    if completed {
        "✔".done()
    } else {
        "○".muted()
    }
}

/// How a requirement differs from the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Added,
    Removed,
    Changed,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Added => "+",
            Self::Removed => "-",
            Self::Changed => "~",
        };
        if !color_enabled() {
            return f.write_str(symbol);
        }
        match self {
            Self::Added => write!(f, "{}", symbol.fg::<css::Green>()),
            Self::Removed => write!(f, "{}", symbol.fg::<css::Red>()),
            Self::Changed => write!(f, "{}", symbol.fg::<css::Orange>()),
        }
    }
}
