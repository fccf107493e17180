//! Truecolor SGR helpers for labels and banners

use super::accent::Accent;
use super::theme::Rgb;

const RESET: &str = "\x1b[0m";
const ITALIC: &str = "\x1b[3m";

fn fg(rgb: Rgb) -> String {
    format!("\x1b[38;2;{};{};{}m", rgb.0, rgb.1, rgb.2)
}

fn bg(rgb: Rgb) -> String {
    format!("\x1b[48;2;{};{};{}m", rgb.0, rgb.1, rgb.2)
}

/// `text` on the accent background, reset afterwards
pub fn styled(accent: Accent, text: &str) -> String {
    format!("{}{}{}{}", bg(accent.bg), fg(accent.fg), text, RESET)
}

/// Italic variant used for source labels
pub fn styled_italic(accent: Accent, text: &str) -> String {
    format!("{}{}{}{}{}", bg(accent.bg), fg(accent.fg), ITALIC, text, RESET)
}

/// Attribution prefix for the combined view: ` <name> ` plus a separating space
pub fn label(accent: Accent, name: &str) -> String {
    format!("{} ", styled_italic(accent, &format!(" {name} ")))
}

pub fn stopped_banner(accent: Accent) -> String {
    styled(accent, " STOPPED ")
}

pub fn error_banner(accent: Accent, message: &str) -> String {
    styled(accent, &format!(" ERROR: {message} "))
}
