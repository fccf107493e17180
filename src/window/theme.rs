//! Theme tokens and the terminal palette derived from them
//!
//! The theming collaborator publishes a [`ThemeTokens`] set; surfaces turn it
//! into a [`TerminalTheme`] and replace their emulator palette in place.

use serde::{Deserialize, Serialize};

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha is ignored)
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Rgb(digits.next()??, digits.next()??, digits.next()??))
            }
            6 | 8 => Some(Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        }
    }
}

/// Built-in theme names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeName::Dark => "Dark",
            ThemeName::Light => "Light",
        }
    }

    pub fn tokens(&self) -> ThemeTokens {
        match self {
            ThemeName::Dark => ThemeTokens {
                base_200: "#191e24".to_string(),
                base_300: "#15191e".to_string(),
                base_content: "#a6adbb".to_string(),
            },
            ThemeName::Light => ThemeTokens {
                base_200: "#f2f2f2".to_string(),
                base_300: "#e5e6e6".to_string(),
                base_content: "#1f2937".to_string(),
            },
        }
    }
}

/// Ambient colour tokens of the current theme.
///
/// Values are raw strings as published by the theming collaborator; anything
/// that fails to parse falls back to a fixed default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeTokens {
    pub base_200: String,
    pub base_300: String,
    pub base_content: String,
}

impl ThemeTokens {
    pub fn base_200(&self) -> Rgb {
        color_or(&self.base_200, Rgb::WHITE)
    }

    pub fn base_content(&self) -> Rgb {
        color_or(&self.base_content, Rgb(0x1f, 0x29, 0x37))
    }
}

/// Palette applied to a terminal emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalTheme {
    pub background: Rgb,
    pub foreground: Rgb,
    pub cursor: Rgb,
    pub selection_background: Rgb,
    pub selection_foreground: Rgb,
    pub selection_inactive_background: Rgb,
}

impl TerminalTheme {
    pub fn from_tokens(tokens: &ThemeTokens) -> Self {
        let content = tokens.base_content();
        Self {
            background: tokens.base_200(),
            foreground: content,
            cursor: content,
            selection_background: color_or(&tokens.base_300, Rgb(0x93, 0xc5, 0xfd)),
            selection_foreground: content,
            selection_inactive_background: color_or(&tokens.base_300, Rgb(0x1f, 0x29, 0x37)),
        }
    }
}

impl Default for TerminalTheme {
    fn default() -> Self {
        Self::from_tokens(&ThemeName::default().tokens())
    }
}

fn color_or(value: &str, fallback: Rgb) -> Rgb {
    Rgb::from_hex(value).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::from_hex("#1d4ed8"), Some(Rgb(0x1d, 0x4e, 0xd8)));
        assert_eq!(Rgb::from_hex("fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("#93c5fd44"), Some(Rgb(0x93, 0xc5, 0xfd)));
        assert_eq!(Rgb::from_hex("#12"), None);
        assert_eq!(Rgb::from_hex("oklch(0.5 0.1 200)"), None);
    }

    #[test]
    fn test_theme_from_tokens() {
        let theme = TerminalTheme::from_tokens(&ThemeName::Light.tokens());
        assert_eq!(theme.background, Rgb(0xf2, 0xf2, 0xf2));
        assert_eq!(theme.foreground, Rgb(0x1f, 0x29, 0x37));
        assert_eq!(theme.cursor, theme.foreground);
    }

    #[test]
    fn test_invalid_tokens_fall_back() {
        let theme = TerminalTheme::from_tokens(&ThemeTokens::default());
        assert_eq!(theme.background, Rgb::WHITE);
        assert_eq!(theme.foreground, Rgb(0x1f, 0x29, 0x37));
    }
}
