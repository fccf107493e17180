//! Accent colour pairs used to attribute output to its source session

use super::theme::{Rgb, ThemeTokens};
use serde::{Deserialize, Serialize};

/// Fixed palette for sorted mode, indexed by registration order
pub const SORTED_PALETTE: [Rgb; 18] = [
    Rgb(0x1d, 0x4e, 0xd8), // blue
    Rgb(0x0f, 0x76, 0x6e), // teal
    Rgb(0x6d, 0x28, 0xd9), // violet
    Rgb(0xc2, 0x41, 0x0c), // orange
    Rgb(0x03, 0x69, 0xa1), // sky
    Rgb(0xa2, 0x1c, 0xaf), // fuchsia
    Rgb(0x4d, 0x7c, 0x0f), // lime
    Rgb(0x43, 0x38, 0xca), // indigo
    Rgb(0xbe, 0x18, 0x5d), // pink
    Rgb(0x15, 0x80, 0x3d), // green
    Rgb(0x0e, 0x74, 0x90), // cyan
    Rgb(0xbe, 0x12, 0x3c), // rose
    Rgb(0xb4, 0x53, 0x09), // amber
    Rgb(0x6b, 0x21, 0xa8), // purple
    Rgb(0x04, 0x78, 0x57), // emerald
    Rgb(0x37, 0x41, 0x51), // gray
    Rgb(0xa1, 0x62, 0x07), // yellow
    Rgb(0xb9, 0x1c, 0x1c), // red
];

/// How accent pairs are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentMode {
    /// Derived from the theme base colours; stable until the theme changes
    #[default]
    Theme,
    /// One palette entry per session, by registration order
    Sorted,
}

impl AccentMode {
    pub fn from_sorted(sorted: bool) -> Self {
        if sorted {
            AccentMode::Sorted
        } else {
            AccentMode::Theme
        }
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self, AccentMode::Sorted)
    }

    pub fn toggled(self) -> Self {
        match self {
            AccentMode::Theme => AccentMode::Sorted,
            AccentMode::Sorted => AccentMode::Theme,
        }
    }
}

/// (background, foreground) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub bg: Rgb,
    pub fg: Rgb,
}

impl Accent {
    /// Accent for the session registered at `index`
    pub fn compute(mode: AccentMode, index: usize, tokens: &ThemeTokens) -> Self {
        match mode {
            AccentMode::Sorted => Self {
                bg: SORTED_PALETTE[index % SORTED_PALETTE.len()],
                fg: Rgb::WHITE,
            },
            AccentMode::Theme => Self {
                bg: tokens.base_content(),
                fg: tokens.base_200(),
            },
        }
    }
}
