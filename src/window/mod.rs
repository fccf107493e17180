//! Rendering layer
//!
//! Terminal surfaces bound to session feeds, the combined-view aggregation,
//! theme and accent handling, the console shell and the top-level error
//! boundary.

pub mod accent;
pub mod aggregate;
pub mod ansi;
pub mod boundary;
pub mod console;
mod deferred;
pub mod emulator;
pub mod keys;
pub mod screen;
pub mod shell;
pub mod surface;
pub mod theme;

pub use accent::{Accent, AccentMode};
pub use aggregate::{Aggregator, FeedItem, FeedMode};
pub use boundary::{ErrorBoundary, Failure, FallbackScreen};
pub use console::{Console, Flow};
pub use deferred::Deferred;
pub use emulator::{CellSize, TerminalEmulator, TranscriptEmulator, Viewport};
pub use keys::ShellAction;
pub use screen::{Screen, ScreenPane};
pub use shell::{Shell, TabKey, ALL_TAB_TITLE};
pub use surface::{Appearance, Feed, RenderSurface, SurfaceOptions, SurfacePhase};
pub use theme::{Rgb, TerminalTheme, ThemeName, ThemeTokens};
