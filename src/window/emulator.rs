//! Terminal emulator seam
//!
//! A render surface drives one [`TerminalEmulator`]. [`TranscriptEmulator`]
//! keeps everything in memory; the console panes in `screen` share the
//! process's own terminal.

use super::theme::TerminalTheme;
use crate::protocol::TermSize;
use parking_lot::Mutex;
use std::sync::Arc;
use vte::{Parser, Perform};

/// Space available to a surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Grid that fits in this viewport, or `None` when nothing is laid out
    pub fn grid(&self, cell: CellSize) -> Option<TermSize> {
        if self.width <= 0.0 || self.height <= 0.0 || cell.width <= 0.0 || cell.height <= 0.0 {
            return None;
        }
        let cols = (self.width / cell.width).floor().clamp(2.0, u16::MAX as f32) as u16;
        let rows = (self.height / cell.height).floor().clamp(1.0, u16::MAX as f32) as u16;
        Some(TermSize::new(cols, rows))
    }
}

/// Pixel size of one character cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    /// Cells measured in cells, for character-grid hosts
    pub const UNIT: CellSize = CellSize {
        width: 1.0,
        height: 1.0,
    };
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: 9.0,
            height: 18.0,
        }
    }
}

/// Rendering primitive bound to one surface
pub trait TerminalEmulator: Send {
    /// Attach to the host
    fn open(&mut self);

    fn write(&mut self, data: &str);

    fn writeln(&mut self, data: &str) {
        self.write(data);
        self.write("\r\n");
    }

    /// Replace the colour palette in place
    fn set_theme(&mut self, theme: &TerminalTheme);

    fn set_input_enabled(&mut self, enabled: bool);

    fn set_cursor_blink(&mut self, blink: bool);

    fn cell_size(&self) -> CellSize;

    fn size(&self) -> TermSize;

    fn resize(&mut self, size: TermSize);

    /// Release the instance; no further calls are made afterwards
    fn dispose(&mut self);

    /// Recompute rows/cols for `viewport`. Returns the new size if it changed.
    fn fit(&mut self, viewport: Viewport) -> Option<TermSize> {
        let proposed = viewport.grid(self.cell_size())?;
        if proposed == self.size() {
            return None;
        }
        self.resize(proposed);
        Some(proposed)
    }
}

// ── In-memory transcript ───────────────────────────────────────────

/// Observable state of a [`TranscriptEmulator`]
#[derive(Debug, Clone, Default)]
pub struct TranscriptState {
    /// Every byte written, escape sequences included
    pub raw: String,
    /// One entry per write call (`writeln` appends its line break separately)
    pub writes: Vec<String>,
    pub size: TermSize,
    pub theme: Option<TerminalTheme>,
    pub theme_changes: usize,
    pub input_enabled: bool,
    pub cursor_blink: bool,
    pub opened: bool,
    pub disposed: bool,
    pub resizes: Vec<TermSize>,
}

/// Emulator that records its output in memory.
///
/// Clones share the same state, so a host can keep a handle for inspection
/// after boxing the emulator into a surface.
#[derive(Debug, Clone)]
pub struct TranscriptEmulator {
    state: Arc<Mutex<TranscriptState>>,
    cell: CellSize,
}

impl TranscriptEmulator {
    pub fn new() -> Self {
        Self::with_cell_size(CellSize::default())
    }

    pub fn with_cell_size(cell: CellSize) -> Self {
        Self {
            state: Arc::new(Mutex::new(TranscriptState {
                input_enabled: true,
                ..TranscriptState::default()
            })),
            cell,
        }
    }

    pub fn state(&self) -> TranscriptState {
        self.state.lock().clone()
    }

    pub fn raw(&self) -> String {
        self.state.lock().raw.clone()
    }

    /// Output with escape sequences removed and `\r\n` folded to `\n`
    pub fn plain_text(&self) -> String {
        strip_ansi(&self.state.lock().raw)
    }

    /// Non-empty plain-text lines
    pub fn lines(&self) -> Vec<String> {
        self.plain_text()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for TranscriptEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalEmulator for TranscriptEmulator {
    fn open(&mut self) {
        self.state.lock().opened = true;
    }

    fn write(&mut self, data: &str) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.raw.push_str(data);
        state.writes.push(data.to_string());
    }

    fn set_theme(&mut self, theme: &TerminalTheme) {
        let mut state = self.state.lock();
        state.theme = Some(*theme);
        state.theme_changes += 1;
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.state.lock().input_enabled = enabled;
    }

    fn set_cursor_blink(&mut self, blink: bool) {
        self.state.lock().cursor_blink = blink;
    }

    fn cell_size(&self) -> CellSize {
        self.cell
    }

    fn size(&self) -> TermSize {
        self.state.lock().size
    }

    fn resize(&mut self, size: TermSize) {
        let mut state = self.state.lock();
        state.size = size;
        state.resizes.push(size);
    }

    fn dispose(&mut self) {
        self.state.lock().disposed = true;
    }
}

// ── ANSI stripping ─────────────────────────────────────────────────

struct PlainText<'a> {
    out: &'a mut String,
}

impl Perform for PlainText<'_> {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.out.push('\n'),
            b'\t' => self.out.push('\t'),
            _ => {}
        }
    }
}

/// Remove escape sequences and control characters other than `\n` and `\t`
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut parser = Parser::new();
    let mut performer = PlainText { out: &mut out };
    for byte in input.as_bytes() {
        parser.advance(&mut performer, *byte);
    }
    out
}
