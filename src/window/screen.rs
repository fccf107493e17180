//! The process's own terminal, shared by every tab
//!
//! Each tab renders into a [`ScreenPane`]. Panes always keep a bounded
//! scrollback; only the pane currently shown also writes through to the
//! terminal. Row 1 is a header line, output scrolls below it.

use super::emulator::{CellSize, TerminalEmulator, Viewport};
use super::theme::TerminalTheme;
use crate::protocol::TermSize;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

/// Bytes of output kept per pane for replay when it is shown again
pub const SCROLLBACK_LIMIT: usize = 256 * 1024;

/// Rows taken by the header line
const HEADER_ROWS: u16 = 1;

struct ScreenInner {
    out: Box<dyn Write + Send>,
    shown: Option<usize>,
    next_pane: usize,
    rows: u16,
}

impl ScreenInner {
    fn emit(&mut self, data: &str) {
        if let Err(e) = self.out.write_all(data.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

/// Handle to the controlling terminal; clones share it
#[derive(Clone)]
pub struct Screen {
    inner: Arc<Mutex<ScreenInner>>,
}

impl Screen {
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScreenInner {
                out: Box::new(out),
                shown: None,
                next_pane: 0,
                rows: TermSize::default().rows + HEADER_ROWS,
            })),
        }
    }

    /// Space below the header line of the controlling terminal, in cells
    pub fn host_viewport() -> Option<Viewport> {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => Some(Viewport::new(
                cols as f32,
                rows.saturating_sub(HEADER_ROWS).max(1) as f32,
            )),
            Err(e) => {
                warn!("Failed to query terminal size: {}", e);
                None
            }
        }
    }

    /// New pane on this screen, not shown yet
    pub fn pane(&self) -> ScreenPane {
        let mut inner = self.inner.lock();
        let id = inner.next_pane;
        inner.next_pane += 1;
        ScreenPane {
            id,
            screen: self.clone(),
            state: Arc::new(Mutex::new(PaneState {
                scrollback: String::new(),
                size: TermSize::default(),
                disposed: false,
            })),
        }
    }

    /// Put `pane` on screen: clear, draw `header`, replay the pane's
    /// scrollback and let its further output through.
    pub fn show(&self, pane: &ScreenPane, header: &str) {
        let scrollback = pane.scrollback();

        let mut inner = self.inner.lock();
        inner.shown = Some(pane.id);
        let rows = inner.rows;
        // reset attributes, clear, confine scrolling below the header
        inner.emit(&format!("\x1b[0m\x1b[2J\x1b[{};{}r", HEADER_ROWS + 1, rows));
        inner.emit(&format!("\x1b[1;1H\x1b[2K{}\x1b[0m\x1b[{};1H", header, HEADER_ROWS + 1));
        inner.emit(&scrollback);
    }

    /// Height of the area below the header, taken from the host viewport
    pub fn set_content_rows(&self, rows: u16) {
        self.inner.lock().rows = rows.max(1).saturating_add(HEADER_ROWS);
    }

    /// Detach every pane and write `text` on a cleared screen
    pub fn print(&self, text: &str) {
        let mut inner = self.inner.lock();
        inner.shown = None;
        inner.emit("\x1b[0m\x1b[r\x1b[2J\x1b[1;1H");
        inner.emit(text);
    }

    /// Give the terminal back: no pane shown, scroll region and attributes reset
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        inner.shown = None;
        inner.emit("\x1b[0m\x1b[r\r\n");
    }

    fn write_if_shown(&self, pane: usize, data: &str) {
        let mut inner = self.inner.lock();
        if inner.shown == Some(pane) {
            inner.emit(data);
        }
    }

    fn is_shown(&self, pane: usize) -> bool {
        self.inner.lock().shown == Some(pane)
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Screen")
            .field("shown", &inner.shown)
            .field("rows", &inner.rows)
            .finish()
    }
}

struct PaneState {
    scrollback: String,
    size: TermSize,
    disposed: bool,
}

/// Emulator for one tab of the console.
///
/// The host terminal does the actual emulation; the pane tracks the grid size
/// so fits can be reported to sessions. Clones share state.
#[derive(Clone)]
pub struct ScreenPane {
    id: usize,
    screen: Screen,
    state: Arc<Mutex<PaneState>>,
}

impl ScreenPane {
    pub fn is_shown(&self) -> bool {
        self.screen.is_shown(self.id)
    }

    pub fn scrollback(&self) -> String {
        self.state.lock().scrollback.clone()
    }
}

impl std::fmt::Debug for ScreenPane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenPane").field("id", &self.id).finish()
    }
}

impl TerminalEmulator for ScreenPane {
    fn open(&mut self) {}

    fn write(&mut self, data: &str) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.scrollback.push_str(data);
            trim_front(&mut state.scrollback, SCROLLBACK_LIMIT);
        }
        self.screen.write_if_shown(self.id, data);
    }

    fn set_theme(&mut self, _theme: &TerminalTheme) {
        // the host terminal keeps its own palette
    }

    fn set_input_enabled(&mut self, _enabled: bool) {
        // keys are read by the console, not by the pane
    }

    fn set_cursor_blink(&mut self, _blink: bool) {}

    fn cell_size(&self) -> CellSize {
        CellSize::UNIT
    }

    fn size(&self) -> TermSize {
        self.state.lock().size
    }

    fn resize(&mut self, size: TermSize) {
        self.state.lock().size = size;
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock();
        state.disposed = true;
        state.scrollback.clear();
    }
}

/// Drop whole lines from the front until `buf` is at most `limit` bytes
fn trim_front(buf: &mut String, limit: usize) {
    if buf.len() <= limit {
        return;
    }
    let mut start = buf.len() - limit;
    while !buf.is_char_boundary(start) {
        start += 1;
    }
    let cut = match buf[start..].find('\n') {
        Some(offset) => start + offset + 1,
        None => start,
    };
    buf.drain(..cut);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writer whose output stays readable after being boxed into a screen
    #[derive(Clone, Default)]
    pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }

        pub(crate) fn clear(&self) {
            self.0.lock().clear();
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_only_shown_pane_reaches_terminal() {
        let capture = Capture::default();
        let screen = Screen::with_writer(capture.clone());
        let mut first = screen.pane();
        let mut second = screen.pane();

        screen.show(&first, "header");
        first.write("one\r\n");
        second.write("two\r\n");

        assert!(capture.text().ends_with("one\r\n"));
        assert!(!capture.text().contains("two"));
        assert!(first.is_shown());
        assert!(!second.is_shown());
        assert_eq!(second.scrollback(), "two\r\n");
    }

    #[test]
    fn test_show_replays_scrollback_under_header() {
        let capture = Capture::default();
        let screen = Screen::with_writer(capture.clone());
        let first = screen.pane();
        let mut second = screen.pane();
        screen.set_content_rows(30);

        screen.show(&first, "header");
        second.write("earlier\r\n");
        capture.clear();

        screen.show(&second, "[Serve]");
        let text = capture.text();
        assert!(text.contains("\x1b[2;31r"));
        assert!(text.contains("[Serve]"));
        assert!(text.ends_with("earlier\r\n"));
        assert!(!first.is_shown());
    }

    #[test]
    fn test_disposed_pane_stays_silent() {
        let capture = Capture::default();
        let screen = Screen::with_writer(capture.clone());
        let mut pane = screen.pane();
        screen.show(&pane, "h");
        pane.dispose();
        capture.clear();

        pane.write("late");
        assert!(capture.text().is_empty());
        assert!(pane.scrollback().is_empty());
    }

    #[test]
    fn test_print_detaches_panes() {
        let capture = Capture::default();
        let screen = Screen::with_writer(capture.clone());
        let mut pane = screen.pane();
        screen.show(&pane, "h");

        screen.print("Uh oh!\r\n");
        pane.write("more");
        assert!(capture.text().ends_with("Uh oh!\r\n"));
        assert!(!pane.is_shown());
    }

    #[test]
    fn test_trim_front_keeps_whole_lines() {
        let mut buf = "aaaa\nbbbb\ncccc\n".to_string();
        trim_front(&mut buf, 8);
        assert_eq!(buf, "cccc\n");

        let mut long = "é".repeat(10);
        trim_front(&mut long, 5);
        assert!(long.len() <= 6);
        assert!(long.chars().all(|c| c == 'é'));
    }
}
