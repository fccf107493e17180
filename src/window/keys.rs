//! Keyboard handling for the console shell
//!
//! Shell bindings use Alt (and Ctrl+Q); every other key is encoded as the
//! byte sequence a terminal would send and handed to the visible tab.

use crate::core::events::{AppEvent, EventSender};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Something the user asked the shell to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    /// Show the tab at this position (0-based)
    Select(usize),
    /// Show the combined tab
    SelectAll,
    NextTab,
    PreviousTab,
    /// Start/stop button of the visible tab
    ToggleRunning,
    /// Switch between theme-derived and sorted accent colours
    ToggleSortedColors,
    Quit,
    /// Keystrokes or pasted text for the visible tab
    Input(String),
}

/// Key hints shown in the header line
pub const KEY_HINTS: &str = "Alt+1..9/0 tab  Alt+←/→ cycle  Alt+s start/stop  Alt+c colours  Ctrl+q quit";

/// Map a terminal event to a shell action
pub fn action_for(event: &Event) -> Option<ShellAction> {
    match event {
        Event::Key(key) => action_for_key(key),
        Event::Paste(text) => Some(ShellAction::Input(text.clone())),
        _ => None,
    }
}

fn action_for_key(key: &KeyEvent) -> Option<ShellAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let mods = key.modifiers;
    if mods == KeyModifiers::ALT {
        match key.code {
            KeyCode::Char('0') => return Some(ShellAction::SelectAll),
            KeyCode::Char(c @ '1'..='9') => return Some(ShellAction::Select(c as usize - '1' as usize)),
            KeyCode::Right => return Some(ShellAction::NextTab),
            KeyCode::Left => return Some(ShellAction::PreviousTab),
            KeyCode::Char('s') => return Some(ShellAction::ToggleRunning),
            KeyCode::Char('c') => return Some(ShellAction::ToggleSortedColors),
            _ => {}
        }
    }
    if mods == KeyModifiers::CONTROL && key.code == KeyCode::Char('q') {
        return Some(ShellAction::Quit);
    }

    encode_key(key).map(ShellAction::Input)
}

/// Bytes an xterm-compatible terminal sends for `key`
pub fn encode_key(key: &KeyEvent) -> Option<String> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let base = match key.code {
        KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
            c @ 'a'..='z' => ((c as u8 - b'a' + 1) as char).to_string(),
            ' ' | '@' => "\x00".to_string(),
            '[' => "\x1b".to_string(),
            '\\' => "\x1c".to_string(),
            ']' => "\x1d".to_string(),
            _ => return None,
        },
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".to_string(),
        KeyCode::Backspace => "\x7f".to_string(),
        KeyCode::Tab => "\t".to_string(),
        KeyCode::BackTab => "\x1b[Z".to_string(),
        KeyCode::Esc => "\x1b".to_string(),
        KeyCode::Up => "\x1b[A".to_string(),
        KeyCode::Down => "\x1b[B".to_string(),
        KeyCode::Right => "\x1b[C".to_string(),
        KeyCode::Left => "\x1b[D".to_string(),
        KeyCode::Home => "\x1b[H".to_string(),
        KeyCode::End => "\x1b[F".to_string(),
        KeyCode::PageUp => "\x1b[5~".to_string(),
        KeyCode::PageDown => "\x1b[6~".to_string(),
        KeyCode::Insert => "\x1b[2~".to_string(),
        KeyCode::Delete => "\x1b[3~".to_string(),
        KeyCode::F(n) => function_key(n)?.to_string(),
        _ => return None,
    };

    if alt {
        Some(format!("\x1b{}", base))
    } else {
        Some(base)
    }
}

fn function_key(n: u8) -> Option<&'static str> {
    Some(match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    })
}

/// Read terminal events on a dedicated thread and post them to the main loop.
///
/// The thread ends when the loop is gone or the terminal stops delivering
/// events.
pub fn spawn_input_reader(events: EventSender) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("runz-input".to_string())
        .spawn(move || loop {
            let event = match crossterm::event::read() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Stopped reading terminal input: {}", e);
                    break;
                }
            };

            let delivered = match event {
                Event::Resize(..) => events.send(AppEvent::Resized),
                other => match action_for(&other) {
                    Some(action) => events.send(AppEvent::Action(action)),
                    None => true,
                },
            };
            if !delivered {
                debug!("Input reader exiting");
                break;
            }
        })
}
