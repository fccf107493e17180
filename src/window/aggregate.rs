//! Combined-view aggregation and per-event rendering
//!
//! The aggregator merges several sessions' streams into one attributed feed.
//! Items keep arrival order; every item carries its own source id so no
//! cross-session ordering is imposed. Rendering turns an item (or, for a
//! single-session view, a raw event) into emulator writes.

use super::accent::Accent;
use super::ansi;
use crate::protocol::{Event, EventKind};
use crate::terminal::SessionId;
use std::collections::HashSet;

/// Whether a feed shows one session or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Single,
    Aggregated,
}

/// One unit of the combined feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub source: SessionId,
    pub kind: EventKind,
    pub payload: Option<String>,
}

/// A write to the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draw {
    /// Raw text, written as-is
    Text(String),
    /// Text followed by a line break
    Line(String),
}

/// Result of rendering one event in a single-session view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub draws: Vec<Draw>,
    /// New value of the surface's running flag, if the event changes it
    pub running: Option<bool>,
}

/// Aggregation state for one combined surface
#[derive(Debug, Default)]
pub struct Aggregator {
    /// Sessions that already produced non-blank output
    seen_output: HashSet<SessionId>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn an event into a feed item, or drop it.
    ///
    /// Until a session has produced real output, blank output from it
    /// (whitespace only) is suppressed.
    pub fn accept(&mut self, source: &str, event: &Event) -> Option<FeedItem> {
        if let Event::Output(text) = event {
            if !self.seen_output.contains(source) {
                if text.trim().is_empty() {
                    return None;
                }
                self.seen_output.insert(source.to_string());
            }
        }

        Some(FeedItem {
            source: source.to_string(),
            kind: event.kind(),
            payload: event.data().map(str::to_string),
        })
    }

    pub fn has_seen_output(&self, source: &str) -> bool {
        self.seen_output.contains(source)
    }

    /// Forget every session's history (surface recreated)
    pub fn reset(&mut self) {
        self.seen_output.clear();
    }
}

/// Render a combined-feed item with its source label
pub fn render_item(item: &FeedItem, name: &str, accent: Accent) -> Vec<Draw> {
    let label = Draw::Text(ansi::label(accent, name));
    match item.kind {
        EventKind::Output => vec![label, Draw::Text(item.payload.clone().unwrap_or_default())],
        EventKind::Running => vec![label],
        EventKind::Stopped => vec![label, Draw::Line(ansi::stopped_banner(accent))],
        EventKind::Error => vec![
            label,
            Draw::Line(ansi::error_banner(accent, item.payload.as_deref().unwrap_or_default())),
        ],
    }
}

/// Render an event for a single-session view
pub fn render_single(event: &Event, accent: Accent) -> Rendered {
    match event {
        Event::Output(text) => Rendered {
            draws: vec![Draw::Text(text.clone())],
            running: None,
        },
        Event::Running => Rendered {
            draws: Vec::new(),
            running: Some(true),
        },
        Event::Stopped => Rendered {
            draws: vec![Draw::Line(ansi::stopped_banner(accent))],
            running: Some(false),
        },
        Event::Error(message) => Rendered {
            draws: vec![Draw::Line(ansi::error_banner(accent, message))],
            running: Some(false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::theme::Rgb;

    const ACCENT: Accent = Accent {
        bg: Rgb(10, 20, 30),
        fg: Rgb::WHITE,
    };

    #[test]
    fn test_blank_first_output_is_suppressed() {
        let mut aggregator = Aggregator::new();
        assert_eq!(aggregator.accept("a", &Event::Output("\n".into())), None);
        assert_eq!(aggregator.accept("a", &Event::Output("  \r\n".into())), None);

        let item = aggregator.accept("a", &Event::Output("hello".into())).unwrap();
        assert_eq!(item.source, "a");
        assert_eq!(item.payload.as_deref(), Some("hello"));

        // once real output was seen, blank output passes through
        assert!(aggregator.accept("a", &Event::Output("\n".into())).is_some());
    }

    #[test]
    fn test_suppression_is_per_session() {
        let mut aggregator = Aggregator::new();
        aggregator.accept("a", &Event::Output("x".into()));
        assert!(aggregator.has_seen_output("a"));
        assert!(!aggregator.has_seen_output("b"));
        assert_eq!(aggregator.accept("b", &Event::Output("".into())), None);
    }

    #[test]
    fn test_state_events_are_not_suppressed() {
        let mut aggregator = Aggregator::new();
        let item = aggregator.accept("a", &Event::Running).unwrap();
        assert_eq!(item.kind, EventKind::Running);
        assert!(!aggregator.has_seen_output("a"));
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut aggregator = Aggregator::new();
        aggregator.accept("a", &Event::Output("x".into()));
        aggregator.reset();
        assert_eq!(aggregator.accept("a", &Event::Output("\n".into())), None);
    }

    #[test]
    fn test_render_item_output_is_labeled() {
        let item = FeedItem {
            source: "a".into(),
            kind: EventKind::Output,
            payload: Some("ok\n".into()),
        };
        let draws = render_item(&item, "Build", ACCENT);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0], Draw::Text(ansi::label(ACCENT, "Build")));
        assert_eq!(draws[1], Draw::Text("ok\n".into()));
    }

    #[test]
    fn test_render_item_running_is_label_only() {
        let item = FeedItem {
            source: "a".into(),
            kind: EventKind::Running,
            payload: None,
        };
        assert_eq!(render_item(&item, "Build", ACCENT), vec![Draw::Text(ansi::label(ACCENT, "Build"))]);
    }

    #[test]
    fn test_render_item_error_banner() {
        let item = FeedItem {
            source: "a".into(),
            kind: EventKind::Error,
            payload: Some("spawn failed".into()),
        };
        let draws = render_item(&item, "Build", ACCENT);
        assert_eq!(draws[1], Draw::Line(ansi::error_banner(ACCENT, "spawn failed")));
    }

    #[test]
    fn test_render_single() {
        let running = render_single(&Event::Running, ACCENT);
        assert!(running.draws.is_empty());
        assert_eq!(running.running, Some(true));

        let stopped = render_single(&Event::Stopped, ACCENT);
        assert_eq!(stopped.draws, vec![Draw::Line(ansi::stopped_banner(ACCENT))]);
        assert_eq!(stopped.running, Some(false));

        let output = render_single(&Event::Output("\n".into()), ACCENT);
        assert_eq!(output.draws, vec![Draw::Text("\n".into())]);
        assert_eq!(output.running, None);

        assert_eq!(render_single(&Event::Error("e".into()), ACCENT).running, Some(false));
    }
}
