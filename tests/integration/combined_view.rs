//! Combined ("All") view behaviour

use crate::common::{context, manual_options, service, transcript_shell};
use runz::core::settings::Settings;
use runz::protocol::Event;
use runz::window::{ansi, Accent, AccentMode, TabKey};

#[test]
fn test_build_serve_scenario() {
    let (ctx, _sink) = context(Settings::default());
    let (shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.deliver("a", r#"{"type":"running"}"#);
    let single = shell.surface(&service("a")).unwrap();
    assert!(single.is_running());
    assert!(emulators[&service("a")].raw().is_empty());

    ctx.deliver("a", r#"{"type":"output","data":"ok\n"}"#);
    assert_eq!(emulators[&service("a")].raw(), "ok\n");

    let accent = Accent::compute(AccentMode::Theme, 0, &ctx.appearance().theme.get());
    let label = ansi::label(accent, "Build");
    assert_eq!(
        emulators[&TabKey::All].state().writes,
        vec![label.clone(), label, "ok\n".to_string()]
    );
    assert!(emulators[&service("b")].raw().is_empty());
}

#[test]
fn test_blank_first_output_is_dropped_from_combined_view_only() {
    let (ctx, _sink) = context(Settings::default());
    let (_shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.backend().deliver("a", &Event::Output("\n".into()));
    assert!(emulators[&TabKey::All].raw().is_empty());
    assert_eq!(emulators[&service("a")].raw(), "\n");

    ctx.backend().deliver("a", &Event::Output("hello".into()));
    let lines = emulators[&TabKey::All].lines();
    assert_eq!(lines, vec![" Build  hello"]);

    // the other session still gets its own suppression
    ctx.backend().deliver("b", &Event::Output("  \r\n".into()));
    assert_eq!(emulators[&TabKey::All].lines(), vec![" Build  hello"]);
}

#[test]
fn test_state_transitions_render_banners() {
    let (ctx, _sink) = context(Settings::default());
    let (_shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.backend().deliver("b", &Event::Stopped);
    ctx.backend().deliver("a", &Event::Error("spawn failed".into()));

    let text = emulators[&TabKey::All].plain_text();
    assert!(text.contains(" Serve   STOPPED \n"));
    assert!(text.contains(" Build   ERROR: spawn failed \n"));
}

#[test]
fn test_sessions_interleave_in_arrival_order() {
    let (ctx, _sink) = context(Settings::default());
    let (_shell, emulators) = transcript_shell(&ctx, manual_options());

    for (id, text) in [("a", "a1\n"), ("b", "b1\n"), ("a", "a2\n"), ("b", "b2\n")] {
        ctx.backend().deliver(id, &Event::Output(text.into()));
    }

    assert_eq!(
        emulators[&TabKey::All].lines(),
        vec![" Build  a1", " Serve  b1", " Build  a2", " Serve  b2"]
    );
    assert_eq!(emulators[&service("a")].plain_text(), "a1\na2\n");
}

#[test]
fn test_accent_switch_keeps_labels() {
    let (ctx, _sink) = context(Settings::default());
    let (_shell, emulators) = transcript_shell(&ctx, manual_options());
    let all = &emulators[&TabKey::All];

    ctx.backend().deliver("a", &Event::Output("one\n".into()));
    ctx.backend().deliver("b", &Event::Output("two\n".into()));
    let before = all.lines();

    assert_eq!(ctx.toggle_sorted_colors(), AccentMode::Sorted);
    ctx.backend().deliver("a", &Event::Output("one\n".into()));
    ctx.backend().deliver("b", &Event::Output("two\n".into()));

    // switching again to the same mode changes nothing
    ctx.appearance().accent_mode.set(AccentMode::Sorted);
    ctx.backend().deliver("a", &Event::Output("one\n".into()));
    ctx.backend().deliver("b", &Event::Output("two\n".into()));

    let lines = all.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(&lines[0..2], &before[..]);
    assert_eq!(&lines[2..4], &before[..]);
    assert_eq!(&lines[4..6], &before[..]);

    let tokens = ctx.appearance().theme.get();
    let sorted_a = ansi::label(Accent::compute(AccentMode::Sorted, 0, &tokens), "Build");
    let sorted_b = ansi::label(Accent::compute(AccentMode::Sorted, 1, &tokens), "Serve");
    let raw = all.raw();
    assert_eq!(raw.matches(&sorted_a).count(), 2);
    assert_eq!(raw.matches(&sorted_b).count(), 2);
    assert_eq!(ctx.registry().len(), 2);
}

#[test]
fn test_sorted_preference_applies_at_startup() {
    let settings = Settings {
        sorted_colors: true,
        ..Settings::default()
    };
    let (ctx, _sink) = context(settings);
    let (_shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.backend().deliver("b", &Event::Output("x".into()));
    let tokens = ctx.appearance().theme.get();
    let expected = ansi::label(Accent::compute(AccentMode::Sorted, 1, &tokens), "Serve");
    assert!(emulators[&TabKey::All].raw().starts_with(&expected));
}
