//! Surface lifecycle: start sequencing, cancellation, resize and theme sync

use crate::common::{context, manual_options, service, transcript_shell};
use runz::core::settings::Settings;
use runz::protocol::{Command, Event, TermSize};
use runz::window::{
    ErrorBoundary, Feed, RenderSurface, SurfaceOptions, SurfacePhase, TabKey, TerminalTheme, ThemeName,
    TranscriptEmulator, Viewport,
};
use std::sync::Arc;
use std::time::Duration;

fn start_commands(sink: &runz::terminal::RecordingSink) -> Vec<String> {
    sink.envelopes()
        .into_iter()
        .filter(|e| e.event == Command::StartTerminal)
        .map(|e| e.id)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_dispose_before_delayed_start_sends_nothing() {
    let (ctx, sink) = context(Settings::default());
    let session = Arc::clone(ctx.registry().get("a").unwrap());
    let surface = RenderSurface::new(
        Feed::Single(session),
        Box::new(TranscriptEmulator::new()),
        ctx.appearance(),
        SurfaceOptions {
            start_delay: Duration::from_millis(500),
            ..SurfaceOptions::default()
        },
    );
    surface.mount();
    surface.mark_ready(None);
    assert!(surface.start_pending());

    surface.dispose();
    assert!(!surface.start_pending());

    tokio::time::sleep(Duration::from_millis(500)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(sink.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_surface_starts_its_sessions_once_ready() {
    let (ctx, sink) = context(Settings::default());
    let (shell, _emulators) = transcript_shell(
        &ctx,
        SurfaceOptions {
            start_delay: Duration::from_millis(500),
            ..SurfaceOptions::default()
        },
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(sink.messages().is_empty());

    shell.ready(Some(Viewport::new(720.0, 432.0)));
    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(start_commands(&sink).is_empty());

    tokio::time::sleep(Duration::from_millis(2)).await;
    let mut started = start_commands(&sink);
    started.sort();
    // per-service tabs plus the combined tab
    assert_eq!(started, vec!["a", "a", "b", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_shell_dispose_cancels_all_pending_starts() {
    let (ctx, sink) = context(Settings::default());
    let (mut shell, _emulators) = transcript_shell(
        &ctx,
        SurfaceOptions {
            start_delay: Duration::from_millis(500),
            ..SurfaceOptions::default()
        },
    );
    shell.ready(None);
    shell.dispose();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(sink.messages().is_empty());
    for session in ctx.registry().iter() {
        assert_eq!(session.listener_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_resize_refits_visible_tab_after_debounce() {
    let (ctx, sink) = context(Settings::default());
    let (mut shell, emulators) = transcript_shell(&ctx, manual_options());
    shell.select(&service("b"));

    shell.on_window_resize(Viewport::new(450.0, 360.0));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shell.on_window_resize(Viewport::new(900.0, 360.0));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(emulators[&service("b")].state().resizes.is_empty());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(emulators[&service("b")].state().size, TermSize::new(100, 20));
    assert_eq!(emulators[&TabKey::All].state().resizes, Vec::<TermSize>::new());
    assert!(emulators[&service("a")].state().resizes.is_empty());

    let resizes: Vec<_> = sink
        .envelopes()
        .into_iter()
        .filter(|e| matches!(e.event, Command::ResizeTerminal(_)))
        .collect();
    assert_eq!(resizes.len(), 1);
    assert_eq!(resizes[0].id, "b");

    // the hidden tab catches up as soon as it is shown
    shell.select(&service("a"));
    assert_eq!(emulators[&service("a")].state().size, TermSize::new(100, 20));
}

#[test]
fn test_theme_change_resyncs_without_recreating_emulators() {
    let (ctx, _sink) = context(Settings::default());
    let (shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.backend().deliver("a", &Event::Output("before\n".into()));
    ctx.set_theme(ThemeName::Light);
    ctx.backend().deliver("a", &Event::Output("after\n".into()));

    let light = TerminalTheme::from_tokens(&ThemeName::Light.tokens());
    for emulator in emulators.values() {
        let state = emulator.state();
        assert_eq!(state.theme, Some(light));
        assert_eq!(state.theme_changes, 2);
        assert!(!state.disposed);
    }
    assert_eq!(emulators[&service("a")].plain_text(), "before\nafter\n");
    assert_eq!(shell.active().map(|s| s.phase()), Some(SurfacePhase::Mounted));
}

#[test]
fn test_stopped_reenables_input_on_service_tab() {
    let (ctx, sink) = context(Settings::default());
    let (mut shell, emulators) = transcript_shell(&ctx, manual_options());
    shell.select(&service("a"));

    ctx.deliver("a", r#"{"type":"running"}"#);
    assert!(shell.active().is_some_and(|s| !s.input_enabled()));
    assert!(!shell.handle_input("ignored"));
    assert_eq!(emulators[&service("a")].plain_text().matches("STOPPED").count(), 0);

    ctx.deliver("a", r#"{"type":"stopped"}"#);
    assert!(shell.active().is_some_and(|s| s.input_enabled()));
    assert_eq!(emulators[&service("a")].plain_text().matches("STOPPED").count(), 1);

    assert!(shell.handle_input("make\r"));
    assert_eq!(
        sink.envelopes().last().map(|e| e.event.clone()),
        Some(Command::InputTerminal("make\r".into()))
    );
}

#[test]
fn test_malformed_backend_messages_leave_state_alone() {
    let (ctx, _sink) = context(Settings::default());
    let (shell, emulators) = transcript_shell(&ctx, manual_options());

    ctx.deliver("a", r#"{"type":"running"}"#);
    ctx.deliver("a", "garbage");
    ctx.deliver("a", r#"{"type":"bogus"}"#);
    ctx.deliver("nobody", r#"{"type":"stopped"}"#);

    assert!(shell.surface(&service("a")).unwrap().is_running());
    assert!(emulators[&service("a")].raw().is_empty());
}

#[test]
fn test_boundary_rebuilds_shell_after_reload() {
    let (ctx, _sink) = context(Settings::default());
    let mut boundary = ErrorBoundary::new();

    let shell = boundary.guard(|| {
        let (shell, _) = transcript_shell(&ctx, manual_options());
        shell
    });
    assert!(shell.is_some());

    let failed: Option<()> = boundary.guard(|| panic!("render failure"));
    assert!(failed.is_none());
    let mut shell = shell.unwrap();
    shell.dispose();
    assert!(boundary.fallback_screen().is_some());

    assert!(boundary.reload());
    let rebuilt = boundary.guard(|| transcript_shell(&ctx, manual_options()));
    let (rebuilt, emulators) = rebuilt.unwrap();
    ctx.backend().deliver("b", &Event::Output("back\n".into()));
    assert_eq!(emulators[&service("b")].plain_text(), "back\n");
    assert_eq!(rebuilt.len(), 3);
}
