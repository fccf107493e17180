//! Session and event-bus contracts as seen from outside the crate

use crate::common::context;
use parking_lot::Mutex;
use runz::core::settings::Settings;
use runz::protocol::{Command, CommandEnvelope, Event, EventKind, TermSize};
use runz::terminal::{ListenerId, SubscribeError};
use std::sync::Arc;

#[test]
fn test_subscribers_see_emission_order() {
    let (ctx, _sink) = context(Settings::default());
    let session = ctx.registry().get("a").unwrap();

    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));
    for seen in [&first, &second] {
        let seen = Arc::clone(seen);
        session
            .subscribe(ListenerId::new(), EventKind::Output, move |e| {
                if let Event::Output(text) = e {
                    seen.lock().push(text.clone());
                }
            })
            .unwrap();
    }

    let expected: Vec<String> = (0..200).map(|i| format!("line {i}\n")).collect();
    for text in &expected {
        ctx.deliver("a", &Event::Output(text.clone()).to_json());
    }

    assert_eq!(*first.lock(), expected);
    assert_eq!(*second.lock(), expected);
}

#[test]
fn test_unsubscribe_is_complete() {
    let (ctx, _sink) = context(Settings::default());
    let session = ctx.registry().get("b").unwrap();
    let calls = Arc::new(Mutex::new(0));

    let id = ListenerId::new();
    let counter = Arc::clone(&calls);
    session
        .subscribe(id, EventKind::Stopped, move |_| *counter.lock() += 1)
        .unwrap();
    assert!(session.unsubscribe(id));
    assert_eq!(session.listener_count(), 0);

    ctx.deliver("b", r#"{"type":"stopped"}"#);
    assert_eq!(*calls.lock(), 0);

    // unknown ids are a no-op
    assert!(!session.unsubscribe(id));
}

#[test]
fn test_duplicate_listener_is_rejected() {
    let (ctx, _sink) = context(Settings::default());
    let session = ctx.registry().get("a").unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let id = ListenerId::new();
    let c = Arc::clone(&calls);
    session.subscribe(id, EventKind::Running, move |_| c.lock().push("first")).unwrap();
    let c = Arc::clone(&calls);
    let second = session.subscribe(id, EventKind::Running, move |_| c.lock().push("second"));
    assert_eq!(second, Err(SubscribeError::DuplicateListener(id)));

    ctx.deliver("a", r#"{"type":"running"}"#);
    assert_eq!(*calls.lock(), vec!["first"]);
}

#[test]
fn test_commands_serialize_to_envelopes() {
    let (ctx, sink) = context(Settings::default());
    let session = ctx.registry().get("b").unwrap();

    session.start();
    session.input("q");
    session.resize(TermSize::new(132, 43));
    session.open_link("https://example.com");
    session.stop();

    assert_eq!(
        sink.envelopes(),
        vec![
            CommandEnvelope::new("b", Command::StartTerminal),
            CommandEnvelope::new("b", Command::InputTerminal("q".into())),
            CommandEnvelope::new("b", Command::ResizeTerminal(TermSize::new(132, 43))),
            CommandEnvelope::new("b", Command::OpenLink("https://example.com".into())),
            CommandEnvelope::new("b", Command::StopTerminal),
        ]
    );
    assert!(sink.messages()[2].contains(r#""payload":{"cols":132,"rows":43}"#));
}

#[test]
fn test_shutdown_disposes_sessions() {
    let (ctx, sink) = context(Settings::default());
    ctx.shutdown();
    ctx.shutdown();

    for session in ctx.registry().iter() {
        assert!(session.is_disposed());
        session.start();
    }
    assert!(sink.messages().is_empty());
    assert_eq!(ctx.backend().route_count(), 0);
}
