//! Shared fixtures

use runz::core::config::{Config, ServiceConfig};
use runz::core::context::AppContext;
use runz::core::settings::Settings;
use runz::terminal::RecordingSink;
use runz::window::{Shell, SurfaceOptions, TabKey, TranscriptEmulator};
use std::collections::HashMap;
use std::sync::Arc;

/// Two services: `a` ("Build") and `b` ("Serve")
pub fn build_serve_config() -> Config {
    Config::new(
        "test",
        vec![
            ServiceConfig::new("a", "make").with_name("Build"),
            ServiceConfig::new("b", "serve").with_name("Serve"),
        ],
    )
    .unwrap()
}

pub fn context(settings: Settings) -> (AppContext, RecordingSink) {
    let sink = RecordingSink::new();
    let ctx = AppContext::new(build_serve_config(), Arc::new(sink.clone()), settings);
    (ctx, sink)
}

/// Surfaces that only start sessions when told to
pub fn manual_options() -> SurfaceOptions {
    SurfaceOptions {
        autostart: false,
        ..SurfaceOptions::default()
    }
}

/// Shell whose every tab renders into an inspectable transcript
pub fn transcript_shell(
    ctx: &AppContext,
    options: SurfaceOptions,
) -> (Shell, HashMap<TabKey, TranscriptEmulator>) {
    let mut emulators = HashMap::new();
    let shell = Shell::new(ctx, options, |key| {
        let emulator = TranscriptEmulator::new();
        emulators.insert(key.clone(), emulator.clone());
        Box::new(emulator)
    });
    (shell, emulators)
}

pub fn service(id: &str) -> TabKey {
    TabKey::Service(id.to_string())
}
