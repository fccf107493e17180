//! runz - Entry Point
//!
//! Console shell: every tab is drawn on this process's own terminal, one at
//! a time under a tab strip. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use runz::{
    core::{
        config::{Config, ConfigSource},
        context::AppContext,
        events::{AppEvent, EventSender},
        settings::Settings,
    },
    protocol::Command,
    pty::PtySupervisor,
    terminal::{ChannelSink, CommandSink},
    window::{keys::spawn_input_reader, Console, ErrorBoundary, Flow, Screen, ShellAction, SurfaceOptions, ThemeName},
};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, terminal,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "runz")]
#[command(version)]
#[command(about = "Run several services side by side with one combined log view")]
struct Cli {
    /// Configuration file (yaml, json, jsonc or toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Inline configuration, e.g. 'yaml|services: [{prog: top}]'
    #[arg(short, long = "raw-config", value_name = "FORMAT|DATA")]
    raw_config: Option<String>,

    /// Colour theme (overrides the saved preference)
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Accent colours from the fixed palette, by service order
    #[arg(long)]
    sorted_colors: bool,

    /// Delay between the view being ready and services being started
    #[arg(long, value_name = "MS", default_value_t = 0)]
    start_delay: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for ThemeName {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => ThemeName::Dark,
            ThemeArg::Light => ThemeName::Light,
        }
    }
}

fn main() -> Result<()> {
    // stdout belongs to the combined view
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runz=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&ConfigSource {
        raw: cli.raw_config,
        path: cli.config,
    })
    .context("Failed to load configuration")?;
    info!("Starting {} with {} services", config.name, config.services.len());

    let settings_path = match Settings::settings_path() {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Preferences will not be saved: {:#}", e);
            None
        }
    };
    let mut settings = settings_path
        .as_deref()
        .map(|path| {
            Settings::load_from(path).unwrap_or_else(|e| {
                warn!("Ignoring unreadable preferences: {:#}", e);
                Settings::default()
            })
        })
        .unwrap_or_default();
    if let Some(theme) = cli.theme {
        settings.theme = theme.into();
    }
    if cli.sorted_colors {
        settings.sorted_colors = true;
    }

    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<String>();
    let sink: Arc<dyn CommandSink> = Arc::new(ChannelSink::new(command_tx));
    let mut ctx = AppContext::new(config, sink, settings);
    if let Some(path) = settings_path {
        ctx = ctx.with_settings_path(path);
    }

    let (events, mut event_rx) = EventSender::channel();
    let supervisor = PtySupervisor::new(ctx.config(), events.clone());
    watch_signals(events.clone());

    let raw_mode = RawMode::enable();
    if raw_mode.is_some() {
        if let Err(e) = spawn_input_reader(events.clone()) {
            warn!("Keyboard input unavailable: {}", e);
        }
    }

    let options = SurfaceOptions {
        start_delay: Duration::from_millis(cli.start_delay),
        failures: Some(events),
        ..SurfaceOptions::default()
    };

    let screen = Screen::stdout();
    let mut boundary = ErrorBoundary::new();
    let mut console = boundary.guard(|| build_console(&ctx, &options, &screen));

    loop {
        tokio::select! {
            Some(message) = command_rx.recv() => supervisor.handle_message(&message),
            Some(event) = event_rx.recv() => match event {
                AppEvent::Backend { id, payload } => {
                    if console.is_some() {
                        boundary.guard(|| ctx.deliver(&id, &payload));
                    }
                }
                AppEvent::Action(action) => {
                    if let Some(active) = console.as_mut() {
                        if boundary.guard(|| active.apply(&ctx, action)) == Some(Flow::Quit) {
                            break;
                        }
                    } else {
                        match action {
                            ShellAction::Quit => break,
                            ShellAction::Input(data) if data == "\x03" => break,
                            ShellAction::Input(data) if data == "r" => {
                                if boundary.reload() {
                                    console = boundary.guard(|| build_console(&ctx, &options, &screen));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                AppEvent::Resized => {
                    if let (Some(active), Some(viewport)) = (&console, Screen::host_viewport()) {
                        boundary.guard(|| active.on_window_resize(viewport));
                    }
                }
                AppEvent::Failed(failure) => boundary.report(failure),
                AppEvent::Reload => {
                    if boundary.reload() {
                        console = boundary.guard(|| build_console(&ctx, &options, &screen));
                    }
                }
                AppEvent::Window(Command::CloseWindow) | AppEvent::Quit => break,
                AppEvent::Window(command) => debug!("Ignoring {:?} without a window", command),
            },
            else => break,
        }

        if boundary.is_tripped() {
            if let Some(mut failed) = console.take() {
                failed.dispose();
                show_fallback(&boundary, &screen);
            }
        }
    }

    info!("Shutting down");
    match console {
        Some(mut console) => console.dispose(),
        None => screen.release(),
    }
    ctx.shutdown();
    supervisor.shutdown();
    Ok(())
}

/// Tabs for every service plus the combined view, drawn on `screen`
fn build_console(ctx: &AppContext, options: &SurfaceOptions, screen: &Screen) -> Console {
    let console = Console::new(ctx, options.clone(), screen.clone());
    console.ready(Screen::host_viewport());
    console
}

fn show_fallback(boundary: &ErrorBoundary, screen: &Screen) {
    let Some(fallback) = boundary.fallback_screen() else {
        return;
    };
    let mut text = fallback.lines().join("\r\n");
    text.push_str("\r\n\r\n(press r to reload, Ctrl+q to quit)\r\n");
    screen.print(&text);
}

/// Raw keyboard mode on the controlling terminal, restored on drop
struct RawMode;

impl RawMode {
    /// Only when both ends are a terminal; piped runs keep line mode
    fn enable() -> Option<Self> {
        if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
            return None;
        }
        if let Err(e) = terminal::enable_raw_mode() {
            warn!("Failed to enable raw mode: {}", e);
            return None;
        }
        if let Err(e) = execute!(std::io::stdout(), EnableBracketedPaste) {
            debug!("Bracketed paste unavailable: {}", e);
        }
        Some(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), DisableBracketedPaste);
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Forward OS signals to the main loop
fn watch_signals(events: EventSender) {
    let quit = events.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                quit.send(AppEvent::Quit);
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        for (kind, event) in [
            (SignalKind::window_change(), AppEvent::Resized),
            (SignalKind::terminate(), AppEvent::Quit),
            (SignalKind::hangup(), AppEvent::Reload),
        ] {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to install signal handler: {}", e);
                    continue;
                }
            };
            let events = events.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if !events.send(event.clone()) {
                        break;
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    drop(events);
}
