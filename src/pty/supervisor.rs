//! PTY supervisor: the backend side of the command protocol
//!
//! Consumes serialized command envelopes, runs each configured service in
//! its own PTY, and reports what happens as inbound event envelopes posted to
//! the main loop.

use crate::core::config::{Config, ServiceConfig};
use crate::core::events::{AppEvent, EventSender};
use crate::protocol::{Command, CommandEnvelope, Event, TermSize};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Initial PTY size; the UI resizes once its surface is fitted
const INITIAL_SIZE: TermSize = TermSize::new(80, 24);

const READ_BUFFER_SIZE: usize = 4096;

/// One running service
struct PtyProcess {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    /// Distinguishes successive runs of the same service
    generation: u64,
}

type ProcessTable = Arc<Mutex<HashMap<String, PtyProcess>>>;

pub struct PtySupervisor {
    services: HashMap<String, Arc<ServiceConfig>>,
    processes: ProcessTable,
    events: EventSender,
    generation: AtomicU64,
}

impl PtySupervisor {
    pub fn new(config: &Config, events: EventSender) -> Self {
        let services = config
            .services
            .iter()
            .map(|s| (s.id.clone(), Arc::new(s.clone())))
            .collect();
        Self {
            services,
            processes: Arc::new(Mutex::new(HashMap::new())),
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// Handle one serialized outbound envelope. Malformed ones are dropped.
    pub fn handle_message(&self, raw: &str) {
        match CommandEnvelope::from_json(raw) {
            Ok(envelope) => self.handle(envelope),
            Err(e) => debug!("Dropping malformed command envelope: {}", e),
        }
    }

    pub fn handle(&self, envelope: CommandEnvelope) {
        let CommandEnvelope { id, event } = envelope;
        match event {
            Command::StartTerminal => self.start(&id),
            Command::StopTerminal => self.stop(&id),
            Command::InputTerminal(data) => self.input(&id, &data),
            Command::ResizeTerminal(size) => self.resize(&id, size),
            Command::OpenLink(uri) => open_link(&uri),
            command @ (Command::CloseWindow | Command::MinimizeWindow | Command::MaximizeWindow) => {
                self.events.send(AppEvent::Window(command));
            }
        }
    }

    fn emit(&self, id: &str, event: Event) {
        emit(&self.events, id, event);
    }

    /// Spawn the service, or re-announce it if it is already up
    pub fn start(&self, id: &str) {
        let Some(service) = self.services.get(id).cloned() else {
            debug!("Start requested for unknown service {}", id);
            return;
        };

        let mut processes = self.processes.lock();
        if processes.contains_key(id) {
            drop(processes);
            self.emit(id, Event::Running);
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        match spawn(&service, generation) {
            Ok((process, child, reader)) => {
                processes.insert(id.to_string(), process);
                drop(processes);
                self.emit(id, Event::Running);
                self.start_reader_thread(id.to_string(), generation, child, reader);
            }
            Err(e) => {
                drop(processes);
                warn!("Failed to start {}: {:#}", id, e);
                self.emit(id, Event::Error(format!("{:#}", e)));
            }
        }
    }

    /// Stream output until EOF, then reap the child and report the end
    fn start_reader_thread(
        &self,
        id: String,
        generation: u64,
        mut child: Box<dyn Child + Send + Sync>,
        mut reader: Box<dyn Read + Send>,
    ) {
        let events = self.events.clone();
        let processes = Arc::clone(&self.processes);

        std::thread::spawn(move || {
            let mut buffer = [0u8; READ_BUFFER_SIZE];
            let mut decoder = Utf8Decoder::default();

            let last = loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break Event::Stopped,
                    Ok(n) => {
                        let text = decoder.decode(&buffer[..n]);
                        if !text.is_empty() {
                            emit(&events, &id, Event::Output(text));
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) if is_hangup(&e) => break Event::Stopped,
                    Err(e) => {
                        warn!("PTY read error for {}: {}", id, e);
                        break Event::Error(e.to_string());
                    }
                }
            };

            let rest = decoder.finish();
            if !rest.is_empty() {
                emit(&events, &id, Event::Output(rest));
            }

            match child.wait() {
                Ok(status) => info!("Service {} exited with status {}", id, status.exit_code()),
                Err(e) => error!("Failed to wait for service {}: {}", id, e),
            }

            {
                let mut processes = processes.lock();
                if processes.get(&id).is_some_and(|p| p.generation == generation) {
                    processes.remove(&id);
                }
            }

            emit(&events, &id, last);
        });
    }

    /// Kill the service; the reader reports `stopped`
    pub fn stop(&self, id: &str) {
        let mut processes = self.processes.lock();
        match processes.get_mut(id) {
            Some(process) => {
                info!("Stopping service {}", id);
                if let Err(e) = process.killer.kill() {
                    warn!("Failed to kill service {}: {}", id, e);
                }
            }
            None => debug!("Stop requested for service {} which is not running", id),
        }
    }

    pub fn input(&self, id: &str, data: &str) {
        let mut processes = self.processes.lock();
        let Some(process) = processes.get_mut(id) else {
            debug!("Input for service {} which is not running", id);
            return;
        };
        if let Err(e) = process
            .writer
            .write_all(data.as_bytes())
            .and_then(|_| process.writer.flush())
        {
            warn!("Failed to write to service {}: {}", id, e);
        }
    }

    pub fn resize(&self, id: &str, size: TermSize) {
        let processes = self.processes.lock();
        let Some(process) = processes.get(id) else {
            debug!("Resize for service {} which is not running", id);
            return;
        };
        if let Err(e) = process.master.resize(pty_size(size)) {
            warn!("Failed to resize service {}: {}", id, e);
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.processes.lock().contains_key(id)
    }

    pub fn running_count(&self) -> usize {
        self.processes.lock().len()
    }

    /// Kill every child
    pub fn shutdown(&self) {
        let mut processes = self.processes.lock();
        for (id, process) in processes.iter_mut() {
            if let Err(e) = process.killer.kill() {
                debug!("Failed to kill service {} on shutdown: {}", id, e);
            }
        }
        processes.clear();
        info!("Supervisor shut down");
    }
}

impl Drop for PtySupervisor {
    fn drop(&mut self) {
        if self.running_count() > 0 {
            self.shutdown();
        }
    }
}

fn emit(events: &EventSender, id: &str, event: Event) {
    if !events.backend(id, event.to_json()) {
        debug!("Main loop gone, dropping {} event for {}", event.kind(), id);
    }
}

fn pty_size(size: TermSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

type Spawned = (PtyProcess, Box<dyn Child + Send + Sync>, Box<dyn Read + Send>);

fn spawn(service: &ServiceConfig, generation: u64) -> Result<Spawned> {
    let pair = native_pty_system()
        .openpty(pty_size(INITIAL_SIZE))
        .context("Failed to create PTY")?;

    let mut cmd = CommandBuilder::new(&service.prog);
    cmd.args(&service.args);

    let wdir = match &service.wdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };
    cmd.cwd(&wdir);
    cmd.env("PWD", &wdir);
    cmd.env("TERM", "xterm-256color");
    cmd.env("COLORTERM", "truecolor");

    info!("Starting {}: {} {:?}", service.id, service.prog, service.args);

    let child = pair
        .slave
        .spawn_command(cmd)
        .with_context(|| format!("Failed to spawn {}", service.prog))?;
    // the child holds its own copy; keeping ours would delay EOF
    drop(pair.slave);

    let reader = pair.master.try_clone_reader().context("Failed to get PTY reader")?;
    let writer = pair.master.take_writer().context("Failed to get PTY writer")?;
    let killer = child.clone_killer();

    let process = PtyProcess {
        master: pair.master,
        writer,
        killer,
        generation,
    };
    Ok((process, child, reader))
}

/// Reading from a PTY whose slave side closed fails with EIO on Linux
fn is_hangup(e: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        const EIO: i32 = 5;
        e.raw_os_error() == Some(EIO)
    }
    #[cfg(not(unix))]
    {
        let _ = e;
        false
    }
}

/// Open a link with the platform handler
pub fn open_link(uri: &str) {
    let target = uri.trim().trim_matches('"').trim_matches('\'');
    if target.is_empty() {
        return;
    }
    info!("Opening link: {}", target);
    if let Err(e) = open::that(target) {
        warn!("Failed to open link {}: {}", target, e);
    }
}

/// Incremental UTF-8 decoding for byte chunks that may split characters
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut start = 0;

        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(s) => {
                    out.push_str(s);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..start + valid]));
                    start += valid;
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start += len;
                        }
                        // incomplete sequence at the end, wait for more
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Whatever is still buffered, lossily
    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
