// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod common;
pub mod handshake;
pub mod tasks;

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    engine::Reporter,
    error::EngineError,
    pipe::LinePipe,
    session::common::SharedWriter,
};

/// Lifecycle of one engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Running,
    Error,
    Stopped,
}

/// Shared state of one network engine session.
///
/// The session owns the two line pipes and the synchronization surface the
/// reader, writer and watchdog tasks coordinate through; the tasks hold it
/// behind an `Arc` and `shutdown` is the single join point.
pub struct Session {
    /// Engine → GUI lines.
    pub(crate) to_gui: LinePipe,
    /// GUI → engine lines.
    pub(crate) to_engine: LinePipe,

    state: Mutex<SessionState>,
    shutdown_requested: AtomicBool,
    error_flag: AtomicBool,
    running: AtomicBool,
    started_ok: AtomicBool,
    uci_confirmed: AtomicBool,

    /// Handshake gate: set exactly once by the reader, awaited by the writer.
    gate: watch::Sender<bool>,
    cancel: CancellationToken,
    /// Write half of the socket, bound by the reader task after connecting.
    writer: OnceCell<SharedWriter>,

    last_position: Mutex<Option<String>>,
    last_go: Mutex<Option<String>>,
}

impl Session {
    pub(crate) fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            to_gui: LinePipe::new(),
            to_engine: LinePipe::new(),
            state: Mutex::new(SessionState::Idle),
            shutdown_requested: AtomicBool::new(false),
            error_flag: AtomicBool::new(false),
            running: AtomicBool::new(false),
            started_ok: AtomicBool::new(false),
            uci_confirmed: AtomicBool::new(false),
            gate,
            cancel: CancellationToken::new(),
            writer: OnceCell::new(),
            last_position: Mutex::new(None),
            last_go: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state mutex poisoned")
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        *self.state.lock().expect("session state mutex poisoned") = next;
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn bind_writer(&self, writer: SharedWriter) {
        let _ = self.writer.set(writer);
    }

    pub(crate) fn writer(&self) -> Option<&SharedWriter> {
        self.writer.get()
    }

    /// Marks the session as shutting down; error paths observed afterwards
    /// stay silent.
    pub(crate) fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Stopped);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn is_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn started_ok(&self) -> bool {
        self.started_ok.load(Ordering::SeqCst)
    }

    pub fn uci_confirmed(&self) -> bool {
        self.uci_confirmed.load(Ordering::SeqCst)
    }

    /// Opens the handshake gate; the writer may emit bytes from here on.
    pub(crate) fn release_gate(&self) {
        let _ = self.gate.send_replace(true);
    }

    pub(crate) fn gate(&self) -> watch::Receiver<bool> {
        self.gate.subscribe()
    }

    /// Forwards one engine line to the GUI. The first line flips the session
    /// to running (the signal the startup watchdog keys off); a `uciok` line
    /// confirms the protocol.
    pub(crate) fn push_engine_line(&self, line: &str) {
        if !self.started_ok.swap(true, Ordering::SeqCst) {
            self.running.store(true, Ordering::SeqCst);
            self.set_state(SessionState::Running);
            debug!("engine produced its first line");
        }
        if line.trim() == "uciok" {
            self.uci_confirmed.store(true, Ordering::SeqCst);
        }
        self.to_gui.push(line);
    }

    /// Remembers the most recent `position `/`go ` commands for reconnect
    /// bookkeeping.
    pub(crate) fn note_outgoing(&self, line: &str) {
        if line.starts_with("position ") {
            *self
                .last_position
                .lock()
                .expect("session mutex poisoned") = Some(line.to_string());
        } else if line.starts_with("go ") {
            *self.last_go.lock().expect("session mutex poisoned") = Some(line.to_string());
        }
    }

    pub fn last_position_line(&self) -> Option<String> {
        self.last_position
            .lock()
            .expect("session mutex poisoned")
            .clone()
    }

    pub fn last_go_line(&self) -> Option<String> {
        self.last_go.lock().expect("session mutex poisoned").clone()
    }

    pub(crate) fn close_pipes(&self) {
        self.to_gui.close();
        self.to_engine.close();
    }

    /// Transitions to the terminal error state and reports `err` to the
    /// host, unless a shutdown is in progress (expected I/O failures during
    /// teardown are suppressed) or another task already reported.
    pub(crate) fn fail(&self, reporter: &dyn Reporter, err: &EngineError) {
        if self.is_shutdown_requested() {
            self.close_pipes();
            return;
        }
        if !self.error_flag.swap(true, Ordering::SeqCst) {
            self.set_state(SessionState::Error);
            reporter.report_error(&err.to_string());
        }
        self.close_pipes();
    }
}
