// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{io::AsyncWriteExt, task::JoinHandle, time::timeout};
use tracing::debug;

use crate::{
    cfg::{
        config::RuntimeConfig,
        endpoint::Endpoint,
    },
    engine::{HostOptions, Reporter, UciEngine, editable_option},
    options::{OptionKind, OptionsRegistry, SetOutcome, parse::parse_option_line},
    pipe::PipeRead,
    session::{Session, SessionState, tasks},
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A UCI engine reached over the network.
///
/// One value owns one session: the reader, writer and watchdog tasks it
/// spawns on [`start`](Self::start), the two line pipes between them and the
/// GUI, and the registry of options the engine declared.
pub struct NetworkEngine {
    endpoint: Endpoint,
    runtime: RuntimeConfig,
    reporter: Arc<dyn Reporter>,
    session: Arc<Session>,
    options: Mutex<OptionsRegistry>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NetworkEngine {
    pub fn new(endpoint: Endpoint, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_runtime(endpoint, RuntimeConfig::default(), reporter)
    }

    pub fn with_runtime(
        endpoint: Endpoint,
        runtime: RuntimeConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            endpoint,
            runtime,
            reporter,
            session: Arc::new(Session::new()),
            options: Mutex::new(OptionsRegistry::new()),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_error(&self) -> bool {
        self.session.is_error()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Spawns the session tasks. Idempotent; only the first call connects.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.session.set_state(SessionState::Connecting);
        debug!("starting network engine session to {}", self.endpoint.address());

        let mut handles = self.tasks.lock().expect("task list mutex poisoned");
        handles.push(tokio::spawn(tasks::reader_task(
            Arc::clone(&self.session),
            self.endpoint.clone(),
            Arc::clone(&self.reporter),
        )));
        handles.push(tokio::spawn(tasks::writer_task(
            Arc::clone(&self.session),
            Arc::clone(&self.reporter),
        )));
        handles.push(tokio::spawn(tasks::watchdog_task(
            Arc::clone(&self.session),
            Arc::clone(&self.reporter),
            self.runtime.startup_timeout,
        )));
    }

    /// Next engine line; `Some("")` on timeout, `None` once the session is
    /// closed and drained.
    pub async fn read_line(&self, timeout: Duration) -> Option<String> {
        match self.session.to_gui.read(timeout).await {
            PipeRead::Line(line) => Some(line),
            PipeRead::Timeout => Some(String::new()),
            PipeRead::Closed => None,
        }
    }

    /// Queues one command for the engine. Lines beginning with `position `
    /// or `go ` are additionally remembered for reconnect bookkeeping when
    /// the writer forwards them.
    pub fn write_line(&self, line: &str) {
        self.session.to_engine.push(line);
    }

    /// Parses and registers an `option …` declaration line, applying the
    /// editability filter. Returns false on malformed declarations.
    pub fn register_option(&self, line: &str) -> bool {
        match parse_option_line(line) {
            Some(mut option) => {
                option.set_visible(editable_option(option.name()));
                self.options
                    .lock()
                    .expect("options mutex poisoned")
                    .register(option);
                true
            },
            None => false,
        }
    }

    pub fn clear_options(&self) {
        self.options
            .lock()
            .expect("options mutex poisoned")
            .clear();
    }

    /// Deep copy of the registry, for option editors.
    pub fn all_options(&self) -> OptionsRegistry {
        self.options
            .lock()
            .expect("options mutex poisoned")
            .clone()
    }

    pub fn option_value(&self, name: &str) -> Option<String> {
        self.options
            .lock()
            .expect("options mutex poisoned")
            .get(name)
            .map(|o| o.string_value())
    }

    /// Assigns an option and emits the matching `setoption` command when the
    /// value actually changed (buttons always fire). Returns false for
    /// unknown options and rejected values.
    pub fn set_option(&self, name: &str, value: &str) -> bool {
        let command = {
            let mut registry = self.options.lock().expect("options mutex poisoned");
            let Some(option) = registry.get_mut(name) else {
                return false;
            };
            if matches!(option.kind, OptionKind::Button) {
                Some(format!("setoption name {}", option.name()))
            } else {
                match option.set_from_string(value) {
                    SetOutcome::Updated => Some(format!(
                        "setoption name {} value {}",
                        option.name(),
                        option.string_value()
                    )),
                    SetOutcome::Unchanged => None,
                    SetOutcome::Rejected => return false,
                }
            }
        };
        if let Some(command) = command {
            self.write_line(&command);
        }
        true
    }

    /// Programs the host-managed options into the engine.
    pub fn init_options(&self, host: &HostOptions) {
        let _ = self.set_option("Hash", &host.hash_mb.to_string());
        if !host.syzygy_path.is_empty() {
            let _ = self.set_option("SyzygyPath", &host.syzygy_path);
        }
        if !host.gaviota_path.is_empty() {
            let _ = self.set_option("GaviotaTbPath", &host.gaviota_path);
        }
    }

    /// False when the session errored or a registered host-managed option
    /// disagrees with the host configuration (the engine needs a restart to
    /// pick the value up).
    pub fn options_ok(&self, host: &HostOptions) -> bool {
        if self.session.is_error() {
            return false;
        }
        let registry = self.options.lock().expect("options mutex poisoned");
        let wanted = [
            ("Hash", host.hash_mb.to_string()),
            ("SyzygyPath", host.syzygy_path.clone()),
            ("GaviotaTbPath", host.gaviota_path.clone()),
        ];
        for (name, want) in wanted {
            if let Some(option) = registry.get(name)
                && option.string_value() != want
            {
                return false;
            }
        }
        true
    }

    pub fn last_position_line(&self) -> Option<String> {
        self.session.last_position_line()
    }

    pub fn last_go_line(&self) -> Option<String> {
        self.session.last_go_line()
    }

    /// Stops the session: flags the shutdown (so teardown I/O errors stay
    /// silent), attempts a `quit`, cancels the tasks, closes the socket
    /// write half and both pipes, and joins the tasks.
    pub async fn shutdown(&self) {
        self.session.request_shutdown();

        if let Some(writer) = self.session.writer().map(Arc::clone) {
            let _ = timeout(self.runtime.quit_grace, async {
                let mut w = writer.lock().await;
                let _ = w.write_all(b"quit\n").await;
                let _ = w.flush().await;
                let _ = w.shutdown().await;
            })
            .await;
        }

        self.session.cancel_token().cancel();
        self.session.close_pipes();

        let handles: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .expect("task list mutex poisoned")
            .drain(..)
            .collect();
        for handle in handles {
            let _ = timeout(JOIN_TIMEOUT, handle).await;
        }
        debug!("network engine session shut down");
    }
}

impl UciEngine for NetworkEngine {
    fn start(&self) {
        NetworkEngine::start(self);
    }

    async fn read_line(&self, timeout: Duration) -> Option<String> {
        NetworkEngine::read_line(self, timeout).await
    }

    fn write_line(&self, line: &str) {
        NetworkEngine::write_line(self, line);
    }

    fn init_options(&self, host: &HostOptions) {
        NetworkEngine::init_options(self, host);
    }

    fn options_ok(&self, host: &HostOptions) -> bool {
        NetworkEngine::options_ok(self, host)
    }

    async fn shutdown(&self) {
        NetworkEngine::shutdown(self).await;
    }
}
