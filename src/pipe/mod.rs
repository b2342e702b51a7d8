// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::VecDeque, fmt, sync::Mutex, time::Duration};

use tokio::{
    sync::Notify,
    time::{Instant, sleep_until},
};

/// Outcome of a timed [`LinePipe::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeRead {
    /// The head line of the queue.
    Line(String),
    /// The timeout elapsed with the queue still empty.
    Timeout,
    /// The pipe is closed and fully drained.
    Closed,
}

impl PipeRead {
    pub fn into_line(self) -> Option<String> {
        match self {
            PipeRead::Line(l) => Some(l),
            PipeRead::Timeout | PipeRead::Closed => None,
        }
    }
}

#[derive(Debug, Default)]
struct PipeState {
    lines: VecDeque<String>,
    closed: bool,
}

/// A thread-safe FIFO of text lines connecting one side of a UCI session to
/// the other.
///
/// Producers call [`push`](Self::push) (never blocks); the single typical
/// consumer calls [`read`](Self::read) with a timeout. Closing the pipe wakes
/// every blocked reader; lines pushed before the close stay readable until
/// the queue drains, after which reads return [`PipeRead::Closed`].
#[derive(Debug, Default)]
pub struct LinePipe {
    state: Mutex<PipeState>,
    readable: Notify,
}

impl LinePipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line and wakes any blocked reader. Pushing to a closed pipe
    /// silently drops the line.
    pub fn push(&self, line: impl Into<String>) {
        {
            let mut st = self.state.lock().expect("line pipe mutex poisoned");
            if st.closed {
                return;
            }
            st.lines.push_back(line.into());
        }
        self.readable.notify_waiters();
    }

    /// Formats and pushes, mirroring `push(format!(…))`.
    pub fn print(&self, args: fmt::Arguments<'_>) {
        self.push(args.to_string());
    }

    /// Removes and returns the head line, waiting up to `timeout` for one to
    /// arrive. A timeout too large to resolve against the monotonic clock
    /// (for example `Duration::MAX`) waits forever.
    pub async fn read(&self, timeout: Duration) -> PipeRead {
        let deadline = Instant::now().checked_add(timeout);
        let notified = self.readable.notified();
        tokio::pin!(notified);
        loop {
            // Register before inspecting state so a push between the check
            // and the await cannot be missed.
            notified.as_mut().enable();
            {
                let mut st = self.state.lock().expect("line pipe mutex poisoned");
                if let Some(line) = st.lines.pop_front() {
                    return PipeRead::Line(line);
                }
                if st.closed {
                    return PipeRead::Closed;
                }
            }
            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = notified.as_mut() => {
                            notified.set(self.readable.notified());
                        },
                        _ = sleep_until(at) => return PipeRead::Timeout,
                    }
                },
                None => {
                    notified.as_mut().await;
                    notified.set(self.readable.notified());
                },
            }
        }
    }

    /// Marks the pipe closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        {
            let mut st = self.state.lock().expect("line pipe mutex poisoned");
            st.closed = true;
        }
        self.readable.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .expect("line pipe mutex poisoned")
            .closed
    }
}
