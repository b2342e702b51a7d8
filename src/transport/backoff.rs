// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::{net::TcpStream, time::sleep};
use tracing::warn;

use crate::{
    error::EngineError,
    transport::{RETRY_CONNECT_TIMEOUT, timed_connect},
};

/// Attempt cap for the backoff strategy.
pub const MAX_ATTEMPTS: u32 = 5;

const INITIAL_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 30_000;

/// Delay after the given zero-based failed attempt: 1 s doubling per
/// attempt, capped at 30 s.
pub fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64 << attempt.min(16);
    Duration::from_millis((INITIAL_DELAY_MS * factor).min(MAX_DELAY_MS))
}

/// Repeatedly dials `host:port`, sleeping the backoff schedule between
/// attempts. Returns the last classified error once the cap is reached.
pub async fn connect_with_retry(
    host: &str,
    port: u16,
) -> Result<TcpStream, EngineError> {
    let target = format!("{host}:{port}");
    let mut last: Option<EngineError> = None;

    for attempt in 0..MAX_ATTEMPTS {
        match timed_connect(&target, RETRY_CONNECT_TIMEOUT).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                warn!(
                    "retry {}/{MAX_ATTEMPTS} to {target} failed: {e}",
                    attempt + 1
                );
                last = Some(e);
            },
        }
        if attempt + 1 < MAX_ATTEMPTS {
            sleep(retry_delay(attempt)).await;
        }
    }

    Err(last.unwrap_or_else(|| EngineError::timeout(target, &[])))
}
