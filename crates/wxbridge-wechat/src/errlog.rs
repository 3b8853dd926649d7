// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate limiting for session client error logs.
//!
//! The session client tends to emit the same error many times per second
//! while a connection is flapping. Each distinct signature is logged at most
//! once per suppression window.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::error;
use wxbridge_core::protocol::SessionErrorInfo;

/// Default suppression window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15);

/// Remembers when each error signature was last logged.
#[derive(Debug)]
pub struct ErrorLog {
    window: Duration,
    last_logged: Mutex<HashMap<String, Instant>>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ErrorLog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_logged: Mutex::new(HashMap::new()),
        }
    }

    /// Logs `err` unless the same signature was logged within the window.
    ///
    /// Returns whether the error was logged.
    pub fn report(&self, err: &SessionErrorInfo, account: Option<&str>) -> bool {
        let signature = err.signature();
        let now = Instant::now();
        {
            let mut seen = self.last_logged.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = seen.get(&signature) {
                if now.duration_since(*last) < self.window {
                    return false;
                }
            }
            seen.insert(signature, now);
        }
        error!(
            self_id = account.unwrap_or("-"),
            name = %err.name,
            code = err.code.as_deref().unwrap_or(""),
            tips = err.tips.as_deref().unwrap_or(""),
            "session error: {}",
            err.message
        );
        true
    }
}
