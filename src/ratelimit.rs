// src/ratelimit.rs
//! Fixed-window request limiting keyed by client address.

use crate::db::Database;
use crate::errors::ServerError;
use rusqlite::params;
use std::collections::HashMap;
use std::sync::Mutex;

/// Counter state for one client after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub window_start: i64,
    pub hits: u32,
}

/// Where window counters live. Implementations must be safe to share
/// across worker threads.
pub trait RateLimitStore: Send + Sync {
    /// Records one hit for `key` at `now` (unix seconds), starting a fresh
    /// window when the current one has elapsed, and returns the new state.
    fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<WindowState, ServerError>;
}

const PURGE_THRESHOLD: usize = 10_000;

/// Single-process store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    windows: Mutex<HashMap<String, WindowState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryStore {
    fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<WindowState, ServerError> {
        let mut windows = self.windows.lock().map_err(|_| ServerError::InternalError)?;

        if windows.len() > PURGE_THRESHOLD {
            windows.retain(|_, w| now - w.window_start < window_secs);
        }

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            window_start: now,
            hits: 0,
        });
        if now - state.window_start >= window_secs {
            *state = WindowState {
                window_start: now,
                hits: 0,
            };
        }
        state.hits = state.hits.saturating_add(1);
        Ok(*state)
    }
}

/// Counters in the application database, shared by every process on it.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl RateLimitStore for SqliteStore {
    fn hit(&self, key: &str, now: i64, window_secs: i64) -> Result<WindowState, ServerError> {
        self.db.with_conn(|conn| {
            let state = conn.query_row(
                r#"
                insert into rate_limits (client_key, window_start, hits)
                values (?1, ?2, 1)
                on conflict(client_key) do update set
                  hits = case when ?2 - window_start >= ?3 then 1 else hits + 1 end,
                  window_start = case when ?2 - window_start >= ?3 then ?2 else window_start end
                returning window_start, hits
                "#,
                params![key, now, window_secs],
                |row| {
                    Ok(WindowState {
                        window_start: row.get(0)?,
                        hits: row.get(1)?,
                    })
                },
            )?;
            Ok(state)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    /// Seconds until the window resets.
    Limited { retry_after: i64 },
}

pub struct FixedWindowLimiter {
    store: Box<dyn RateLimitStore>,
    max_requests: u32,
    window_secs: i64,
}

impl FixedWindowLimiter {
    pub fn new(store: Box<dyn RateLimitStore>, max_requests: u32, window_secs: i64) -> Self {
        Self {
            store,
            max_requests,
            window_secs: window_secs.max(1),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str, now: i64) -> Result<Decision, ServerError> {
        let state = self.store.hit(key, now, self.window_secs)?;
        if state.hits > self.max_requests {
            let retry_after = (state.window_start + self.window_secs - now).max(1);
            Ok(Decision::Limited { retry_after })
        } else {
            Ok(Decision::Allowed {
                remaining: self.max_requests - state.hits,
            })
        }
    }
}
