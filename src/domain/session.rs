//! Session and visitor identity for the tracking script.
//!
//! Identity lives in whatever key-value store the caller hands in (browser
//! storage on the client, [`MemoryStorage`] in tests and tooling). Nothing
//! here reads ambient global state; the clock is passed in as well.

use std::collections::HashMap;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const SESSION_KEY: &str = "analytics_session_id";
pub const SESSION_TIME_KEY: &str = "analytics_session_id_time";
pub const VISITOR_KEY: &str = "analytics_visitor_id";

/// Inactivity after which a new session starts.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::minutes(30);

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorIdentity {
    pub visitor_id: String,
    pub is_new: bool,
}

/// Identity lookups bound to one storage and one instant.
pub struct IdentityContext<'a, S: SessionStorage> {
    storage: &'a mut S,
    now: OffsetDateTime,
}

impl<'a, S: SessionStorage> IdentityContext<'a, S> {
    pub fn new(storage: &'a mut S, now: OffsetDateTime) -> Self {
        Self { storage, now }
    }

    /// Current session id, rotating it after [`SESSION_IDLE_TIMEOUT`] of inactivity.
    ///
    /// Every call refreshes the stored activity timestamp.
    pub fn session_id(&mut self) -> String {
        let now_ms = unix_millis(self.now);
        let mut session_id = self.storage.get(SESSION_KEY);

        if session_id.is_some() {
            if let Some(last_seen) = self.storage.get(SESSION_TIME_KEY) {
                let expired = match last_seen.trim().parse::<i128>() {
                    Ok(last_ms) => now_ms - last_ms > SESSION_IDLE_TIMEOUT.whole_milliseconds(),
                    Err(_) => true,
                };
                if expired {
                    session_id = None;
                }
            }
        }

        let session_id = match session_id {
            Some(id) => id,
            None => {
                let id = generate_id("session", self.now);
                self.storage.set(SESSION_KEY, id.clone());
                id
            }
        };

        self.storage.set(SESSION_TIME_KEY, now_ms.to_string());
        session_id
    }

    /// Long-lived visitor id, created on first sight.
    pub fn visitor(&mut self) -> VisitorIdentity {
        match self.storage.get(VISITOR_KEY) {
            Some(visitor_id) => VisitorIdentity {
                visitor_id,
                is_new: false,
            },
            None => {
                let visitor_id = generate_id("visitor", self.now);
                self.storage.set(VISITOR_KEY, visitor_id.clone());
                VisitorIdentity {
                    visitor_id,
                    is_new: true,
                }
            }
        }
    }
}

fn unix_millis(now: OffsetDateTime) -> i128 {
    now.unix_timestamp_nanos() / 1_000_000
}

/// `<prefix>_<unix millis>_<9 random base36 chars>`.
fn generate_id(prefix: &str, now: OffsetDateTime) -> String {
    let mut entropy = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        suffix.push(char::from(BASE36[(entropy % 36) as usize]));
        entropy /= 36;
    }
    format!("{prefix}_{}_{suffix}", unix_millis(now))
}
