//! Per-session chat transcripts for the browser front end.
//!
//! A [`Conversation`] only grows: messages are appended in order and never
//! edited or removed. Transcripts live in memory and are gone on restart.
//! The [`SessionStore`] is bounded; the least recently used session makes
//! room for a new one.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::models::{Message, Role};

#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Default for `[server] max_sessions`.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// All open sessions, keyed by session ID.
///
/// Holds at most `capacity` sessions. Creating one more evicts the session
/// that was created or written to least recently.
#[derive(Debug)]
pub struct SessionStore {
    capacity: usize,
    inner: RwLock<Sessions>,
}

#[derive(Debug, Default)]
struct Sessions {
    clock: u64,
    by_id: HashMap<Uuid, Session>,
}

#[derive(Debug)]
struct Session {
    conversation: Conversation,
    last_used: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("session store lock poisoned")
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Sessions::default()),
        }
    }

    pub fn create(&self) -> Result<Uuid> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        while inner.by_id.len() >= self.capacity {
            let oldest = inner
                .by_id
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    inner.by_id.remove(&id);
                    tracing::debug!(session = %id, "evicted idle session");
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        let last_used = inner.tick();
        inner.by_id.insert(
            id,
            Session {
                conversation: Conversation::new(),
                last_used,
            },
        );
        Ok(id)
    }

    pub fn exists(&self, id: &Uuid) -> Result<bool> {
        Ok(self.inner.read().map_err(poisoned)?.by_id.contains_key(id))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(poisoned)?.by_id.len())
    }

    /// Snapshot of a session's transcript, `None` for unknown sessions.
    pub fn transcript(&self, id: &Uuid) -> Result<Option<Vec<Message>>> {
        Ok(self
            .inner
            .read()
            .map_err(poisoned)?
            .by_id
            .get(id)
            .map(|s| s.conversation.messages().to_vec()))
    }

    /// Append to a session, returning the stored message, or `None` for
    /// unknown sessions.
    pub fn append(&self, id: &Uuid, role: Role, content: &str) -> Result<Option<Message>> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let now = inner.tick();
        Ok(inner.by_id.get_mut(id).map(|session| {
            session.last_used = now;
            session.conversation.push(role, content).clone()
        }))
    }
}
