//! Per-visitor conversation state: a bounded message buffer plus the session
//! store holding one buffer per visitor token.
//!
//! The buffer evicts from the head once the bound is exceeded, so it always
//! holds the most recent N messages in insertion order. Same-visitor writes go
//! through the DashMap entry API; a read-modify-write never interleaves with
//! another request on the same key.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Message author, serialized lowercase to match the provider wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered log of role-tagged messages, bounded at `limit`. Oldest entries are
/// evicted from the head once the bound is exceeded.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: VecDeque<Message>,
    limit: usize,
}

impl ConversationBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Appends one message to the tail, then trims from the head until the
    /// bound holds. Always succeeds.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push_back(Message::new(role, content));
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }

    /// Snapshot of the current buffer, oldest first.
    pub fn window(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Idempotent.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

struct VisitorSession {
    buffer: ConversationBuffer,
    last_touched: Instant,
}

impl VisitorSession {
    fn new(limit: usize) -> Self {
        Self {
            buffer: ConversationBuffer::new(limit),
            last_touched: Instant::now(),
        }
    }
}

/// One conversation buffer per visitor token. Tokens are opaque; the store
/// never inspects them. Buffers are created on first append and evicted either
/// explicitly or by the idle sweeper.
pub struct SessionStore {
    sessions: DashMap<String, VisitorSession>,
    limit: usize,
}

impl SessionStore {
    pub fn new(limit: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            limit,
        }
    }

    /// Initialize-if-absent, append, trim. One atomic read-modify-write on the key.
    pub fn append(&self, token: &str, role: Role, content: &str) {
        let mut session = self
            .sessions
            .entry(token.to_string())
            .or_insert_with(|| VisitorSession::new(self.limit));
        session.buffer.push(role, content);
        session.last_touched = Instant::now();
    }

    /// Bounded window for the token, oldest first. Empty if the visitor has no session.
    pub fn window(&self, token: &str) -> Vec<Message> {
        self.sessions
            .get(token)
            .map(|s| s.buffer.window())
            .unwrap_or_default()
    }

    /// Empties the visitor's buffer but keeps the session alive. Idempotent.
    pub fn clear(&self, token: &str) {
        if let Some(mut session) = self.sessions.get_mut(token) {
            session.buffer.clear();
            session.last_touched = Instant::now();
        }
    }

    /// Drops the session entirely (fresh visit, or sweeper eviction).
    pub fn remove(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total messages held across all sessions.
    pub fn total_messages(&self) -> usize {
        self.sessions.iter().map(|s| s.buffer.len()).sum()
    }

    /// Live visitor tokens, in no particular order.
    pub fn tokens(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }

    /// Evicts sessions idle longer than `ttl`. Returns the eviction count.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_touched.elapsed() <= ttl);
        before.saturating_sub(self.sessions.len())
    }
}
