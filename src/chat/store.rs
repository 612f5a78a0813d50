//! Session storage for chat transcripts.
//!
//! `SessionStore` is the seam between the chat service and wherever
//! history lives. The only implementation here keeps everything in
//! process memory and forgets it on restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;

use crate::ai::chat::{Message, Transcript};

/// Bounds on how many sessions are kept and for how long. `None`
/// means no bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_sessions: Option<usize>,
    pub ttl: Option<Duration>,
}

impl SessionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub message_count: usize,
}

#[async_trait]
pub trait SessionStore {
    /// Return the history of `session_id`, creating an empty session
    /// if it doesn't exist yet.
    async fn get_or_create(&self, session_id: &str) -> Result<Vec<Message>, Error>;

    /// Append a user message and its reply as one unit.
    async fn append_turn(&self, session_id: &str, user: Message, reply: Message)
    -> Result<(), Error>;

    /// History of an existing session without creating it.
    async fn transcript(&self, session_id: &str) -> Result<Option<Vec<Message>>, Error>;

    async fn sessions(&self) -> Result<Vec<SessionSummary>, Error>;
}

pub type BoxedSessionStore = Box<dyn SessionStore + Send + Sync + 'static>;

struct Session {
    transcript: Transcript,
    last_active: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            transcript: Transcript::new(),
            last_active: now,
        }
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    policy: SessionPolicy,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("Session store lock poisoned"))
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        self.policy
            .ttl
            .is_some_and(|ttl| now.duration_since(session.last_active) > ttl)
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        if self.policy.ttl.is_none() {
            return;
        }
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!("Expired {} idle session(s)", purged);
        }
    }

    // Make room for one more session by dropping the least recently
    // active ones
    fn evict_for_insert(&self, sessions: &mut HashMap<String, Session>) {
        let Some(max) = self.policy.max_sessions else {
            return;
        };
        while sessions.len() >= max {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_active)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    tracing::debug!("Evicting session {} to stay within {} sessions", id, max);
                    sessions.remove(&id);
                }
                None => break,
            }
        }
    }

    fn entry<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        session_id: &str,
        now: Instant,
    ) -> &'a mut Session {
        self.purge_expired(sessions, now);
        if !sessions.contains_key(session_id) {
            self.evict_for_insert(sessions);
            tracing::debug!("Creating session {}", session_id);
        }
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(now))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> Result<Vec<Message>, Error> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        let session = self.entry(&mut sessions, session_id, now);
        session.last_active = now;
        Ok(session.transcript.messages())
    }

    async fn append_turn(
        &self,
        session_id: &str,
        user: Message,
        reply: Message,
    ) -> Result<(), Error> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        // The session may have been evicted while the provider was
        // generating, in which case the turn starts a fresh one
        let session = self.entry(&mut sessions, session_id, now);
        session.transcript.push_turn(user, reply);
        session.last_active = now;
        Ok(())
    }

    async fn transcript(&self, session_id: &str) -> Result<Option<Vec<Message>>, Error> {
        let now = Instant::now();
        let sessions = self.lock()?;
        Ok(sessions
            .get(session_id)
            .filter(|s| !self.is_expired(s, now))
            .map(|s| s.transcript.messages()))
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, Error> {
        let now = Instant::now();
        let sessions = self.lock()?;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .filter(|(_, s)| !self.is_expired(s, now))
            .map(|(id, s)| SessionSummary {
                id: id.clone(),
                message_count: s.transcript.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
