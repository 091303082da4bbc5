//! In-Memory Session Store
//!
//! Sessions live only for the lifetime of the process. Each one sits behind
//! its own async mutex so that turns on different sessions never contend, and
//! the map lock is only held long enough to look a session up.
//!
//! The store is bounded two ways: each user keeps at most a fixed number of
//! sessions (creating one more evicts their least recently active), and
//! [`SessionStore::evict_idle`] drops sessions nobody has touched for a while.

use chrono::{DateTime, TimeDelta, Utc};
use coaching_core::SessionState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// Sessions a single user may hold at once.
pub const MAX_SESSIONS_PER_USER: usize = 20;

/// A session together with its ownership and bookkeeping fields.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: SessionState,
}

impl SessionRecord {
    /// Replaces the session with a freshly started one.
    pub fn restart(&mut self) {
        self.state = SessionState::start();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub type SessionSlot = Arc<Mutex<SessionRecord>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    max_per_user: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_max_per_user(MAX_SESSIONS_PER_USER)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_per_user(max_per_user: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_per_user: max_per_user.max(1),
        }
    }

    /// Creates an unstarted session owned by `user_id`, evicting the user's
    /// least recently active sessions beyond the per-user limit.
    pub async fn create(&self, user_id: &str) -> SessionRecord {
        let now = Utc::now();
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
            state: SessionState::new(),
        };

        let mut sessions = self.sessions.write().await;
        // Slot locks are never held across a map lock, so waiting here cannot deadlock.
        let mut owned = Vec::new();
        for (id, slot) in sessions.iter() {
            let existing = slot.lock().await;
            if existing.user_id == user_id {
                owned.push((*id, existing.updated_at));
            }
        }
        if owned.len() >= self.max_per_user {
            owned.sort_by_key(|(_, updated_at)| *updated_at);
            let excess = owned.len() + 1 - self.max_per_user;
            for (id, _) in owned.into_iter().take(excess) {
                sessions.remove(&id);
                info!(session_id = %id, user_id, "Evicted session over the per-user limit");
            }
        }
        sessions.insert(record.id, Arc::new(Mutex::new(record.clone())));
        record
    }

    /// Drops every session untouched for longer than `max_idle`. Sessions
    /// busy at the moment of the sweep are kept. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = TimeDelta::from_std(max_idle)
            .ok()
            .and_then(|max_idle| Utc::now().checked_sub_signed(max_idle))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(record) => record.updated_at >= cutoff,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Retrieves a session by id, scoped to its owner.
    pub async fn get(&self, session_id: Uuid, user_id: &str) -> Option<SessionSlot> {
        let slot = self.sessions.read().await.get(&session_id).cloned()?;
        let owned = slot.lock().await.user_id == user_id;
        owned.then_some(slot)
    }

    /// Snapshots all of a user's sessions, most recently created first.
    pub async fn list(&self, user_id: &str) -> Vec<SessionRecord> {
        let slots: Vec<SessionSlot> = self.sessions.read().await.values().cloned().collect();
        let mut records = Vec::new();
        for slot in slots {
            let record = slot.lock().await;
            if record.user_id == user_id {
                records.push(record.clone());
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Removes a session. Returns whether it existed for this owner.
    pub async fn remove(&self, session_id: Uuid, user_id: &str) -> bool {
        if self.get(session_id, user_id).await.is_none() {
            return false;
        }
        self.sessions.write().await.remove(&session_id).is_some()
    }
}
