// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token storage.
//!
//! Tokens are opaque server-minted UUIDs. The store is behind a trait so a
//! deployment can back it with a shared cache; the default implementation is
//! an in-process map with TTL expiry and explicit revocation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::roles::Role;

/// A live session binding a token to an identity snapshot.
///
/// The role is captured at login time; user mutations revoke the session so
/// the next login observes the change.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Storage for live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by token. Expired sessions are not returned.
    async fn get(&self, token: Uuid) -> Option<Session>;

    /// Insert `session` unless its username already has a live session, and
    /// return whichever session is live afterwards. The check and the insert
    /// are one critical section, so concurrent logins for the same username
    /// always converge on a single token.
    async fn put_if_absent(&self, session: Session) -> Session;

    /// Revoke a session. Returns whether a live session was removed.
    async fn delete(&self, token: Uuid) -> bool;

    /// Revoke every session held by a username. Returns the count removed.
    async fn delete_by_username(&self, username: &str) -> usize;
}

/// In-process session store with TTL expiry.
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Expiry timestamp for a session minted now.
    pub fn expiry_from_now(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(8))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, token: Uuid) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&token).filter(|s| !s.is_expired()).cloned()
    }

    async fn put_if_absent(&self, session: Session) -> Session {
        // Prune, check, and insert under one write lock: a concurrent login
        // for the same username observes either nothing or the winner.
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired());
        if let Some(existing) = sessions
            .values()
            .find(|s| s.username == session.username)
            .cloned()
        {
            return existing;
        }
        sessions.insert(session.token, session.clone());
        session
    }

    async fn delete(&self, token: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&token).is_some_and(|s| !s.is_expired())
    }

    async fn delete_by_username(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.username != username);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(store: &InMemorySessionStore, username: &str) -> Session {
        Session {
            token: Uuid::new_v4(),
            username: username.to_string(),
            role: Role::from(Role::REVIEWER),
            expires_at: store.expiry_from_now(),
        }
    }

    #[tokio::test]
    async fn put_and_get_roundtrip() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = store.put_if_absent(session(&store, "bob")).await;

        let loaded = store.get(s.token).await.unwrap();
        assert_eq!(loaded.username, "bob");
        assert!(loaded.role.is_reviewer());
    }

    #[tokio::test]
    async fn put_if_absent_keeps_the_first_session() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let first = store.put_if_absent(session(&store, "bob")).await;
        let second = store.put_if_absent(session(&store, "bob")).await;

        assert_eq!(first.token, second.token);
        // The losing candidate's token never became live.
        let other = store.put_if_absent(session(&store, "alice")).await;
        assert_ne!(other.token, first.token);
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let mut s = session(&store, "bob");
        s.expires_at = Utc::now() - chrono::Duration::seconds(1);
        let s = store.put_if_absent(s).await;

        assert!(store.get(s.token).await.is_none());

        // An expired session does not block a fresh one for the username.
        let fresh = store.put_if_absent(session(&store, "bob")).await;
        assert_ne!(fresh.token, s.token);
        assert!(store.get(fresh.token).await.is_some());
    }

    #[tokio::test]
    async fn delete_revokes() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let s = store.put_if_absent(session(&store, "bob")).await;

        assert!(store.delete(s.token).await);
        assert!(store.get(s.token).await.is_none());
        assert!(!store.delete(s.token).await);
    }

    #[tokio::test]
    async fn delete_by_username_leaves_other_users_alone() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let bob = store.put_if_absent(session(&store, "bob")).await;
        let alice = store.put_if_absent(session(&store, "alice")).await;

        assert_eq!(store.delete_by_username("bob").await, 1);
        assert!(store.get(bob.token).await.is_none());
        assert!(store.get(alice.token).await.is_some());
        assert_eq!(store.delete_by_username("bob").await, 0);
    }
}
