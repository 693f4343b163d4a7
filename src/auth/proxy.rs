// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and user administration.
//!
//! Login is idempotent per username: while a session is live, repeat logins
//! return the same token. User mutations revoke the subject's live session
//! so stale role snapshots cannot outlive the change.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::roles::{Role, RoleCatalog};
use super::session::{Session, SessionStore};
use crate::error::ApiError;
use crate::storage::{CustodyDb, StoreError, UserRecord};

/// Identity resolved from a session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: Role,
}

/// Shape of the users bootstrap file: the role catalog plus seed users.
#[derive(Debug, Deserialize)]
pub struct Bootstrap {
    pub roles: Vec<Role>,
    pub users: Vec<UserRecord>,
}

impl Bootstrap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let raw = std::fs::read(path.as_ref())
            .map_err(|e| ApiError::Persistence(StoreError::Io(e)))?;
        serde_json::from_slice(&raw).map_err(|e| ApiError::Persistence(StoreError::Serde(e)))
    }
}

/// Gatekeeper for every operation that carries a session token.
pub struct AuthProxy {
    db: Arc<CustodyDb>,
    sessions: Arc<dyn SessionStore>,
    catalog: RoleCatalog,
    session_expiry: Box<dyn Fn() -> chrono::DateTime<chrono::Utc> + Send + Sync>,
}

impl AuthProxy {
    pub fn new(
        db: Arc<CustodyDb>,
        sessions: Arc<dyn SessionStore>,
        catalog: RoleCatalog,
        session_ttl: std::time::Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(session_ttl).unwrap_or(chrono::Duration::hours(8));
        Self {
            db,
            sessions,
            catalog,
            session_expiry: Box::new(move || chrono::Utc::now() + ttl),
        }
    }

    /// Seed users from the bootstrap file. Existing usernames are left
    /// untouched, so restarts never clobber password changes.
    pub fn seed_users(&self, bootstrap: &Bootstrap) -> Result<usize, ApiError> {
        let mut seeded = 0;
        for user in &bootstrap.users {
            if !self.catalog.contains(&user.role) {
                return Err(ApiError::validation(format!(
                    "bootstrap user {} has unknown role {}",
                    user.username, user.role
                )));
            }
            match self.db.add_user(user) {
                Ok(()) => seeded += 1,
                Err(StoreError::AlreadyExists(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(seeded)
    }

    /// Authenticate and mint (or return) the live session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let user = match self.db.user(username) {
            Ok(user) => user,
            // Unknown user and wrong password are indistinguishable.
            Err(StoreError::NotFound(_)) => {
                return Err(ApiError::validation("invalid username or password"))
            }
            Err(e) => return Err(e.into()),
        };
        if user.password != password {
            return Err(ApiError::validation("invalid username or password"));
        }

        // The store inserts the candidate only if the username has no live
        // session; concurrent logins converge on one token.
        let candidate = Session {
            token: Uuid::new_v4(),
            username: user.username.clone(),
            role: user.role.clone(),
            expires_at: (self.session_expiry)(),
        };
        Ok(self.sessions.put_if_absent(candidate).await)
    }

    /// Revoke a session token.
    pub async fn logout(&self, token: Uuid) -> Result<(), ApiError> {
        if self.sessions.delete(token).await {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }

    /// Resolve a token to its identity. Expired or unknown tokens fail with
    /// [`ApiError::NotAuthenticated`].
    pub async fn user_by_token(&self, token: Uuid) -> Result<AuthenticatedUser, ApiError> {
        let session = self.sessions.get(token).await.ok_or(ApiError::NotAuthenticated)?;
        Ok(AuthenticatedUser {
            username: session.username,
            role: session.role,
        })
    }

    pub fn user_by_username(&self, username: &str) -> Result<UserRecord, ApiError> {
        Ok(self.db.user(username)?)
    }

    pub async fn require_admin(&self, token: Uuid) -> Result<AuthenticatedUser, ApiError> {
        let actor = self.user_by_token(token).await?;
        if !actor.role.is_admin() {
            return Err(ApiError::permission_denied("admin role required"));
        }
        Ok(actor)
    }

    fn validate_user_input(&self, username: &str, password: &str, role: &Role) -> Result<(), ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::validation("username and password are required"));
        }
        if !self.catalog.contains(role) {
            return Err(ApiError::validation(format!("unknown role {role}")));
        }
        Ok(())
    }

    pub async fn add_user(
        &self,
        token: Uuid,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), ApiError> {
        self.require_admin(token).await?;
        self.validate_user_input(username, password, &role)?;
        self.db.add_user(&UserRecord {
            username: username.to_string(),
            password: password.to_string(),
            role,
        })?;
        Ok(())
    }

    /// Replace a user's password and role. The user's live session (if any)
    /// is revoked.
    pub async fn change_user(
        &self,
        token: Uuid,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), ApiError> {
        self.require_admin(token).await?;
        self.validate_user_input(username, password, &role)?;
        self.db.update_user(&UserRecord {
            username: username.to_string(),
            password: password.to_string(),
            role,
        })?;
        self.revoke_session_of(username).await;
        Ok(())
    }

    pub async fn delete_user(&self, token: Uuid, username: &str) -> Result<(), ApiError> {
        let actor = self.require_admin(token).await?;
        if actor.username == username {
            return Err(ApiError::validation("cannot delete the calling admin"));
        }
        self.db.delete_user(username)?;
        self.revoke_session_of(username).await;
        Ok(())
    }

    pub async fn list_users(&self, token: Uuid) -> Result<Vec<UserRecord>, ApiError> {
        self.require_admin(token).await?;
        Ok(self.db.list_users()?)
    }

    /// Usernames holding the reviewer role. Empty is an error: a desk with
    /// no reviewers cannot run the workflow.
    pub async fn list_reviewers(&self, token: Uuid) -> Result<Vec<String>, ApiError> {
        self.user_by_token(token).await?;
        let reviewers = self.db.users_by_role(&Role::from(Role::REVIEWER))?;
        if reviewers.is_empty() {
            return Err(ApiError::not_found("no reviewers available"));
        }
        Ok(reviewers.into_iter().map(|u| u.username).collect())
    }

    pub async fn list_roles(&self, token: Uuid) -> Result<Vec<Role>, ApiError> {
        self.user_by_token(token).await?;
        Ok(self.catalog.roles().to_vec())
    }

    async fn revoke_session_of(&self, username: &str) {
        self.sessions.delete_by_username(username).await;
    }
}
