// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User records keyed by username.

use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::db::{all_json, get_json, put_json, CustodyDb, StoreError, StoreResult, USERS};
use crate::auth::Role;

/// A stored user. The username is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl CustodyDb {
    /// Insert a new user. Fails with [`StoreError::AlreadyExists`] if the
    /// username is taken; the check and the insert share one write
    /// transaction.
    pub fn add_user(&self, user: &UserRecord) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USERS)?;
            if table.get(user.username.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "user {}",
                    user.username
                )));
            }
            put_json(&mut table, &user.username, user)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn user(&self, username: &str) -> StoreResult<UserRecord> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS)?;
        get_json(&table, username)?
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    /// Overwrite an existing user's password and role.
    pub fn update_user(&self, user: &UserRecord) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USERS)?;
            if table.get(user.username.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("user {}", user.username)));
            }
            put_json(&mut table, &user.username, user)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn delete_user(&self, username: &str) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USERS)?;
            if table.remove(username)?.is_none() {
                return Err(StoreError::NotFound(format!("user {username}")));
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS)?;
        all_json(&table)
    }

    pub fn users_by_role(&self, role: &Role) -> StoreResult<Vec<UserRecord>> {
        Ok(self
            .list_users()?
            .into_iter()
            .filter(|u| &u.role == role)
            .collect())
    }
}
