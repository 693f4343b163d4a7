// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: username → serialized UserRecord
//! - `transfer_requests` / `withdraw_requests`: request id → serialized request
//! - `review_history`: request id → serialized ReviewRecord
//! - `history_cid_index`: cid → request id
//! - `customers`: customer id → serialized Customer
//! - `customer_names`: customer name → customer id
//! - `miners`: miner id → serialized Miner
//! - `accounts`: address → serialized Account
//! - `transfer_targets`: address → serialized target list
//!
//! Uniqueness invariants (usernames, customer names, miner ids, addresses)
//! are enforced here with insert-if-absent inside a single write
//! transaction, not in application logic.

use std::fs;
use std::path::Path;

use redb::{Database, ReadableTable, Table, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
pub(crate) const TRANSFER_REQUESTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("transfer_requests");
pub(crate) const WITHDRAW_REQUESTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("withdraw_requests");
pub(crate) const REVIEW_HISTORY: TableDefinition<&str, &[u8]> =
    TableDefinition::new("review_history");
pub(crate) const HISTORY_CID_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("history_cid_index");
pub(crate) const CUSTOMERS: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");
pub(crate) const CUSTOMER_NAMES: TableDefinition<&str, &str> =
    TableDefinition::new("customer_names");
pub(crate) const MINERS: TableDefinition<&str, &[u8]> = TableDefinition::new("miners");
pub(crate) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
pub(crate) const TRANSFER_TARGETS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("transfer_targets");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Status CAS failure: the request was not in the expected state.
    #[error("request {id} is in state {found}")]
    InvalidTransition { id: String, found: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// JSON value helpers
// =============================================================================

pub(crate) fn get_json<T, Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn put_json<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let bytes = serde_json::to_vec(value)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

pub(crate) fn all_json<T, Tbl>(table: &Tbl) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.iter()? {
        let (_, guard) = entry?;
        values.push(serde_json::from_slice(guard.value())?);
    }
    Ok(values)
}

// =============================================================================
// CustodyDb
// =============================================================================

/// Handle to the embedded custody database.
///
/// Typed operations live in the sibling repository modules
/// (`users`, `requests`, `history`, `registry`) as `impl CustodyDb` blocks.
pub struct CustodyDb {
    pub(crate) db: Database,
}

impl CustodyDb {
    /// Open (or create) the database at `path` and ensure all tables exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        // Create every table up front so read transactions never observe a
        // missing table.
        let txn = db.begin_write()?;
        {
            txn.open_table(USERS)?;
            txn.open_table(TRANSFER_REQUESTS)?;
            txn.open_table(WITHDRAW_REQUESTS)?;
            txn.open_table(REVIEW_HISTORY)?;
            txn.open_table(HISTORY_CID_INDEX)?;
            txn.open_table(CUSTOMERS)?;
            txn.open_table(CUSTOMER_NAMES)?;
            txn.open_table(MINERS)?;
            txn.open_table(ACCOUNTS)?;
            txn.open_table(TRANSFER_TARGETS)?;
        }
        txn.commit()?;

        Ok(Self { db })
    }
}
