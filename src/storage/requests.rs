// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pending transfer and withdraw requests, plus the status transitions that
//! drive the approval workflow.
//!
//! A request moves `created -> submitting -> accepted` on approval,
//! `created -> rejected` on rejection. `accepted` and `rejected` are
//! terminal. Every transition is a compare-and-set inside one write
//! transaction, so two concurrent reviewers cannot both win.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::db::{
    all_json, get_json, put_json, CustodyDb, StoreError, StoreResult, HISTORY_CID_INDEX,
    REVIEW_HISTORY, TRANSFER_REQUESTS, WITHDRAW_REQUESTS,
};
use super::history::ReviewRecord;

/// Lifecycle state of a balance-movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting review.
    Created,
    /// A reviewer won the race and the chain submission is in flight.
    Submitting,
    /// Submitted on chain and recorded. Terminal.
    Accepted,
    /// Declined without any chain activity. Terminal.
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Created => "created",
            RequestStatus::Submitting => "submitting",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which movement a request describes. Transfers and withdrawals share the
/// same shape and lifecycle but live in separate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Transfer,
    Withdraw,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Transfer => "transfer",
            RequestKind::Withdraw => "withdraw",
        }
    }

    fn table(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            RequestKind::Transfer => TRANSFER_REQUESTS,
            RequestKind::Withdraw => WITHDRAW_REQUESTS,
        }
    }
}

/// A pending balance movement awaiting dual control.
///
/// For transfers, `source`/`dest` are the sending and receiving addresses.
/// For withdrawals, `source` is the miner actor and `dest` the owner address
/// the funds land on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceRequest {
    pub id: String,
    pub creator: String,
    pub reviewer: String,
    pub source: String,
    pub dest: String,
    pub amount: f64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl CustodyDb {
    pub fn add_request(&self, kind: RequestKind, request: &BalanceRequest) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(kind.table())?;
            if table.get(request.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "{} request {}",
                    kind.as_str(),
                    request.id
                )));
            }
            put_json(&mut table, &request.id, request)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn request(&self, kind: RequestKind, id: &str) -> StoreResult<BalanceRequest> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(kind.table())?;
        get_json(&table, id)
            .and_then(|r| r.ok_or_else(|| StoreError::NotFound(format!("request {id}"))))
    }

    pub fn list_requests(&self, kind: RequestKind) -> StoreResult<Vec<BalanceRequest>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(kind.table())?;
        all_json(&table)
    }

    /// Compare-and-set the status of a request.
    ///
    /// Fails with [`StoreError::InvalidTransition`] carrying the observed
    /// status when the request is not in `expect`.
    pub fn transition_request(
        &self,
        kind: RequestKind,
        id: &str,
        expect: RequestStatus,
        next: RequestStatus,
    ) -> StoreResult<BalanceRequest> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut table = txn.open_table(kind.table())?;
            let mut request: BalanceRequest = get_json(&table, id)?
                .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
            if request.status != expect {
                return Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    found: request.status.to_string(),
                });
            }
            request.status = next;
            put_json(&mut table, id, &request)?;
            request
        };
        txn.commit()?;
        Ok(updated)
    }

    /// Finalize an approval: move the request from `submitting` to
    /// `accepted` and write its review record and cid index entry, all in
    /// one transaction. Called exactly once per request after the chain
    /// submission succeeded.
    pub fn accept_with_history(
        &self,
        kind: RequestKind,
        id: &str,
        record: &ReviewRecord,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut requests = txn.open_table(kind.table())?;
            let mut request: BalanceRequest = get_json(&requests, id)?
                .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
            if request.status != RequestStatus::Submitting {
                return Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    found: request.status.to_string(),
                });
            }
            request.status = RequestStatus::Accepted;
            put_json(&mut requests, id, &request)?;

            let mut history = txn.open_table(REVIEW_HISTORY)?;
            if history.get(id)?.is_some() {
                return Err(StoreError::AlreadyExists(format!("review record {id}")));
            }
            put_json(&mut history, id, record)?;

            let mut index = txn.open_table(HISTORY_CID_INDEX)?;
            index.insert(record.cid.as_str(), id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Finalize a rejection: move the request from `created` straight to
    /// `rejected` and write its review record. No cid is indexed because no
    /// chain submission happened.
    pub fn reject_with_history(
        &self,
        kind: RequestKind,
        id: &str,
        record: &ReviewRecord,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut requests = txn.open_table(kind.table())?;
            let mut request: BalanceRequest = get_json(&requests, id)?
                .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
            if request.status != RequestStatus::Created {
                return Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    found: request.status.to_string(),
                });
            }
            request.status = RequestStatus::Rejected;
            put_json(&mut requests, id, &request)?;

            let mut history = txn.open_table(REVIEW_HISTORY)?;
            if history.get(id)?.is_some() {
                return Err(StoreError::AlreadyExists(format!("review record {id}")));
            }
            put_json(&mut history, id, record)?;
        }
        txn.commit()?;
        Ok(())
    }
}
