// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Immutable review decisions, indexed by request id and by message cid.
//!
//! Accepted records carry the chain submission (cid + gas terms); rejected
//! records carry an empty cid. The cid index exists for fee escalation:
//! replacing a stuck message mints a new cid, and the record must follow it.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::db::{
    all_json, get_json, put_json, CustodyDb, StoreError, StoreResult, HISTORY_CID_INDEX,
    REVIEW_HISTORY,
};

/// One decided request. Written exactly once, then only re-pointed to a new
/// cid when a stuck submission is replaced.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewRecord {
    pub request_id: String,
    pub from: String,
    /// Customer that owns the sending address, when known.
    pub from_owner: String,
    pub creator: String,
    pub to: String,
    /// Customer that owns the receiving address, when known.
    pub to_owner: String,
    pub amount: f64,
    /// Message cid of the chain submission. Empty for rejections.
    pub cid: String,
    pub gas_limit: i64,
    pub gas_feecap: String,
    pub gas_premium: String,
    pub reviewer: String,
    pub status: String,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CustodyDb {
    pub fn reviews(&self) -> StoreResult<Vec<ReviewRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REVIEW_HISTORY)?;
        all_json(&table)
    }

    pub fn review(&self, request_id: &str) -> StoreResult<ReviewRecord> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REVIEW_HISTORY)?;
        get_json(&table, request_id)
            .and_then(|r| r.ok_or_else(|| StoreError::NotFound(format!("review {request_id}"))))
    }

    /// Look up the review record that produced a chain message.
    pub fn review_by_cid(&self, cid: &str) -> StoreResult<ReviewRecord> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(HISTORY_CID_INDEX)?;
        let request_id = index
            .get(cid)?
            .map(|g| g.value().to_string())
            .ok_or_else(|| StoreError::NotFound(format!("no review for cid {cid}")))?;
        let table = txn.open_table(REVIEW_HISTORY)?;
        get_json(&table, &request_id)
            .and_then(|r| r.ok_or_else(|| StoreError::NotFound(format!("review {request_id}"))))
    }

    /// After a fee-bumped replacement, move the record and its index entry
    /// from the old cid to the new one, updating the recorded gas terms.
    /// Atomic: the old cid disappears and the new one appears together.
    pub fn repoint_review_cid(
        &self,
        old_cid: &str,
        new_cid: &str,
        gas_limit: i64,
        gas_feecap: &str,
        gas_premium: &str,
    ) -> StoreResult<ReviewRecord> {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut index = txn.open_table(HISTORY_CID_INDEX)?;
            let request_id = index
                .get(old_cid)?
                .map(|g| g.value().to_string())
                .ok_or_else(|| StoreError::NotFound(format!("no review for cid {old_cid}")))?;
            index.remove(old_cid)?;
            index.insert(new_cid, request_id.as_str())?;

            let mut table = txn.open_table(REVIEW_HISTORY)?;
            let mut record: ReviewRecord = get_json(&table, &request_id)?
                .ok_or_else(|| StoreError::NotFound(format!("review {request_id}")))?;
            record.cid = new_cid.to_string();
            record.gas_limit = gas_limit;
            record.gas_feecap = gas_feecap.to_string();
            record.gas_premium = gas_premium.to_string();
            put_json(&mut table, &request_id, &record)?;
            record
        };
        txn.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::requests::{BalanceRequest, RequestKind, RequestStatus};
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> CustodyDb {
        CustodyDb::open(dir.path().join("custody.redb")).unwrap()
    }

    fn accepted(db: &CustodyDb, id: &str, cid: &str) {
        db.add_request(
            RequestKind::Transfer,
            &BalanceRequest {
                id: id.to_string(),
                creator: "alice".to_string(),
                reviewer: "bob".to_string(),
                source: "f1source".to_string(),
                dest: "f1dest".to_string(),
                amount: 1.0,
                status: RequestStatus::Created,
                created_at: Utc::now(),
            },
        )
        .unwrap();
        db.transition_request(
            RequestKind::Transfer,
            id,
            RequestStatus::Created,
            RequestStatus::Submitting,
        )
        .unwrap();
        db.accept_with_history(
            RequestKind::Transfer,
            id,
            &ReviewRecord {
                request_id: id.to_string(),
                from: "f1source".to_string(),
                from_owner: String::new(),
                creator: "alice".to_string(),
                to: "f1dest".to_string(),
                to_owner: String::new(),
                amount: 1.0,
                cid: cid.to_string(),
                gas_limit: 1000,
                gas_feecap: "101".to_string(),
                gas_premium: "100".to_string(),
                reviewer: "bob".to_string(),
                status: "accepted".to_string(),
                time: Utc::now(),
                kind: "transfer".to_string(),
            },
        )
        .unwrap();
    }

    #[test]
    fn review_lookup_by_cid() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        accepted(&db, "r1", "bafyA");

        assert_eq!(db.review_by_cid("bafyA").unwrap().request_id, "r1");
        assert!(matches!(
            db.review_by_cid("bafyZ").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn repoint_moves_index_and_updates_gas() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        accepted(&db, "r1", "bafyA");

        let updated = db
            .repoint_review_cid("bafyA", "bafyB", 2000, "303", "300")
            .unwrap();
        assert_eq!(updated.cid, "bafyB");
        assert_eq!(updated.gas_limit, 2000);

        assert!(db.review_by_cid("bafyA").is_err());
        let record = db.review_by_cid("bafyB").unwrap();
        assert_eq!(record.request_id, "r1");
        assert_eq!(record.gas_feecap, "303");
    }

    #[test]
    fn repoint_unknown_cid_fails() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        assert!(matches!(
            db.repoint_review_cid("bafyZ", "bafyY", 1, "1", "1").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = ReviewRecord {
            request_id: "r1".to_string(),
            from: "f1a".to_string(),
            from_owner: "acme".to_string(),
            creator: "alice".to_string(),
            to: "f1b".to_string(),
            to_owner: String::new(),
            amount: 1.5,
            cid: "bafyA".to_string(),
            gas_limit: 1000,
            gas_feecap: "101".to_string(),
            gas_premium: "100".to_string(),
            reviewer: "bob".to_string(),
            status: "accepted".to_string(),
            time: Utc::now(),
            kind: "transfer".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "transfer");
        assert_eq!(json["gas_feecap"], "101");
        assert_eq!(json["request_id"], "r1");
    }
}
