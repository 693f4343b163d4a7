// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The dual-control approval workflow.
//!
//! An accounter creates a request naming one reviewer; only that reviewer
//! can decide it. Confirmation submits to the chain at most once: the
//! request is parked in `submitting` before the executor call, and only a
//! request observed in `created` can be parked. Rejection never touches the
//! chain.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{AuthProxy, AuthenticatedUser};
use crate::chain::{bump_gas, ExecutorError, LedgerExecutor, SubmissionReceipt};
use crate::error::ApiError;
use crate::storage::{
    BalanceRequest, CustodyDb, RequestKind, RequestStatus, ReviewRecord, StoreError,
};

/// Caller-supplied gas terms for fee escalation. `None` fields fall back
/// to the automatic bump.
#[derive(Debug, Clone, Default)]
pub struct GasOverride {
    pub gas_limit: Option<i64>,
    pub gas_feecap: Option<String>,
    pub gas_premium: Option<String>,
}

pub struct WorkflowEngine {
    db: Arc<CustodyDb>,
    executor: Arc<dyn LedgerExecutor>,
    auth: Arc<AuthProxy>,
}

impl WorkflowEngine {
    pub fn new(db: Arc<CustodyDb>, executor: Arc<dyn LedgerExecutor>, auth: Arc<AuthProxy>) -> Self {
        Self { db, executor, auth }
    }

    /// Create a request awaiting review.
    ///
    /// Validation runs before authentication so malformed input never costs
    /// a session lookup; nothing is persisted unless every check passes.
    pub async fn create_request(
        &self,
        token: Uuid,
        kind: RequestKind,
        source: &str,
        dest: &str,
        reviewer: &str,
        amount: f64,
    ) -> Result<BalanceRequest, ApiError> {
        if source.is_empty() || dest.is_empty() {
            return Err(ApiError::validation("source and destination are required"));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::validation("amount must be positive"));
        }
        if reviewer.is_empty() {
            return Err(ApiError::validation("a reviewer must be named"));
        }

        let actor = self.auth.user_by_token(token).await?;
        if !actor.role.is_accounter() {
            return Err(ApiError::permission_denied("accounter role required"));
        }

        let designated = self.auth.user_by_username(reviewer)?;
        if !designated.role.is_reviewer() {
            return Err(ApiError::validation(format!(
                "{reviewer} does not hold the reviewer role"
            )));
        }

        let request = BalanceRequest {
            id: Uuid::new_v4().to_string(),
            creator: actor.username,
            reviewer: reviewer.to_string(),
            source: source.to_string(),
            dest: dest.to_string(),
            amount,
            status: RequestStatus::Created,
            created_at: Utc::now(),
        };
        self.db.add_request(kind, &request)?;

        tracing::info!(
            request_id = %request.id,
            kind = kind.as_str(),
            creator = %request.creator,
            reviewer = %request.reviewer,
            amount,
            "request created"
        );
        Ok(request)
    }

    /// Approve a request and submit it to the chain.
    ///
    /// The `created -> submitting` compare-and-set is the at-most-once
    /// gate: a concurrent confirm, a re-confirm after failure-to-record, or
    /// a confirm of a decided request all lose the CAS and surface as
    /// `Conflict` without reaching the executor.
    pub async fn confirm_request(
        &self,
        token: Uuid,
        kind: RequestKind,
        request_id: &str,
    ) -> Result<ReviewRecord, ApiError> {
        let actor = self.authorize_decision(token, kind, request_id).await?;

        let request = self.db.transition_request(
            kind,
            request_id,
            RequestStatus::Created,
            RequestStatus::Submitting,
        )?;

        let submitted = match kind {
            RequestKind::Transfer => {
                self.executor
                    .send(&request.source, &request.dest, request.amount)
                    .await
            }
            RequestKind::Withdraw => {
                self.executor
                    .withdraw(&request.source, &request.dest, request.amount)
                    .await
            }
        };

        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(e) => {
                // Nothing hit the chain; put the request back up for review.
                if let Err(revert) = self.db.transition_request(
                    kind,
                    request_id,
                    RequestStatus::Submitting,
                    RequestStatus::Created,
                ) {
                    tracing::error!(
                        request_id,
                        error = %revert,
                        "failed to revert request after executor failure"
                    );
                }
                return Err(e.into());
            }
        };

        let record =
            self.build_record(&request, kind, &actor.username, "accepted", Some(&receipt));
        if let Err(e) = self.db.accept_with_history(kind, request_id, &record) {
            // The message is on chain but we could not record the decision.
            // The request stays in `submitting` so nobody re-sends it.
            return Err(ApiError::SubmittedUnrecorded {
                cid: receipt.cid,
                source: e,
            });
        }

        tracing::info!(
            request_id,
            kind = kind.as_str(),
            reviewer = %actor.username,
            cid = %record.cid,
            "request accepted and submitted"
        );
        Ok(record)
    }

    /// Decline a request. No chain interaction, ever.
    pub async fn reject_request(
        &self,
        token: Uuid,
        kind: RequestKind,
        request_id: &str,
    ) -> Result<ReviewRecord, ApiError> {
        let actor = self.authorize_decision(token, kind, request_id).await?;

        let request = self.db.request(kind, request_id)?;
        let record = self.build_record(&request, kind, &actor.username, "rejected", None);
        self.db.reject_with_history(kind, request_id, &record)?;

        tracing::info!(
            request_id,
            kind = kind.as_str(),
            reviewer = %actor.username,
            "request rejected"
        );
        Ok(record)
    }

    /// Replace a stuck accepted submission with a fee-bumped copy and move
    /// the review record to the new cid.
    ///
    /// Callers may pin any of the gas terms; omitted terms default to a 25%
    /// premium bump with the fee cap lifted to cover it.
    pub async fn escalate_fee(
        &self,
        token: Uuid,
        cid: &str,
        gas: GasOverride,
    ) -> Result<ReviewRecord, ApiError> {
        self.auth.user_by_token(token).await?;

        // Unknown cids fail here, before any chain call.
        self.db.review_by_cid(cid)?;

        let pending = self.executor.pending_message(cid).await?;
        let (bumped_cap, bumped_premium) = bump_gas(&pending.gas_fee_cap, &pending.gas_premium)?;
        let gas_limit = gas.gas_limit.unwrap_or(pending.gas_limit);
        let fee_cap = gas.gas_feecap.unwrap_or(bumped_cap);
        let premium = gas.gas_premium.unwrap_or(bumped_premium);

        let new_cid = self
            .executor
            .replace_fee(&pending.sender, pending.nonce, gas_limit, &fee_cap, &premium)
            .await?;

        let record = self
            .db
            .repoint_review_cid(cid, &new_cid, gas_limit, &fee_cap, &premium)?;
        tracing::info!(old_cid = cid, new_cid = %new_cid, "submission replaced with bumped fees");
        Ok(record)
    }

    /// Whether an accepted submission is still waiting in the message pool.
    pub async fn submission_pending(&self, token: Uuid, cid: &str) -> Result<bool, ApiError> {
        self.auth.user_by_token(token).await?;
        self.db.review_by_cid(cid)?;
        match self.executor.pending_message(cid).await {
            Ok(_) => Ok(true),
            Err(ExecutorError::NotPending(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_requests(
        &self,
        token: Uuid,
        kind: RequestKind,
    ) -> Result<Vec<BalanceRequest>, ApiError> {
        self.auth.user_by_token(token).await?;
        Ok(self.db.list_requests(kind)?)
    }

    pub async fn list_history(&self, token: Uuid) -> Result<Vec<ReviewRecord>, ApiError> {
        self.auth.user_by_token(token).await?;
        Ok(self.db.reviews()?)
    }

    /// Common gate for confirm/reject: the actor must hold the reviewer
    /// role and be the reviewer the request names.
    async fn authorize_decision(
        &self,
        token: Uuid,
        kind: RequestKind,
        request_id: &str,
    ) -> Result<AuthenticatedUser, ApiError> {
        let actor = self.auth.user_by_token(token).await?;
        if !actor.role.is_reviewer() {
            return Err(ApiError::permission_denied("reviewer role required"));
        }
        let request = self.db.request(kind, request_id)?;
        if request.reviewer != actor.username {
            return Err(ApiError::permission_denied(format!(
                "request {request_id} is assigned to {}",
                request.reviewer
            )));
        }
        Ok(actor)
    }

    fn build_record(
        &self,
        request: &BalanceRequest,
        kind: RequestKind,
        reviewer: &str,
        status: &str,
        receipt: Option<&SubmissionReceipt>,
    ) -> ReviewRecord {
        ReviewRecord {
            request_id: request.id.clone(),
            from: request.source.clone(),
            from_owner: self.owner_name(&request.source),
            creator: request.creator.clone(),
            to: request.dest.clone(),
            to_owner: self.owner_name(&request.dest),
            amount: request.amount,
            cid: receipt.map(|r| r.cid.clone()).unwrap_or_default(),
            gas_limit: receipt.map(|r| r.gas_limit).unwrap_or_default(),
            gas_feecap: receipt.map(|r| r.gas_fee_cap.clone()).unwrap_or_default(),
            gas_premium: receipt.map(|r| r.gas_premium.clone()).unwrap_or_default(),
            reviewer: reviewer.to_string(),
            status: status.to_string(),
            time: Utc::now(),
            kind: kind.as_str().to_string(),
        }
    }

    /// Customer name behind an address, for history enrichment. Best
    /// effort: unregistered addresses yield an empty owner.
    fn owner_name(&self, address: &str) -> String {
        let account = match self.db.account(address) {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return String::new(),
            Err(e) => {
                tracing::warn!(address, error = %e, "owner lookup failed");
                return String::new();
            }
        };
        match self.db.customer(&account.customer_id) {
            Ok(customer) => customer.name,
            Err(e) => {
                tracing::warn!(address, error = %e, "customer lookup failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Bootstrap, InMemorySessionStore, Role, RoleCatalog};
    use crate::chain::PendingMessage;
    use crate::storage::UserRecord;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct MockExecutor {
        send_calls: AtomicUsize,
        withdraw_calls: AtomicUsize,
        replace_calls: AtomicUsize,
        fail_submissions: AtomicBool,
        available_fil: Mutex<f64>,
        pool: Mutex<HashMap<String, PendingMessage>>,
        next_cid: Mutex<u32>,
    }

    impl MockExecutor {
        fn new() -> Self {
            Self {
                send_calls: AtomicUsize::new(0),
                withdraw_calls: AtomicUsize::new(0),
                replace_calls: AtomicUsize::new(0),
                fail_submissions: AtomicBool::new(false),
                available_fil: Mutex::new(1_000.0),
                pool: Mutex::new(HashMap::new()),
                next_cid: Mutex::new(0),
            }
        }

        fn mint_cid(&self) -> String {
            let mut n = self.next_cid.lock().unwrap();
            *n += 1;
            format!("bafymock{n}")
        }

        fn receipt(&self, sender: &str) -> SubmissionReceipt {
            let cid = self.mint_cid();
            self.pool.lock().unwrap().insert(
                cid.clone(),
                PendingMessage {
                    cid: cid.clone(),
                    sender: sender.to_string(),
                    nonce: 7,
                    gas_limit: 1000,
                    gas_fee_cap: "100".to_string(),
                    gas_premium: "100".to_string(),
                },
            );
            SubmissionReceipt {
                cid,
                gas_limit: 1000,
                gas_fee_cap: "100".to_string(),
                gas_premium: "100".to_string(),
            }
        }
    }

    #[async_trait]
    impl LedgerExecutor for MockExecutor {
        async fn send(
            &self,
            from: &str,
            _to: &str,
            _amount: f64,
        ) -> Result<SubmissionReceipt, ExecutorError> {
            self.send_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_submissions.load(Ordering::SeqCst) {
                return Err(ExecutorError::Rpc("injected failure".into()));
            }
            Ok(self.receipt(from))
        }

        async fn withdraw(
            &self,
            _miner: &str,
            owner: &str,
            amount: f64,
        ) -> Result<SubmissionReceipt, ExecutorError> {
            self.withdraw_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_submissions.load(Ordering::SeqCst) {
                return Err(ExecutorError::Rpc("injected failure".into()));
            }
            let available = *self.available_fil.lock().unwrap();
            if amount > available {
                return Err(ExecutorError::InsufficientFunds {
                    available: available.to_string(),
                    requested: amount.to_string(),
                });
            }
            Ok(self.receipt(owner))
        }

        async fn balance(&self, _address: &str) -> Result<String, ExecutorError> {
            Ok("1000000000000000000000".to_string())
        }

        async fn miner_available(&self, _miner: &str) -> Result<String, ExecutorError> {
            Ok("1000000000000000000000".to_string())
        }

        async fn pending_message(&self, cid: &str) -> Result<PendingMessage, ExecutorError> {
            self.pool
                .lock()
                .unwrap()
                .get(cid)
                .cloned()
                .ok_or_else(|| ExecutorError::NotPending(cid.to_string()))
        }

        async fn replace_fee(
            &self,
            sender: &str,
            nonce: u64,
            gas_limit: i64,
            gas_fee_cap: &str,
            gas_premium: &str,
        ) -> Result<String, ExecutorError> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            let mut pool = self.pool.lock().unwrap();
            let old = pool
                .iter()
                .find(|(_, m)| m.sender == sender && m.nonce == nonce)
                .map(|(cid, _)| cid.clone())
                .ok_or_else(|| ExecutorError::NotPending(format!("{sender} nonce {nonce}")))?;
            pool.remove(&old);
            let cid = self.mint_cid();
            pool.insert(
                cid.clone(),
                PendingMessage {
                    cid: cid.clone(),
                    sender: sender.to_string(),
                    nonce,
                    gas_limit,
                    gas_fee_cap: gas_fee_cap.to_string(),
                    gas_premium: gas_premium.to_string(),
                },
            );
            Ok(cid)
        }
    }

    /// Delegates to [`MockExecutor`] but moves the request out of
    /// `submitting` behind the engine's back right after the send, so the
    /// decision write that follows is guaranteed to fail.
    struct RecorderBreaker {
        inner: MockExecutor,
        db: Arc<CustodyDb>,
        request_id: String,
    }

    #[async_trait]
    impl LedgerExecutor for RecorderBreaker {
        async fn send(
            &self,
            from: &str,
            to: &str,
            amount: f64,
        ) -> Result<SubmissionReceipt, ExecutorError> {
            let receipt = self.inner.send(from, to, amount).await?;
            self.db
                .transition_request(
                    RequestKind::Transfer,
                    &self.request_id,
                    RequestStatus::Submitting,
                    RequestStatus::Created,
                )
                .unwrap();
            Ok(receipt)
        }

        async fn withdraw(
            &self,
            miner: &str,
            owner: &str,
            amount: f64,
        ) -> Result<SubmissionReceipt, ExecutorError> {
            self.inner.withdraw(miner, owner, amount).await
        }

        async fn balance(&self, address: &str) -> Result<String, ExecutorError> {
            self.inner.balance(address).await
        }

        async fn miner_available(&self, miner: &str) -> Result<String, ExecutorError> {
            self.inner.miner_available(miner).await
        }

        async fn pending_message(&self, cid: &str) -> Result<PendingMessage, ExecutorError> {
            self.inner.pending_message(cid).await
        }

        async fn replace_fee(
            &self,
            sender: &str,
            nonce: u64,
            gas_limit: i64,
            gas_fee_cap: &str,
            gas_premium: &str,
        ) -> Result<String, ExecutorError> {
            self.inner
                .replace_fee(sender, nonce, gas_limit, gas_fee_cap, gas_premium)
                .await
        }
    }

    struct Fixture {
        engine: WorkflowEngine,
        auth: Arc<AuthProxy>,
        executor: Arc<MockExecutor>,
        db: Arc<CustodyDb>,
        _dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let db = Arc::new(CustodyDb::open(dir.path().join("custody.redb")).unwrap());
            let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(60)));
            let auth = Arc::new(AuthProxy::new(
                db.clone(),
                sessions,
                RoleCatalog::default(),
                Duration::from_secs(60),
            ));
            auth.seed_users(&Bootstrap {
                roles: RoleCatalog::default().roles().to_vec(),
                users: vec![
                    UserRecord {
                        username: "alice".into(),
                        password: "pw".into(),
                        role: Role::from(Role::ACCOUNTER),
                    },
                    UserRecord {
                        username: "bob".into(),
                        password: "pw".into(),
                        role: Role::from(Role::REVIEWER),
                    },
                    UserRecord {
                        username: "carol".into(),
                        password: "pw".into(),
                        role: Role::from(Role::REVIEWER),
                    },
                ],
            })
            .unwrap();

            let executor = Arc::new(MockExecutor::new());
            let engine = WorkflowEngine::new(db.clone(), executor.clone(), auth.clone());
            Self {
                engine,
                auth,
                executor,
                db,
                _dir: dir,
            }
        }

        async fn login(&self, username: &str) -> Uuid {
            self.auth.login(username, "pw").await.unwrap().token
        }

        async fn created_request(&self, kind: RequestKind) -> (Uuid, String) {
            let alice = self.login("alice").await;
            let request = self
                .engine
                .create_request(alice, kind, "f1source", "f1dest", "bob", 2.5)
                .await
                .unwrap();
            (alice, request.id)
        }
    }

    #[tokio::test]
    async fn happy_path_transfer() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;

        let bob = fx.login("bob").await;
        let record = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();

        assert_eq!(record.status, "accepted");
        assert!(!record.cid.is_empty());
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fx.db.request(RequestKind::Transfer, &id).unwrap().status,
            RequestStatus::Accepted
        );
        assert_eq!(fx.db.review_by_cid(&record.cid).unwrap().request_id, id);
    }

    #[tokio::test]
    async fn invalid_amount_never_persists() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;

        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = fx
                .engine
                .create_request(alice, RequestKind::Transfer, "f1a", "f1b", "bob", amount)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
        assert!(fx.db.list_requests(RequestKind::Transfer).unwrap().is_empty());
    }

    #[tokio::test]
    async fn creator_must_be_accounter() {
        let fx = Fixture::new();
        let bob = fx.login("bob").await;
        let err = fx
            .engine
            .create_request(bob, RequestKind::Transfer, "f1a", "f1b", "carol", 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn reviewer_must_hold_reviewer_role() {
        let fx = Fixture::new();
        let alice = fx.login("alice").await;
        let err = fx
            .engine
            .create_request(alice, RequestKind::Transfer, "f1a", "f1b", "alice", 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = fx
            .engine
            .create_request(alice, RequestKind::Transfer, "f1a", "f1b", "ghost", 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_the_named_reviewer_decides() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;

        let carol = fx.login("carol").await;
        let err = fx
            .engine
            .confirm_request(carol, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied(_)));
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 0);

        let alice = fx.login("alice").await;
        let err = fx
            .engine
            .reject_request(alice, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn double_confirm_is_conflict_with_single_submission() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;

        fx.engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();
        let err = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.db.reviews().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submitting_request_refuses_both_decisions() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;

        // Park the request as a submission in flight.
        fx.db
            .transition_request(
                RequestKind::Transfer,
                &id,
                RequestStatus::Created,
                RequestStatus::Submitting,
            )
            .unwrap();

        let err = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = fx
            .engine
            .reject_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Neither decision reached the chain or wrote history.
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 0);
        assert!(fx.db.reviews().unwrap().is_empty());
        assert_eq!(
            fx.db.request(RequestKind::Transfer, &id).unwrap().status,
            RequestStatus::Submitting
        );
    }

    #[tokio::test]
    async fn unrecorded_submission_is_surfaced_distinctly() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;

        let breaker = Arc::new(RecorderBreaker {
            inner: MockExecutor::new(),
            db: fx.db.clone(),
            request_id: id.clone(),
        });
        let engine = WorkflowEngine::new(fx.db.clone(), breaker.clone(), fx.auth.clone());

        let err = engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        match err {
            ApiError::SubmittedUnrecorded { cid, .. } => assert!(!cid.is_empty()),
            other => panic!("expected submitted_unrecorded, got {other:?}"),
        }

        // The send happened exactly once, but no decision was recorded.
        assert_eq!(breaker.inner.send_calls.load(Ordering::SeqCst), 1);
        assert!(fx.db.reviews().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reject_never_touches_the_chain() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Withdraw).await;
        let bob = fx.login("bob").await;

        let record = fx
            .engine
            .reject_request(bob, RequestKind::Withdraw, &id)
            .await
            .unwrap();

        assert_eq!(record.status, "rejected");
        assert!(record.cid.is_empty());
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.executor.withdraw_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            fx.db.request(RequestKind::Withdraw, &id).unwrap().status,
            RequestStatus::Rejected
        );

        // A decided request refuses a second decision.
        let err = fx
            .engine
            .confirm_request(bob, RequestKind::Withdraw, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(fx.executor.withdraw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn executor_failure_reverts_to_created() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;

        fx.executor.fail_submissions.store(true, Ordering::SeqCst);
        let err = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Executor(_)));

        // Back to created: a retry succeeds and submits exactly once more.
        assert_eq!(
            fx.db.request(RequestKind::Transfer, &id).unwrap().status,
            RequestStatus::Created
        );
        fx.executor.fail_submissions.store(false, Ordering::SeqCst);
        fx.engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();
        assert_eq!(fx.executor.send_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn insufficient_withdrawal_leaves_request_reviewable() {
        let fx = Fixture::new();
        *fx.executor.available_fil.lock().unwrap() = 1.0;
        let (_, id) = fx.created_request(RequestKind::Withdraw).await;
        let bob = fx.login("bob").await;

        let err = fx
            .engine
            .confirm_request(bob, RequestKind::Withdraw, &id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Executor(ExecutorError::InsufficientFunds { .. })
        ));
        assert_eq!(
            fx.db.request(RequestKind::Withdraw, &id).unwrap().status,
            RequestStatus::Created
        );
        assert!(fx.db.reviews().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fee_escalation_repoints_history() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;
        let record = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();

        let updated = fx.engine.escalate_fee(bob, &record.cid, GasOverride::default()).await.unwrap();
        assert_ne!(updated.cid, record.cid);
        assert_eq!(updated.request_id, id);
        assert_eq!(fx.executor.replace_calls.load(Ordering::SeqCst), 1);

        // The history follows the replacement; the old cid is gone.
        assert!(fx.db.review_by_cid(&record.cid).is_err());
        assert_eq!(fx.db.review_by_cid(&updated.cid).unwrap().request_id, id);

        // Escalation is repeatable on the new cid.
        let again = fx.engine.escalate_fee(bob, &updated.cid, GasOverride::default()).await.unwrap();
        assert_ne!(again.cid, updated.cid);
    }

    #[tokio::test]
    async fn fee_escalation_honors_pinned_gas_terms() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;
        let record = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();

        let gas = GasOverride {
            gas_limit: Some(5000),
            gas_feecap: Some("999".to_string()),
            gas_premium: Some("900".to_string()),
        };
        let updated = fx.engine.escalate_fee(bob, &record.cid, gas).await.unwrap();
        assert_eq!(updated.gas_limit, 5000);
        assert_eq!(updated.gas_feecap, "999");
        assert_eq!(updated.gas_premium, "900");
    }

    #[tokio::test]
    async fn fee_escalation_unknown_cid_makes_no_chain_call() {
        let fx = Fixture::new();
        let bob = fx.login("bob").await;

        let err = fx.engine.escalate_fee(bob, "bafyunknown", GasOverride::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(fx.executor.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pending_status_reflects_the_pool() {
        let fx = Fixture::new();
        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;
        let record = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();

        assert!(fx.engine.submission_pending(bob, &record.cid).await.unwrap());

        fx.executor.pool.lock().unwrap().clear();
        assert!(!fx.engine.submission_pending(bob, &record.cid).await.unwrap());
    }

    #[tokio::test]
    async fn history_is_enriched_with_customer_names() {
        let fx = Fixture::new();
        let customer = fx.db.upsert_customer("acme").unwrap();
        fx.db
            .upsert_account(&crate::storage::Account {
                id: "a1".into(),
                address: "f1source".into(),
                wallet_type: "accounting".into(),
                customer_id: customer.id.clone(),
                miner_id: String::new(),
                miner_wallet_type: String::new(),
                have_private_key: false,
            })
            .unwrap();

        let (_, id) = fx.created_request(RequestKind::Transfer).await;
        let bob = fx.login("bob").await;
        let record = fx
            .engine
            .confirm_request(bob, RequestKind::Transfer, &id)
            .await
            .unwrap();

        assert_eq!(record.from_owner, "acme");
        // Unregistered destination: empty owner, not an error.
        assert_eq!(record.to_owner, "");
    }

    #[tokio::test]
    async fn listing_requires_authentication() {
        let fx = Fixture::new();
        let err = fx
            .engine
            .list_requests(Uuid::new_v4(), RequestKind::Transfer)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }
}
