// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The chain executor seam.
//!
//! The approval workflow talks to the chain only through this trait, so
//! tests swap in a mock and the workflow logic never sees an HTTP client.

use async_trait::async_trait;

use super::types::{ExecutorError, PendingMessage, SubmissionReceipt};

#[async_trait]
pub trait LedgerExecutor: Send + Sync {
    /// Push a transfer of `amount` FIL from `from` to `to`. Returns the
    /// submission receipt once the node accepts the message into its pool.
    async fn send(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<SubmissionReceipt, ExecutorError>;

    /// Withdraw `amount` FIL of available balance from a miner actor to its
    /// owner address.
    async fn withdraw(
        &self,
        miner: &str,
        owner: &str,
        amount: f64,
    ) -> Result<SubmissionReceipt, ExecutorError>;

    /// Spendable balance of a wallet address, in attoFIL.
    async fn balance(&self, address: &str) -> Result<String, ExecutorError>;

    /// Available (withdrawable) balance of a miner actor, in attoFIL.
    async fn miner_available(&self, miner: &str) -> Result<String, ExecutorError>;

    /// Look up a message in the pending pool.
    /// [`ExecutorError::NotPending`] when it is not there.
    async fn pending_message(&self, cid: &str) -> Result<PendingMessage, ExecutorError>;

    /// Replace a pending message with identical content but bumped gas
    /// terms. Returns the cid of the replacement.
    async fn replace_fee(
        &self,
        sender: &str,
        nonce: u64,
        gas_limit: i64,
        gas_fee_cap: &str,
        gas_premium: &str,
    ) -> Result<String, ExecutorError>;
}
