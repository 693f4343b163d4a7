// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain access: the executor trait and its Lotus JSON-RPC implementation.

mod executor;
mod lotus;
mod types;

pub use executor::LedgerExecutor;
pub use lotus::LotusExecutor;
pub use types::{
    atto_to_fil, bump_gas, fil_to_atto, ExecutorError, PendingMessage, SubmissionReceipt,
};
