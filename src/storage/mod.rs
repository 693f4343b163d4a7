// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence layer: an embedded redb database with typed repositories.

mod db;
mod history;
mod registry;
mod requests;
mod users;

pub use db::{CustodyDb, StoreError, StoreResult};
pub use history::ReviewRecord;
pub use registry::{Account, Customer, Miner, MINER_WALLET_TYPES, WALLET_TYPES};
pub use requests::{BalanceRequest, RequestKind, RequestStatus};
pub use users::UserRecord;
