// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthProxy;
use crate::chain::LedgerExecutor;
use crate::storage::CustodyDb;
use crate::workflow::WorkflowEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CustodyDb>,
    pub auth: Arc<AuthProxy>,
    pub engine: Arc<WorkflowEngine>,
    pub executor: Arc<dyn LedgerExecutor>,
}

impl AppState {
    pub fn new(
        db: Arc<CustodyDb>,
        auth: Arc<AuthProxy>,
        engine: Arc<WorkflowEngine>,
        executor: Arc<dyn LedgerExecutor>,
    ) -> Self {
        Self {
            db,
            auth,
            engine,
            executor,
        }
    }
}
