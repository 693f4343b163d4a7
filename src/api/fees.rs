// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee escalation for stuck submissions.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::ReviewRecord;
use crate::workflow::GasOverride;

#[derive(Debug, Deserialize, ToSchema)]
pub struct HandlingFeeInput {
    pub auth_code: Uuid,
    /// Cid of the stuck accepted submission.
    pub cid: String,
    /// Omitted gas terms fall back to the automatic 25% premium bump.
    #[serde(default)]
    pub gas_limit: Option<i64>,
    #[serde(default)]
    pub gas_feecap: Option<String>,
    #[serde(default)]
    pub gas_premium: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HandlingStatusInput {
    pub auth_code: Uuid,
    pub cid: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HandlingStatusResponse {
    pub cid: String,
    /// Whether the message is still waiting in the pool.
    pub pending: bool,
}

/// Replace a stuck submission with a fee-bumped copy. The review history
/// follows the new cid; the returned record carries it.
#[utoipa::path(
    post,
    path = "/api/v0/handling/fee",
    tag = "Fees",
    request_body = HandlingFeeInput,
    responses(
        (status = 200, description = "Replacement submitted", body = ReviewRecord),
        (status = 404, description = "Cid is not an accepted submission"),
        (status = 409, description = "Message is no longer pending"),
        (status = 502, description = "Replacement failed; nothing changed"),
    )
)]
pub async fn handling_fee(
    State(state): State<AppState>,
    Json(input): Json<HandlingFeeInput>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let gas = GasOverride {
        gas_limit: input.gas_limit,
        gas_feecap: input.gas_feecap,
        gas_premium: input.gas_premium,
    };
    let record = state
        .engine
        .escalate_fee(input.auth_code, &input.cid, gas)
        .await?;
    Ok(Json(record))
}

/// Whether an accepted submission is still pending in the message pool.
#[utoipa::path(
    post,
    path = "/api/v0/query/handling/status",
    tag = "Fees",
    request_body = HandlingStatusInput,
    responses(
        (status = 200, description = "Pool status", body = HandlingStatusResponse),
        (status = 404, description = "Cid is not an accepted submission"),
    )
)]
pub async fn handling_status(
    State(state): State<AppState>,
    Json(input): Json<HandlingStatusInput>,
) -> Result<Json<HandlingStatusResponse>, ApiError> {
    let pending = state
        .engine
        .submission_pending(input.auth_code, &input.cid)
        .await?;
    Ok(Json(HandlingStatusResponse {
        cid: input.cid,
        pending,
    }))
}
