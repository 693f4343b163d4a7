// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Approval workflow endpoints: create, confirm, and reject balance
//! requests, plus the request and history listings.
//!
//! Transfers and withdrawals share one engine; the wire keeps the original
//! paired endpoints and field names (`from`/`to` for transfers,
//! `miner`/`owner` for withdrawals).

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{BalanceRequest, RequestKind, RequestStatus, ReviewRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequestInput {
    pub auth_code: Uuid,
    pub from: String,
    pub to: String,
    pub reviewer: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRequestInput {
    pub auth_code: Uuid,
    pub miner: String,
    pub owner: String,
    pub reviewer: String,
    pub amount: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestCreatedResponse {
    pub request_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionInput {
    pub auth_code: Uuid,
    pub request_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferRequestView {
    pub request_id: String,
    pub creator: String,
    pub reviewer: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<BalanceRequest> for TransferRequestView {
    fn from(r: BalanceRequest) -> Self {
        Self {
            request_id: r.id,
            creator: r.creator,
            reviewer: r.reviewer,
            from: r.source,
            to: r.dest,
            amount: r.amount,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawRequestView {
    pub request_id: String,
    pub creator: String,
    pub reviewer: String,
    pub miner: String,
    pub owner: String,
    pub amount: f64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<BalanceRequest> for WithdrawRequestView {
    fn from(r: BalanceRequest) -> Self {
        Self {
            request_id: r.id,
            creator: r.creator,
            reviewer: r.reviewer,
            miner: r.source,
            owner: r.dest,
            amount: r.amount,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RequestListResponse {
    pub transfers: Vec<TransferRequestView>,
    pub withdraws: Vec<WithdrawRequestView>,
}

/// Request a balance transfer between two accounts.
#[utoipa::path(
    post,
    path = "/api/v0/request/transfer/balance",
    tag = "Workflow",
    request_body = TransferRequestInput,
    responses(
        (status = 200, description = "Request created", body = RequestCreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Caller is not an accounter"),
    )
)]
pub async fn request_transfer(
    State(state): State<AppState>,
    Json(input): Json<TransferRequestInput>,
) -> Result<Json<RequestCreatedResponse>, ApiError> {
    let request = state
        .engine
        .create_request(
            input.auth_code,
            RequestKind::Transfer,
            &input.from,
            &input.to,
            &input.reviewer,
            input.amount,
        )
        .await?;
    Ok(Json(RequestCreatedResponse {
        request_id: request.id,
    }))
}

/// Request a withdrawal of miner available balance to its owner.
#[utoipa::path(
    post,
    path = "/api/v0/request/withdraw/balance",
    tag = "Workflow",
    request_body = WithdrawRequestInput,
    responses(
        (status = 200, description = "Request created", body = RequestCreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Caller is not an accounter"),
    )
)]
pub async fn request_withdraw(
    State(state): State<AppState>,
    Json(input): Json<WithdrawRequestInput>,
) -> Result<Json<RequestCreatedResponse>, ApiError> {
    let request = state
        .engine
        .create_request(
            input.auth_code,
            RequestKind::Withdraw,
            &input.miner,
            &input.owner,
            &input.reviewer,
            input.amount,
        )
        .await?;
    Ok(Json(RequestCreatedResponse {
        request_id: request.id,
    }))
}

/// Approve a transfer request and submit it on chain.
#[utoipa::path(
    post,
    path = "/api/v0/confirm/transfer/balance",
    tag = "Workflow",
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Submitted; review record", body = ReviewRecord),
        (status = 403, description = "Caller is not the named reviewer"),
        (status = 409, description = "Request already decided or submitting"),
        (status = 502, description = "Chain submission failed; request back in review"),
    )
)]
pub async fn confirm_transfer(
    State(state): State<AppState>,
    Json(input): Json<DecisionInput>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let record = state
        .engine
        .confirm_request(input.auth_code, RequestKind::Transfer, &input.request_id)
        .await?;
    Ok(Json(record))
}

/// Approve a withdraw request and submit it on chain.
#[utoipa::path(
    post,
    path = "/api/v0/confirm/withdraw/balance",
    tag = "Workflow",
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Submitted; review record", body = ReviewRecord),
        (status = 403, description = "Caller is not the named reviewer"),
        (status = 409, description = "Request already decided or submitting"),
        (status = 502, description = "Chain submission failed; request back in review"),
    )
)]
pub async fn confirm_withdraw(
    State(state): State<AppState>,
    Json(input): Json<DecisionInput>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let record = state
        .engine
        .confirm_request(input.auth_code, RequestKind::Withdraw, &input.request_id)
        .await?;
    Ok(Json(record))
}

/// Reject a transfer request. Never touches the chain.
#[utoipa::path(
    post,
    path = "/api/v0/reject/transfer/balance",
    tag = "Workflow",
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Rejected; review record", body = ReviewRecord),
        (status = 403, description = "Caller is not the named reviewer"),
        (status = 409, description = "Request already decided"),
    )
)]
pub async fn reject_transfer(
    State(state): State<AppState>,
    Json(input): Json<DecisionInput>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let record = state
        .engine
        .reject_request(input.auth_code, RequestKind::Transfer, &input.request_id)
        .await?;
    Ok(Json(record))
}

/// Reject a withdraw request. Never touches the chain.
#[utoipa::path(
    post,
    path = "/api/v0/reject/withdraw/balance",
    tag = "Workflow",
    request_body = DecisionInput,
    responses(
        (status = 200, description = "Rejected; review record", body = ReviewRecord),
        (status = 403, description = "Caller is not the named reviewer"),
        (status = 409, description = "Request already decided"),
    )
)]
pub async fn reject_withdraw(
    State(state): State<AppState>,
    Json(input): Json<DecisionInput>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let record = state
        .engine
        .reject_request(input.auth_code, RequestKind::Withdraw, &input.request_id)
        .await?;
    Ok(Json(record))
}

/// All balance requests, both kinds, every status.
#[utoipa::path(
    post,
    path = "/api/v0/list/balance/request",
    tag = "Workflow",
    request_body = super::users::AuthedRequest,
    responses((status = 200, description = "All requests", body = RequestListResponse))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Json(input): Json<super::users::AuthedRequest>,
) -> Result<Json<RequestListResponse>, ApiError> {
    let transfers = state
        .engine
        .list_requests(input.auth_code, RequestKind::Transfer)
        .await?;
    let withdraws = state
        .engine
        .list_requests(input.auth_code, RequestKind::Withdraw)
        .await?;
    Ok(Json(RequestListResponse {
        transfers: transfers.into_iter().map(Into::into).collect(),
        withdraws: withdraws.into_iter().map(Into::into).collect(),
    }))
}

/// All review decisions.
#[utoipa::path(
    post,
    path = "/api/v0/list/review/history",
    tag = "Workflow",
    request_body = super::users::AuthedRequest,
    responses((status = 200, description = "Review history", body = [ReviewRecord]))
)]
pub async fn list_history(
    State(state): State<AppState>,
    Json(input): Json<super::users::AuthedRequest>,
) -> Result<Json<Vec<ReviewRecord>>, ApiError> {
    let records = state.engine.list_history(input.auth_code).await?;
    Ok(Json(records))
}
