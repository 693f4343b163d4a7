// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Master data endpoints: customers, miners, accounts, and transfer
//! target allow-lists. Mutations are admin-gated; listings require any
//! authenticated session.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chain::atto_to_fil;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{Account, Customer, Miner, MINER_WALLET_TYPES, WALLET_TYPES};

use super::users::AuthedRequest;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCustomerRequest {
    pub auth_code: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMinerRequest {
    pub auth_code: Uuid,
    pub miner_id: String,
    pub customer_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAccountRequest {
    pub auth_code: Uuid,
    pub address: String,
    /// `accounting` or `miner`.
    pub wallet_type: String,
    pub customer_name: String,
    /// Required for miner-class accounts.
    #[serde(default)]
    pub miner_id: String,
    /// `owner`, `worker`, or `post`. Required for miner-class accounts.
    #[serde(default)]
    pub miner_wallet_type: String,
    /// Whether the node keystore holds the signing key.
    #[serde(default)]
    pub have_private_key: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressRequest {
    pub auth_code: Uuid,
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MinerInfoRequest {
    pub auth_code: Uuid,
    pub miner_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTransferTargetsRequest {
    pub auth_code: Uuid,
    pub address: String,
    pub targets: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountInfoResponse {
    pub address: String,
    pub wallet_type: String,
    pub miner_wallet_type: String,
    pub customer_name: String,
    /// attoFIL string, live from the node.
    pub balance: String,
    pub balance_fil: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MinerInfoResponse {
    pub miner_id: String,
    pub customer_name: String,
    /// Owner account registered for this miner, if any.
    pub owner_address: Option<String>,
    /// Withdrawable balance, attoFIL string.
    pub available: String,
    pub available_fil: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletTypesResponse {
    pub types: Vec<&'static str>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferTargetsResponse {
    pub address: String,
    pub targets: Vec<String>,
}

/// Register a customer (admin only). Idempotent by name.
#[utoipa::path(
    post,
    path = "/api/v0/add/customer",
    tag = "Registry",
    request_body = AddCustomerRequest,
    responses(
        (status = 200, description = "Customer row", body = Customer),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn add_customer(
    State(state): State<AppState>,
    Json(input): Json<AddCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    state.auth.require_admin(input.auth_code).await?;
    if input.name.is_empty() {
        return Err(ApiError::validation("customer name is required"));
    }
    Ok(Json(state.db.upsert_customer(&input.name)?))
}

/// All customers.
#[utoipa::path(
    post,
    path = "/api/v0/list/customers",
    tag = "Registry",
    request_body = AuthedRequest,
    responses((status = 200, description = "All customers", body = [Customer]))
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(state.db.list_customers()?))
}

/// Register a miner actor for an existing customer (admin only).
#[utoipa::path(
    post,
    path = "/api/v0/add/miner",
    tag = "Registry",
    request_body = AddMinerRequest,
    responses(
        (status = 200, description = "Miner row", body = Miner),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown customer"),
    )
)]
pub async fn add_miner(
    State(state): State<AppState>,
    Json(input): Json<AddMinerRequest>,
) -> Result<Json<Miner>, ApiError> {
    state.auth.require_admin(input.auth_code).await?;
    if input.miner_id.is_empty() {
        return Err(ApiError::validation("miner id is required"));
    }
    let customer = state.db.customer_by_name(&input.customer_name)?;
    Ok(Json(state.db.upsert_miner(&input.miner_id, &customer.id)?))
}

/// All miners.
#[utoipa::path(
    post,
    path = "/api/v0/list/miners",
    tag = "Registry",
    request_body = AuthedRequest,
    responses((status = 200, description = "All miners", body = [Miner]))
)]
pub async fn list_miners(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<Vec<Miner>>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(state.db.list_miners()?))
}

/// Register an account (admin only). Idempotent by address; a miner can
/// have at most one owner-type account.
#[utoipa::path(
    post,
    path = "/api/v0/add/account",
    tag = "Registry",
    request_body = AddAccountRequest,
    responses(
        (status = 200, description = "Account row", body = Account),
        (status = 400, description = "Unknown wallet type"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unknown customer or miner"),
        (status = 409, description = "Miner already has an owner account"),
    )
)]
pub async fn add_account(
    State(state): State<AppState>,
    Json(input): Json<AddAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    state.auth.require_admin(input.auth_code).await?;
    if input.address.is_empty() {
        return Err(ApiError::validation("address is required"));
    }
    if !WALLET_TYPES.contains(&input.wallet_type.as_str()) {
        return Err(ApiError::validation(format!(
            "unknown wallet type {}",
            input.wallet_type
        )));
    }
    let customer = state.db.customer_by_name(&input.customer_name)?;

    if input.wallet_type == "miner" {
        if !MINER_WALLET_TYPES.contains(&input.miner_wallet_type.as_str()) {
            return Err(ApiError::validation(format!(
                "unknown miner wallet type {}",
                input.miner_wallet_type
            )));
        }
        // The miner actor must be registered first.
        state.db.miner(&input.miner_id)?;
    } else if !input.miner_id.is_empty() || !input.miner_wallet_type.is_empty() {
        return Err(ApiError::validation(
            "miner fields are only valid for miner-class accounts",
        ));
    }

    let account = Account {
        id: Uuid::new_v4().to_string(),
        address: input.address,
        wallet_type: input.wallet_type,
        customer_id: customer.id,
        miner_id: input.miner_id,
        miner_wallet_type: input.miner_wallet_type,
        have_private_key: input.have_private_key,
    };
    Ok(Json(state.db.upsert_account(&account)?))
}

/// All registered accounts.
#[utoipa::path(
    post,
    path = "/api/v0/list/accounts",
    tag = "Registry",
    request_body = AuthedRequest,
    responses((status = 200, description = "All accounts", body = [Account]))
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<Vec<Account>>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(state.db.list_accounts()?))
}

/// Registry row plus the live chain balance for one account.
#[utoipa::path(
    post,
    path = "/api/v0/account/info",
    tag = "Registry",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Account detail", body = AccountInfoResponse),
        (status = 404, description = "Unregistered address"),
        (status = 502, description = "Node unreachable"),
    )
)]
pub async fn account_info(
    State(state): State<AppState>,
    Json(input): Json<AddressRequest>,
) -> Result<Json<AccountInfoResponse>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    let account = state.db.account(&input.address)?;
    let customer_name = state
        .db
        .customer(&account.customer_id)
        .map(|c| c.name)
        .unwrap_or_default();
    let balance = state.executor.balance(&account.address).await?;
    let balance_fil = atto_to_fil(&balance).unwrap_or_default();
    Ok(Json(AccountInfoResponse {
        address: account.address,
        wallet_type: account.wallet_type,
        miner_wallet_type: account.miner_wallet_type,
        customer_name,
        balance,
        balance_fil,
    }))
}

/// Miner detail: owning customer, registered owner account, and the
/// withdrawable balance from the node.
#[utoipa::path(
    post,
    path = "/api/v0/miner/info",
    tag = "Registry",
    request_body = MinerInfoRequest,
    responses(
        (status = 200, description = "Miner detail", body = MinerInfoResponse),
        (status = 404, description = "Unregistered miner"),
        (status = 409, description = "More than one owner account registered"),
        (status = 502, description = "Node unreachable"),
    )
)]
pub async fn miner_info(
    State(state): State<AppState>,
    Json(input): Json<MinerInfoRequest>,
) -> Result<Json<MinerInfoResponse>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    let miner = state.db.miner(&input.miner_id)?;
    let customer_name = state
        .db
        .customer(&miner.customer_id)
        .map(|c| c.name)
        .unwrap_or_default();

    let owners: Vec<Account> = state
        .db
        .accounts_for_miner(&miner.miner_id)?
        .into_iter()
        .filter(|a| a.miner_wallet_type == "owner")
        .collect();
    if owners.len() > 1 {
        return Err(ApiError::conflict(format!(
            "miner {} has {} owner accounts registered",
            miner.miner_id,
            owners.len()
        )));
    }

    let available = state.executor.miner_available(&miner.miner_id).await?;
    let available_fil = atto_to_fil(&available).unwrap_or_default();
    Ok(Json(MinerInfoResponse {
        miner_id: miner.miner_id,
        customer_name,
        owner_address: owners.into_iter().next().map(|a| a.address),
        available,
        available_fil,
    }))
}

/// Valid account classes.
#[utoipa::path(
    post,
    path = "/api/v0/list/wallet/types",
    tag = "Registry",
    request_body = AuthedRequest,
    responses((status = 200, description = "Wallet types", body = WalletTypesResponse))
)]
pub async fn list_wallet_types(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<WalletTypesResponse>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(WalletTypesResponse {
        types: WALLET_TYPES.to_vec(),
    }))
}

/// Valid miner wallet sub-types.
#[utoipa::path(
    post,
    path = "/api/v0/list/miner/wallet/types",
    tag = "Registry",
    request_body = AuthedRequest,
    responses((status = 200, description = "Miner wallet types", body = WalletTypesResponse))
)]
pub async fn list_miner_wallet_types(
    State(state): State<AppState>,
    Json(input): Json<AuthedRequest>,
) -> Result<Json<WalletTypesResponse>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    Ok(Json(WalletTypesResponse {
        types: MINER_WALLET_TYPES.to_vec(),
    }))
}

/// Replace the transfer allow-list for a source account (admin only).
/// Every target must itself be a registered account.
#[utoipa::path(
    post,
    path = "/api/v0/set/transfer/targets",
    tag = "Registry",
    request_body = SetTransferTargetsRequest,
    responses(
        (status = 200, description = "Allow-list replaced", body = TransferTargetsResponse),
        (status = 400, description = "Empty target list"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Unregistered source or target"),
    )
)]
pub async fn set_transfer_targets(
    State(state): State<AppState>,
    Json(input): Json<SetTransferTargetsRequest>,
) -> Result<Json<TransferTargetsResponse>, ApiError> {
    state.auth.require_admin(input.auth_code).await?;
    if input.targets.is_empty() {
        return Err(ApiError::validation("target list must not be empty"));
    }
    if !state.db.account_exists(&input.address)? {
        return Err(ApiError::not_found(format!(
            "account {} is not registered",
            input.address
        )));
    }
    for target in &input.targets {
        if !state.db.account_exists(target)? {
            return Err(ApiError::not_found(format!(
                "target {target} is not registered"
            )));
        }
    }
    state.db.set_transfer_targets(&input.address, &input.targets)?;
    Ok(Json(TransferTargetsResponse {
        address: input.address,
        targets: input.targets,
    }))
}

/// The transfer allow-list for a source account.
#[utoipa::path(
    post,
    path = "/api/v0/get/transfer/targets",
    tag = "Registry",
    request_body = AddressRequest,
    responses((status = 200, description = "Allow-list", body = TransferTargetsResponse))
)]
pub async fn get_transfer_targets(
    State(state): State<AppState>,
    Json(input): Json<AddressRequest>,
) -> Result<Json<TransferTargetsResponse>, ApiError> {
    state.auth.user_by_token(input.auth_code).await?;
    let targets = state.db.transfer_targets(&input.address)?;
    Ok(Json(TransferTargetsResponse {
        address: input.address,
        targets,
    }))
}
