// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface: routing, OpenAPI document, and middleware layers.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod fees;
pub mod health;
pub mod registry;
pub mod requests;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v0_routes = Router::new()
        // sessions and users
        .route("/user/login", post(users::login))
        .route("/user/logout", post(users::logout))
        .route("/user/info", post(users::user_info))
        .route("/add/user", post(users::add_user))
        .route("/change/user", post(users::change_user))
        .route("/delete/user", post(users::delete_user))
        .route("/list/users", post(users::list_users))
        .route("/list/reviewers", post(users::list_reviewers))
        .route("/list/roles", post(users::list_roles))
        // approval workflow
        .route("/request/transfer/balance", post(requests::request_transfer))
        .route("/request/withdraw/balance", post(requests::request_withdraw))
        .route("/confirm/transfer/balance", post(requests::confirm_transfer))
        .route("/confirm/withdraw/balance", post(requests::confirm_withdraw))
        .route("/reject/transfer/balance", post(requests::reject_transfer))
        .route("/reject/withdraw/balance", post(requests::reject_withdraw))
        .route("/list/balance/request", post(requests::list_requests))
        .route("/list/review/history", post(requests::list_history))
        // fee escalation
        .route("/handling/fee", post(fees::handling_fee))
        .route("/query/handling/status", post(fees::handling_status))
        // master data
        .route("/add/customer", post(registry::add_customer))
        .route("/list/customers", post(registry::list_customers))
        .route("/add/miner", post(registry::add_miner))
        .route("/list/miners", post(registry::list_miners))
        .route("/add/account", post(registry::add_account))
        .route("/list/accounts", post(registry::list_accounts))
        .route("/account/info", post(registry::account_info))
        .route("/miner/info", post(registry::miner_info))
        .route("/list/wallet/types", post(registry::list_wallet_types))
        .route(
            "/list/miner/wallet/types",
            post(registry::list_miner_wallet_types),
        )
        .route("/set/transfer/targets", post(registry::set_transfer_targets))
        .route("/get/transfer/targets", post(registry::get_transfer_targets))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .nest("/api/v0", v0_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::live,
        users::login,
        users::logout,
        users::user_info,
        users::add_user,
        users::change_user,
        users::delete_user,
        users::list_users,
        users::list_reviewers,
        users::list_roles,
        requests::request_transfer,
        requests::request_withdraw,
        requests::confirm_transfer,
        requests::confirm_withdraw,
        requests::reject_transfer,
        requests::reject_withdraw,
        requests::list_requests,
        requests::list_history,
        fees::handling_fee,
        fees::handling_status,
        registry::add_customer,
        registry::list_customers,
        registry::add_miner,
        registry::list_miners,
        registry::add_account,
        registry::list_accounts,
        registry::account_info,
        registry::miner_info,
        registry::list_wallet_types,
        registry::list_miner_wallet_types,
        registry::set_transfer_targets,
        registry::get_transfer_targets
    ),
    components(
        schemas(
            health::HealthResponse,
            users::LoginRequest,
            users::LoginResponse,
            users::AuthedRequest,
            users::UserView,
            users::AddUserRequest,
            users::DeleteUserRequest,
            users::ReviewerListResponse,
            users::RoleListResponse,
            requests::TransferRequestInput,
            requests::WithdrawRequestInput,
            requests::RequestCreatedResponse,
            requests::DecisionInput,
            requests::TransferRequestView,
            requests::WithdrawRequestView,
            requests::RequestListResponse,
            fees::HandlingFeeInput,
            fees::HandlingStatusInput,
            fees::HandlingStatusResponse,
            registry::AddCustomerRequest,
            registry::AddMinerRequest,
            registry::AddAccountRequest,
            registry::AddressRequest,
            registry::MinerInfoRequest,
            registry::SetTransferTargetsRequest,
            registry::AccountInfoResponse,
            registry::MinerInfoResponse,
            registry::WalletTypesResponse,
            registry::TransferTargetsResponse,
            crate::auth::Role,
            crate::storage::RequestStatus,
            crate::storage::ReviewRecord,
            crate::storage::Customer,
            crate::storage::Miner,
            crate::storage::Account
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Users", description = "Sessions and user administration"),
        (name = "Workflow", description = "Dual-control balance requests"),
        (name = "Fees", description = "Gas escalation for stuck submissions"),
        (name = "Registry", description = "Customers, miners, and accounts")
    )
)]
struct ApiDoc;
