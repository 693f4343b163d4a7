// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use custody_server::api::router;
use custody_server::auth::{AuthProxy, Bootstrap, InMemorySessionStore, RoleCatalog};
use custody_server::chain::{LedgerExecutor, LotusExecutor};
use custody_server::config::Config;
use custody_server::state::AppState;
use custody_server::storage::CustodyDb;
use custody_server::workflow::WorkflowEngine;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env();

    let db = Arc::new(
        CustodyDb::open(config.data_dir.join("custody.redb")).expect("failed to open database"),
    );

    // Role catalog and seed users come from the bootstrap file when present;
    // otherwise only the three workflow roles are valid.
    let (catalog, bootstrap) = match &config.users_file {
        Some(path) => {
            let bootstrap = Bootstrap::load(path).expect("failed to read users bootstrap file");
            (RoleCatalog::new(bootstrap.roles.clone()), Some(bootstrap))
        }
        None => (RoleCatalog::default(), None),
    };

    let sessions = Arc::new(InMemorySessionStore::new(config.session_ttl));
    let auth = Arc::new(AuthProxy::new(
        db.clone(),
        sessions,
        catalog,
        config.session_ttl,
    ));

    if let Some(bootstrap) = &bootstrap {
        let seeded = auth
            .seed_users(bootstrap)
            .expect("failed to seed bootstrap users");
        tracing::info!(seeded, "bootstrap users loaded");
    }

    let executor: Arc<dyn LedgerExecutor> = Arc::new(
        LotusExecutor::new(
            &config.lotus_rpc_url,
            config.lotus_token.clone(),
            config.executor_timeout,
        )
        .expect("invalid lotus endpoint"),
    );

    let engine = Arc::new(WorkflowEngine::new(
        db.clone(),
        executor.clone(),
        auth.clone(),
    ));

    let app = router(AppState::new(db, auth, engine, executor));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("failed to parse bind address");

    tracing::info!(%addr, lotus = %config.lotus_rpc_url, "custody server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
