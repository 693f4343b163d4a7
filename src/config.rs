// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `USERS_FILE` | Bootstrap JSON with role catalog and seed users | Optional |
//! | `LOTUS_RPC_URL` | Lotus node JSON-RPC endpoint | `http://127.0.0.1:1234/rpc/v0` |
//! | `LOTUS_TOKEN` | Lotus API bearer token | Optional |
//! | `EXECUTOR_TIMEOUT_SECS` | Per-call timeout for chain operations | `30` |
//! | `SESSION_TTL_SECS` | Session token lifetime | `28800` (8h) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the users bootstrap file.
pub const USERS_FILE_ENV: &str = "USERS_FILE";

const DEFAULT_LOTUS_RPC_URL: &str = "http://127.0.0.1:1234/rpc/v0";
const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,
    /// Directory holding the embedded database.
    pub data_dir: PathBuf,
    /// Optional bootstrap file with the role catalog and seed users.
    pub users_file: Option<PathBuf>,
    /// Lotus JSON-RPC endpoint.
    pub lotus_rpc_url: String,
    /// Optional Lotus API bearer token.
    pub lotus_token: Option<String>,
    /// Caller-imposed timeout for each chain executor call.
    pub executor_timeout: Duration,
    /// Session token lifetime.
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from the environment, applying defaults.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let data_dir = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/data"));

        let users_file = env::var(USERS_FILE_ENV).ok().map(PathBuf::from);

        let lotus_rpc_url =
            env::var("LOTUS_RPC_URL").unwrap_or_else(|_| DEFAULT_LOTUS_RPC_URL.to_string());
        let lotus_token = env::var("LOTUS_TOKEN").ok().filter(|t| !t.is_empty());

        let executor_timeout = Duration::from_secs(
            env::var("EXECUTOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXECUTOR_TIMEOUT_SECS),
        );
        let session_ttl = Duration::from_secs(
            env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
        );

        Self {
            host,
            port,
            data_dir,
            users_file,
            lotus_rpc_url,
            lotus_token,
            executor_timeout,
            session_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // Environment-dependent fields aside, the constants should hold.
        assert_eq!(DEFAULT_LOTUS_RPC_URL, "http://127.0.0.1:1234/rpc/v0");
        assert_eq!(
            Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            Duration::from_secs(28800)
        );
        assert_eq!(
            Duration::from_secs(DEFAULT_EXECUTOR_TIMEOUT_SECS),
            Duration::from_secs(30)
        );
    }
}
