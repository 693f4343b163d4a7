// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody Server - Dual-Control Filecoin Custody Service
//!
//! Internal bookkeeping service for a fleet of Filecoin accounts. Accounters
//! request balance transfers and miner withdrawals, the reviewer each request
//! names approves or rejects it, and approved requests are submitted to a
//! Lotus node exactly once.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Sessions and role-based authorization
//! - `chain` - Lotus JSON-RPC executor behind a trait seam
//! - `storage` - Embedded redb database
//! - `workflow` - The dual-control approval engine

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod workflow;
