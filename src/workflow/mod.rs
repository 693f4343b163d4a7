// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dual-control approval workflow over balance movements.

mod engine;

pub use engine::{GasOverride, WorkflowEngine};
