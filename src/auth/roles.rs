// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.
//!
//! The set of valid roles is configuration data, not code: deployments ship
//! their catalog in the users bootstrap file. Three roles carry hardcoded
//! meaning in the approval workflow:
//!
//! - `admin` - manage users, accounts, customers, and miners
//! - `accounter` - create transfer/withdraw requests
//! - `reviewer` - approve or reject requests

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user role. Open-ended string, validated against the [`RoleCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const ACCOUNTER: &'static str = "accounter";
    pub const REVIEWER: &'static str = "reviewer";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }

    pub fn is_accounter(&self) -> bool {
        self.0 == Self::ACCOUNTER
    }

    pub fn is_reviewer(&self) -> bool {
        self.0 == Self::REVIEWER
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The configured set of valid roles.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: Vec<Role>,
}

impl RoleCatalog {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl Default for RoleCatalog {
    /// The three workflow roles.
    fn default() -> Self {
        Self::new(vec![
            Role::from(Role::ADMIN),
            Role::from(Role::ACCOUNTER),
            Role::from(Role::REVIEWER),
        ])
    }
}
