// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication, sessions, and role-based authorization.

mod proxy;
mod roles;
mod session;

pub use proxy::{AuthProxy, AuthenticatedUser, Bootstrap};
pub use roles::{Role, RoleCatalog};
pub use session::{InMemorySessionStore, Session, SessionStore};
