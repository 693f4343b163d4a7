// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error taxonomy.
//!
//! Every failure crossing the HTTP boundary is one of these classes. The
//! split between [`ApiError::Executor`] and [`ApiError::SubmittedUnrecorded`]
//! matters operationally: the former means nothing was persisted or moved
//! (safe to retry), the latter means a chain submission exists but the
//! decision record could not be written (investigate before retrying).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chain::ExecutorError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input. Rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Unknown or expired session token.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Role or capability mismatch.
    #[error("{0}")]
    PermissionDenied(String),

    /// Unknown user, request, account, or cid.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate entity or request already decided.
    #[error("{0}")]
    Conflict(String),

    /// The chain executor failed or timed out. No state was changed.
    #[error("chain executor failure: {0}")]
    Executor(#[from] ExecutorError),

    /// A storage write failed before any chain submission.
    #[error("persistence failure")]
    Persistence(#[source] StoreError),

    /// The submission landed on chain but recording the decision failed.
    /// The request is left in `submitting`; re-confirming would double-send.
    #[error("submission {cid} was accepted on chain but the decision could not be recorded")]
    SubmittedUnrecorded {
        cid: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Stable machine-readable code for this error class.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::NotAuthenticated => "not_authenticated",
            ApiError::PermissionDenied(_) => "permission_denied",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            // A message that is no longer in the pending pool is a state
            // conflict, not an executor outage.
            ApiError::Executor(ExecutorError::NotPending(_)) => "conflict",
            ApiError::Executor(_) => "executor_failure",
            ApiError::Persistence(_) => "persistence_failure",
            ApiError::SubmittedUnrecorded { .. } => "submitted_unrecorded",
        }
    }

    /// HTTP status code for this error class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Executor(ExecutorError::NotPending(_)) => StatusCode::CONFLICT,
            ApiError::Executor(_) => StatusCode::BAD_GATEWAY,
            ApiError::Persistence(_) | ApiError::SubmittedUnrecorded { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::AlreadyExists(what) => ApiError::Conflict(format!("{what} already exists")),
            StoreError::InvalidTransition { id, found } => {
                ApiError::Conflict(format!("request {id} is already {found}"))
            }
            other => ApiError::Persistence(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage and partial-progress failures carry internal detail that
        // must not cross the boundary; log it here instead.
        if status.is_server_error() {
            tracing::error!(error = ?self, "internal error");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
