//! Error types for the collectives API.
//!
//! [`CollectivesError`] is what library callers see. [`ApiError`] is what
//! crosses the request boundary: every reason a caller could not reach a
//! resource collapses into `NotFound` there.

use serde_json::{json, Value};
use thiserror::Error;

use collectives_core::{CollectiveId, CoreError, PageId};
use collectives_pages::PagesError;
use collectives_perms::PermsError;
use collectives_store::StoreError;

/// Errors that can occur during collectives operations.
#[derive(Debug, Error)]
pub enum CollectivesError {
    /// The permission gate denied the request.
    #[error("authorization denied")]
    AuthorizationDenied,

    /// The collective already has an active share link.
    #[error("collective {0} is already shared")]
    AlreadyShared(CollectiveId),

    /// The collective has no active share link.
    #[error("collective {0} has no active share")]
    NoActiveShare(CollectiveId),

    /// Moving `page` under `parent` would create a cycle.
    #[error("moving page {page} under {parent} would create a cycle")]
    CycleDetected { page: PageId, parent: PageId },

    /// A presented share token resolved to nothing.
    #[error("share token not found")]
    TokenNotFound,

    /// Unknown or expired edit session.
    #[error("edit session not found")]
    SessionNotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("permission error: {0}")]
    Permission(PermsError),

    #[error("page error: {0}")]
    Pages(PagesError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<PermsError> for CollectivesError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::Denied => CollectivesError::AuthorizationDenied,
            PermsError::Store(err) => CollectivesError::Store(err),
            other => CollectivesError::Permission(other),
        }
    }
}

impl From<PagesError> for CollectivesError {
    fn from(err: PagesError) -> Self {
        match err {
            PagesError::CycleDetected { page, parent } => {
                CollectivesError::CycleDetected { page, parent }
            }
            other => CollectivesError::Pages(other),
        }
    }
}

/// Result type for collectives operations.
pub type Result<T> = std::result::Result<T, CollectivesError>;

/// Error as reported to a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing, revoked, never issued or not permitted. Indistinguishable
    /// on purpose.
    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("unprocessable: {0}")]
    Unprocessable(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    /// HTTP status code.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::NotFound => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Conflict(_) => 409,
            ApiError::Unprocessable(_) => 422,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal => 500,
        }
    }

    /// Stable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "not_found",
            ApiError::MethodNotAllowed => "method_not_allowed",
            ApiError::Conflict(code) | ApiError::Unprocessable(code) => *code,
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal => "internal",
        }
    }

    /// JSON body for the response.
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::BadRequest(message) => json!({ "error": self.code(), "message": message }),
            _ => json!({ "error": self.code() }),
        }
    }
}

impl From<CollectivesError> for ApiError {
    fn from(err: CollectivesError) -> Self {
        match err {
            CollectivesError::AuthorizationDenied
            | CollectivesError::TokenNotFound
            | CollectivesError::SessionNotFound => ApiError::NotFound,

            CollectivesError::AlreadyShared(_) => ApiError::Conflict("already_shared"),
            CollectivesError::NoActiveShare(_) => ApiError::Conflict("no_active_share"),
            CollectivesError::CycleDetected { .. } => ApiError::Unprocessable("cycle_detected"),

            CollectivesError::Pages(err) => match err {
                PagesError::CollectiveNotFound(_)
                | PagesError::PageNotFound(_)
                | PagesError::ParentNotFound(_) => ApiError::NotFound,
                PagesError::DuplicateTitle(_) => ApiError::Conflict("duplicate_title"),
                PagesError::InvalidPage(message) => ApiError::BadRequest(message),
                PagesError::Core(err) => ApiError::BadRequest(err.to_string()),
                PagesError::CycleDetected { .. } => ApiError::Unprocessable("cycle_detected"),
                PagesError::Poisoned(_) => ApiError::Internal,
            },

            CollectivesError::InvalidRequest(message) => ApiError::BadRequest(message),
            CollectivesError::Core(err) => ApiError::BadRequest(err.to_string()),

            CollectivesError::InvalidConfig(_)
            | CollectivesError::Poisoned(_)
            | CollectivesError::Store(_)
            | CollectivesError::Permission(_) => ApiError::Internal,
        }
    }
}
