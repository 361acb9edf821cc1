//! # Collectives Permissions
//!
//! Access control for collectives.
//!
//! ## Overview
//!
//! Every inbound request presents a [`RequestContext`]: optionally a member
//! session (resolved by an [`Authenticator`]) and optionally a share token
//! (resolved by a [`TokenStore`](collectives_store::TokenStore)). The
//! [`PermissionGate`] turns that context and a requested [`Operation`] into a
//! [`Decision`].
//!
//! ## Decision Table
//!
//! | Credential | Read | Write | ManageShare |
//! |---|---|---|---|
//! | member of the collective | Allow | Allow | Allow |
//! | active token, read-only tier | Allow | Deny | Deny |
//! | active token, edit tier | Allow | Allow | Deny |
//! | anything else | Deny | Deny | Deny |
//!
//! A deny carries no reason. Callers report it as "not found" so that a
//! revoked link, a link that never existed and an insufficient tier look
//! the same from outside.

pub mod auth;
pub mod error;
pub mod gate;
pub mod operation;

pub use auth::{
    Authenticator, MemberDirectory, RequestContext, SessionAuthenticator, StaticMemberDirectory,
};
pub use error::{PermsError, Result};
pub use gate::{Access, Decision, PermissionGate};
pub use operation::Operation;
