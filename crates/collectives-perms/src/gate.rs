//! The permission gate.
//!
//! Evaluates the credentials of a request against a requested operation on
//! a collective. Member credentials are checked first; if they do not
//! grant access, the share token is checked.

use std::sync::Arc;

use tracing::debug;

use collectives_core::{CollectiveId, MemberId, ShareTier, ShareToken};
use collectives_store::{TokenStore, TokenStoreExt};

use crate::auth::{Authenticator, MemberDirectory, RequestContext};
use crate::error::{PermsError, Result};
use crate::operation::Operation;

/// How a request was let in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// An owner or collaborator of the collective.
    Member(MemberId),
    /// Holder of an active share link.
    Share { token: ShareToken, tier: ShareTier },
}

impl Access {
    /// Tier used to scope reads. Members see what an edit link sees.
    pub fn effective_tier(&self) -> ShareTier {
        match self {
            Access::Member(_) => ShareTier::Edit,
            Access::Share { tier, .. } => *tier,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Access::Member(_))
    }

    pub fn member(&self) -> Option<&MemberId> {
        match self {
            Access::Member(member) => Some(member),
            Access::Share { .. } => None,
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Access),
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Evaluates requests against the decision table.
pub struct PermissionGate<S: TokenStore> {
    tokens: Arc<S>,
    auth: Arc<dyn Authenticator>,
    directory: Arc<dyn MemberDirectory>,
}

impl<S: TokenStore> Clone for PermissionGate<S> {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
            auth: Arc::clone(&self.auth),
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<S: TokenStore> PermissionGate<S> {
    pub fn new(
        tokens: Arc<S>,
        auth: Arc<dyn Authenticator>,
        directory: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            tokens,
            auth,
            directory,
        }
    }

    /// The token store consulted by this gate.
    pub fn tokens(&self) -> &Arc<S> {
        &self.tokens
    }

    /// Decide whether the request may perform `op` on the collective.
    pub async fn check(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        op: Operation,
    ) -> Result<Decision> {
        if let Some(member) = self.auth.current_member(ctx).await? {
            if self.directory.is_member(collective_id, &member).await? {
                debug!(%collective_id, %op, member = %member, "allowed member");
                return Ok(Decision::Allow(Access::Member(member)));
            }
        }

        let Some(presented) = ctx.share_token.as_deref() else {
            debug!(%collective_id, %op, "denied: no credentials");
            return Ok(Decision::Deny);
        };

        let Some(grant) = self.tokens.get_by_hex(presented).await? else {
            debug!(%collective_id, %op, "denied: unknown share token");
            return Ok(Decision::Deny);
        };

        if grant.collective_id != collective_id {
            debug!(%collective_id, %op, token = %grant.token, "denied: token for another collective");
            return Ok(Decision::Deny);
        }

        if !op.permitted_by_tier(grant.tier) {
            debug!(%collective_id, %op, token = %grant.token, tier = grant.tier.as_str(), "denied: tier");
            return Ok(Decision::Deny);
        }

        debug!(%collective_id, %op, token = %grant.token, tier = grant.tier.as_str(), "allowed share link");
        Ok(Decision::Allow(Access::Share {
            token: grant.token,
            tier: grant.tier,
        }))
    }

    /// Like [`check`](Self::check), but a deny becomes `PermsError::Denied`.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        op: Operation,
    ) -> Result<Access> {
        match self.check(ctx, collective_id, op).await? {
            Decision::Allow(access) => Ok(access),
            Decision::Deny => Err(PermsError::Denied),
        }
    }
}
