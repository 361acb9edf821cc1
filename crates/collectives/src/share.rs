//! Share link management.
//!
//! A collective has at most one active share link. Only members may
//! create, change or delete it; the gate rejects everyone else before any
//! state is looked at, so authorization failures and business-rule
//! failures never mix.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use url::Url;

use collectives_core::{now_millis, CollectiveId, ShareGrant, ShareTier, ShareToken};
use collectives_pages::PageIndex;
use collectives_perms::{Decision, Operation, PermissionGate, RequestContext};
use collectives_store::{StoreError, TokenStore};

use crate::config::share_url;
use crate::error::{CollectivesError, Result};
use crate::locks::CollectiveLocks;

/// An active share link, as shown to the collective's members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Share {
    pub token: ShareToken,
    pub collective_id: CollectiveId,
    pub tier: ShareTier,
    pub editable: bool,
    /// Public link embedding the token.
    pub url: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Creates, updates and deletes the share grant of a collective.
pub struct ShareService<S: TokenStore> {
    gate: PermissionGate<S>,
    pages: Arc<PageIndex>,
    locks: Arc<CollectiveLocks>,
    base_url: Url,
}

impl<S: TokenStore> ShareService<S> {
    pub fn new(
        gate: PermissionGate<S>,
        pages: Arc<PageIndex>,
        locks: Arc<CollectiveLocks>,
        base_url: Url,
    ) -> Self {
        Self {
            gate,
            pages,
            locks,
            base_url,
        }
    }

    /// Create the share link of a collective. New links are read-only.
    pub async fn create_share(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
    ) -> Result<Share> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id).await?;

        let collective = self.pages.collective(collective_id)?;
        if self.tokens().find_for_collective(collective_id).await?.is_some() {
            return Err(CollectivesError::AlreadyShared(collective_id));
        }

        let grant = ShareGrant::new(ShareToken::generate(), collective_id, now_millis());
        match self.tokens().put(&grant.token, &grant).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                return Err(CollectivesError::AlreadyShared(collective_id))
            }
            Err(err) => return Err(err.into()),
        }

        info!(%collective_id, title = %collective.title, token = %grant.token, "created share");
        self.to_share(grant)
    }

    /// The active share link of a collective.
    pub async fn get_share(&self, collective_id: CollectiveId, ctx: &RequestContext) -> Result<Share> {
        self.authorize(ctx, collective_id).await?;
        let grant = self.active_grant(collective_id, None).await?;
        self.to_share(grant)
    }

    /// Change the tier of the active link. The token stays the same, so
    /// links already handed out keep working with the new tier.
    pub async fn update_share_tier(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
        tier: ShareTier,
    ) -> Result<Share> {
        self.update(collective_id, ctx, None, tier).await
    }

    /// Like [`update_share_tier`](Self::update_share_tier), for a request
    /// naming the token. A token other than the active one counts as no
    /// active share.
    pub async fn update_share_tier_by_token(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
        token: &str,
        tier: ShareTier,
    ) -> Result<Share> {
        self.update(collective_id, ctx, Some(token), tier).await
    }

    /// Delete the active link. Its token is retired for good.
    pub async fn delete_share(&self, collective_id: CollectiveId, ctx: &RequestContext) -> Result<()> {
        self.delete(collective_id, ctx, None).await
    }

    /// Like [`delete_share`](Self::delete_share), for a request naming the
    /// token.
    pub async fn delete_share_by_token(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<()> {
        self.delete(collective_id, ctx, Some(token)).await
    }

    async fn update(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
        token: Option<&str>,
        tier: ShareTier,
    ) -> Result<Share> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id).await?;

        let mut grant = self.active_grant(collective_id, token).await?;
        grant.set_tier(tier, now_millis());
        self.tokens().put(&grant.token, &grant).await?;

        info!(%collective_id, token = %grant.token, tier = tier.as_str(), "updated share");
        self.to_share(grant)
    }

    async fn delete(
        &self,
        collective_id: CollectiveId,
        ctx: &RequestContext,
        token: Option<&str>,
    ) -> Result<()> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id).await?;

        let grant = self.active_grant(collective_id, token).await?;
        if !self.tokens().delete(&grant.token).await? {
            return Err(CollectivesError::NoActiveShare(collective_id));
        }

        info!(%collective_id, token = %grant.token, "deleted share");
        Ok(())
    }

    async fn authorize(&self, ctx: &RequestContext, collective_id: CollectiveId) -> Result<()> {
        match self.gate.check(ctx, collective_id, Operation::ManageShare).await? {
            Decision::Allow(_) => Ok(()),
            Decision::Deny => Err(CollectivesError::AuthorizationDenied),
        }
    }

    async fn active_grant(
        &self,
        collective_id: CollectiveId,
        token: Option<&str>,
    ) -> Result<ShareGrant> {
        let grant = self
            .tokens()
            .find_for_collective(collective_id)
            .await?
            .ok_or(CollectivesError::NoActiveShare(collective_id))?;

        if let Some(token) = token {
            let matches = ShareToken::from_hex(token).is_ok_and(|t| t == grant.token);
            if !matches {
                return Err(CollectivesError::NoActiveShare(collective_id));
            }
        }
        Ok(grant)
    }

    fn to_share(&self, grant: ShareGrant) -> Result<Share> {
        let collective = self.pages.collective(grant.collective_id)?;
        Ok(Share {
            url: share_url(&self.base_url, &grant.token, &collective.title),
            token: grant.token,
            collective_id: grant.collective_id,
            tier: grant.tier,
            editable: grant.tier.can_write(),
            created_at: grant.created_at,
            updated_at: grant.updated_at,
        })
    }

    fn tokens(&self) -> &S {
        self.gate.tokens()
    }
}
