//! The Collectives facade: one entry point for share links, pages,
//! backlinks, search and edit sessions.
//!
//! Every request-facing method takes the caller's [`RequestContext`] and
//! passes it through the [`PermissionGate`] before touching any state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use collectives_core::{
    Collective, CollectiveId, OutlineItem, Page, PageId, ShareTier,
};
use collectives_pages::{PageIndex, PagesError, SearchResults};
use collectives_perms::{
    Access, Authenticator, Decision, MemberDirectory, Operation, PermissionGate, RequestContext,
};
use collectives_store::{TokenStore, TokenStoreExt};

use crate::config::CollectivesConfig;
use crate::error::{CollectivesError, Result};
use crate::locks::CollectiveLocks;
use crate::sessions::{EditSession, EditSessions, SessionId};
use crate::share::{Share, ShareService};

/// Content of the root page of a new collective.
pub const WELCOME_CONTENT: &str = "# Welcome to your new collective\n\
\n\
Come, organize and build shared knowledge!\n\
\n\
Every page can have subpages. Link pages to each other to connect them.\n";

/// What a share link opens, as seen by its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedCollective {
    pub collective: Collective,
    pub tier: ShareTier,
    pub editable: bool,
}

/// Changes to a page. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<PageId>,
}

/// The collectives service.
pub struct Collectives<S: TokenStore> {
    config: CollectivesConfig,
    gate: PermissionGate<S>,
    pages: Arc<PageIndex>,
    shares: ShareService<S>,
    sessions: EditSessions,
    locks: Arc<CollectiveLocks>,
}

impl<S: TokenStore> Collectives<S> {
    /// Create the service over a token store and the member-auth
    /// collaborators.
    pub fn new(
        store: S,
        auth: Arc<dyn Authenticator>,
        directory: Arc<dyn MemberDirectory>,
        config: CollectivesConfig,
    ) -> Result<Self> {
        let base_url = config.base_url()?;
        let gate = PermissionGate::new(Arc::new(store), auth, directory);
        let pages = Arc::new(PageIndex::new());
        let locks = Arc::new(CollectiveLocks::new());
        let shares = ShareService::new(gate.clone(), Arc::clone(&pages), Arc::clone(&locks), base_url);
        let sessions = EditSessions::new(config.session_ttl);

        Ok(Self {
            config,
            gate,
            pages,
            shares,
            sessions,
            locks,
        })
    }

    pub fn config(&self) -> &CollectivesConfig {
        &self.config
    }

    /// The page index, without any access checks.
    pub fn index(&self) -> &PageIndex {
        &self.pages
    }

    pub fn gate(&self) -> &PermissionGate<S> {
        &self.gate
    }

    pub fn shares(&self) -> &ShareService<S> {
        &self.shares
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        op: Operation,
    ) -> Result<Access> {
        match self.gate.check(ctx, collective_id, op).await? {
            Decision::Allow(access) => Ok(access),
            Decision::Deny => Err(CollectivesError::AuthorizationDenied),
        }
    }

    /// A page, provided it belongs to the collective.
    fn page_in(&self, collective_id: CollectiveId, page_id: PageId) -> Result<Page> {
        let page = self.pages.page(page_id)?;
        if page.collective_id != collective_id {
            return Err(PagesError::PageNotFound(page_id).into());
        }
        Ok(page)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collectives
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a collective with a welcome root page.
    ///
    /// Membership is managed by the [`MemberDirectory`]; this only creates
    /// the pages.
    pub fn create_collective(&self, title: &str) -> Result<Collective> {
        let collective = self.pages.create_collective(title)?;
        self.pages.set_content(collective.root_page_id, WELCOME_CONTENT)?;
        info!(collective_id = %collective.id, "collective ready");
        Ok(collective)
    }

    pub async fn collective(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
    ) -> Result<Collective> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        Ok(self.pages.collective(collective_id)?)
    }

    /// Open a share link.
    ///
    /// The link names no collective, so the grant decides which one the gate
    /// is asked about.
    pub async fn shared_collective(&self, token: &str) -> Result<SharedCollective> {
        let collective_id = self
            .gate
            .tokens()
            .get_by_hex(token)
            .await?
            .ok_or(CollectivesError::TokenNotFound)?
            .collective_id;

        let ctx = RequestContext::with_share_token(token);
        let tier = self
            .authorize(&ctx, collective_id, Operation::Read)
            .await?
            .effective_tier();
        let collective = self.pages.collective(collective_id)?;

        debug!(%collective_id, "opened share link");
        Ok(SharedCollective {
            collective,
            tier,
            editable: tier.can_write(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shares
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_share(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
    ) -> Result<Share> {
        self.shares.create_share(collective_id, ctx).await
    }

    pub async fn get_share(&self, ctx: &RequestContext, collective_id: CollectiveId) -> Result<Share> {
        self.shares.get_share(collective_id, ctx).await
    }

    pub async fn update_share_tier(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        tier: ShareTier,
    ) -> Result<Share> {
        self.shares.update_share_tier(collective_id, ctx, tier).await
    }

    pub async fn delete_share(&self, ctx: &RequestContext, collective_id: CollectiveId) -> Result<()> {
        self.shares.delete_share(collective_id, ctx).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Every page in tree order.
    pub async fn pages_of(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
    ) -> Result<Vec<Page>> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        Ok(self.pages.pages_of(collective_id)?)
    }

    pub async fn page(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<Page> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        self.page_in(collective_id, page_id)
    }

    pub async fn backlinks_of(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<Vec<Page>> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        self.page_in(collective_id, page_id)?;
        Ok(self.pages.backlinks_of(page_id)?)
    }

    pub async fn forward_links_of(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<Vec<Page>> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        self.page_in(collective_id, page_id)?;
        Ok(self.pages.forward_links_of(page_id)?)
    }

    pub async fn outline_of(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<Vec<OutlineItem>> {
        self.authorize(ctx, collective_id, Operation::Read).await?;
        self.page_in(collective_id, page_id)?;
        Ok(self.pages.outline_of(page_id)?)
    }

    /// Filter the pages of a collective with the configured search mode.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        query: &str,
    ) -> Result<SearchResults> {
        let access = self.authorize(ctx, collective_id, Operation::Read).await?;
        Ok(self.pages.search_with(
            collective_id,
            query,
            access.effective_tier(),
            self.config.search_mode,
        )?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page writes
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_page(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        parent_id: PageId,
        title: &str,
        content: &str,
    ) -> Result<Page> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id, Operation::Write).await?;

        self.page_in(collective_id, parent_id)?;
        let page = self.pages.create_page(collective_id, parent_id, title, content)?;
        info!(%collective_id, page_id = %page.id, %parent_id, "created page");
        Ok(page)
    }

    /// Rename, move or rewrite a page.
    ///
    /// A content-only update always counts as a new version; a rename or
    /// move counts as one only if the content changed too.
    pub async fn update_page(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
        update: PageUpdate,
    ) -> Result<Page> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id, Operation::Write).await?;

        let mut page = self.page_in(collective_id, page_id)?;
        let structural = update.title.as_ref().is_some_and(|t| *t != page.title)
            || update.parent_id.is_some_and(|p| Some(p) != page.parent_id);

        if !structural {
            return match update.content {
                Some(content) => Ok(self.pages.set_content(page_id, content)?),
                None => Ok(page),
            };
        }

        if let Some(title) = update.title {
            page.title = title;
        }
        if let Some(parent_id) = update.parent_id {
            page.parent_id = Some(parent_id);
        }
        if let Some(content) = update.content {
            page.content = content;
        }
        Ok(self.pages.upsert_page(page)?)
    }

    /// Remove a page without subpages and end its edit sessions.
    pub async fn remove_page(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<Page> {
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id, Operation::Write).await?;

        self.page_in(collective_id, page_id)?;
        let removed = self.pages.remove_page(page_id)?;
        let closed = self.sessions.close_page(page_id)?;
        info!(%collective_id, %page_id, closed_sessions = closed, "removed page");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edit sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Open an edit session on a page. Requires write access.
    pub async fn open_session(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
    ) -> Result<EditSession> {
        self.authorize(ctx, collective_id, Operation::Write).await?;
        self.page_in(collective_id, page_id)?;
        self.sessions.open(collective_id, page_id)
    }

    /// Write page content through a session. Write access is checked again.
    pub async fn write_session(
        &self,
        ctx: &RequestContext,
        session_id: &SessionId,
        content: &str,
    ) -> Result<Page> {
        let collective_id = self.sessions.touch(session_id)?.collective_id;
        let _guard = self.locks.lock(collective_id).await?;
        self.authorize(ctx, collective_id, Operation::Write).await?;

        // The page may have been removed while waiting for the lock
        let session = self.sessions.touch(session_id)?;
        Ok(self.pages.set_content(session.page_id, content)?)
    }

    /// A live session.
    pub fn session(&self, session_id: &SessionId) -> Result<EditSession> {
        self.sessions.touch(session_id)
    }

    /// End an edit session on a page. Requires write access, like opening
    /// one.
    pub async fn close_session(
        &self,
        ctx: &RequestContext,
        collective_id: CollectiveId,
        page_id: PageId,
        session_id: &SessionId,
    ) -> Result<bool> {
        self.authorize(ctx, collective_id, Operation::Write).await?;
        let session = self.sessions.touch(session_id)?;
        if session.collective_id != collective_id || session.page_id != page_id {
            return Err(CollectivesError::SessionNotFound);
        }
        self.sessions.close(session_id)
    }
}
