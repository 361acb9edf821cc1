//! Request credentials and the member-auth collaborators.
//!
//! Authentication of logged-in members happens outside this workspace. The
//! [`Authenticator`] trait is the seam: it maps a request's session to a
//! member. The [`MemberDirectory`] answers whether a member belongs to a
//! collective. In-memory implementations are provided for embedding and
//! tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use collectives_core::{CollectiveId, MemberId};

use crate::error::{PermsError, Result};

/// Credentials presented with a request.
///
/// Both fields are untrusted input. The share token is kept in the form it
/// arrived in; malformed tokens are simply never found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Member session identifier, if logged in.
    pub session: Option<String>,

    /// Share token from a public link, if any.
    pub share_token: Option<String>,
}

impl RequestContext {
    /// A request without any credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A request carrying a member session.
    pub fn with_session(session: impl Into<String>) -> Self {
        Self {
            session: Some(session.into()),
            share_token: None,
        }
    }

    /// A request carrying a share token.
    pub fn with_share_token(token: impl Into<String>) -> Self {
        Self {
            session: None,
            share_token: Some(token.into()),
        }
    }
}

/// Resolves the member behind a request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// The authenticated member, or `None` for anonymous requests and
    /// unknown sessions.
    async fn current_member(&self, ctx: &RequestContext) -> Result<Option<MemberId>>;
}

/// Answers collective membership questions.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Whether `member` is an owner or collaborator of the collective.
    async fn is_member(&self, collective_id: CollectiveId, member: &MemberId) -> Result<bool>;
}

/// Authenticator backed by a session table.
#[derive(Default)]
pub struct SessionAuthenticator {
    sessions: RwLock<HashMap<String, MemberId>>,
}

impl SessionAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a logged-in session.
    pub fn login(&self, session: impl Into<String>, member: MemberId) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        sessions.insert(session.into(), member);
        Ok(())
    }

    /// Forget a session.
    pub fn logout(&self, session: &str) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        sessions.remove(session);
        Ok(())
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn current_member(&self, ctx: &RequestContext) -> Result<Option<MemberId>> {
        let Some(session) = ctx.session.as_deref() else {
            return Ok(None);
        };
        let sessions = self
            .sessions
            .read()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        Ok(sessions.get(session).cloned())
    }
}

/// Member directory held in memory.
#[derive(Default)]
pub struct StaticMemberDirectory {
    members: RwLock<HashMap<CollectiveId, HashSet<MemberId>>>,
}

impl StaticMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, collective_id: CollectiveId, member: MemberId) -> Result<()> {
        let mut members = self
            .members
            .write()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        members.entry(collective_id).or_default().insert(member);
        Ok(())
    }

    pub fn remove_member(&self, collective_id: CollectiveId, member: &MemberId) -> Result<()> {
        let mut members = self
            .members
            .write()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        if let Some(set) = members.get_mut(&collective_id) {
            set.remove(member);
        }
        Ok(())
    }
}

#[async_trait]
impl MemberDirectory for StaticMemberDirectory {
    async fn is_member(&self, collective_id: CollectiveId, member: &MemberId) -> Result<bool> {
        let members = self
            .members
            .read()
            .map_err(|e| PermsError::Directory(e.to_string()))?;
        Ok(members
            .get(&collective_id)
            .is_some_and(|set| set.contains(member)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_lookup() {
        let auth = SessionAuthenticator::new();
        auth.login("s-bob", MemberId::new("bob")).unwrap();

        let ctx = RequestContext::with_session("s-bob");
        assert_eq!(auth.current_member(&ctx).await.unwrap(), Some(MemberId::new("bob")));

        let unknown = RequestContext::with_session("s-nobody");
        assert_eq!(auth.current_member(&unknown).await.unwrap(), None);
        assert_eq!(auth.current_member(&RequestContext::anonymous()).await.unwrap(), None);

        auth.logout("s-bob").unwrap();
        assert_eq!(auth.current_member(&ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_membership() {
        let dir = StaticMemberDirectory::new();
        let bob = MemberId::new("bob");
        dir.add_member(CollectiveId(1), bob.clone()).unwrap();

        assert!(dir.is_member(CollectiveId(1), &bob).await.unwrap());
        assert!(!dir.is_member(CollectiveId(2), &bob).await.unwrap());

        dir.remove_member(CollectiveId(1), &bob).unwrap();
        assert!(!dir.is_member(CollectiveId(1), &bob).await.unwrap());
    }
}
