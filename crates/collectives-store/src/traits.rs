//! TokenStore trait: the abstract interface for share grant persistence.
//!
//! This trait allows the gate and share service to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory.

use async_trait::async_trait;
use collectives_core::{CollectiveId, ShareGrant, ShareToken};

use crate::error::Result;

/// The TokenStore trait: async interface for grant persistence.
///
/// # Design Notes
///
/// - **Insert or replace**: `put` stores a new grant or replaces the grant
///   held by the same token (tier updates keep the token).
/// - **One grant per collective**: `put` fails with `Conflict` when a
///   different token already holds a grant for the collective.
/// - **Hard delete**: `delete` removes the grant and retires the token.
/// - **No enumeration**: there is deliberately no way to list tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store `grant` under `token`.
    ///
    /// # Errors
    /// - `TokenRetired` if the token was deleted before.
    /// - `Conflict` if another token holds a grant for the same collective.
    /// - `InvalidData` if `grant.token` differs from `token`, or if the token
    ///   is already bound to a different collective.
    async fn put(&self, token: &ShareToken, grant: &ShareGrant) -> Result<()>;

    /// Look up the grant for a token.
    async fn get(&self, token: &ShareToken) -> Result<Option<ShareGrant>>;

    /// Remove the grant for a token. Returns whether a grant was removed.
    async fn delete(&self, token: &ShareToken) -> Result<bool>;

    /// Find the active grant of a collective, if any.
    async fn find_for_collective(&self, collective_id: CollectiveId)
        -> Result<Option<ShareGrant>>;

    /// Whether the token was deleted before.
    async fn is_retired(&self, token: &ShareToken) -> Result<bool>;
}

/// Extension trait for lookups with untrusted input.
pub trait TokenStoreExt: TokenStore {
    /// Look up a grant by the hex form found in a share URL.
    ///
    /// Malformed input resolves to `None`, exactly like an unknown token.
    fn get_by_hex(
        &self,
        presented: &str,
    ) -> impl std::future::Future<Output = Result<Option<ShareGrant>>> + Send;
}

impl<S: TokenStore + ?Sized> TokenStoreExt for S {
    async fn get_by_hex(&self, presented: &str) -> Result<Option<ShareGrant>> {
        match ShareToken::from_hex(presented.trim()) {
            Ok(token) => self.get(&token).await,
            Err(_) => Ok(None),
        }
    }
}

pub(crate) fn check_binding(token: &ShareToken, grant: &ShareGrant) -> Result<()> {
    if &grant.token != token {
        return Err(crate::error::StoreError::InvalidData(format!(
            "grant token {} does not match key {}",
            grant.token, token
        )));
    }
    Ok(())
}
