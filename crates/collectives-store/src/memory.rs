//! In-memory implementation of the TokenStore trait.
//!
//! Same semantics as SQLite but nothing survives a restart.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use collectives_core::{CollectiveId, ShareGrant, ShareToken};

use crate::error::{Result, StoreError};
use crate::traits::{check_binding, TokenStore};

/// In-memory token store.
///
/// Thread-safe via RwLock.
pub struct MemoryTokenStore {
    inner: RwLock<MemoryTokenStoreInner>,
}

#[derive(Default)]
struct MemoryTokenStoreInner {
    /// Grants indexed by token.
    grants: HashMap<ShareToken, ShareGrant>,

    /// Collective -> token of its active grant.
    by_collective: HashMap<CollectiveId, ShareToken>,

    /// Digests of deleted tokens.
    retired: HashSet<[u8; 32]>,
}

impl MemoryTokenStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryTokenStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryTokenStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryTokenStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, token: &ShareToken, grant: &ShareGrant) -> Result<()> {
        check_binding(token, grant)?;
        let mut inner = self.write()?;

        if inner.retired.contains(&token.digest()) {
            return Err(StoreError::TokenRetired);
        }

        if let Some(existing) = inner.by_collective.get(&grant.collective_id) {
            if existing != token {
                return Err(StoreError::Conflict {
                    collective_id: grant.collective_id,
                });
            }
        }

        if let Some(existing) = inner.grants.get(token) {
            if existing.collective_id != grant.collective_id {
                return Err(StoreError::InvalidData(format!(
                    "token {} is bound to collective {}",
                    token, existing.collective_id
                )));
            }
        }

        inner.grants.insert(*token, grant.clone());
        inner.by_collective.insert(grant.collective_id, *token);
        debug!(%token, collective_id = %grant.collective_id, tier = grant.tier.as_str(), "stored share grant");

        Ok(())
    }

    async fn get(&self, token: &ShareToken) -> Result<Option<ShareGrant>> {
        let inner = self.read()?;
        Ok(inner.grants.get(token).cloned())
    }

    async fn delete(&self, token: &ShareToken) -> Result<bool> {
        let mut inner = self.write()?;

        let Some(grant) = inner.grants.remove(token) else {
            return Ok(false);
        };
        inner.by_collective.remove(&grant.collective_id);
        inner.retired.insert(token.digest());
        debug!(%token, collective_id = %grant.collective_id, "deleted share grant");

        Ok(true)
    }

    async fn find_for_collective(
        &self,
        collective_id: CollectiveId,
    ) -> Result<Option<ShareGrant>> {
        let inner = self.read()?;
        Ok(inner
            .by_collective
            .get(&collective_id)
            .and_then(|token| inner.grants.get(token))
            .cloned())
    }

    async fn is_retired(&self, token: &ShareToken) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.retired.contains(&token.digest()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TokenStoreExt;
    use collectives_core::ShareTier;
    use proptest::prelude::*;

    fn grant_for(collective: u64) -> ShareGrant {
        ShareGrant::new(ShareToken::generate(), CollectiveId(collective), 1_000)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryTokenStore::new();
        let grant = grant_for(1);

        store.put(&grant.token, &grant).await.unwrap();

        let loaded = store.get(&grant.token).await.unwrap().unwrap();
        assert_eq!(loaded, grant);
        let by_collective = store.find_for_collective(CollectiveId(1)).await.unwrap();
        assert_eq!(by_collective, Some(grant));
    }

    #[tokio::test]
    async fn test_put_replaces_tier_in_place() {
        let store = MemoryTokenStore::new();
        let mut grant = grant_for(1);
        store.put(&grant.token, &grant).await.unwrap();

        grant.set_tier(ShareTier::Edit, 2_000);
        store.put(&grant.token, &grant).await.unwrap();

        let loaded = store.get(&grant.token).await.unwrap().unwrap();
        assert_eq!(loaded.tier, ShareTier::Edit);
        assert_eq!(loaded.token, grant.token);
    }

    #[tokio::test]
    async fn test_second_token_for_collective_conflicts() {
        let store = MemoryTokenStore::new();
        let first = grant_for(1);
        let second = grant_for(1);

        store.put(&first.token, &first).await.unwrap();
        let err = store.put(&second.token, &second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_deleted_token_is_absent_and_retired() {
        let store = MemoryTokenStore::new();
        let grant = grant_for(1);
        store.put(&grant.token, &grant).await.unwrap();

        assert!(store.delete(&grant.token).await.unwrap());
        assert!(!store.delete(&grant.token).await.unwrap());
        assert_eq!(store.get(&grant.token).await.unwrap(), None);
        assert_eq!(store.find_for_collective(CollectiveId(1)).await.unwrap(), None);
        assert!(store.is_retired(&grant.token).await.unwrap());

        let err = store.put(&grant.token, &grant).await.unwrap_err();
        assert!(matches!(err, StoreError::TokenRetired));
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_tokens_look_alike() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get_by_hex("garbage").await.unwrap(), None);
        let unknown = ShareToken::generate().to_hex();
        assert_eq!(store.get_by_hex(&unknown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mismatched_key_rejected() {
        let store = MemoryTokenStore::new();
        let grant = grant_for(1);
        let other = ShareToken::generate();
        assert!(matches!(
            store.put(&other, &grant).await.unwrap_err(),
            StoreError::InvalidData(_)
        ));
    }

    proptest! {
        #[test]
        fn test_retired_tokens_never_return(collectives in prop::collection::vec(1u64..4, 1..16)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryTokenStore::new();
                let mut retired = Vec::new();

                // Each step toggles the share of one collective
                for c in collectives {
                    match store.find_for_collective(CollectiveId(c)).await.unwrap() {
                        Some(active) => {
                            assert!(store.delete(&active.token).await.unwrap());
                            retired.push(active);
                        }
                        None => {
                            let grant = grant_for(c);
                            store.put(&grant.token, &grant).await.unwrap();
                        }
                    }
                }

                for grant in &retired {
                    assert_eq!(store.get(&grant.token).await.unwrap(), None);
                    assert!(matches!(
                        store.put(&grant.token, grant).await,
                        Err(StoreError::TokenRetired)
                    ));
                }
            });
        }
    }
}
