//! SQLite implementation of the TokenStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use collectives_core::{now_millis, CollectiveId, ShareGrant, ShareTier, ShareToken};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_binding, TokenStore};

/// SQLite-based token store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteTokenStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTokenStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShareGrant> {
    let token_bytes: Vec<u8> = row.get("token")?;
    let collective_id: i64 = row.get("collective_id")?;
    let tier: u8 = row.get("tier")?;

    let token = ShareToken::from_bytes(token_bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "token".into(), rusqlite::types::Type::Blob)
    })?);
    let tier = ShareTier::from_u8(tier).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(2, "tier".into(), rusqlite::types::Type::Integer)
    })?;

    Ok(ShareGrant {
        token,
        collective_id: CollectiveId(collective_id as u64),
        tier,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn put(&self, token: &ShareToken, grant: &ShareGrant) -> Result<()> {
        check_binding(token, grant)?;
        let token = *token;
        let grant = grant.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let retired: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM retired_tokens WHERE token_digest = ?1)",
                params![token.digest().as_slice()],
                |row| row.get(0),
            )?;
            if retired {
                return Err(StoreError::TokenRetired);
            }

            let holder: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT token FROM share_grants WHERE collective_id = ?1",
                    params![grant.collective_id.0 as i64],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(holder) = holder {
                if holder.as_slice() != token.as_bytes().as_slice() {
                    return Err(StoreError::Conflict {
                        collective_id: grant.collective_id,
                    });
                }
            }

            let bound_to: Option<i64> = tx
                .query_row(
                    "SELECT collective_id FROM share_grants WHERE token = ?1",
                    params![token.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(bound_to) = bound_to {
                if bound_to as u64 != grant.collective_id.0 {
                    return Err(StoreError::InvalidData(format!(
                        "token {} is bound to collective {}",
                        token, bound_to
                    )));
                }
            }

            tx.execute(
                "INSERT INTO share_grants (token, collective_id, tier, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(token) DO UPDATE SET
                    tier = excluded.tier,
                    updated_at = excluded.updated_at",
                params![
                    token.as_bytes().as_slice(),
                    grant.collective_id.0 as i64,
                    grant.tier.to_u8(),
                    grant.created_at,
                    grant.updated_at,
                ],
            )?;

            tx.commit()?;
            debug!(%token, collective_id = %grant.collective_id, tier = grant.tier.as_str(), "stored share grant");
            Ok(())
        })
        .await
    }

    async fn get(&self, token: &ShareToken) -> Result<Option<ShareGrant>> {
        let token = *token;

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT token, collective_id, tier, created_at, updated_at
                 FROM share_grants WHERE token = ?1",
                params![token.as_bytes().as_slice()],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete(&self, token: &ShareToken) -> Result<bool> {
        let token = *token;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM share_grants WHERE token = ?1",
                params![token.as_bytes().as_slice()],
            )?;
            if removed > 0 {
                tx.execute(
                    "INSERT OR IGNORE INTO retired_tokens (token_digest, retired_at) VALUES (?1, ?2)",
                    params![token.digest().as_slice(), now_millis()],
                )?;
            }

            tx.commit()?;
            if removed > 0 {
                debug!(%token, "deleted share grant");
            }
            Ok(removed > 0)
        })
        .await
    }

    async fn find_for_collective(
        &self,
        collective_id: CollectiveId,
    ) -> Result<Option<ShareGrant>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT token, collective_id, tier, created_at, updated_at
                 FROM share_grants WHERE collective_id = ?1",
                params![collective_id.0 as i64],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn is_retired(&self, token: &ShareToken) -> Result<bool> {
        let token = *token;

        self.with_conn(move |conn| {
            let retired: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM retired_tokens WHERE token_digest = ?1)",
                params![token.digest().as_slice()],
                |row| row.get(0),
            )?;
            Ok(retired)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant_for(collective: u64) -> ShareGrant {
        ShareGrant::new(ShareToken::generate(), CollectiveId(collective), 1_000)
    }

    #[tokio::test]
    async fn test_sqlite_put_get_update() {
        let store = SqliteTokenStore::open_memory().unwrap();
        let mut grant = grant_for(3);

        store.put(&grant.token, &grant).await.unwrap();
        assert_eq!(store.get(&grant.token).await.unwrap(), Some(grant.clone()));

        grant.set_tier(ShareTier::Edit, 2_000);
        store.put(&grant.token, &grant).await.unwrap();

        let loaded = store.find_for_collective(CollectiveId(3)).await.unwrap().unwrap();
        assert_eq!(loaded.tier, ShareTier::Edit);
        assert_eq!(loaded.created_at, 1_000);
        assert_eq!(loaded.updated_at, 2_000);
    }

    #[tokio::test]
    async fn test_sqlite_one_grant_per_collective() {
        let store = SqliteTokenStore::open_memory().unwrap();
        let first = grant_for(3);
        let second = grant_for(3);

        store.put(&first.token, &first).await.unwrap();
        assert!(matches!(
            store.put(&second.token, &second).await.unwrap_err(),
            StoreError::Conflict { .. }
        ));
    }

    #[tokio::test]
    async fn test_sqlite_delete_retires_token() {
        let store = SqliteTokenStore::open_memory().unwrap();
        let grant = grant_for(3);
        store.put(&grant.token, &grant).await.unwrap();

        assert!(store.delete(&grant.token).await.unwrap());
        assert_eq!(store.get(&grant.token).await.unwrap(), None);
        assert!(store.is_retired(&grant.token).await.unwrap());
        assert!(matches!(
            store.put(&grant.token, &grant).await.unwrap_err(),
            StoreError::TokenRetired
        ));

        // A fresh token may be issued for the collective again
        let fresh = grant_for(3);
        store.put(&fresh.token, &fresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shares.db");
        let grant = grant_for(9);

        {
            let store = SqliteTokenStore::open(&path).unwrap();
            store.put(&grant.token, &grant).await.unwrap();
        }

        let store = SqliteTokenStore::open(&path).unwrap();
        assert_eq!(store.get(&grant.token).await.unwrap(), Some(grant));
    }
}
