//! Edit sessions.
//!
//! Before a page is edited the editor opens a session for it. Opening
//! requires write access; so does every write made through the session,
//! which makes a tier downgrade or a deleted share take effect on sessions
//! that are already open.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use collectives_core::{CollectiveId, PageId};

use crate::error::{CollectivesError, Result};

/// Random identifier of an edit session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.get(..8).unwrap_or(&self.0))
    }
}

/// An open edit session on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSession {
    pub id: SessionId,
    pub collective_id: CollectiveId,
    pub page_id: PageId,
    #[serde(skip)]
    last_used: Instant,
}

/// Open edit sessions, expired lazily after a fixed idle time.
pub struct EditSessions {
    sessions: RwLock<HashMap<SessionId, EditSession>>,
    ttl: Duration,
}

impl EditSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, EditSession>>> {
        self.sessions
            .write()
            .map_err(|e| CollectivesError::Poisoned(e.to_string()))
    }

    /// Register a new session. Access is checked by the caller.
    pub fn open(&self, collective_id: CollectiveId, page_id: PageId) -> Result<EditSession> {
        let session = EditSession {
            id: SessionId::generate(),
            collective_id,
            page_id,
            last_used: Instant::now(),
        };

        let mut sessions = self.write()?;
        sessions.retain(|_, s| s.last_used.elapsed() < self.ttl);
        sessions.insert(session.id.clone(), session.clone());

        debug!(session = %session.id, %collective_id, %page_id, "opened edit session");
        Ok(session)
    }

    /// Look up a live session and mark it used.
    pub fn touch(&self, id: &SessionId) -> Result<EditSession> {
        let mut sessions = self.write()?;
        let expired = match sessions.get_mut(id) {
            Some(session) if session.last_used.elapsed() < self.ttl => {
                session.last_used = Instant::now();
                return Ok(session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(id);
            debug!(session = %id, "edit session expired");
        }
        Err(CollectivesError::SessionNotFound)
    }

    /// End a session. Returns whether it was open.
    pub fn close(&self, id: &SessionId) -> Result<bool> {
        let closed = self.write()?.remove(id).is_some();
        if closed {
            debug!(session = %id, "closed edit session");
        }
        Ok(closed)
    }

    /// End every session on a page.
    pub fn close_page(&self, page_id: PageId) -> Result<usize> {
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.page_id != page_id);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_touch_close() {
        let sessions = EditSessions::new(Duration::from_secs(60));
        let session = sessions.open(CollectiveId(1), PageId(2)).unwrap();

        assert_eq!(sessions.touch(&session.id).unwrap().page_id, PageId(2));

        assert!(sessions.close(&session.id).unwrap());
        assert!(!sessions.close(&session.id).unwrap());
        assert!(matches!(
            sessions.touch(&session.id),
            Err(CollectivesError::SessionNotFound)
        ));
    }

    #[test]
    fn test_expired_sessions_are_gone() {
        let sessions = EditSessions::new(Duration::ZERO);
        let session = sessions.open(CollectiveId(1), PageId(2)).unwrap();

        assert!(matches!(
            sessions.touch(&session.id),
            Err(CollectivesError::SessionNotFound)
        ));
    }

    #[test]
    fn test_close_page() {
        let sessions = EditSessions::new(Duration::from_secs(60));
        sessions.open(CollectiveId(1), PageId(2)).unwrap();
        sessions.open(CollectiveId(1), PageId(2)).unwrap();
        let other = sessions.open(CollectiveId(1), PageId(3)).unwrap();

        assert_eq!(sessions.close_page(PageId(2)).unwrap(), 2);
        sessions.touch(&other.id).unwrap();
    }

    #[test]
    fn test_display_is_short() {
        let id = SessionId::generate();
        assert_eq!(id.to_string().len(), 8);
        assert_eq!(id.as_str().len(), 32);
    }
}
