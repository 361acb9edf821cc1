//! Operations a request can ask for.

use serde::{Deserialize, Serialize};
use std::fmt;

use collectives_core::ShareTier;

/// Class of a requested operation on a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// View pages, search, backlinks, outlines.
    Read,
    /// Create pages, change titles and content, open edit sessions.
    Write,
    /// Create, update or delete the collective's share link.
    ManageShare,
}

impl Operation {
    /// Whether a share link of the given tier permits this operation.
    ///
    /// Managing shares is never possible through a share link.
    pub fn permitted_by_tier(self, tier: ShareTier) -> bool {
        match self {
            Operation::Read => true,
            Operation::Write => tier.can_write(),
            Operation::ManageShare => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::ManageShare => "manage_share",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table() {
        assert!(Operation::Read.permitted_by_tier(ShareTier::ReadOnly));
        assert!(!Operation::Write.permitted_by_tier(ShareTier::ReadOnly));
        assert!(!Operation::ManageShare.permitted_by_tier(ShareTier::ReadOnly));

        assert!(Operation::Read.permitted_by_tier(ShareTier::Edit));
        assert!(Operation::Write.permitted_by_tier(ShareTier::Edit));
        assert!(!Operation::ManageShare.permitted_by_tier(ShareTier::Edit));
    }
}
