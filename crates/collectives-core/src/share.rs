//! Share tokens, tiers and grants.
//!
//! A share grant binds an opaque token to a collective and a permission
//! tier. Tokens are 32 bytes drawn from the operating system CSPRNG and are
//! exchanged in hex form inside share URLs.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::CollectiveId;

/// Length of a share token in bytes.
pub const TOKEN_LEN: usize = 32;

/// An opaque, unguessable share token.
///
/// `Display` and `Debug` only print a short prefix so that tokens never end
/// up in logs in full. Use [`ShareToken::to_hex`] to build links.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShareToken([u8; TOKEN_LEN]);

impl ShareToken {
    /// Generate a fresh token from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Convert to the hex form used in share URLs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex form. Anything that is not exactly 64 hex digits is
    /// rejected.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|_| CoreError::InvalidToken)?;
        let arr: [u8; TOKEN_LEN] = bytes.try_into().map_err(|_| CoreError::InvalidToken)?;
        Ok(Self(arr))
    }

    /// Blake3 digest of the token, kept for retired tokens instead of the
    /// token itself.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"collectives-share-token-v0:");
        hasher.update(&self.0);
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareToken({}…)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", &self.to_hex()[..8])
    }
}

impl FromStr for ShareToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ShareToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ShareToken {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Permission tier carried by a share link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareTier {
    /// View only.
    #[default]
    ReadOnly,
    /// View, create and modify pages.
    Edit,
}

impl ShareTier {
    /// Whether holders of this tier may write pages.
    pub fn can_write(self) -> bool {
        matches!(self, ShareTier::Edit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShareTier::ReadOnly => "read_only",
            ShareTier::Edit => "edit",
        }
    }

    /// Convert to the integer stored by persistent token stores.
    pub fn to_u8(self) -> u8 {
        match self {
            ShareTier::ReadOnly => 0,
            ShareTier::Edit => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ShareTier::ReadOnly),
            1 => Some(ShareTier::Edit),
            _ => None,
        }
    }
}

impl FromStr for ShareTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read_only" | "readonly" | "view" => Ok(ShareTier::ReadOnly),
            "edit" | "editable" => Ok(ShareTier::Edit),
            other => Err(CoreError::UnknownTier(other.to_string())),
        }
    }
}

/// The record binding a token to a collective and a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    /// The share token.
    pub token: ShareToken,

    /// The collective the token opens.
    pub collective_id: CollectiveId,

    /// The permission tier of the link.
    pub tier: ShareTier,

    /// Creation time (Unix ms).
    pub created_at: i64,

    /// Last tier change (Unix ms).
    pub updated_at: i64,
}

impl ShareGrant {
    /// Create a new read-only grant.
    pub fn new(token: ShareToken, collective_id: CollectiveId, now: i64) -> Self {
        Self {
            token,
            collective_id,
            tier: ShareTier::ReadOnly,
            created_at: now,
            updated_at: now,
        }
    }

    /// Change the tier in place, keeping the token.
    pub fn set_tier(&mut self, tier: ShareTier, now: i64) {
        self.tier = tier;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hex_roundtrip() {
        let token = ShareToken::generate();
        let parsed = ShareToken::from_hex(&token.to_hex()).unwrap();
        assert_eq!(token, parsed);
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(ShareToken::generate(), ShareToken::generate());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(ShareToken::from_hex("").is_err());
        assert!(ShareToken::from_hex("not-hex").is_err());
        assert!(ShareToken::from_hex(&"ab".repeat(16)).is_err());
    }

    #[test]
    fn test_token_display_is_truncated() {
        let token = ShareToken::from_bytes([0xab; TOKEN_LEN]);
        assert_eq!(token.to_string(), "abababab…");
        assert!(!format!("{:?}", token).contains(&token.to_hex()));
    }

    #[test]
    fn test_digest_differs_from_token() {
        let token = ShareToken::from_bytes([0x11; TOKEN_LEN]);
        assert_ne!(&token.digest(), token.as_bytes());
        assert_eq!(token.digest(), token.digest());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("edit".parse::<ShareTier>().unwrap(), ShareTier::Edit);
        assert_eq!("read_only".parse::<ShareTier>().unwrap(), ShareTier::ReadOnly);
        assert!("admin".parse::<ShareTier>().is_err());
        assert_eq!(ShareTier::from_u8(ShareTier::Edit.to_u8()), Some(ShareTier::Edit));
    }

    #[test]
    fn test_new_grant_is_read_only() {
        let grant = ShareGrant::new(ShareToken::generate(), CollectiveId(1), 100);
        assert_eq!(grant.tier, ShareTier::ReadOnly);
        assert!(!grant.tier.can_write());
    }
}
