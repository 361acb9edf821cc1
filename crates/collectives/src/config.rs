//! Configuration.

use std::time::Duration;

use url::Url;

use collectives_core::ShareToken;
use collectives_pages::SearchMode;

use crate::error::{CollectivesError, Result};

/// Configuration for [`Collectives`](crate::Collectives).
#[derive(Debug, Clone)]
pub struct CollectivesConfig {
    /// Base URL that share links are built on.
    pub public_base_url: String,
    /// Match mode of the public page filter.
    pub search_mode: SearchMode,
    /// Edit sessions idle longer than this are expired.
    pub session_ttl: Duration,
}

impl Default for CollectivesConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost/index.php/apps/collectives".to_string(),
            search_mode: SearchMode::FullText,
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl CollectivesConfig {
    /// Parse and check the base URL.
    pub(crate) fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.public_base_url)
            .map_err(|e| CollectivesError::InvalidConfig(format!("public_base_url: {}", e)))?;
        if url.cannot_be_a_base() {
            return Err(CollectivesError::InvalidConfig(
                "public_base_url cannot carry a path".into(),
            ));
        }
        Ok(url)
    }
}

/// Build the public link of a share: `{base}/p/{token}/{title}`.
pub(crate) fn share_url(base: &Url, token: &ShareToken, collective_title: &str) -> String {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push("p")
            .push(&token.to_hex())
            .push(collective_title);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url_encodes_title() {
        let config = CollectivesConfig::default();
        let token = ShareToken::from_bytes([0xab; 32]);
        let url = share_url(&config.base_url().unwrap(), &token, "Share me");
        assert_eq!(
            url,
            format!(
                "http://localhost/index.php/apps/collectives/p/{}/Share%20me",
                "ab".repeat(32)
            )
        );
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let config = CollectivesConfig {
            public_base_url: "https://cloud.example.org/apps/collectives/".into(),
            ..Default::default()
        };
        let token = ShareToken::from_bytes([1; 32]);
        let url = share_url(&config.base_url().unwrap(), &token, "Notes");
        assert!(url.starts_with("https://cloud.example.org/apps/collectives/p/0101"));
        assert!(url.ends_with("/Notes"));
    }

    #[test]
    fn test_invalid_base_rejected() {
        for base in ["not a url", "mailto:someone@example.org"] {
            let config = CollectivesConfig {
                public_base_url: base.into(),
                ..Default::default()
            };
            assert!(matches!(config.base_url(), Err(CollectivesError::InvalidConfig(_))));
        }
    }
}
