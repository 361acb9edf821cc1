//! Link extraction from page content.
//!
//! Pages reference each other with markdown links or wikilinks. This module
//! only parses: it turns content into [`LinkTarget`]s. Resolving a target to
//! a page needs the collective's tree and happens in the page index.
//!
//! Recognized forms:
//!
//! - `[text](/index.php/apps/collectives/Collective/Some%20Page)` - absolute
//!   app path, percent-decoded, optionally with the public `p/{token}` prefix
//! - `[text](https://host/apps/collectives/Collective/Page?fileId=12)` - the
//!   `fileId` query parameter wins over the path
//! - `[text](../Sibling/Child.md)` - relative to the linking page's parent
//! - `[[Page Title#Section|Alias]]` - wikilink by title
//!
//! Links inside fenced code blocks and inline code are ignored, and so are
//! images, fragment-only links and links with non-http schemes.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::types::PageId;

/// Path prefix of the collectives app in absolute links.
pub const APP_PATH: &str = "/apps/collectives/";

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid wikilink regex"));

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[([^\[\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("valid markdown link regex")
});

static FENCED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n]*\n.*?```|~~~[^\n]*\n.*?~~~").expect("valid fenced code regex")
});

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`").expect("valid inline code regex"));

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("valid scheme regex"));

/// An unresolved reference found in page content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    /// Direct page reference through a `fileId` query parameter.
    PageId(PageId),

    /// Path from a collective's root, e.g. `Our Garden/Day 1`.
    Absolute {
        /// Title of the collective named in the link.
        collective: String,
        /// Page titles below the root page. Empty for the root page itself.
        path: Vec<String>,
    },

    /// Path relative to the linking page's parent.
    Relative {
        /// Number of leading `..` segments.
        up: usize,
        /// Page titles after the `..` segments.
        path: Vec<String>,
    },

    /// Wikilink by page title.
    Title(String),
}

/// Extract link targets from markdown content, in document order.
pub fn extract_links(markdown: &str) -> Vec<LinkTarget> {
    let without_fenced = FENCED_CODE_RE.replace_all(markdown, "");
    let without_code = INLINE_CODE_RE.replace_all(&without_fenced, "");

    let mut links = Vec::new();

    for cap in WIKILINK_RE.captures_iter(&without_code) {
        if let Some(target) = parse_wikilink(&cap[1]) {
            links.push(target);
        }
    }

    let without_wikilinks = WIKILINK_RE.replace_all(&without_code, "");
    for cap in MARKDOWN_LINK_RE.captures_iter(&without_wikilinks) {
        // Images are not references
        if &cap[1] == "!" {
            continue;
        }
        if let Some(target) = parse_href(&cap[3]) {
            links.push(target);
        }
    }

    links
}

/// Parse the inside of a `[[...]]` wikilink.
fn parse_wikilink(inner: &str) -> Option<LinkTarget> {
    let mut name = inner;
    if let Some(pipe_idx) = name.find('|') {
        name = &name[..pipe_idx];
    }
    if let Some(hash_idx) = name.find('#') {
        name = &name[..hash_idx];
    }
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = normalize(name.split('/').map(|s| s.trim().to_string()).collect());
        if path.is_empty() {
            return None;
        }
        return Some(LinkTarget::Relative { up: 0, path });
    }

    Some(LinkTarget::Title(strip_md_suffix(name).to_string()))
}

/// Parse a markdown link destination.
pub fn parse_href(href: &str) -> Option<LinkTarget> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let has_scheme = SCHEME_RE.is_match(href);
    let (path, query) = if has_scheme {
        let url = url::Url::parse(href).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        (url.path().to_string(), url.query().map(str::to_string))
    } else {
        let without_fragment = href.split('#').next().unwrap_or_default();
        match without_fragment.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (without_fragment.to_string(), None),
        }
    };

    if let Some(id) = query.as_deref().and_then(file_id_from_query) {
        return Some(LinkTarget::PageId(id));
    }

    if let Some(idx) = path.find(APP_PATH) {
        let mut segments = decode_segments(&path[idx + APP_PATH.len()..]);
        // Public share links look like p/{token}/{collective}/...
        if segments.first().map(String::as_str) == Some("p") {
            if segments.len() < 3 {
                return None;
            }
            segments.drain(..2);
        }
        if segments.is_empty() {
            return None;
        }
        let collective = segments.remove(0);
        return Some(LinkTarget::Absolute {
            collective,
            path: normalize(segments),
        });
    }

    // Other hosts and other apps are not page references
    if has_scheme || path.starts_with('/') {
        return None;
    }

    let mut up = 0;
    let mut segments: Vec<String> = Vec::new();
    for segment in decode_segments(&path) {
        match segment.as_str() {
            "." => {}
            ".." => {
                if segments.pop().is_none() {
                    up += 1;
                }
            }
            _ => segments.push(segment),
        }
    }

    let path = normalize(segments);
    if path.is_empty() && up == 0 {
        return None;
    }
    Some(LinkTarget::Relative { up, path })
}

fn file_id_from_query(query: &str) -> Option<PageId> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "fileId")
        .and_then(|(_, value)| value.parse::<u64>().ok())
        .map(PageId)
}

fn decode_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| s.to_string())
        })
        .collect()
}

/// Drop a `.md` suffix on the last segment and a trailing `Readme` segment,
/// which stands for its parent page.
fn normalize(mut segments: Vec<String>) -> Vec<String> {
    segments.retain(|s| !s.is_empty());
    if let Some(last) = segments.last_mut() {
        let stripped = strip_md_suffix(last).to_string();
        *last = stripped;
    }
    if segments
        .last()
        .is_some_and(|last| last.eq_ignore_ascii_case("readme"))
    {
        segments.pop();
    }
    segments
}

fn strip_md_suffix(name: &str) -> &str {
    let len = name.len();
    if len > 3 && name.is_char_boundary(len - 3) && name[len - 3..].eq_ignore_ascii_case(".md") {
        &name[..len - 3]
    } else {
        name
    }
}
