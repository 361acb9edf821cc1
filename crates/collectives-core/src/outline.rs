//! Outline extraction.
//!
//! The outline is the ordered list of ATX headings (`#` to `######`) of a
//! page, used for the table of contents. Headings inside fenced code blocks
//! are skipped. It is a pure function of the content.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").expect("valid heading regex")
});

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(```|~~~)").expect("valid fence regex"));

/// A heading node of a page outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Markdown heading level, 1 to 6.
    pub level: u8,

    /// Nesting depth relative to the shallowest heading of the page.
    pub depth: u8,

    /// Heading text.
    pub text: String,

    /// Anchor id, unique within the page.
    pub anchor: String,
}

/// Extract the outline of markdown content.
pub fn extract_outline(markdown: &str) -> Vec<OutlineItem> {
    let mut headings: Vec<(u8, String)> = Vec::new();
    let mut open_fence: Option<&str> = None;

    for line in markdown.lines() {
        if let Some(m) = FENCE_RE.captures(line) {
            let marker = m.get(1).map(|g| g.as_str()).unwrap_or_default();
            match open_fence {
                Some(open) if open == marker => open_fence = None,
                Some(_) => {}
                None => open_fence = Some(marker),
            }
            continue;
        }
        if open_fence.is_some() {
            continue;
        }

        if let Some(cap) = HEADING_RE.captures(line) {
            let level = cap[1].len() as u8;
            let text = cap.get(2).map(|g| g.as_str().trim()).unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            headings.push((level, text.to_string()));
        }
    }

    let min_level = headings.iter().map(|(level, _)| *level).min().unwrap_or(1);
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut emitted: HashSet<String> = HashSet::new();

    headings
        .into_iter()
        .map(|(level, text)| {
            let base = format!("h-{}", slugify(&text));
            let count = repeats.entry(base.clone()).or_insert(0);
            let mut anchor = base.clone();
            // A suffixed anchor may collide with a heading that slugs to it
            while emitted.contains(&anchor) {
                *count += 1;
                anchor = format!("{}-{}", base, count);
            }
            emitted.insert(anchor.clone());

            OutlineItem {
                level,
                depth: level - min_level,
                text,
                anchor,
            }
        })
        .collect()
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
