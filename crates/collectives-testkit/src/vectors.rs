//! Link vectors.
//!
//! Markdown snippets with the link targets they must parse to. Every
//! embedder that writes page content relies on these forms being
//! recognised the same way.

use collectives_core::{extract_links, LinkTarget, PageId};

/// A single link vector.
#[derive(Debug, Clone)]
pub struct LinkVector {
    pub name: &'static str,
    pub markdown: &'static str,
    pub expected: Vec<LinkTarget>,
}

fn absolute(collective: &str, path: &[&str]) -> LinkTarget {
    LinkTarget::Absolute {
        collective: collective.to_string(),
        path: path.iter().map(|s| s.to_string()).collect(),
    }
}

fn relative(up: usize, path: &[&str]) -> LinkTarget {
    LinkTarget::Relative {
        up,
        path: path.iter().map(|s| s.to_string()).collect(),
    }
}

/// All link vectors.
pub fn all_vectors() -> Vec<LinkVector> {
    vec![
        LinkVector {
            name: "app_path_link",
            markdown: "a [link to Day 1](/index.php/apps/collectives/Our%20Garden/Day%201).",
            expected: vec![absolute("Our Garden", &["Day 1"])],
        },
        LinkVector {
            name: "full_url_with_file_id",
            markdown: "[x](https://cloud.example.org/apps/collectives/Our%20Garden/Day%201?fileId=42)",
            expected: vec![LinkTarget::PageId(PageId(42))],
        },
        LinkVector {
            name: "public_share_link",
            markdown: "[x](/apps/collectives/p/abc123/Our%20Garden/Day%202.md)",
            expected: vec![absolute("Our Garden", &["Day 2"])],
        },
        LinkVector {
            name: "relative_sibling_markdown_file",
            markdown: "[x](Day%201.md)",
            expected: vec![relative(0, &["Day 1"])],
        },
        LinkVector {
            name: "relative_parent_readme",
            markdown: "[x](../Garden/Readme.md)",
            expected: vec![relative(1, &["Garden"])],
        },
        LinkVector {
            name: "wikilink_with_alias_and_anchor",
            markdown: "see [[Day 1#Morning|the first day]]",
            expected: vec![LinkTarget::Title("Day 1".into())],
        },
        LinkVector {
            name: "ignored_forms",
            markdown: "![img](Day%201.png) [a](#top) [b](mailto:x@example.org) \
                [c](https://other.example.org/wiki/Page) `[d](Day%201)`",
            expected: vec![],
        },
        LinkVector {
            name: "fenced_code_is_not_content",
            markdown: "```\n[x](Day%201)\n```\n[[Day 2]]",
            expected: vec![LinkTarget::Title("Day 2".into())],
        },
    ]
}

/// Check every vector. Returns the names of the failing ones.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|v| extract_links(v.markdown) != v.expected)
        .map(|v| v.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        for vector in all_vectors() {
            assert_eq!(
                extract_links(vector.markdown),
                vector.expected,
                "vector {}",
                vector.name
            );
        }
        assert!(verify_all_vectors().is_empty());
    }
}
