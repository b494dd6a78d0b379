//! Removal of inline image links from document text.
//!
//! Only the minimal `![alt](path)` shape is recognised: `alt` may not contain
//! `]` and `path` may not contain `)`. Nested brackets are not handled.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_INLINE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]*)\)").unwrap());

/// Delete every inline image link whose target basename is in `removed`.
pub fn rewrite(text: &str, removed: &HashSet<String>) -> String {
    rewrite_counted(text, removed).0
}

/// Like [`rewrite`], also returning how many links were deleted.
pub fn rewrite_counted(text: &str, removed: &HashSet<String>) -> (String, usize) {
    if removed.is_empty() {
        return (text.to_string(), 0);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut count = 0;

    for caps in RE_INLINE_IMAGE.captures_iter(text) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if removed.contains(link_basename(target.as_str())) {
            out.push_str(&text[last..whole.start()]);
            last = whole.end();
            count += 1;
        }
    }
    out.push_str(&text[last..]);

    (out, count)
}

/// Final segment of a link target, split on either path separator.
fn link_basename(target: &str) -> &str {
    target.rsplit(['/', '\\']).next().unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_only_matched_link_is_excised() {
        let text = "Fig1 ![x](imgs/a.png) text ![y](imgs/c.png)";
        assert_eq!(
            rewrite(text, &removed(&["a.png"])),
            "Fig1  text ![y](imgs/c.png)"
        );
    }

    #[test]
    fn test_empty_set_is_identity() {
        let text = "# Title\n\n![Image](doc_artifacts/image_000000_abc.png)\n";
        let (out, count) = rewrite_counted(text, &HashSet::new());
        assert_eq!(out, text);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_multiple_links_on_one_line() {
        let text = "![a](x/a.png)![b](x/b.png) tail ![a2](y/a.png)";
        let (out, count) = rewrite_counted(text, &removed(&["a.png", "b.png"]));
        assert_eq!(out, " tail ");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_basename_must_match_exactly() {
        let text = "![p](imgs/xa.png) ![q](imgs/a.png.bak) ![r](imgs/A.png)";
        assert_eq!(rewrite(text, &removed(&["a.png"])), text);
    }

    #[test]
    fn test_plain_links_are_left_alone() {
        let text = "see [a](imgs/a.png) and ![a](imgs/a.png)";
        assert_eq!(rewrite(text, &removed(&["a.png"])), "see [a](imgs/a.png) and ");
    }

    #[test]
    fn test_bare_and_backslash_targets() {
        let text = "![](a.png)|![w](dir\\sub\\a.png)|";
        assert_eq!(rewrite(text, &removed(&["a.png"])), "||");
    }

    #[test]
    fn test_newlines_around_links_are_preserved() {
        let text = "before\n\n![Image](doc_artifacts/a.png)\n\nafter\n";
        assert_eq!(rewrite(text, &removed(&["a.png"])), "before\n\n\n\nafter\n");
    }

    #[test]
    fn test_link_basename() {
        assert_eq!(link_basename("a/b/c.png"), "c.png");
        assert_eq!(link_basename("c.png"), "c.png");
        assert_eq!(link_basename("a\\c.png"), "c.png");
        assert_eq!(link_basename("dir/"), "");
    }
}
