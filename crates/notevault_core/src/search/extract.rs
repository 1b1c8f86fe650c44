//! Flattening of rich content into matchable plain text.
//!
//! # Responsibility
//! - Produce one order-preserving, whitespace-normalized string from a page
//!   title and its content tree.
//! - Drop media, UI controls and hidden subtrees.
//!
//! # Invariants
//! - Pure function of its inputs; the live content is never touched.
//! - Never fails. Malformed markup degrades to best-effort text.
//! - Output contains no markup, attribute fragments or base64 payloads.

use crate::search::markup::{ContentNode, ContentTree, Element};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static RESIDUAL_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid residual tag regex"));
static RESIDUAL_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b\w+="[^"]*""#).expect("valid residual attribute regex"));
static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:[^;\s]+;base64,[A-Za-z0-9+/=]+").expect("valid data uri regex")
});

/// Non-textual subtrees removed wholesale.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "img", "picture", "video", "audio", "iframe", "canvas", "svg", "object",
    "embed", "button", "input", "select", "textarea",
];
/// Class tokens that mark editor chrome rather than content.
const EXCLUDED_CLASSES: &[&str] = &[
    "link-preview",
    "draggable-image",
    "search-results",
    "context-menu",
    "toolbar",
];
/// Substrings of the class attribute that mark controls.
const CONTROL_CLASS_FRAGMENTS: &[&str] = &["control", "btn", "button"];
const CONTROL_ROLES: &[&str] = &["button", "toolbar", "menu", "menubar", "dialog"];

/// Elements whose descendant text is kept.
const TEXT_BEARING_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "div", "span", "strong", "em", "b",
    "i", "u",
];
/// Elements that separate words at their boundaries.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "div", "br", "hr", "blockquote",
    "pre", "table", "tr", "td", "th", "section", "article", "header", "footer",
];

/// Extracts matchable text from raw markup and an optional title.
pub fn extract_text(title: Option<&str>, markup: &str) -> String {
    extract_tree_text(title, &ContentTree::parse(markup))
}

/// Extracts matchable text from a parsed tree and an optional title.
pub fn extract_tree_text(title: Option<&str>, tree: &ContentTree) -> String {
    let mut buffer = String::new();
    if let Some(title) = title.map(str::trim).filter(|title| !title.is_empty()) {
        buffer.push_str(title);
        buffer.push(' ');
    }
    collect_text(&tree.nodes, false, &mut buffer);

    let collapsed = collapse_whitespace(&buffer);
    let without_tags = RESIDUAL_TAG_RE.replace_all(&collapsed, "");
    let without_attrs = RESIDUAL_ATTR_RE.replace_all(&without_tags, "");
    let without_data = DATA_URI_RE.replace_all(&without_attrs, "");
    collapse_whitespace(&without_data)
}

fn collect_text(nodes: &[ContentNode], text_bearing: bool, buffer: &mut String) {
    for node in nodes {
        match node {
            ContentNode::Text(text) => {
                if text_bearing {
                    buffer.push_str(text);
                }
            }
            ContentNode::Element(element) => {
                if is_excluded(element) {
                    continue;
                }
                let tag = element.tag.as_str();
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    buffer.push(' ');
                }
                collect_text(
                    &element.children,
                    text_bearing || TEXT_BEARING_TAGS.contains(&tag),
                    buffer,
                );
                if block {
                    buffer.push(' ');
                }
            }
        }
    }
}

fn is_excluded(element: &Element) -> bool {
    if EXCLUDED_TAGS.contains(&element.tag.as_str()) || element.has_attr("hidden") {
        return true;
    }

    if element
        .attr("contenteditable")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
    {
        return true;
    }

    if let Some(class) = element.attr("class") {
        let class = class.to_ascii_lowercase();
        if class
            .split_whitespace()
            .any(|token| EXCLUDED_CLASSES.contains(&token))
            || CONTROL_CLASS_FRAGMENTS
                .iter()
                .any(|fragment| class.contains(fragment))
        {
            return true;
        }
    }

    if let Some(role) = element.attr("role") {
        let role = role.trim().to_ascii_lowercase();
        if CONTROL_ROLES.contains(&role.as_str()) {
            return true;
        }
    }

    element.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::extract_text;

    #[test]
    fn title_is_prepended_with_separator() {
        assert_eq!(
            extract_text(Some("  Hello  "), "<p>world</p>"),
            "Hello world"
        );
        assert_eq!(extract_text(Some("   "), "<p>world</p>"), "world");
        assert_eq!(extract_text(None, "<p>world</p>"), "world");
    }

    #[test]
    fn block_boundaries_separate_words_and_inline_ones_do_not() {
        let text = extract_text(None, "<p>Hello <strong>big</strong> wor<b>ld</b></p><p>next</p>");
        assert_eq!(text, "Hello big world next");
    }

    #[test]
    fn nested_text_is_not_duplicated() {
        let text = extract_text(None, "<div><p>one <em>two</em></p><ul><li>three</li></ul></div>");
        assert_eq!(text, "one two three");
    }

    #[test]
    fn media_controls_and_hidden_nodes_are_removed() {
        let markup = concat!(
            "<p>keep</p>",
            "<img src=\"data:image/png;base64,AAAA\" alt=\"pic\">",
            "<div class=\"draggable-image\"><span>caption</span></div>",
            "<div class=\"image-control-btn\">x</div>",
            "<div contenteditable=\"false\">locked</div>",
            "<span style=\"display: none\">hidden</span>",
            "<span role=\"button\">press</span>",
            "<iframe src=\"https://video\"></iframe>",
            "<p>also</p>",
        );
        assert_eq!(extract_text(None, markup), "keep also");
    }

    #[test]
    fn text_outside_text_bearing_elements_is_dropped() {
        assert_eq!(extract_text(None, "loose <p>kept <a href=\"#\">link</a></p>"), "kept link");
    }

    #[test]
    fn residual_fragments_are_scrubbed() {
        let markup = "<p>see &lt;b&gt; and width=\"10\" data:image/png;base64,QUJD end</p>";
        assert_eq!(extract_text(None, markup), "see and end");
    }

    #[test]
    fn empty_content_yields_empty_text() {
        assert_eq!(extract_text(None, "<p><br></p>"), "");
        assert_eq!(extract_text(None, ""), "");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(extract_text(None, "<p>Fish&nbsp;&amp;&nbsp;chips</p>"), "Fish & chips");
    }
}
