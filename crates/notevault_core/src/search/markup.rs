//! Lenient markup tokenizer and rich-content tree.
//!
//! # Responsibility
//! - Split editor markup into text and tag tokens with exact byte spans.
//! - Build an owned, immutable content tree for text extraction.
//!
//! # Invariants
//! - Tokenizing never fails; anything that is not a well-formed tag is text.
//! - Token spans cover the source without gaps or overlaps, in order.
//! - `script`/`style` bodies are a single raw text token.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::ops::Range;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("valid tag regex")
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute regex")
});
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid entity regex")
});

/// Elements that never have children.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
/// Elements whose body is raw text, not markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea"];

/// One lexical unit of markup, with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text {
        span: Range<usize>,
        /// Body of a `script`/`style`/`textarea` element.
        raw_text: bool,
    },
    Open {
        span: Range<usize>,
        tag: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    Close {
        span: Range<usize>,
        tag: String,
    },
    /// Comments and declarations.
    Other { span: Range<usize> },
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::Text { span, .. }
            | Self::Open { span, .. }
            | Self::Close { span, .. }
            | Self::Other { span } => span.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased.
    pub name: String,
    /// Entity-decoded; empty for boolean attributes.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased.
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<ContentNode>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|attr| attr.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Element(Element),
    /// Entity-decoded text.
    Text(String),
}

/// Parsed rich-content tree. Never borrows from, or mutates, its source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTree {
    pub nodes: Vec<ContentNode>,
}

impl ContentTree {
    /// Parses markup leniently; unmatched close tags are dropped and open
    /// elements are closed at end of input.
    pub fn parse(source: &str) -> Self {
        let mut stack: Vec<Element> = Vec::new();
        let mut roots: Vec<ContentNode> = Vec::new();

        for token in tokenize(source) {
            match token {
                Token::Text { span, raw_text } => {
                    let raw = &source[span];
                    let text = if raw_text {
                        raw.to_string()
                    } else {
                        decode_entities(raw).into_owned()
                    };
                    attach(&mut stack, &mut roots, ContentNode::Text(text));
                }
                Token::Open {
                    tag,
                    attrs,
                    self_closing,
                    ..
                } => {
                    let void = self_closing || VOID_TAGS.contains(&tag.as_str());
                    let element = Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    };
                    if void {
                        attach(&mut stack, &mut roots, ContentNode::Element(element));
                    } else {
                        stack.push(element);
                    }
                }
                Token::Close { tag, .. } => {
                    let Some(index) = stack.iter().rposition(|open| open.tag == tag) else {
                        continue;
                    };
                    while stack.len() > index {
                        close_top(&mut stack, &mut roots);
                    }
                }
                Token::Other { .. } => {}
            }
        }

        while !stack.is_empty() {
            close_top(&mut stack, &mut roots);
        }
        Self { nodes: roots }
    }
}

fn attach(stack: &mut [Element], roots: &mut Vec<ContentNode>, node: ContentNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn close_top(stack: &mut Vec<Element>, roots: &mut Vec<ContentNode>) {
    if let Some(element) = stack.pop() {
        attach(stack, roots, ContentNode::Element(element));
    }
}

/// Splits `source` into tokens whose spans tile the whole input.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some(caps) = TAG_RE.captures_at(source, pos) else {
            tokens.push(Token::Text {
                span: pos..source.len(),
                raw_text: false,
            });
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        if whole.start() > pos {
            tokens.push(Token::Text {
                span: pos..whole.start(),
                raw_text: false,
            });
        }
        let span = whole.range();
        pos = whole.end();

        let Some(name) = caps.get(2) else {
            tokens.push(Token::Other { span });
            continue;
        };
        let tag = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            tokens.push(Token::Close { span, tag });
            continue;
        }

        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        let attrs = parse_attributes(caps.get(3).map_or("", |m| m.as_str()));
        let raw_body = !self_closing && RAW_TEXT_TAGS.contains(&tag.as_str());
        let closer = format!("</{tag}");
        tokens.push(Token::Open {
            span,
            tag,
            attrs,
            self_closing,
        });

        if raw_body {
            let end = source[pos..]
                .to_ascii_lowercase()
                .find(&closer)
                .map_or(source.len(), |offset| pos + offset);
            if end > pos {
                tokens.push(Token::Text {
                    span: pos..end,
                    raw_text: true,
                });
            }
            pos = end;
        }
    }

    tokens
}

fn parse_attributes(raw: &str) -> Vec<Attribute> {
    ATTR_RE
        .captures_iter(raw)
        .map(|caps: Captures<'_>| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            Attribute {
                name: caps[1].to_ascii_lowercase(),
                value: decode_entities(value).into_owned(),
            }
        })
        .collect()
}

/// Byte spans of the character references in `text`, in source order.
pub fn entity_spans(text: &str) -> Vec<Range<usize>> {
    ENTITY_RE.find_iter(text).map(|hit| hit.range()).collect()
}

/// Decodes character references. Unknown named references are kept verbatim.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &Captures<'_>| {
        let body = &caps[1];
        let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => None,
            }
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

/// Escapes text so it can be matched against, or spliced into, markup text.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{decode_entities, escape_text, tokenize, ContentNode, ContentTree, Token};

    fn element_tags(nodes: &[ContentNode]) -> Vec<&str> {
        nodes
            .iter()
            .filter_map(|node| match node {
                ContentNode::Element(el) => Some(el.tag.as_str()),
                ContentNode::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn token_spans_tile_the_source() {
        let source = "<p class=\"a\">Hi <b>there</b></p><!-- note -->tail < 3";
        let tokens = tokenize(source);
        let mut cursor = 0;
        for token in &tokens {
            let span = token.span();
            assert_eq!(span.start, cursor);
            cursor = span.end;
        }
        assert_eq!(cursor, source.len());
        assert!(matches!(tokens.last(), Some(Token::Text { .. })));
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let tree = ContentTree::parse(r#"<div data-x='1' hidden><p>One<br>Two</p></div>"#);
        assert_eq!(element_tags(&tree.nodes), vec!["div"]);
        let ContentNode::Element(div) = &tree.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(div.attr("data-x"), Some("1"));
        assert!(div.has_attr("hidden"));
        let ContentNode::Element(p) = &div.children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(element_tags(&p.children), vec!["br"]);
        assert_eq!(p.children.len(), 3);
    }

    #[test]
    fn unclosed_and_stray_tags_are_tolerated() {
        let tree = ContentTree::parse("<p>open <em>still</p></span>after");
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes[1], ContentNode::Text("after".to_string()));
    }

    #[test]
    fn script_body_is_raw_text() {
        let tokens = tokenize("<script>if (a < b) { x = '<p>'; }</script><p>ok</p>");
        let raw = tokens
            .iter()
            .filter(|token| matches!(token, Token::Text { raw_text: true, .. }))
            .count();
        assert_eq!(raw, 1);
        let tree = ContentTree::parse("<script>if (a < b) {}</script><p>ok</p>");
        assert_eq!(element_tags(&tree.nodes), vec!["script", "p"]);
    }

    #[test]
    fn entities_decode_and_unknown_ones_survive() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
        assert_eq!(decode_entities("&bogus; &nbsp;"), "&bogus; \u{a0}");
    }

    #[test]
    fn escape_text_covers_markup_significant_characters() {
        assert_eq!(escape_text("a & <b>"), "a &amp; &lt;b&gt;");
    }
}
