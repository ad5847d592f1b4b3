//! Response decoding and the navigable document tree.
//!
//! [`DocumentTree`] wraps a parsed `scraper::Html` and exposes the handful of
//! queries the extraction pipeline needs. No extraction logic lives here.

use std::sync::LazyLock;

use encoding_rs::{Encoding, GB18030, UTF_8, WINDOWS_1252};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::transport::RawResponse;
use crate::{CrawlError, Result};

/// How many leading bytes are scanned for a `<meta>` charset declaration.
const META_SNIFF_BYTES: usize = 2048;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
        .expect("meta charset pattern is valid")
});

/// A response body together with the encoding it will be decoded with.
#[derive(Debug, Clone)]
pub struct RawDocument {
    body: Vec<u8>,
    encoding: &'static Encoding,
    origin: Url,
}

impl RawDocument {
    /// Creates a document with an already resolved encoding.
    pub fn new(body: impl Into<Vec<u8>>, encoding: &'static Encoding, origin: Url) -> Self {
        Self {
            body: body.into(),
            encoding,
            origin,
        }
    }

    /// Resolves the encoding of a response and wraps its body.
    pub fn from_response(response: RawResponse, origin: Url) -> Self {
        let encoding = resolve_encoding(response.charset.as_deref(), &response.body);
        Self::new(response.body, encoding, origin)
    }

    /// Wraps an in-memory UTF-8 page.
    pub fn from_html(html: &str, origin: Url) -> Self {
        Self::new(html.as_bytes(), UTF_8, origin)
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Resolved encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Origin relative links are resolved against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Parses the body into a document tree.
    pub fn parse(&self) -> DocumentTree {
        DocumentTree::parse(&self.body, self.encoding)
    }
}

/// Picks the encoding for a body.
///
/// A declared charset is trusted unless it is missing, unknown, or the
/// generic Latin-1 fallback, in which case the content is sniffed.
pub fn resolve_encoding(declared: Option<&str>, body: &[u8]) -> &'static Encoding {
    match declared.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        Some(encoding) if encoding != WINDOWS_1252 => encoding,
        _ => detect_encoding(body),
    }
}

/// Detects an encoding from content: BOM, then `<meta>` declaration, then
/// UTF-8 validity, falling back to GB18030.
pub fn detect_encoding(body: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }

    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    let declared = META_CHARSET
        .captures(&head)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
        .filter(|encoding| *encoding != WINDOWS_1252);
    if let Some(encoding) = declared {
        return encoding;
    }

    if std::str::from_utf8(body).is_ok() {
        UTF_8
    } else {
        GB18030
    }
}

/// Collapses whitespace runs into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A parsed HTML document.
pub struct DocumentTree {
    html: Html,
}

impl DocumentTree {
    /// Decodes `body` with `encoding` and parses it.
    pub fn parse(body: &[u8], encoding: &'static Encoding) -> Self {
        let (text, used, had_errors) = encoding.decode(body);
        if had_errors {
            debug!("Body had malformed {} sequences", used.name());
        }
        Self::parse_str(&text)
    }

    /// Parses an already decoded page.
    pub fn parse_str(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// The `<html>` element.
    pub fn root(&self) -> Node<'_> {
        Node::new(self.html.root_element())
    }

    /// All elements with the given tag, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<Node<'_>> {
        self.root().find_all(tag)
    }

    /// All elements matching a CSS selector, in document order.
    pub fn select(&self, css: &str) -> Result<Vec<Node<'_>>> {
        let selector = Selector::parse(css)
            .map_err(|e| CrawlError::Parse(format!("Failed to parse selector: {:?}", e)))?;
        Ok(self.html.select(&selector).map(Node::new).collect())
    }
}

/// An element inside a [`DocumentTree`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

impl<'a> Node<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Lower-case tag name.
    pub fn tag(&self) -> &'a str {
        self.element.value().name()
    }

    /// Attribute value.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Returns true if both refer to the same element.
    pub fn is_same(&self, other: &Node<'_>) -> bool {
        self.element.id() == other.element.id()
    }

    fn descendants(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .map(Node::new)
    }

    /// Descendants with the given tag, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<Node<'a>> {
        self.descendants().filter(|n| n.tag() == tag).collect()
    }

    /// First descendant with the given tag.
    pub fn find(&self, tag: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.tag() == tag)
    }

    /// First descendant with the given tag that carries `attr`.
    pub fn find_with_attr(&self, tag: &str, attr: &str) -> Option<Node<'a>> {
        self.descendants()
            .find(|n| n.tag() == tag && n.attr(attr).is_some())
    }

    /// First descendant with the given tag whose `attr` matches `pattern`.
    pub fn find_by_attr_pattern(&self, tag: &str, attr: &str, pattern: &Regex) -> Option<Node<'a>> {
        self.descendants().find(|n| {
            n.tag() == tag && n.attr(attr).is_some_and(|value| pattern.is_match(value))
        })
    }

    /// Closest enclosing element with the given tag.
    pub fn nearest_ancestor(&self, tag: &str) -> Option<Node<'a>> {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .map(Node::new)
            .find(|n| n.tag() == tag)
    }

    /// Enclosing element.
    pub fn parent(&self) -> Option<Node<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Node::new)
    }

    /// All descendant text, concatenated as-is.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text of direct text children only.
    pub fn own_text(&self) -> String {
        self.element
            .children()
            .filter_map(|child| child.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    /// All descendant text with whitespace collapsed.
    pub fn visible_text(&self) -> String {
        collapse_whitespace(&self.text())
    }
}
