//! Candidate discovery.
//!
//! Two strategies share the [`LocateStrategy`] contract. Result pages with
//! heading-anchored entries go through [`HeadingAnchored`]; pages without
//! that structure fall back to [`FlatLink`]. Both feed the same filter.

use tracing::{debug, warn};

use crate::config::Denylist;
use crate::document::{DocumentTree, Node};

/// A link that might describe one news item, with the element around it.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// The link-bearing element.
    pub anchor: Node<'a>,
    /// Element scanned for summary, source and cover.
    pub context: Node<'a>,
}

impl<'a> Candidate<'a> {
    /// Creates a candidate.
    pub fn new(anchor: Node<'a>, context: Node<'a>) -> Self {
        Self { anchor, context }
    }

    /// Visible anchor text with whitespace collapsed.
    pub fn anchor_text(&self) -> String {
        self.anchor.visible_text()
    }
}

/// Discovery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMode {
    /// One candidate per heading, in its enclosing container.
    HeadingAnchored,
    /// Every link, with the link as its own context.
    FlatLink,
}

/// A way of finding unfiltered candidates in a document.
pub trait LocateStrategy {
    /// Mode implemented by this strategy.
    fn mode(&self) -> LocateMode;

    /// Finds candidates in document order.
    fn locate<'a>(&self, doc: &'a DocumentTree) -> Vec<Candidate<'a>>;
}

/// Headings with a link inside, scoped to their nearest container.
#[derive(Debug, Clone)]
pub struct HeadingAnchored {
    heading_tag: String,
    container_tag: String,
}

impl HeadingAnchored {
    /// Creates the strategy for the given heading and container tags.
    pub fn new(heading_tag: impl Into<String>, container_tag: impl Into<String>) -> Self {
        Self {
            heading_tag: heading_tag.into(),
            container_tag: container_tag.into(),
        }
    }

    /// Returns true if any heading in the document carries a link.
    pub fn applies_to(&self, doc: &DocumentTree) -> bool {
        doc.find_all(&self.heading_tag)
            .iter()
            .any(|heading| heading.find_with_attr("a", "href").is_some())
    }
}

impl LocateStrategy for HeadingAnchored {
    fn mode(&self) -> LocateMode {
        LocateMode::HeadingAnchored
    }

    fn locate<'a>(&self, doc: &'a DocumentTree) -> Vec<Candidate<'a>> {
        doc.find_all(&self.heading_tag)
            .into_iter()
            .filter_map(|heading| {
                let anchor = heading.find_with_attr("a", "href")?;
                let context = heading
                    .nearest_ancestor(&self.container_tag)
                    .or_else(|| heading.parent())
                    .unwrap_or(heading);
                Some(Candidate::new(anchor, context))
            })
            .collect()
    }
}

/// Every link in the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLink;

impl LocateStrategy for FlatLink {
    fn mode(&self) -> LocateMode {
        LocateMode::FlatLink
    }

    fn locate<'a>(&self, doc: &'a DocumentTree) -> Vec<Candidate<'a>> {
        match doc.select("a[href]") {
            Ok(links) => links
                .into_iter()
                .map(|link| Candidate::new(link, link))
                .collect(),
            Err(e) => {
                warn!("Flat link scan failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Picks a strategy and filters out navigation and too-short anchors.
#[derive(Debug, Clone)]
pub struct CandidateLocator {
    heading: HeadingAnchored,
    flat: FlatLink,
    denylist: Denylist,
    min_anchor_chars: usize,
}

impl CandidateLocator {
    /// Creates a locator.
    pub fn new(heading: HeadingAnchored, denylist: Denylist, min_anchor_chars: usize) -> Self {
        Self {
            heading,
            flat: FlatLink,
            denylist,
            min_anchor_chars,
        }
    }

    /// Probes the document for heading-anchored structure.
    pub fn mode_for(&self, doc: &DocumentTree) -> LocateMode {
        if self.heading.applies_to(doc) {
            LocateMode::HeadingAnchored
        } else {
            LocateMode::FlatLink
        }
    }

    /// Locates filtered candidates using the probed mode.
    ///
    /// Headings that only carry navigation (related searches, sidebars)
    /// leave the heading pass empty; the page is then scanned flat.
    pub fn locate<'a>(&self, doc: &'a DocumentTree) -> Vec<Candidate<'a>> {
        match self.mode_for(doc) {
            LocateMode::HeadingAnchored => {
                let kept = self.locate_with(LocateMode::HeadingAnchored, doc);
                if kept.is_empty() {
                    debug!("Heading pass kept nothing, rescanning flat links");
                    self.locate_with(LocateMode::FlatLink, doc)
                } else {
                    kept
                }
            }
            LocateMode::FlatLink => self.locate_with(LocateMode::FlatLink, doc),
        }
    }

    /// Locates filtered candidates using an explicit mode.
    pub fn locate_with<'a>(&self, mode: LocateMode, doc: &'a DocumentTree) -> Vec<Candidate<'a>> {
        let strategy: &dyn LocateStrategy = match mode {
            LocateMode::HeadingAnchored => &self.heading,
            LocateMode::FlatLink => &self.flat,
        };

        let found = strategy.locate(doc);
        let total = found.len();
        let kept: Vec<_> = found
            .into_iter()
            .filter(|candidate| self.accepts(&candidate.anchor_text()))
            .collect();

        debug!(
            "{:?} mode kept {} of {} candidates",
            strategy.mode(),
            kept.len(),
            total
        );
        kept
    }

    /// Returns true if the anchor text may be a news title.
    pub fn accepts(&self, anchor_text: &str) -> bool {
        anchor_text.chars().count() >= self.min_anchor_chars && !self.denylist.rejects(anchor_text)
    }
}
