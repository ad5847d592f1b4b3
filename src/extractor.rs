//! Field extraction for located candidates.
//!
//! Each field is computed independently as a [`FieldResult`]; failures are
//! merged to an empty string so one bad field never costs the whole record.
//! Only a missing title or URL rejects a candidate.

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ExtractionPolicy;
use crate::locator::Candidate;
use crate::patterns::{
    FALLBACK_SUMMARY_CLEANUP, SOURCE_BEFORE_DATE, SOURCE_CLASSES, SOURCE_CLEANUP, SOURCE_LABEL,
    SOURCE_LABEL_WORD, SUMMARY_CLASSES, SUMMARY_CLEANUP,
};
use crate::NewsRecord;

/// Image attributes in preference order; lazy-load attributes first.
const IMAGE_ATTRS: &[&str] = &["data-src", "data-original", "src"];

/// Why a single field came out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Nothing in the markup looked like this field.
    #[error("not found")]
    Missing,
    /// Text was found but was too short after cleanup.
    #[error("too short")]
    TooShort,
    /// Text was found but was too long to be plausible.
    #[error("too long")]
    TooLong,
    /// Link could not be resolved against the origin.
    #[error("unresolvable link")]
    Unresolvable,
    /// Link resolved to something other than http(s).
    #[error("not an http(s) URL")]
    NotHttp,
    /// Image belongs to the search engine's own assets.
    #[error("search engine asset")]
    EngineAsset,
}

/// Outcome of extracting one field.
pub type FieldResult<T = String> = std::result::Result<T, FieldError>;

/// Why a candidate produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Anchor had no visible text.
    #[error("empty title")]
    EmptyTitle,
    /// Title shorter than the policy minimum.
    #[error("title '{0}' is too short")]
    TitleTooShort(String),
    /// Anchor had no usable link.
    #[error("no usable URL ({0})")]
    NoUrl(FieldError),
}

/// Turns candidates into records.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    policy: ExtractionPolicy,
    origin: Url,
}

impl FieldExtractor {
    /// Creates an extractor resolving relative links against `origin`.
    pub fn new(policy: ExtractionPolicy, origin: Url) -> Self {
        Self { policy, origin }
    }

    /// Extracts a record, or explains why the candidate was dropped.
    pub fn extract(&self, candidate: &Candidate<'_>) -> Result<NewsRecord, Rejection> {
        let title = self.title(candidate).map_err(|_| Rejection::EmptyTitle)?;
        if title.chars().count() < self.policy.min_title_chars {
            return Err(Rejection::TitleTooShort(title));
        }
        let url = self.url(candidate).map_err(Rejection::NoUrl)?;

        let summary = merge("summary", self.summary(candidate, &title));
        Ok(NewsRecord::new(title, url)
            .with_summary(summary)
            .with_cover(merge("cover", self.cover(candidate)))
            .with_source(merge("source", self.source(candidate))))
    }

    /// Visible anchor text.
    pub fn title(&self, candidate: &Candidate<'_>) -> FieldResult {
        let title = candidate.anchor_text();
        if title.is_empty() {
            return Err(FieldError::Missing);
        }
        Ok(title)
    }

    /// Absolute article URL, unwrapping redirector links when possible.
    pub fn url(&self, candidate: &Candidate<'_>) -> FieldResult {
        let href = candidate
            .anchor
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or(FieldError::Missing)?;
        let url = self.resolve(href)?;

        if self.is_redirector(&url) {
            if let Some(destination) = self.redirect_destination(&url) {
                return Ok(destination);
            }
            debug!("Keeping undecodable redirector {}", url);
        }
        Ok(url.into())
    }

    /// Abstract from a summary-classed element, else from the container text.
    pub fn summary(&self, candidate: &Candidate<'_>, title: &str) -> FieldResult {
        let context = candidate.context;

        if let Some(element) = SUMMARY_CLASSES.find(context) {
            let text = SUMMARY_CLEANUP.apply(&element.visible_text().replace(title, ""));
            let text = strip_title(&text, title);
            if text.chars().count() > self.policy.summary_element_min_chars {
                return Ok(truncate(&text, self.policy.summary_max_chars));
            }
        }

        let full = context.visible_text();
        let text = FALLBACK_SUMMARY_CLEANUP.apply(&full.replace(title, ""));
        let text = strip_title(&text, title);
        if text.chars().count() > self.policy.summary_fallback_min_chars {
            Ok(truncate(&text, self.policy.summary_max_chars))
        } else if full == title {
            Err(FieldError::Missing)
        } else {
            Err(FieldError::TooShort)
        }
    }

    /// First image in the container, unless it is an engine asset.
    pub fn cover(&self, candidate: &Candidate<'_>) -> FieldResult {
        let image = candidate
            .context
            .find("img")
            .ok_or(FieldError::Missing)?;
        let src = IMAGE_ATTRS
            .iter()
            .filter_map(|attr| image.attr(attr))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .ok_or(FieldError::Missing)?;

        let url = self.resolve(src)?;
        if self.is_engine_asset(&url) {
            return Err(FieldError::EngineAsset);
        }
        Ok(url.into())
    }

    /// Publisher from a source-classed element, else from free-text patterns.
    pub fn source(&self, candidate: &Candidate<'_>) -> FieldResult {
        let context = candidate.context;
        let max = self.policy.source_max_chars;

        if let Some(element) = SOURCE_CLASSES.find(context) {
            let text = SOURCE_CLEANUP.apply(&element.visible_text());
            let len = text.chars().count();
            if len > 0 && len < max {
                return Ok(text);
            }
        }

        let full = context.text();
        if let Some(caps) = SOURCE_LABEL.captures(&full) {
            return Ok(truncate(caps[1].trim(), max));
        }

        let caps = SOURCE_BEFORE_DATE
            .captures(&full)
            .ok_or(FieldError::Missing)?;
        let token = caps[1].trim();
        if token.contains(SOURCE_LABEL_WORD) {
            return Err(FieldError::Missing);
        }
        if token.chars().count() >= self.policy.source_token_max_chars {
            return Err(FieldError::TooLong);
        }
        Ok(token.to_string())
    }

    fn resolve(&self, href: &str) -> FieldResult<Url> {
        let url = self
            .origin
            .join(href)
            .map_err(|_| FieldError::Unresolvable)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(FieldError::NotHttp),
        }
    }

    fn is_redirector(&self, url: &Url) -> bool {
        let url = url.as_str();
        self.policy
            .redirect_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
    }

    /// Destination carried by a redirector, if it decodes to an http(s) URL.
    fn redirect_destination(&self, url: &Url) -> Option<String> {
        let (_, value) = url
            .query_pairs()
            .find(|(name, _)| *name == self.policy.redirect_param)?;

        let parsed = Url::parse(&value).ok().or_else(|| {
            // double-encoded destinations
            let decoded = urlencoding::decode(&value).ok()?;
            Url::parse(&decoded).ok()
        })?;
        matches!(parsed.scheme(), "http" | "https").then(|| parsed.into())
    }

    fn is_engine_asset(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        let on_engine_host = self
            .policy
            .asset_hosts
            .iter()
            .any(|asset_host| host == asset_host.as_str() || host.ends_with(&format!(".{}", asset_host)));
        if !on_engine_host {
            return false;
        }
        let lower = url.as_str().to_lowercase();
        self.policy
            .asset_markers
            .iter()
            .any(|marker| lower.contains(marker.as_str()))
    }
}

fn merge(field: &str, result: FieldResult) -> String {
    result.unwrap_or_else(|e| {
        debug!("Field '{}' left empty: {}", field, e);
        String::new()
    })
}

/// Removes every occurrence of `title`, including ones created by earlier removals.
fn strip_title(text: &str, title: &str) -> String {
    let mut text = text.to_string();
    if title.is_empty() {
        return text;
    }
    while text.contains(title) {
        text = text.replace(title, "");
    }
    text.trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}
