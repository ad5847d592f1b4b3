//! Pattern tables used for field cleanup and element matching.
//!
//! Markup drift is patched here by editing a table, not the extractor's
//! control flow. Tables are applied in order.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::Node;

/// Matches "2024-01-15", "2024/1/5", "2024.01.15" and "2024年1月15日".
const DATE: &str = r"\d{4}[-/.年]\d{1,2}[-/.月]\d{1,2}日?";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

/// An ordered list of (pattern, replacement) rewrites.
pub struct PatternTable {
    rules: Vec<(Regex, &'static str)>,
}

impl PatternTable {
    fn new(rules: &[(&str, &'static str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(pattern, replacement)| (compile(pattern), *replacement))
                .collect(),
        }
    }

    /// Applies every rule in order and trims the result.
    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (pattern, replacement) in &self.rules {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }
        text.trim().to_string()
    }
}

/// Tag/class pairs tried in priority order.
pub struct ClassTable {
    entries: Vec<(&'static str, Regex)>,
}

impl ClassTable {
    fn new(entries: &[(&'static str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(tag, pattern)| (*tag, compile(pattern)))
                .collect(),
        }
    }

    /// First descendant of `node` matching an entry, trying entries in order.
    pub fn find<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        self.entries
            .iter()
            .find_map(|(tag, pattern)| node.find_by_attr_pattern(tag, "class", pattern))
    }
}

/// Strips source labels and trailing dates from a summary element's text.
pub static SUMMARY_CLEANUP: LazyLock<PatternTable> = LazyLock::new(|| {
    PatternTable::new(&[(r"来源[：:].*", ""), (format!("{}.*", DATE).as_str(), "")])
});

/// Same as [`SUMMARY_CLEANUP`], plus raw URLs and whitespace runs, for
/// summaries recovered from a whole container.
pub static FALLBACK_SUMMARY_CLEANUP: LazyLock<PatternTable> = LazyLock::new(|| {
    PatternTable::new(&[
        (r"来源[：:].*", ""),
        (format!("{}.*", DATE).as_str(), ""),
        (r"https?://\S+", ""),
        (r"\s+", " "),
    ])
});

/// Strips publication dates and relative times trailing a source name.
pub static SOURCE_CLEANUP: LazyLock<PatternTable> = LazyLock::new(|| {
    PatternTable::new(&[
        (format!(r"\s*{}.*", DATE).as_str(), ""),
        (r"\s*\d+\s*(?:秒|分钟|小时|天)前.*", ""),
    ])
});

/// Elements likely to hold an abstract.
pub static SUMMARY_CLASSES: LazyLock<ClassTable> = LazyLock::new(|| {
    ClassTable::new(&[
        ("span", r"content|abstract|summary|desc|c-span9"),
        ("div", r"content|abstract|summary|desc"),
    ])
});

/// Elements likely to name the publisher.
pub static SOURCE_CLASSES: LazyLock<ClassTable> = LazyLock::new(|| {
    ClassTable::new(&[
        ("span", r"source|author|site|from|c-color-gray"),
        ("div", r"source|author|site|from"),
        ("a", r"source|site"),
    ])
});

/// "来源：X" inside free text; group 1 is the source.
pub static SOURCE_LABEL: LazyLock<Regex> = LazyLock::new(|| compile(r"来源[：:]\s*(\S+)"));

/// "X 2024-01-15" inside free text; group 1 is the candidate source.
pub static SOURCE_BEFORE_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(\S+)\s+{}", DATE)));

/// The literal label word that must never be echoed as a source.
pub const SOURCE_LABEL_WORD: &str = "来源";
