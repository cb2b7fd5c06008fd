//! Text normalization for extracted HTML fragments.
//!
//! [`TextCleaner`] is a stateless service handed to every extractor. It turns
//! markup fragments (one or several joined outer-HTML strings) into plain
//! prose: tags dropped, entities decoded, script/style bodies removed and
//! whitespace collapsed to single spaces.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose text content is never prose.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "iframe"];

/// Elements that do not break a word when they open.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "font", "i", "mark", "small", "span", "strong", "sub", "sup",
    "time", "u",
];

/// Stateless cleaner for markup fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCleaner;

impl TextCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Strip markup from `fragment` and collapse whitespace.
    ///
    /// Block-level boundaries become single spaces so `<p>a</p><p>b</p>`
    /// reads `"a b"`, not `"ab"`.
    pub fn clean(&self, fragment: &str) -> String {
        if !fragment.contains('<') && !fragment.contains('&') {
            return self.collapse_whitespace(fragment);
        }

        let html = Html::parse_fragment(fragment);
        let mut out = String::with_capacity(fragment.len() / 2);
        for node in html.tree.root().descendants() {
            match node.value() {
                Node::Text(text) => {
                    let skipped = node.ancestors().any(|a| {
                        a.value()
                            .as_element()
                            .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                    });
                    if !skipped {
                        out.push_str(text);
                    }
                }
                Node::Element(el) if !INLINE_ELEMENTS.contains(&el.name()) => out.push(' '),
                _ => {}
            }
        }
        self.collapse_whitespace(&out)
    }

    /// Clean `fragment`, then remove every occurrence of `literal`.
    ///
    /// The literal is matched against the whitespace-collapsed text, so
    /// markers split across lines in the source still match.
    pub fn clean_without(&self, fragment: &str, literal: &str) -> String {
        let cleaned = self.clean(fragment);
        let literal = self.collapse_whitespace(literal);
        if literal.is_empty() {
            return cleaned;
        }
        self.collapse_whitespace(&cleaned.replace(&literal, " "))
    }

    pub fn collapse_whitespace(&self, text: &str) -> String {
        WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
    }
}
