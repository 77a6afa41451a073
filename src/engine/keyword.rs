//! Keyword-based policies.
//!
//! Matching is plain case-insensitive substring containment: no tokenizing
//! and no normalization beyond lowercasing, so a keyword buried inside a
//! longer word still matches.

use crate::domain::{Decision, HistoryEntry};
use crate::engine::Policy;

/// Replacement text for redacted keywords.
pub const REDACTION_MASK: &str = "[REDACTED]";

/// A fixed set of banned keywords.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    pub fn new(keywords: Vec<String>) -> Self {
        let lowered = keywords.iter().map(|kw| kw.to_lowercase()).collect();
        Self { keywords, lowered }
    }

    /// Keywords as configured.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First configured keyword contained in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let text_lower = text.to_lowercase();
        self.lowered
            .iter()
            .position(|kw| text_lower.contains(kw.as_str()))
            .map(|idx| self.keywords[idx].as_str())
    }

    /// Whether `text` contains any keyword.
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// Replace every case-insensitive occurrence of every keyword with `mask`.
    pub fn redact(&self, text: &str, mask: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        'scan: while let Some(ch) = rest.chars().next() {
            for kw in self.lowered.iter().filter(|kw| !kw.is_empty()) {
                if let Some(len) = lowercase_prefix_len(rest, kw) {
                    out.push_str(mask);
                    rest = &rest[len..];
                    continue 'scan;
                }
            }
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        // A keyword that starts inside a multi-char lowercase expansion is
        // invisible to the scan above; mask it in the lowered text instead.
        if out == text && self.matches(text) {
            return self
                .lowered
                .iter()
                .filter(|kw| !kw.is_empty())
                .fold(text.to_lowercase(), |acc, kw| acc.replace(kw.as_str(), mask));
        }

        out
    }
}

/// Byte length of the prefix of `haystack` that lowercases to `needle`.
///
/// When `needle` ends inside the expansion of one char, the whole char is
/// part of the prefix.
fn lowercase_prefix_len(haystack: &str, needle: &str) -> Option<usize> {
    let mut needle = needle.chars();
    let mut wanted = needle.next();

    for (offset, ch) in haystack.char_indices() {
        for lower in ch.to_lowercase() {
            match wanted {
                Some(w) if w == lower => wanted = needle.next(),
                Some(_) => return None,
                None => break,
            }
        }
        if wanted.is_none() {
            return Some(offset + ch.len_utf8());
        }
    }

    None
}

/// Blocks any output containing a banned keyword.
pub struct KeywordFilterPolicy {
    keywords: KeywordSet,
}

impl KeywordFilterPolicy {
    pub fn new(banned_keywords: Vec<String>) -> Self {
        Self {
            keywords: KeywordSet::new(banned_keywords),
        }
    }
}

impl Policy for KeywordFilterPolicy {
    fn name(&self) -> &'static str {
        "keyword_filter"
    }

    fn config_snapshot(&self) -> serde_json::Value {
        serde_json::json!({ "banned_keywords": self.keywords.keywords() })
    }

    fn banned_keywords(&self) -> &[String] {
        self.keywords.keywords()
    }

    fn decide(
        &self,
        _user_prompt: &str,
        model_output: &str,
        _history: &mut Vec<HistoryEntry>,
    ) -> Decision {
        match self.keywords.first_match(model_output) {
            Some(keyword) => {
                tracing::debug!(keyword = %keyword, "Banned keyword in model output");
                Decision::Block
            }
            None => Decision::Allow,
        }
    }
}

/// Masks banned keywords instead of refusing the whole output.
pub struct RedactPolicy {
    keywords: KeywordSet,
}

impl RedactPolicy {
    pub fn new(banned_keywords: Vec<String>) -> Self {
        Self {
            keywords: KeywordSet::new(banned_keywords),
        }
    }
}

impl Policy for RedactPolicy {
    fn name(&self) -> &'static str {
        "redact"
    }

    fn config_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "banned_keywords": self.keywords.keywords(),
            "mask": REDACTION_MASK,
        })
    }

    fn banned_keywords(&self) -> &[String] {
        self.keywords.keywords()
    }

    fn decide(
        &self,
        _user_prompt: &str,
        model_output: &str,
        _history: &mut Vec<HistoryEntry>,
    ) -> Decision {
        if self.keywords.matches(model_output) {
            Decision::modify(self.keywords.redact(model_output, REDACTION_MASK))
        } else {
            Decision::Allow
        }
    }
}
