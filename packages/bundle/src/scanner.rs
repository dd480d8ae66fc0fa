//! Nested component reference scanning
//!
//! Stored markup embeds other components with
//! `<component-ref [id]="'card'"></component-ref>`. The identifier may be a
//! quoted literal or a bare token; anything else is kept verbatim as an
//! opaque identifier.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref REF_OPEN_RE: Regex = Regex::new(r"(?i)<component-ref\b([^>]*)>").unwrap();
    static ref REF_CLOSE_RE: Regex = Regex::new(r"(?i)</component-ref\s*>").unwrap();
    static ref ID_ATTR_RE: Regex =
        Regex::new(r#"\[id\]\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).unwrap();
}

/// One reference tag found in markup
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTag {
    /// Normalized identifier
    pub id: String,

    /// Byte range of the whole tag, closing tag included when present
    pub span: Range<usize>,
}

/// Referenced identifiers in document order, duplicates kept
pub fn scan_references(markup: &str) -> Vec<String> {
    scan_reference_tags(markup)
        .into_iter()
        .map(|tag| tag.id)
        .collect()
}

/// Reference tags with their spans, in document order
///
/// Tags without an `[id]` binding are not references and are skipped.
pub fn scan_reference_tags(markup: &str) -> Vec<ReferenceTag> {
    let mut tags = Vec::new();
    let mut search_from = 0;

    while let Some(open) = REF_OPEN_RE.captures_at(markup, search_from) {
        let whole = match open.get(0) {
            Some(m) => m,
            None => break,
        };
        search_from = whole.end();

        let attributes = open.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(id) = extract_id(attributes) else {
            continue;
        };

        let self_closing = attributes.trim_end().ends_with('/');
        let mut end = whole.end();
        if !self_closing {
            // Pair with the next closing tag unless another reference opens first
            if let Some(close) = REF_CLOSE_RE.find_at(markup, whole.end()) {
                let next_open = REF_OPEN_RE
                    .find_at(markup, whole.end())
                    .map(|m| m.start())
                    .unwrap_or(usize::MAX);
                if close.start() < next_open {
                    end = close.end();
                }
            }
        }

        search_from = end;
        tags.push(ReferenceTag {
            id,
            span: whole.start()..end,
        });
    }

    tags
}

fn extract_id(attributes: &str) -> Option<String> {
    let caps = ID_ATTR_RE.captures(attributes)?;
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())?;
    Some(normalize_id(raw))
}

/// Strip one layer of matching quotes from an identifier literal
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['\'', '"', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}
