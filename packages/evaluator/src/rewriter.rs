//! Binding syntax rewriting
//!
//! Authored markup binds with `[prop]="expr"` and `(event)="expr"`. Both are
//! rewritten to inert `data-bind-prop` / `data-event-event` attributes so
//! the markup can be parsed as plain HTML. Nothing is evaluated here.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// An open tag, attribute values may contain `>`
    static ref TAG_RE: Regex =
        Regex::new(r#"<([a-zA-Z][\w-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap();
    static ref PROPERTY_BINDING_RE: Regex =
        Regex::new(r#"(^|\s)\[([\w.:-]+)\]\s*=\s*("[^"]*"|'[^']*')"#).unwrap();
    static ref EVENT_BINDING_RE: Regex =
        Regex::new(r#"(^|\s)\(([\w.:-]+)\)\s*=\s*("[^"]*"|'[^']*')"#).unwrap();
}

pub const BIND_PREFIX: &str = "data-bind-";
pub const EVENT_PREFIX: &str = "data-event-";

/// Rewrite binding attributes in every open tag
///
/// `[id]` on `<component-ref>` is the reference identifier and is kept.
pub fn rewrite_bindings(markup: &str) -> String {
    TAG_RE
        .replace_all(markup, |caps: &Captures| {
            let tag = &caps[1];
            let attributes = &caps[2];
            if !attributes.contains('[') && !attributes.contains('(') {
                return caps[0].to_string();
            }
            let is_reference = tag.eq_ignore_ascii_case("component-ref");
            format!("<{}{}>", tag, rewrite_attributes(attributes, is_reference))
        })
        .into_owned()
}

fn rewrite_attributes(attributes: &str, is_reference: bool) -> String {
    let properties = PROPERTY_BINDING_RE.replace_all(attributes, |caps: &Captures| {
        let name = &caps[2];
        if is_reference && name == "id" {
            return caps[0].to_string();
        }
        format!("{}{}{}={}", &caps[1], BIND_PREFIX, name, &caps[3])
    });

    EVENT_BINDING_RE
        .replace_all(&properties, |caps: &Captures| {
            format!("{}{}{}={}", &caps[1], EVENT_PREFIX, &caps[2], &caps[3])
        })
        .into_owned()
}
