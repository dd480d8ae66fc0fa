//! # Expression template engine
//!
//! Expands `{{...}}` markup against a data value in three ordered passes:
//!
//! 1. `{{#each path}}...{{/each}}` repeats its body per element, expanding
//!    the body with all three passes against an item context.
//! 2. `{{#if path}}...{{else}}...{{/if}}` keeps one branch.
//! 3. `{{path}}` and `{{dotted.path}}` are replaced by their values.
//!
//! Blocks of the same kind are balanced by counting open and close tags,
//! so nested `#each` and `#if` blocks pair correctly. Problems never abort
//! expansion: they leave a `<!-- template error: ... -->` comment behind.
//!
//! ```rust
//! use serde_json::json;
//! use tessera_evaluator::template::render;
//!
//! let html = render("{{#if flag}}Y{{else}}N{{/if}}", &json!({"flag": 1}));
//! assert_eq!(html, "Y");
//! ```

use crate::error::TemplateError;
use crate::lookup::{lookup_path, lookup_value};
use crate::value::Value;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;
use tessera_common::decode_payload;

lazy_static! {
    static ref EACH_OPEN_RE: Regex = Regex::new(r"\{\{\s*#each\s+([^}]*?)\s*\}\}").unwrap();
    static ref EACH_CLOSE_RE: Regex = Regex::new(r"\{\{\s*/each\s*\}\}").unwrap();
    static ref IF_OPEN_RE: Regex = Regex::new(r"\{\{\s*#if\s+([^}]*?)\s*\}\}").unwrap();
    static ref IF_CLOSE_RE: Regex = Regex::new(r"\{\{\s*/if\s*\}\}").unwrap();
    static ref ELSE_RE: Regex = Regex::new(r"\{\{\s*else\s*\}\}").unwrap();
    static ref VARIABLE_RE: Regex = Regex::new(r"\{\{\s*([@$\w][\w.@$]*)\s*\}\}").unwrap();
    static ref PATH_RE: Regex = Regex::new(r"^[@$\w][\w.@$]*$").unwrap();
}

/// Expand a template against JSON data with default settings
pub fn render(template: &str, data: &serde_json::Value) -> String {
    TemplateEngine::new().render(template, &Value::from(data))
}

/// Output of an expansion together with the problems it hit
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub output: String,
    pub errors: Vec<TemplateError>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    debug_comments: bool,

    /// Names left as `{{...}}` when the data lacks them
    deferred: HashSet<String>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_comments(mut self, enabled: bool) -> Self {
        self.debug_comments = enabled;
        self
    }

    /// Keep `{{name...}}` untouched when `name` is missing from the data
    ///
    /// Lets values owned by a component's script survive expansion so they
    /// can be interpolated once the script context exists.
    pub fn with_deferred_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deferred.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn render(&self, template: &str, data: &Value) -> String {
        self.expand(template, data).output
    }

    pub fn expand(&self, template: &str, data: &Value) -> Expansion {
        let mut errors = Vec::new();
        let output = self.expand_all(template, data, &mut errors);
        Expansion { output, errors }
    }

    fn expand_all(&self, template: &str, data: &Value, errors: &mut Vec<TemplateError>) -> String {
        let expanded = self.each_pass(template, data, errors);
        let expanded = self.if_pass(&expanded, data, errors);
        self.variable_pass(&expanded, data)
    }

    fn each_pass(&self, template: &str, data: &Value, errors: &mut Vec<TemplateError>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut cursor = 0;

        while let Some(open) = EACH_OPEN_RE.captures_at(template, cursor) {
            let Some(tag) = open.get(0) else { break };
            push_literal(&mut out, &template[cursor..tag.start()], cursor, &EACH_CLOSE_RE, "each", errors);
            let path = capture(&open, 1);

            match find_block_close(template, tag.end(), &EACH_OPEN_RE, &EACH_CLOSE_RE) {
                Some(close) => {
                    let body = &template[tag.end()..close.start];
                    out.push_str(&self.expand_each(path, body, data, errors));
                    cursor = close.end;
                }
                None => {
                    let err = TemplateError::UnclosedBlock {
                        kind: "each".into(),
                        path: path.to_string(),
                        offset: tag.start(),
                    };
                    tracing::warn!(error = %err, "template block not closed");
                    out.push_str(&err.to_comment());
                    errors.push(err);
                    cursor = tag.end();
                }
            }
        }

        push_literal(&mut out, &template[cursor..], cursor, &EACH_CLOSE_RE, "each", errors);
        out
    }

    fn expand_each(
        &self,
        path: &str,
        body: &str,
        data: &Value,
        errors: &mut Vec<TemplateError>,
    ) -> String {
        if !PATH_RE.is_match(path) {
            let err = TemplateError::InvalidPath {
                path: path.to_string(),
                offset: 0,
            };
            let comment = err.to_comment();
            errors.push(err);
            return comment;
        }

        let items = match iteration_items(lookup_value(data, path)) {
            Some(items) if !items.is_empty() => items,
            _ => {
                return if self.debug_comments {
                    format!("<!-- each: '{}' has no items -->", path)
                } else {
                    String::new()
                };
            }
        };

        let count = items.len();
        let mut out = String::new();
        for (index, item) in items.into_iter().enumerate() {
            let item_context = item_context(data, item, index, count);
            out.push_str(&self.expand_all(body, &item_context, errors));
        }
        out
    }

    fn if_pass(&self, template: &str, data: &Value, errors: &mut Vec<TemplateError>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut cursor = 0;

        while let Some(open) = IF_OPEN_RE.captures_at(template, cursor) {
            let Some(tag) = open.get(0) else { break };
            push_literal(&mut out, &template[cursor..tag.start()], cursor, &IF_CLOSE_RE, "if", errors);
            let path = capture(&open, 1);

            match find_block_close(template, tag.end(), &IF_OPEN_RE, &IF_CLOSE_RE) {
                Some(close) => {
                    let body = &template[tag.end()..close.start];
                    let (then_branch, else_branch) = split_else(body);
                    let branch = if lookup_value(data, path).is_truthy() {
                        then_branch
                    } else {
                        else_branch
                    };
                    out.push_str(&self.if_pass(branch, data, errors));
                    cursor = close.end;
                }
                None => {
                    let err = TemplateError::UnclosedBlock {
                        kind: "if".into(),
                        path: path.to_string(),
                        offset: tag.start(),
                    };
                    tracing::warn!(error = %err, "template block not closed");
                    out.push_str(&err.to_comment());
                    errors.push(err);
                    cursor = tag.end();
                }
            }
        }

        push_literal(&mut out, &template[cursor..], cursor, &IF_CLOSE_RE, "if", errors);
        out
    }

    fn variable_pass(&self, template: &str, data: &Value) -> String {
        VARIABLE_RE
            .replace_all(template, |caps: &Captures| {
                let path = capture(caps, 1);
                if path == "else" {
                    return String::new();
                }
                if lookup_path(data, path).is_none() && self.is_deferred(path) {
                    return caps[0].to_string();
                }
                lookup_value(data, path).to_string()
            })
            .into_owned()
    }

    fn is_deferred(&self, path: &str) -> bool {
        let root = path.split('.').next().unwrap_or(path);
        self.deferred.contains(root)
    }
}

struct BlockClose {
    start: usize,
    end: usize,
}

/// Find the close tag pairing with an open tag ending at `from`
fn find_block_close(template: &str, from: usize, open_re: &Regex, close_re: &Regex) -> Option<BlockClose> {
    let mut depth = 0usize;
    let mut cursor = from;

    loop {
        let close = close_re.find_at(template, cursor)?;
        match open_re.find_at(template, cursor) {
            Some(open) if open.start() < close.start() => {
                depth += 1;
                cursor = open.end();
            }
            _ => {
                if depth == 0 {
                    return Some(BlockClose {
                        start: close.start(),
                        end: close.end(),
                    });
                }
                depth -= 1;
                cursor = close.end();
            }
        }
    }
}

/// Split an if body at its top-level `{{else}}`
fn split_else(body: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut cursor = 0;

    loop {
        let next_else = ELSE_RE.find_at(body, cursor);
        let next_open = IF_OPEN_RE.find_at(body, cursor);
        let next_close = IF_CLOSE_RE.find_at(body, cursor);

        let Some(else_tag) = next_else else {
            return (body, "");
        };

        let open_start = next_open.map(|m| m.start()).unwrap_or(usize::MAX);
        let close_start = next_close.map(|m| m.start()).unwrap_or(usize::MAX);
        let earliest = else_tag.start().min(open_start).min(close_start);

        if earliest == else_tag.start() {
            if depth == 0 {
                return (&body[..else_tag.start()], &body[else_tag.end()..]);
            }
            cursor = else_tag.end();
        } else if earliest == open_start {
            depth += 1;
            cursor = next_open.map(|m| m.end()).unwrap_or(body.len());
        } else {
            depth = depth.saturating_sub(1);
            cursor = next_close.map(|m| m.end()).unwrap_or(body.len());
        }
    }
}

/// Copy literal text, turning stray close tags into error comments
fn push_literal(
    out: &mut String,
    text: &str,
    offset: usize,
    close_re: &Regex,
    kind: &str,
    errors: &mut Vec<TemplateError>,
) {
    let mut last = 0;
    for stray in close_re.find_iter(text) {
        out.push_str(&text[last..stray.start()]);
        let err = TemplateError::UnmatchedClose {
            kind: kind.to_string(),
            offset: offset + stray.start(),
        };
        out.push_str(&err.to_comment());
        errors.push(err);
        last = stray.end();
    }
    out.push_str(&text[last..]);
}

fn capture<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map(|m| m.as_str().trim()).unwrap_or("")
}

/// Elements an `{{#each}}` walks over, after coercion
///
/// JSON text is decoded, and plain objects become `{key, value}` pairs in
/// insertion order. Anything else has no items.
fn iteration_items(value: Value) -> Option<Vec<Value>> {
    let value = match value {
        Value::String(text) => {
            Value::from(decode_payload(&serde_json::Value::String(text)))
        }
        other => other,
    };

    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, value)| {
                    let mut pair = IndexMap::new();
                    pair.insert("key".to_string(), Value::String(key));
                    pair.insert("value".to_string(), value);
                    Value::Object(pair)
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Outer data with the element's own properties merged over it
fn item_context(outer: &Value, item: Value, index: usize, count: usize) -> Value {
    let mut context = match outer {
        Value::Object(map) => map.clone(),
        _ => IndexMap::new(),
    };

    if let Value::Object(fields) = &item {
        for (key, value) in fields {
            context.insert(key.clone(), value.clone());
        }
    }
    context.insert("this".to_string(), item);
    context.insert("@index".to_string(), Value::Number(index as f64));
    context.insert("@first".to_string(), Value::Boolean(index == 0));
    context.insert("@last".to_string(), Value::Boolean(index + 1 == count));

    Value::Object(context)
}
