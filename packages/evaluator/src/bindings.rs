//! # Binding application
//!
//! Connects a mounted subtree to the context of the instance that owns it:
//!
//! - `data-bind-*` attributes are evaluated and applied to their element.
//! - `data-event-*` attributes become listeners that run in the context.
//! - Text nodes and plain attribute values containing `{{expr}}` are
//!   interpolated.
//!
//! The walk stops at nested instance containers; their contents belong to
//! another context. Applying bindings again recomputes everything from the
//! recorded originals, so the same entry point serves as refresh.

use crate::config::ScriptLimits;
use crate::context::ComponentContext;
use crate::dom::{Document, Listener, NodeData, NodeId};
use crate::error::{ScriptError, ScriptResult};
use crate::host::HostEnv;
use crate::interpreter::Interpreter;
use crate::rewriter::{BIND_PREFIX, EVENT_PREFIX};
use crate::value::Value;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tessera_parser::parse_html;

lazy_static! {
    static ref SIMPLE_PATH_RE: Regex = Regex::new(r"^[A-Za-z_$][\w$]*(\.[\w$]+)*$").unwrap();
    static ref INTERPOLATION_RE: Regex = Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap();
}

/// Attribute marking the container of a nested instance
pub const NESTED_INSTANCE_ATTR: &str = "data-nested-instance";

/// Attributes whose presence, not value, carries the meaning
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "disabled",
    "checked",
    "readonly",
    "required",
    "hidden",
    "selected",
    "multiple",
    "autofocus",
    "open",
];

const KEYWORDS: &[&str] = &["true", "false", "null", "undefined", "this"];

pub struct Binder<'a> {
    document: &'a mut Document,
    context: &'a mut ComponentContext,
    host: &'a mut dyn HostEnv,
    limits: ScriptLimits,
}

impl<'a> Binder<'a> {
    pub fn new(
        document: &'a mut Document,
        context: &'a mut ComponentContext,
        host: &'a mut dyn HostEnv,
        limits: ScriptLimits,
    ) -> Self {
        Self {
            document,
            context,
            host,
            limits,
        }
    }

    /// Apply every binding under `root`, returning the failures
    ///
    /// A failing binding leaves its target untouched; the rest still apply.
    pub fn apply(&mut self, root: NodeId) -> Vec<ScriptError> {
        let document = &*self.document;
        let nodes = document.descendants_filtered(root, |node| {
            document.attr(node, NESTED_INSTANCE_ATTR).is_none()
                && !matches!(document.tag(node), Some("script" | "style"))
        });

        let mut errors = Vec::new();
        for node in nodes {
            if node != root && self.document.attr(node, NESTED_INSTANCE_ATTR).is_some() {
                continue;
            }
            let (is_element, is_text) = match self.document.data(node) {
                NodeData::Element(_) => (true, false),
                NodeData::Text(_) => (false, true),
                NodeData::Comment(_) => (false, false),
            };
            if is_element {
                self.bind_element(node, &mut errors);
            } else if is_text {
                self.interpolate_text(node, &mut errors);
            }
        }
        errors
    }

    fn bind_element(&mut self, node: NodeId, errors: &mut Vec<ScriptError>) {
        let attributes = match self.document.element(node) {
            Some(element) => element.attributes.clone(),
            None => return,
        };

        for (name, expression) in attributes {
            if let Some(target) = name.strip_prefix(BIND_PREFIX) {
                match self.evaluate(&expression) {
                    Ok(value) => self.apply_property(node, target, value),
                    Err(err) => {
                        tracing::debug!(
                            instance_id = %self.context.instance_id,
                            binding = %target,
                            error = %err,
                            "binding failed"
                        );
                        errors.push(err);
                    }
                }
            } else if let Some(event) = name.strip_prefix(EVENT_PREFIX) {
                self.document.add_listener(
                    node,
                    Listener {
                        event: event.to_string(),
                        handler: expression,
                        instance_id: self.context.instance_id.clone(),
                    },
                );
            } else if let Some(template) = self.attribute_template(node, &name, expression) {
                self.document.original_attr(node, &name);
                let rendered = self.render_interpolations(&template, errors);
                self.document.set_attr(node, &name, rendered);
            }
        }
    }

    /// Interpolation source of a plain attribute, if it has one
    fn attribute_template(&self, node: NodeId, name: &str, current: String) -> Option<String> {
        let recorded = self
            .document
            .element(node)
            .and_then(|element| element.originals.get(name).cloned());
        let template = match recorded {
            Some(original) => original,
            None => Some(current),
        };
        template.filter(|template| template.contains("{{"))
    }

    fn render_interpolations(&mut self, template: &str, errors: &mut Vec<ScriptError>) -> String {
        let mut failures = Vec::new();
        let rendered = INTERPOLATION_RE
            .replace_all(template, |caps: &Captures| match self.evaluate(&caps[1]) {
                Ok(value) => value.to_string(),
                Err(err) => {
                    failures.push(err);
                    String::new()
                }
            })
            .into_owned();
        errors.extend(failures);
        rendered
    }

    fn interpolate_text(&mut self, node: NodeId, errors: &mut Vec<ScriptError>) {
        let template = match self.document.text(node) {
            Some(text) => match &text.template {
                Some(template) => template.clone(),
                None if text.content.contains("{{") => text.content.clone(),
                None => return,
            },
            None => return,
        };

        let rendered = self.render_interpolations(&template, errors);
        if let Some(text) = self.document.text_mut(node) {
            text.content = rendered;
            text.template = Some(template);
        }
    }

    /// Value of a binding expression
    ///
    /// Plain paths are read straight from the context, so a missing name is
    /// `undefined` rather than an error. Anything else runs in the interpreter.
    pub fn evaluate(&mut self, expression: &str) -> ScriptResult<Value> {
        evaluate_expression(self.context, self.host, self.limits, expression)
    }

    fn apply_property(&mut self, node: NodeId, target: &str, value: Value) {
        // Parsed markup has lowercased attribute names
        match target.to_ascii_lowercase().as_str() {
            "class" => {
                let original = self.document.original_attr(node, "class");
                match class_list(original.as_deref(), &value) {
                    Some(classes) => self.document.set_attr(node, "class", classes),
                    None => self.document.remove_attr(node, "class"),
                }
            }
            "style" => {
                let original = self.document.original_attr(node, "style");
                match style_text(original.as_deref(), &value) {
                    Some(style) => self.document.set_attr(node, "style", style),
                    None => self.document.remove_attr(node, "style"),
                }
            }
            "textcontent" | "innertext" => {
                self.document.set_text_content(node, value.to_string());
            }
            "innerhtml" => {
                self.document.remove_children(node);
                self.document.mount(node, &parse_html(&value.to_string()));
            }
            name if BOOLEAN_ATTRIBUTES.contains(&name) => {
                self.document.original_attr(node, name);
                if value.is_truthy() {
                    self.document.set_attr(node, name, "");
                } else {
                    self.document.remove_attr(node, name);
                }
            }
            name => {
                self.document.original_attr(node, name);
                if value.is_nullish() {
                    self.document.remove_attr(node, name);
                } else {
                    self.document.set_attr(node, name, value.to_string());
                }
            }
        }
    }
}

pub fn evaluate_expression(
    context: &mut ComponentContext,
    host: &mut dyn HostEnv,
    limits: ScriptLimits,
    expression: &str,
) -> ScriptResult<Value> {
    let expression = expression.trim();
    if SIMPLE_PATH_RE.is_match(expression) && !KEYWORDS.contains(&expression) {
        return Ok(context.lookup(expression).cloned().unwrap_or_default());
    }
    Interpreter::new(context, host, limits).evaluate_source(expression)
}

/// Run an event handler expression with `$event` bound to the payload
///
/// The change handle is marked afterwards whether or not the handler failed.
pub fn run_handler(
    context: &mut ComponentContext,
    host: &mut dyn HostEnv,
    limits: ScriptLimits,
    handler: &str,
    event: Value,
) -> ScriptResult<Value> {
    let result = Interpreter::new(context, host, limits)
        .with_local("$event", event)
        .run_source(handler);
    context.change.mark_changed();
    result
}

/// Class attribute for a `[class]` binding, `None` to drop it
fn class_list(original: Option<&str>, value: &Value) -> Option<String> {
    let mut classes: Vec<String> = original
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    match value {
        Value::Object(toggles) => {
            for (names, enabled) in toggles {
                for name in names.split_whitespace() {
                    let present = classes.iter().any(|c| c == name);
                    if enabled.is_truthy() && !present {
                        classes.push(name.to_string());
                    } else if !enabled.is_truthy() {
                        classes.retain(|c| c != name);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let name = item.to_string();
                if !name.is_empty() && !classes.contains(&name) {
                    classes.push(name);
                }
            }
        }
        other if other.is_nullish() => {}
        other => {
            for name in other.to_string().split_whitespace() {
                if !classes.iter().any(|c| c == name) {
                    classes.push(name.to_string());
                }
            }
        }
    }

    if classes.is_empty() && original.is_none() {
        None
    } else {
        Some(classes.join(" "))
    }
}

/// Style attribute for a `[style]` binding, `None` to drop it
fn style_text(original: Option<&str>, value: &Value) -> Option<String> {
    let mut declarations: Vec<String> = original
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    match value {
        Value::Object(properties) => {
            for (property, value) in properties {
                let property = kebab_case(property);
                declarations.retain(|d| {
                    d.split(':').next().map(str::trim) != Some(property.as_str())
                });
                if !value.is_nullish() && !matches!(value, Value::Boolean(false)) {
                    declarations.push(format!("{}: {}", property, value));
                }
            }
        }
        other if other.is_nullish() => {}
        other => declarations.extend(
            other
                .to_string()
                .split(';')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        ),
    }

    if declarations.is_empty() && original.is_none() {
        None
    } else {
        Some(declarations.join("; "))
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
