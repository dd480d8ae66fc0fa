//! # Template compositor
//!
//! Produces the final markup of a render: every `<component-ref>` is
//! replaced by the composited markup of the component it names, wrapped in
//! a container carrying the component's style and a fresh nested-instance
//! id. Unresolvable references become a visible placeholder instead.
//!
//! Each component is processed on its own, innermost-out:
//!
//! 1. reference tags are swapped for sentinel comments,
//! 2. binding syntax is rewritten,
//! 3. the template is expanded against the component's own data,
//! 4. each surviving sentinel is replaced by the child's finished markup.
//!
//! Children are spliced in after the parent's expansion, so a parent's data
//! never leaks into a child's template. A reference inside `{{#each}}` is
//! repeated by the expansion and every copy becomes its own instance.

use crate::bindings::NESTED_INSTANCE_ATTR;
use crate::config::RenderOptions;
use crate::dom::{escape_attribute, escape_text};
use crate::error::TemplateError;
use crate::id_generator::IDGenerator;
use crate::rewriter::rewrite_bindings;
use crate::script::{parse_script, ScriptDefinition};
use crate::template::TemplateEngine;
use crate::value::Value;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::Arc;
use tessera_bundle::{scan_reference_tags, LoadedComponentSet};
use tessera_common::ComponentRecord;

lazy_static! {
    static ref SENTINEL_RE: Regex = Regex::new(r"<!--tessera-ref:(\d+)-->").unwrap();
}

/// Attribute naming the component a nested container renders
pub const COMPONENT_ID_ATTR: &str = "data-component-id";

pub const NESTED_CLASS: &str = "tessera-nested";
pub const PLACEHOLDER_CLASS: &str = "tessera-placeholder";

/// A nested instance planned by composition
#[derive(Debug, Clone, PartialEq)]
pub struct NestedSlot {
    pub instance_id: String,
    pub component_id: String,
    /// 1 for children of the root
    pub depth: usize,
}

/// Result of compositing a root component
#[derive(Debug, Clone, Default)]
pub struct ComposedView {
    pub markup: String,
    pub nested: Vec<NestedSlot>,
    /// References replaced by placeholders
    pub unresolved: Vec<String>,
    pub template_errors: Vec<TemplateError>,
}

pub struct Compositor<'a> {
    components: &'a LoadedComponentSet,
    options: &'a RenderOptions,
    ids: &'a mut IDGenerator,
    definitions: HashMap<String, Arc<ScriptDefinition>>,
}

impl<'a> Compositor<'a> {
    pub fn new(
        components: &'a LoadedComponentSet,
        options: &'a RenderOptions,
        ids: &'a mut IDGenerator,
    ) -> Self {
        Self {
            components,
            options,
            ids,
            definitions: HashMap::new(),
        }
    }

    /// Compiled scripts of every component composited so far
    pub fn into_definitions(self) -> HashMap<String, Arc<ScriptDefinition>> {
        self.definitions
    }

    pub fn compose(&mut self, root: &ComponentRecord) -> ComposedView {
        let mut view = ComposedView::default();
        let mut ancestors = Vec::new();
        view.markup = self.compose_record(root, 0, &mut ancestors, &mut view);
        view
    }

    /// Compiled script of a record, parsed once per component id
    pub fn definition(&mut self, record: &ComponentRecord) -> Arc<ScriptDefinition> {
        self.definitions
            .entry(record.id.clone())
            .or_insert_with(|| Arc::new(parse_script(&record.script)))
            .clone()
    }

    fn compose_record(
        &mut self,
        record: &ComponentRecord,
        depth: usize,
        ancestors: &mut Vec<String>,
        view: &mut ComposedView,
    ) -> String {
        let tags = scan_reference_tags(&record.markup);

        let mut marked = String::with_capacity(record.markup.len());
        let mut cursor = 0;
        for (index, tag) in tags.iter().enumerate() {
            marked.push_str(&record.markup[cursor..tag.span.start]);
            marked.push_str(&format!("<!--tessera-ref:{}-->", index));
            cursor = tag.span.end;
        }
        marked.push_str(&record.markup[cursor..]);

        let definition = self.definition(record);
        let engine = TemplateEngine::new()
            .with_debug_comments(self.options.debug_comments)
            .with_deferred_names(definition.declared_names());
        let expansion = engine.expand(&rewrite_bindings(&marked), &Value::from(record.parsed_data()));
        for error in &expansion.errors {
            tracing::warn!(component_id = %record.id, error = %error, "template error");
        }
        view.template_errors.extend(expansion.errors);

        ancestors.push(record.id.clone());
        let mut output = String::with_capacity(expansion.output.len());
        let mut cursor = 0;
        for caps in SENTINEL_RE.captures_iter(&expansion.output) {
            let Some(whole) = caps.get(0) else { continue };
            output.push_str(&expansion.output[cursor..whole.start()]);
            cursor = whole.end();

            match sentinel_index(&caps).and_then(|i| tags.get(i)) {
                Some(tag) => output.push_str(&self.compose_reference(&tag.id, depth + 1, ancestors, view)),
                None => output.push_str(whole.as_str()),
            }
        }
        output.push_str(&expansion.output[cursor..]);
        ancestors.pop();

        output
    }

    fn compose_reference(
        &mut self,
        id: &str,
        depth: usize,
        ancestors: &mut Vec<String>,
        view: &mut ComposedView,
    ) -> String {
        if ancestors.iter().any(|a| a == id) {
            tracing::warn!(component_id = %id, "circular component reference");
            view.unresolved.push(id.to_string());
            return placeholder(id, &format!("Circular reference to component '{}'", id));
        }

        if depth > self.options.max_nesting_depth {
            tracing::warn!(component_id = %id, depth, "component nesting too deep");
            view.unresolved.push(id.to_string());
            return placeholder(
                id,
                &format!("Component '{}' is nested deeper than {} levels", id, self.options.max_nesting_depth),
            );
        }

        let components = self.components;
        let Some(record) = components.get(id) else {
            let message = match components.failure(id) {
                Some(err) => err.to_string(),
                None => format!("Component '{}' was not loaded", id),
            };
            view.unresolved.push(id.to_string());
            return placeholder(id, &message);
        };

        let instance_id = self.ids.new_id();
        view.nested.push(NestedSlot {
            instance_id: instance_id.clone(),
            component_id: id.to_string(),
            depth,
        });

        let inner = self.compose_record(record, depth, ancestors, view);
        let style = if record.style.trim().is_empty() {
            String::new()
        } else {
            format!("<style>{}</style>", record.style)
        };

        format!(
            r#"<div {}="{}" {}="{}" class="{}">{}{}</div>"#,
            NESTED_INSTANCE_ATTR,
            escape_attribute(&instance_id),
            COMPONENT_ID_ATTR,
            escape_attribute(id),
            NESTED_CLASS,
            style,
            inner
        )
    }
}

fn sentinel_index(caps: &Captures) -> Option<usize> {
    caps.get(1)?.as_str().parse().ok()
}

fn placeholder(id: &str, message: &str) -> String {
    format!(
        r#"<div class="{}" {}="{}">{}</div>"#,
        PLACEHOLDER_CLASS,
        COMPONENT_ID_ATTR,
        escape_attribute(id),
        escape_text(message)
    )
}
