//! # Render session
//!
//! `RenderSession` is the renderer entry point. It owns the view, the
//! instances rendered into it and the task queue that orders their
//! lifecycle:
//!
//! ```text
//! render(source)
//!   teardown previous tree
//!   resolve -> compose -> mount                  (synchronous after the fetches)
//!   post InitRoot
//! run_until_idle()
//!   InitRoot     create + bind root context, post RunInit(root), post InitNested
//!   RunInit      root ngOnInit
//!   InitNested   create + bind nested contexts in document order, post their RunInit
//!   RunInit ...  nested ngOnInit hooks
//!   Refresh      re-apply bindings of changed instances
//! ```
//!
//! Failures never escape: a failed render replaces the view with an error
//! block, a failing script leaves a diagnostic block inside its instance.

use crate::bindings::{run_handler, Binder, NESTED_INSTANCE_ATTR};
use crate::compositor::{Compositor, COMPONENT_ID_ATTR};
use crate::config::RenderOptions;
use crate::context::ComponentContext;
use crate::dom::{Document, Listener, NodeId};
use crate::error::{RenderError, ScriptError};
use crate::host::{HostEnv, RecordingHost};
use crate::id_generator::IDGenerator;
use crate::interpreter::Interpreter;
use crate::lifecycle::{ComponentInstance, InstanceRegistry, LifecycleEvent};
use crate::scheduler::{TaskKind, TaskQueue};
use crate::script::{parse_script, ScriptDefinition};
use crate::value::Value;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_bundle::{resolve_source, LoadedComponentSet, RenderSource};
use tessera_common::{ComponentRecord, ComponentStore};
use tessera_parser::parse_html;
use tracing::{debug, error, info, instrument, warn};

pub const VIEW_CLASS: &str = "tessera-view";
pub const ERROR_CLASS: &str = "tessera-error";
pub const RENDER_ERROR_CLASS: &str = "tessera-render-error";

/// A localized failure reported during a render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub component_id: String,
    pub instance_id: Option<String>,
    pub message: String,
}

/// The root component awaiting its `InitRoot` task
#[derive(Debug, Clone)]
struct PendingRoot {
    component_id: String,
    data: Value,
}

pub struct RenderSession<S: ComponentStore, H: HostEnv = RecordingHost> {
    store: S,
    host: H,
    options: RenderOptions,
    document: Document,
    view: NodeId,
    registry: InstanceRegistry,
    queue: TaskQueue,
    ids: IDGenerator,
    components: LoadedComponentSet,
    definitions: HashMap<String, Arc<ScriptDefinition>>,
    /// Nested containers that could not be initialized
    failed_instances: HashSet<String>,
    pending_root: Option<PendingRoot>,
    root_instance: Option<String>,
    diagnostics: Vec<Diagnostic>,
    last_error: Option<RenderError>,
}

impl<S: ComponentStore> RenderSession<S, RecordingHost> {
    /// Session whose script side effects are recorded, not performed
    pub fn new(store: S) -> Self {
        Self::with_host(store, RecordingHost::new())
    }
}

impl<S: ComponentStore, H: HostEnv> RenderSession<S, H> {
    pub fn with_host(store: S, host: H) -> Self {
        let mut document = Document::new();
        let view = document.create_element("div");
        document.set_attr(view, "class", VIEW_CLASS);
        let body = document.body();
        document.append_child(body, view);

        Self {
            store,
            host,
            options: RenderOptions::default(),
            document,
            view,
            registry: InstanceRegistry::new(),
            queue: TaskQueue::new(),
            ids: IDGenerator::new(),
            components: LoadedComponentSet::new(),
            definitions: HashMap::new(),
            failed_instances: HashSet::new(),
            pending_root: None,
            root_instance: None,
            diagnostics: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render a component tree into the view and run its lifecycle
    ///
    /// Replaces whatever the view showed before. Never fails: errors end up
    /// in the view and in `last_error` / `diagnostics`.
    #[instrument(skip(self, source))]
    pub async fn render(&mut self, source: RenderSource) {
        match self.load(source).await {
            Ok(()) => self.run_until_idle(),
            Err(err) => self.show_render_error(err),
        }
    }

    /// Resolve, compose and mount, leaving initialization queued
    pub async fn load(&mut self, source: RenderSource) -> Result<(), RenderError> {
        self.teardown();
        let generation = self.queue.advance();
        self.document.remove_children(self.view);
        self.diagnostics.clear();
        self.last_error = None;
        self.components = LoadedComponentSet::new();
        self.definitions.clear();
        self.failed_instances.clear();

        let tree = resolve_source(&self.store, &source).await?;
        if self.queue.generation() != generation {
            return Err(RenderError::Superseded);
        }

        let mut compositor = Compositor::new(&tree.components, &self.options, &mut self.ids);
        let composed = compositor.compose(&tree.root);
        self.definitions = compositor.into_definitions();

        info!(
            root = %tree.root.id,
            components = tree.components.len(),
            nested = composed.nested.len(),
            unresolved = composed.unresolved.len(),
            "component tree composed"
        );

        if !tree.root.style.trim().is_empty() {
            let style = self.document.create_element("style");
            let text = self.document.create_text(tree.root.style.as_str());
            self.document.append_child(style, text);
            self.document.append_child(self.view, style);
        }
        self.document.mount(self.view, &parse_html(&composed.markup));

        self.pending_root = Some(PendingRoot {
            component_id: tree.root.id.clone(),
            data: Value::from(tree.root.parsed_data()),
        });
        self.definitions
            .entry(tree.root.id.clone())
            .or_insert_with(|| Arc::new(parse_script(&tree.root.script)));
        self.components = tree.components;

        self.queue.post(TaskKind::InitRoot);
        Ok(())
    }

    /// Drain the task queue, then refresh anything left marked as changed
    pub fn run_until_idle(&mut self) {
        self.drain();
        if !self.registry.dirty_ids().is_empty() {
            self.queue.post(TaskKind::Refresh);
            self.drain();
        }
    }

    fn drain(&mut self) {
        while let Some(task) = self.queue.next() {
            debug!(kind = ?task.kind, "running task");
            match task.kind {
                TaskKind::InitRoot => self.init_root(),
                TaskKind::RunInit { instance_id } => self.run_init(&instance_id),
                TaskKind::InitNested => {
                    self.initialize_nested();
                }
                TaskKind::Refresh => self.refresh_dirty(),
            }
        }
    }

    fn init_root(&mut self) {
        let Some(pending) = self.pending_root.take() else {
            return;
        };
        let instance_id = self.ids.new_id();
        let definition = self.definition_for(&pending.component_id);
        let context = ComponentContext::create(
            &definition,
            pending.data,
            pending.component_id.clone(),
            instance_id.clone(),
        );

        self.document.set_attr(self.view, "data-root-instance", instance_id.as_str());
        self.register(ComponentInstance::new(self.view, context), &definition);
        self.root_instance = Some(instance_id.clone());

        self.queue.post(TaskKind::RunInit { instance_id });
        self.queue.post(TaskKind::InitNested);
    }

    /// Create contexts for nested containers that have none yet
    ///
    /// Walks the live view in document order, so running it again after a
    /// refresh only picks up containers that appeared since. Returns how
    /// many instances were created.
    pub fn initialize_nested(&mut self) -> usize {
        let containers = self.document.find_by_attr(self.view, NESTED_INSTANCE_ATTR);
        let mut created = 0;

        for node in containers {
            let Some(instance_id) = self.document.attr(node, NESTED_INSTANCE_ATTR).map(str::to_string) else {
                continue;
            };
            if self.registry.contains(&instance_id) || self.failed_instances.contains(&instance_id) {
                continue;
            }
            let component_id = self
                .document
                .attr(node, COMPONENT_ID_ATTR)
                .unwrap_or_default()
                .to_string();

            let Some(record) = self.components.get(&component_id).cloned() else {
                let message = format!("Component '{}' is not part of this render", component_id);
                warn!(component_id = %component_id, instance_id = %instance_id, "{}", message);
                self.registry.record(LifecycleEvent::InstanceFailed {
                    component_id: component_id.clone(),
                    message: message.clone(),
                });
                self.append_error_block(node, &message);
                self.failed_instances.insert(instance_id.clone());
                self.diagnostics.push(Diagnostic {
                    component_id,
                    instance_id: Some(instance_id),
                    message,
                });
                continue;
            };

            let definition = self.definition_for_record(&record);
            let context = ComponentContext::create(
                &definition,
                Value::from(record.parsed_data()),
                component_id,
                instance_id.clone(),
            );
            self.register(ComponentInstance::new(node, context), &definition);
            self.queue.post(TaskKind::RunInit { instance_id });
            created += 1;
        }

        if created > 0 {
            debug!(created, "nested instances created");
        }
        created
    }

    /// Register an instance, report its compile diagnostics and bind it
    fn register(&mut self, instance: ComponentInstance, definition: &ScriptDefinition) {
        let instance_id = instance.id.clone();
        if !self.registry.register(instance) {
            warn!(instance_id = %instance_id, "instance id already registered");
            return;
        }

        for diagnostic in &definition.diagnostics {
            self.report_script_error(&instance_id, diagnostic.clone());
        }

        for err in self.bind(&instance_id) {
            self.report_script_error(&instance_id, err);
        }
    }

    fn bind(&mut self, instance_id: &str) -> Vec<ScriptError> {
        let limits = self.options.limits();
        let Some(instance) = self.registry.get_mut(instance_id) else {
            return Vec::new();
        };
        let root = instance.root;
        Binder::new(&mut self.document, &mut instance.context, &mut self.host, limits).apply(root)
    }

    fn run_init(&mut self, instance_id: &str) {
        if !self.registry.is_live(instance_id) {
            return;
        }
        let limits = self.options.limits();
        let Some(instance) = self.registry.get_mut(instance_id) else {
            return;
        };

        let result = match instance.context.on_init() {
            Some(hook) => {
                let result = Interpreter::new(&mut instance.context, &mut self.host, limits).invoke(&hook, Vec::new());
                instance.context.change.mark_changed();
                Some(result)
            }
            None => None,
        };
        let refresh_now = instance.context.change.take_refresh_request();
        self.registry.mark_initialized(instance_id);

        match result {
            Some(Ok(_)) => self.registry.record(LifecycleEvent::InitHookRan {
                instance_id: instance_id.to_string(),
            }),
            Some(Err(err)) => {
                self.registry.record(LifecycleEvent::InitHookFailed {
                    instance_id: instance_id.to_string(),
                    message: err.to_string(),
                });
                self.report_script_error(instance_id, err);
            }
            None => {}
        }

        if refresh_now {
            self.refresh_instance(instance_id);
        }
    }

    /// Fire `event` at `node`, running listeners on it and its ancestors
    ///
    /// Returns how many handlers ran. Changed instances are refreshed before
    /// returning.
    pub fn dispatch(&mut self, node: NodeId, event: &str, payload: Value) -> usize {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.document.parent(current) {
            path.push(parent);
            current = parent;
        }

        let listeners: Vec<Listener> = path
            .iter()
            .flat_map(|n| self.document.listeners(*n).iter())
            .filter(|l| l.event.eq_ignore_ascii_case(event))
            .cloned()
            .collect();

        let limits = self.options.limits();
        let mut ran = 0;
        for listener in listeners {
            let Some(instance) = self.registry.get_mut(&listener.instance_id) else {
                continue;
            };
            if !instance.is_live() {
                continue;
            }
            ran += 1;
            let result = run_handler(
                &mut instance.context,
                &mut self.host,
                limits,
                &listener.handler,
                payload.clone(),
            );
            let refresh_now = instance.context.change.take_refresh_request();

            if let Err(err) = result {
                self.report_script_error(&listener.instance_id, err);
            }
            if refresh_now {
                self.refresh_instance(&listener.instance_id);
            }
        }

        self.run_until_idle();
        ran
    }

    /// Re-apply bindings and interpolation of one instance
    pub fn refresh_instance(&mut self, instance_id: &str) {
        if !self.registry.is_live(instance_id) {
            return;
        }
        if let Some(instance) = self.registry.get_mut(instance_id) {
            instance.context.change.clear();
        }

        let errors = self.bind(instance_id);
        for err in errors {
            warn!(instance_id = %instance_id, error = %err, "binding failed on refresh");
            let component_id = self
                .registry
                .get(instance_id)
                .map(|i| i.component_id.clone())
                .unwrap_or_default();
            self.diagnostics.push(Diagnostic {
                component_id,
                instance_id: Some(instance_id.to_string()),
                message: err.to_string(),
            });
        }

        self.registry.record(LifecycleEvent::Refreshed {
            instance_id: instance_id.to_string(),
        });
    }

    fn refresh_dirty(&mut self) {
        for instance_id in self.registry.dirty_ids() {
            self.refresh_instance(&instance_id);
        }
    }

    /// Run every destroy hook once and forget all instances
    ///
    /// Children are destroyed before the instances that contain them. A
    /// failing hook is logged and does not stop the others.
    pub fn teardown(&mut self) {
        let limits = self.options.limits();
        let mut ids = self.registry.ids();
        ids.reverse();

        for instance_id in ids {
            let Some(instance) = self.registry.get_mut(&instance_id) else {
                continue;
            };
            if !instance.is_live() {
                continue;
            }

            if let Some(hook) = instance.context.on_destroy() {
                let result = Interpreter::new(&mut instance.context, &mut self.host, limits).invoke(&hook, Vec::new());
                match result {
                    Ok(_) => self.registry.record(LifecycleEvent::DestroyHookRan {
                        instance_id: instance_id.clone(),
                    }),
                    Err(err) => {
                        warn!(instance_id = %instance_id, error = %err, "destroy hook failed");
                        self.registry.record(LifecycleEvent::DestroyHookFailed {
                            instance_id: instance_id.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
            self.registry.mark_destroyed(&instance_id);
        }

        self.registry.clear();
        self.queue.clear();
        self.pending_root = None;
        self.root_instance = None;
    }

    fn definition_for(&mut self, component_id: &str) -> Arc<ScriptDefinition> {
        self.definitions
            .get(component_id)
            .cloned()
            .unwrap_or_default()
    }

    fn definition_for_record(&mut self, record: &ComponentRecord) -> Arc<ScriptDefinition> {
        self.definitions
            .entry(record.id.clone())
            .or_insert_with(|| Arc::new(parse_script(&record.script)))
            .clone()
    }

    fn report_script_error(&mut self, instance_id: &str, err: ScriptError) {
        let (component_id, root) = match self.registry.get(instance_id) {
            Some(instance) => (instance.component_id.clone(), instance.root),
            None => (String::new(), self.view),
        };
        error!(component_id = %component_id, instance_id = %instance_id, error = %err, "script error");

        let message = format!("Script error in component '{}': {}", component_id, err);
        self.append_error_block(root, &message);
        self.diagnostics.push(Diagnostic {
            component_id,
            instance_id: Some(instance_id.to_string()),
            message: err.to_string(),
        });
    }

    fn append_error_block(&mut self, parent: NodeId, message: &str) {
        let block = self.document.create_element("div");
        self.document.set_attr(block, "class", ERROR_CLASS);
        self.document.set_attr(block, "data-error-kind", "script");
        // Keep the message out of later interpolation passes
        let text = self.document.create_text(message.replace("{{", "{ {"));
        self.document.append_child(block, text);
        self.document.append_child(parent, block);
    }

    fn show_render_error(&mut self, err: RenderError) {
        error!(error = %err, "render failed");
        self.document.remove_children(self.view);

        let block = self.document.create_element("div");
        self.document
            .set_attr(block, "class", format!("{} {}", ERROR_CLASS, RENDER_ERROR_CLASS));
        let text = self.document.create_text(format!("Render failed: {}", err));
        self.document.append_child(block, text);
        self.document.append_child(self.view, block);

        self.last_error = Some(err);
    }

    /// The view's rendered markup
    pub fn html(&self) -> String {
        self.document.inner_html(self.view)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn view(&self) -> NodeId {
        self.view
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn root_instance(&self) -> Option<&ComponentInstance> {
        self.registry.get(self.root_instance.as_deref()?)
    }

    pub fn instance(&self, instance_id: &str) -> Option<&ComponentInstance> {
        self.registry.get(instance_id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.registry.instances()
    }

    pub fn context(&self, instance_id: &str) -> Option<&ComponentContext> {
        self.registry.get(instance_id).map(|i| &i.context)
    }

    pub fn components(&self) -> &LoadedComponentSet {
        &self.components
    }

    pub fn journal(&self) -> &[LifecycleEvent] {
        self.registry.journal()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ComponentStore, H: HostEnv> Drop for RenderSession<S, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
