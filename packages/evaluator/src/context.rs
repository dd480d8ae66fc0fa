use crate::lookup::lookup_path;
use crate::script::{Method, ScriptDefinition};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Key the component's data payload is stored under
pub const DATA_KEY: &str = "data";

/// Change notifications raised by a script through `this.cdr`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeHandle {
    dirty: bool,
    refresh_requested: bool,
}

impl ChangeHandle {
    /// `markForCheck()`: refresh when the task queue drains
    pub fn mark_changed(&mut self) {
        self.dirty = true;
    }

    /// `detectChanges()`: refresh as soon as the running call returns
    pub fn detect_changes(&mut self) {
        self.dirty = true;
        self.refresh_requested = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    pub fn clear(&mut self) {
        self.dirty = false;
        self.refresh_requested = false;
    }
}

/// The state and behavior bound to one rendered instance
#[derive(Debug, Clone)]
pub struct ComponentContext {
    pub component_id: String,
    pub instance_id: String,
    properties: IndexMap<String, Value>,
    methods: IndexMap<String, Arc<Method>>,
    on_init: Option<Arc<Method>>,
    on_destroy: Option<Arc<Method>>,
    pub change: ChangeHandle,
}

impl ComponentContext {
    /// Build a context from a parsed script and the component's data
    ///
    /// The payload goes under `data` unless it is null and the script
    /// already declares a `data` property.
    pub fn create(
        definition: &ScriptDefinition,
        data: Value,
        component_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        let mut properties = definition.properties.clone();
        if !(data.is_nullish() && properties.contains_key(DATA_KEY)) {
            properties.insert(DATA_KEY.to_string(), data);
        }

        Self {
            component_id: component_id.into(),
            instance_id: instance_id.into(),
            properties,
            methods: definition.methods.clone(),
            on_init: definition.on_init.clone(),
            on_destroy: definition.on_destroy.clone(),
            change: ChangeHandle::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.properties.get_mut(name)
    }

    /// Slot for `name`, created as `undefined` if missing
    pub fn slot(&mut self, name: &str) -> &mut Value {
        self.properties
            .entry(name.to_string())
            .or_insert(Value::Undefined)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// Properties as one object value, as `this` evaluates
    pub fn snapshot(&self) -> Value {
        Value::Object(self.properties.clone())
    }

    /// Dotted-path lookup over the context's names
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        let path = path.strip_prefix("this.").unwrap_or(path);
        if let Some(direct) = self.properties.get(path) {
            return Some(direct);
        }
        let (head, rest) = path.split_once('.')?;
        let root = self.properties.get(head)?;
        lookup_path(root, rest)
    }

    pub fn method(&self, name: &str) -> Option<Arc<Method>> {
        self.methods.get(name).cloned()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|name| name.as_str())
    }

    pub fn on_init(&self) -> Option<Arc<Method>> {
        self.on_init.clone()
    }

    pub fn on_destroy(&self) -> Option<Arc<Method>> {
        self.on_destroy.clone()
    }
}
