//! # Instance registry
//!
//! Owns every live component instance of a render session, keyed by
//! instance id in registration order. Each instance moves through
//! `Uninitialized -> Initialized -> Destroyed` exactly once; the registry
//! enforces that, and records what happened in a journal.

use crate::context::ComponentContext;
use crate::dom::NodeId;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceState {
    Uninitialized,
    Initialized,
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct ComponentInstance {
    pub id: String,
    pub component_id: String,
    /// Container the instance's markup was mounted into
    pub root: NodeId,
    pub context: ComponentContext,
    pub state: InstanceState,
}

impl ComponentInstance {
    pub fn new(root: NodeId, context: ComponentContext) -> Self {
        Self {
            id: context.instance_id.clone(),
            component_id: context.component_id.clone(),
            root,
            context,
            state: InstanceState::Uninitialized,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state != InstanceState::Destroyed
    }
}

/// Lifecycle step recorded by a render session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LifecycleEvent {
    ContextCreated {
        instance_id: String,
        component_id: String,
    },
    InitHookRan {
        instance_id: String,
    },
    InitHookFailed {
        instance_id: String,
        message: String,
    },
    /// The instance could not be set up at all
    InstanceFailed {
        component_id: String,
        message: String,
    },
    DestroyHookRan {
        instance_id: String,
    },
    DestroyHookFailed {
        instance_id: String,
        message: String,
    },
    Destroyed {
        instance_id: String,
    },
    Refreshed {
        instance_id: String,
    },
}

impl LifecycleEvent {
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            LifecycleEvent::ContextCreated { instance_id, .. }
            | LifecycleEvent::InitHookRan { instance_id }
            | LifecycleEvent::InitHookFailed { instance_id, .. }
            | LifecycleEvent::DestroyHookRan { instance_id }
            | LifecycleEvent::DestroyHookFailed { instance_id, .. }
            | LifecycleEvent::Destroyed { instance_id }
            | LifecycleEvent::Refreshed { instance_id } => Some(instance_id),
            LifecycleEvent::InstanceFailed { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: IndexMap<String, ComponentInstance>,
    journal: Vec<LifecycleEvent>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created instance
    ///
    /// Returns false, leaving the registry untouched, if the id is taken.
    pub fn register(&mut self, instance: ComponentInstance) -> bool {
        if self.instances.contains_key(&instance.id) {
            return false;
        }
        self.journal.push(LifecycleEvent::ContextCreated {
            instance_id: instance.id.clone(),
            component_id: instance.component_id.clone(),
        });
        self.instances.insert(instance.id.clone(), instance);
        true
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.instances.contains_key(instance_id)
    }

    pub fn get(&self, instance_id: &str) -> Option<&ComponentInstance> {
        self.instances.get(instance_id)
    }

    pub fn get_mut(&mut self, instance_id: &str) -> Option<&mut ComponentInstance> {
        self.instances.get_mut(instance_id)
    }

    /// Whether the instance exists and has not been destroyed
    pub fn is_live(&self, instance_id: &str) -> bool {
        self.get(instance_id).is_some_and(ComponentInstance::is_live)
    }

    /// Move an uninitialized instance to initialized
    pub fn mark_initialized(&mut self, instance_id: &str) -> bool {
        match self.instances.get_mut(instance_id) {
            Some(instance) if instance.state == InstanceState::Uninitialized => {
                instance.state = InstanceState::Initialized;
                true
            }
            _ => false,
        }
    }

    /// Move an instance to destroyed; false if it already was
    pub fn mark_destroyed(&mut self, instance_id: &str) -> bool {
        match self.instances.get_mut(instance_id) {
            Some(instance) if instance.is_live() => {
                instance.state = InstanceState::Destroyed;
                self.journal.push(LifecycleEvent::Destroyed {
                    instance_id: instance_id.to_string(),
                });
                true
            }
            _ => false,
        }
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }

    pub fn instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.instances.values()
    }

    /// Ids of live instances whose change handle is dirty
    pub fn dirty_ids(&self) -> Vec<String> {
        self.instances
            .values()
            .filter(|i| i.is_live() && i.context.change.is_dirty())
            .map(|i| i.id.clone())
            .collect()
    }

    pub fn record(&mut self, event: LifecycleEvent) {
        self.journal.push(event);
    }

    pub fn journal(&self) -> &[LifecycleEvent] {
        &self.journal
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every instance; the journal is kept
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::script::parse_script;
    use crate::value::Value;

    fn instance(id: &str) -> ComponentInstance {
        let root = Document::new().body();
        ComponentInstance::new(root, ComponentContext::create(&parse_script(""), Value::Null, "card", id))
    }

    #[test]
    fn test_state_moves_forward_once() {
        let mut registry = InstanceRegistry::new();
        assert!(registry.register(instance("a")));
        assert!(!registry.register(instance("a")));

        assert!(registry.mark_initialized("a"));
        assert!(!registry.mark_initialized("a"));
        assert!(registry.mark_destroyed("a"));
        assert!(!registry.mark_destroyed("a"));
        assert!(!registry.mark_initialized("a"));
        assert!(!registry.is_live("a"));
    }

    #[test]
    fn test_journal_and_order() {
        let mut registry = InstanceRegistry::new();
        registry.register(instance("b"));
        registry.register(instance("a"));
        registry.mark_destroyed("b");

        assert_eq!(registry.ids(), vec!["b", "a"]);
        assert_eq!(
            registry.journal()[0],
            LifecycleEvent::ContextCreated {
                instance_id: "b".into(),
                component_id: "card".into()
            }
        );
        assert_eq!(registry.journal()[2].instance_id(), Some("b"));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.journal().len(), 3);
    }

    #[test]
    fn test_dirty_ids() {
        let mut registry = InstanceRegistry::new();
        registry.register(instance("a"));
        registry.register(instance("b"));
        if let Some(b) = registry.get_mut("b") {
            b.context.change.mark_changed();
        }
        assert_eq!(registry.dirty_ids(), vec!["b"]);
    }
}
