//! Dynamic component rendering: composition, templates, scripts and
//! the lifecycle of the instances behind a rendered view.

pub mod bindings;
pub mod compositor;
pub mod config;
pub mod context;
pub mod dom;
pub mod error;
pub mod host;
pub mod id_generator;
pub mod interpreter;
pub mod lifecycle;
pub mod lookup;
pub mod renderer;
pub mod rewriter;
pub mod scheduler;
pub mod script;
pub mod template;
pub mod value;

#[cfg(test)]
mod tests_pipeline;

#[cfg(test)]
mod tests_error_recovery;

#[cfg(test)]
mod tests_scripts;

pub use bindings::{evaluate_expression, run_handler, Binder, NESTED_INSTANCE_ATTR};
pub use compositor::{ComposedView, Compositor, NestedSlot, COMPONENT_ID_ATTR};
pub use config::{RenderOptions, ScriptLimits};
pub use context::{ChangeHandle, ComponentContext, DATA_KEY};
pub use dom::{Document, Listener, NodeData, NodeId};
pub use error::{RenderError, ScriptError, ScriptResult, TemplateError};
pub use host::{ConsoleLevel, HostEffect, HostEnv, RecordingHost};
pub use id_generator::IDGenerator;
pub use interpreter::Interpreter;
pub use lifecycle::{ComponentInstance, InstanceRegistry, InstanceState, LifecycleEvent};
pub use lookup::{lookup_path, lookup_value};
pub use renderer::{Diagnostic, RenderSession};
pub use rewriter::rewrite_bindings;
pub use scheduler::{Task, TaskKind, TaskQueue};
pub use script::{parse_script, Method, MethodBody, ScriptDefinition};
pub use template::{render, Expansion, TemplateEngine};
pub use value::Value;

// Render sources come from the resolver
pub use tessera_bundle::RenderSource;
