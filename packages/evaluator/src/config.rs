use serde::{Deserialize, Serialize};

/// Knobs for a render session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Statements and loop iterations one script call may run
    pub iteration_limit: usize,

    /// Nested method calls allowed before a script call is aborted
    pub call_depth_limit: usize,

    /// Deepest component nesting inlined before a placeholder is emitted
    pub max_nesting_depth: usize,

    /// Leave a comment where an `{{#each}}` produced nothing
    pub debug_comments: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            iteration_limit: 10_000,
            call_depth_limit: 64,
            max_nesting_depth: 32,
            debug_comments: false,
        }
    }
}

impl RenderOptions {
    pub fn limits(&self) -> ScriptLimits {
        ScriptLimits {
            max_steps: self.iteration_limit,
            max_call_depth: self.call_depth_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    pub max_steps: usize,
    pub max_call_depth: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        RenderOptions::default().limits()
    }
}
