use tessera_bundle::ResolveError;
use tessera_parser::ParseError;
use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Template expansion failure, rendered inline as a comment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unclosed #{kind} block '{path}' at offset {offset}")]
    UnclosedBlock {
        kind: String,
        path: String,
        offset: usize,
    },

    #[error("unmatched /{kind} at offset {offset}")]
    UnmatchedClose { kind: String, offset: usize },

    #[error("invalid block path '{path}' at offset {offset}")]
    InvalidPath { path: String, offset: usize },
}

impl TemplateError {
    /// The comment left in the output where the failure happened
    pub fn to_comment(&self) -> String {
        format!("<!-- template error: {} -->", self.to_string().replace("--", "- -"))
    }
}

/// Script compile or execution failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("failed to compile '{name}': {source}")]
    Compile { name: String, source: ParseError },

    #[error("'{name}' is not defined")]
    UnknownIdentifier { name: String },

    #[error("method '{name}' is not defined")]
    UnknownMethod { name: String },

    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("iteration limit of {limit} steps exceeded")]
    IterationLimit { limit: usize },

    #[error("call depth limit of {limit} exceeded")]
    CallDepth { limit: usize },

    #[error("uncaught {value}")]
    Thrown { value: String },
}

impl ScriptError {
    pub fn type_error(message: impl Into<String>) -> Self {
        ScriptError::TypeError {
            message: message.into(),
        }
    }

    pub fn unknown_identifier(name: impl Into<String>) -> Self {
        ScriptError::UnknownIdentifier { name: name.into() }
    }

    pub fn unknown_method(name: impl Into<String>) -> Self {
        ScriptError::UnknownMethod { name: name.into() }
    }
}

/// Failure that discards a whole render pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("render superseded by a newer render")]
    Superseded,

    #[error("render failed: {message}")]
    Internal { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_comment() {
        let err = TemplateError::UnclosedBlock {
            kind: "each".into(),
            path: "items".into(),
            offset: 4,
        };
        assert_eq!(err.to_string(), "unclosed #each block 'items' at offset 4");
        assert_eq!(
            err.to_comment(),
            "<!-- template error: unclosed #each block 'items' at offset 4 -->"
        );
    }

    #[test]
    fn test_script_error_display() {
        assert_eq!(
            ScriptError::unknown_method("save").to_string(),
            "method 'save' is not defined"
        );
        assert_eq!(
            ScriptError::IterationLimit { limit: 10 }.to_string(),
            "iteration limit of 10 steps exceeded"
        );
    }
}
