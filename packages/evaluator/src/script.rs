//! # Component script compilation
//!
//! Turns a component's script text into a `ScriptDefinition`: literal
//! property values, compiled methods and the `ngOnInit` / `ngOnDestroy`
//! hooks. Members are located with `tessera_parser::extract_outline`, and
//! each method body is parsed into the closed statement AST the
//! interpreter runs.
//!
//! Nothing here fails as a whole. A method whose body does not parse
//! becomes a fallback stub, a hook that does not parse becomes a no-op,
//! and every such problem is kept in `diagnostics`.

use crate::error::ScriptError;
use crate::value::Value;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tessera_parser::ast::{Expr, UnaryOp};
use tessera_parser::parser::unescape;
use tessera_parser::{extract_outline, parse_expression, parse_script as parse_statements, Stmt};

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

pub const INIT_HOOK: &str = "ngOnInit";
pub const DESTROY_HOOK: &str = "ngOnDestroy";

/// Members that are never treated as callable methods
const IGNORED_MEMBERS: &[&str] = &["constructor"];

#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    Compiled(Vec<Stmt>),

    /// Body did not compile; calls get the legacy best-effort behavior
    Fallback,

    /// Hook whose body did not compile
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub params: Vec<String>,
    pub body: MethodBody,
}

impl Method {
    pub fn is_compiled(&self) -> bool {
        matches!(self.body, MethodBody::Compiled(_))
    }
}

/// Everything extracted from one script
#[derive(Debug, Clone, Default)]
pub struct ScriptDefinition {
    pub properties: IndexMap<String, Value>,
    pub methods: IndexMap<String, Arc<Method>>,
    pub on_init: Option<Arc<Method>>,
    pub on_destroy: Option<Arc<Method>>,
    pub diagnostics: Vec<ScriptError>,
}

impl ScriptDefinition {
    /// Names a template may refer to before the context exists
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .keys()
            .chain(self.methods.keys())
            .map(|name| name.as_str())
    }
}

/// Compile a component script
pub fn parse_script(code: &str) -> ScriptDefinition {
    let mut definition = ScriptDefinition::default();
    if code.trim().is_empty() {
        return definition;
    }

    let outline = extract_outline(code);
    for diagnostic in outline.diagnostics {
        definition.diagnostics.push(ScriptError::Compile {
            name: "script".to_string(),
            source: diagnostic,
        });
    }

    for property in &outline.properties {
        definition
            .properties
            .insert(property.name.clone(), sniff_literal(&property.raw));
    }

    for source in &outline.methods {
        if IGNORED_MEMBERS.contains(&source.name.as_str()) {
            continue;
        }
        let is_hook = source.name == INIT_HOOK || source.name == DESTROY_HOOK;

        let body = match parse_statements(&source.body) {
            Ok(statements) => MethodBody::Compiled(statements),
            Err(err) => {
                let error = ScriptError::Compile {
                    name: source.name.clone(),
                    source: err.offset(source.body_offset),
                };
                tracing::warn!(method = %source.name, error = %error, "method did not compile");
                definition.diagnostics.push(error);
                if is_hook {
                    MethodBody::Noop
                } else {
                    MethodBody::Fallback
                }
            }
        };

        let method = Arc::new(Method {
            name: source.name.clone(),
            params: source.params.clone(),
            body,
        });

        match source.name.as_str() {
            INIT_HOOK => definition.on_init = Some(method),
            DESTROY_HOOK => definition.on_destroy = Some(method),
            _ => {
                definition.methods.insert(source.name.clone(), method);
            }
        }
    }

    definition
}

/// Value of a property initializer, by literal sniffing
///
/// Tried in order: booleans, `null`, `undefined`, numbers, quoted strings,
/// array and object literals. Array and object literals that cannot be read
/// become empty. Anything else is kept as its raw text.
pub fn sniff_literal(raw: &str) -> Value {
    let text = raw.trim().trim_end_matches(';').trim();

    match text {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "null" => return Value::Null,
        "undefined" => return Value::Undefined,
        _ => {}
    }

    if NUMBER_RE.is_match(text) {
        if let Ok(n) = text.parse::<f64>() {
            return Value::Number(n);
        }
    }

    if let Some(inner) = strip_quotes(text) {
        return Value::String(unescape(inner));
    }

    if text.starts_with('[') && text.ends_with(']') {
        return structured_literal(text).unwrap_or(Value::Array(Vec::new()));
    }

    if text.starts_with('{') && text.ends_with('}') {
        return structured_literal(text).unwrap_or_else(Value::object);
    }

    Value::String(text.to_string())
}

fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ['\'', '"', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            if !inner.contains(quote) || inner.contains('\\') {
                return Some(inner);
            }
        }
    }
    None
}

/// Array or object literal: JSON first, then a constant script expression
fn structured_literal(text: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text.replace('\'', "\"")) {
        return Some(Value::from(json));
    }
    parse_expression(text).ok().and_then(|expr| constant_value(&expr))
}

fn constant_value(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Number(n) => Some(Value::Number(*n)),
        Expr::Str(s) => Some(Value::String(s.clone())),
        Expr::Bool(b) => Some(Value::Boolean(*b)),
        Expr::Null => Some(Value::Null),
        Expr::Undefined => Some(Value::Undefined),
        Expr::Unary {
            operator: UnaryOp::Negate,
            operand,
        } => match constant_value(operand)? {
            Value::Number(n) => Some(Value::Number(-n)),
            _ => None,
        },
        Expr::Array(items) => items
            .iter()
            .map(constant_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Expr::Object(fields) => fields
            .iter()
            .map(|(key, value)| constant_value(value).map(|v| (key.clone(), v)))
            .collect::<Option<IndexMap<_, _>>>()
            .map(Value::Object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sniff_priority() {
        assert_eq!(sniff_literal("true"), Value::Boolean(true));
        assert_eq!(sniff_literal("false;"), Value::Boolean(false));
        assert_eq!(sniff_literal("null"), Value::Null);
        assert_eq!(sniff_literal("undefined"), Value::Undefined);
        assert_eq!(sniff_literal("-12.5"), Value::Number(-12.5));
        assert_eq!(sniff_literal("1e3"), Value::Number(1000.0));
        assert_eq!(sniff_literal("'hi there'"), Value::string("hi there"));
        assert_eq!(sniff_literal("\"x\""), Value::string("x"));
        assert_eq!(sniff_literal("new Date()"), Value::string("new Date()"));
    }

    #[test]
    fn test_sniff_structured() {
        assert_eq!(
            sniff_literal("['a', 'b']"),
            Value::from(json!(["a", "b"]))
        );
        assert_eq!(
            sniff_literal(r#"{"open": true, "n": 1}"#),
            Value::from(json!({"open": true, "n": 1}))
        );
        assert_eq!(
            sniff_literal("{ label: 'Go', sizes: [1, -2] }"),
            Value::from(json!({"label": "Go", "sizes": [1, -2]}))
        );
        assert_eq!(sniff_literal("[1, 2, oops("), Value::Array(vec![]));
        assert_eq!(sniff_literal("{ a: someCall() }"), Value::object());
    }

    #[test]
    fn test_parse_members() {
        let definition = parse_script(
            r#"
            export class CardComponent {
                title: string = 'Card';
                items = [];
                open = false;

                constructor(private cdr: ChangeDetectorRef) {}

                toggle() {
                    this.open = !this.open;
                }

                add(name: string, qty = 1) {
                    this.items.push({ name: name, qty: qty });
                }

                ngOnInit() {
                    console.log('init');
                }

                ngOnDestroy() {
                    console.log('bye');
                }
            }
            "#,
        );

        assert!(definition.diagnostics.is_empty(), "{:?}", definition.diagnostics);
        assert_eq!(definition.properties.get("title"), Some(&Value::string("Card")));
        assert_eq!(definition.properties.get("open"), Some(&Value::Boolean(false)));
        assert_eq!(
            definition.methods.keys().collect::<Vec<_>>(),
            vec!["toggle", "add"]
        );
        assert_eq!(definition.methods["add"].params, vec!["name", "qty"]);
        assert!(definition.methods["toggle"].is_compiled());
        assert!(definition.on_init.is_some());
        assert!(definition.on_destroy.is_some());
    }

    #[test]
    fn test_bad_bodies_degrade() {
        let definition = parse_script(
            r#"
            count = 1;
            showAlert(msg) {
                const f = (x) => x * 2;
            }
            ngOnInit() {
                this.items.map(function (x) { return x; });
            }
            ok() { this.count = 2; }
            "#,
        );

        assert_eq!(definition.diagnostics.len(), 2);
        assert_eq!(definition.methods["showAlert"].body, MethodBody::Fallback);
        assert!(definition.methods["ok"].is_compiled());
        assert_eq!(
            definition.on_init.as_ref().map(|m| m.body.clone()),
            Some(MethodBody::Noop)
        );
        assert_eq!(definition.properties.get("count"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_compile_error_offsets_point_into_script() {
        let code = "broken() {\n  let = 5;\n}";
        let definition = parse_script(code);
        match &definition.diagnostics[0] {
            ScriptError::Compile { name, source } => {
                assert_eq!(name, "broken");
                assert!(source.span().start >= code.find('{').unwrap());
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_script() {
        let definition = parse_script("   ");
        assert!(definition.properties.is_empty());
        assert!(definition.methods.is_empty());
        assert!(definition.diagnostics.is_empty());
    }
}
