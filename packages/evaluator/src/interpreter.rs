//! # Script interpreter
//!
//! Runs compiled component methods and binding expressions against one
//! `ComponentContext`. The interpreter only reaches outside the context
//! through `HostEnv`, and every call is bounded by `ScriptLimits`.
//!
//! ## Name resolution
//!
//! Bare identifiers resolve to locals first, then to context properties.
//! `this.x` always means the context property. Calls resolve to context
//! methods, then to the built-ins (`alert`, `parseInt`, `console.log`,
//! `Math.max`, `JSON.stringify`, ...). Nothing else exists: there are no
//! function values, prototypes or globals.
//!
//! ## Errors
//!
//! Every failure is a `ScriptError` value. A `throw` surfaces as
//! `ScriptError::Thrown`; there is no `try`, so it always ends the call.

use crate::config::ScriptLimits;
use crate::context::ComponentContext;
use crate::error::{ScriptError, ScriptResult};
use crate::host::{ConsoleLevel, HostEnv};
use crate::script::{Method, MethodBody};
use crate::value::{format_number, Value};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use tessera_parser::ast::{BinaryOp, Expr, Stmt, TemplatePart, UnaryOp};
use tessera_parser::{parse_expression, parse_script};

lazy_static! {
    static ref FLOAT_PREFIX_RE: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap();
}

/// Namespaces built-in calls hang off
const NAMESPACES: &[&str] = &["console", "window", "Math", "JSON", "Object", "Array", "Number"];

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Where an assignment lands
enum PlaceRoot {
    Local(usize, String),
    Property(String),
}

pub struct Interpreter<'a> {
    context: &'a mut ComponentContext,
    host: &'a mut dyn HostEnv,
    limits: ScriptLimits,
    steps: usize,
    depth: usize,
    scopes: Vec<IndexMap<String, Value>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        context: &'a mut ComponentContext,
        host: &'a mut dyn HostEnv,
        limits: ScriptLimits,
    ) -> Self {
        Self {
            context,
            host,
            limits,
            steps: 0,
            depth: 0,
            scopes: vec![IndexMap::new()],
        }
    }

    /// Bind a local visible to everything this interpreter runs
    pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
        if let Some(scope) = self.scopes.first_mut() {
            scope.insert(name.into(), value);
        }
        self
    }

    /// Call a context method by name
    pub fn call_method(&mut self, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
        let method = self
            .context
            .method(name)
            .ok_or_else(|| ScriptError::unknown_method(name))?;
        self.invoke(&method, args)
    }

    /// Run a method or hook with arguments
    pub fn invoke(&mut self, method: &Method, args: Vec<Value>) -> ScriptResult<Value> {
        if self.depth >= self.limits.max_call_depth {
            return Err(ScriptError::CallDepth {
                limit: self.limits.max_call_depth,
            });
        }

        match &method.body {
            MethodBody::Compiled(statements) => {
                let mut frame = IndexMap::new();
                let mut args = args.into_iter();
                for param in &method.params {
                    frame.insert(param.clone(), args.next().unwrap_or_default());
                }

                // Methods see their own locals only, plus the bound ones
                let base = self.scopes.first().cloned().unwrap_or_default();
                let saved = std::mem::replace(&mut self.scopes, vec![base, frame]);
                self.depth += 1;
                let result = self.exec_block(statements);
                self.depth -= 1;
                self.scopes = saved;

                match result? {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                }
            }
            MethodBody::Fallback => {
                self.fallback(&method.name, &args);
                Ok(Value::Undefined)
            }
            MethodBody::Noop => Ok(Value::Undefined),
        }
    }

    /// Legacy behavior for methods whose body could not be compiled
    fn fallback(&mut self, name: &str, args: &[Value]) {
        self.host.console(
            ConsoleLevel::Warn,
            &format!("method '{}' could not be compiled; running fallback", name),
        );

        let lower = name.to_ascii_lowercase();
        let first_text = args.first().and_then(|v| v.as_str().map(str::to_string));

        if lower.contains("alert") {
            let message = args
                .first()
                .map(Value::to_js_string)
                .unwrap_or_else(|| name.to_string());
            self.host.alert(&message);
        } else if lower.contains("navigate") {
            if let Some(url) = first_text {
                self.host.navigate(&url);
            }
        } else if lower.contains("open") {
            if let Some(url) = first_text {
                self.host.open(&url);
            }
        }
    }

    /// Evaluate a single expression given as text
    pub fn evaluate_source(&mut self, source: &str) -> ScriptResult<Value> {
        let expr = parse_expression(source).map_err(|err| ScriptError::Compile {
            name: "expression".to_string(),
            source: err,
        })?;
        self.evaluate(&expr)
    }

    /// Run statements given as text, returning the last expression's value
    pub fn run_source(&mut self, source: &str) -> ScriptResult<Value> {
        let statements = parse_script(source).map_err(|err| ScriptError::Compile {
            name: "handler".to_string(),
            source: err,
        })?;

        let mut last = Value::Undefined;
        for statement in &statements {
            if let Stmt::Expr(expr) = statement {
                self.tick()?;
                last = self.evaluate(expr)?;
                continue;
            }
            match self.exec(statement)? {
                Flow::Return(value) => return Ok(value),
                Flow::Break | Flow::Continue | Flow::Normal => {}
            }
        }
        Ok(last)
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ScriptError::IterationLimit {
                limit: self.limits.max_steps,
            });
        }
        Ok(())
    }

    fn in_scope<T>(
        &mut self,
        scope: IndexMap<String, Value>,
        f: impl FnOnce(&mut Self) -> ScriptResult<T>,
    ) -> ScriptResult<T> {
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> ScriptResult<Flow> {
        for statement in statements {
            match self.exec(statement)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Stmt) -> ScriptResult<Flow> {
        self.tick()?;

        match statement {
            Stmt::Expr(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Let { name, init } => {
                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                }
                Ok(Flow::Normal)
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(statements) => {
                self.in_scope(IndexMap::new(), |this| this.exec_block(statements))
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.in_scope(IndexMap::new(), |this| {
                if let Some(init) = init {
                    this.exec(init)?;
                }
                loop {
                    this.tick()?;
                    if let Some(test) = test {
                        if !this.evaluate(test)?.is_truthy() {
                            break;
                        }
                    }
                    match this.exec(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Continue | Flow::Normal => {}
                    }
                    if let Some(update) = update {
                        this.evaluate(update)?;
                    }
                }
                Ok(Flow::Normal)
            }),
            Stmt::ForOf {
                binding,
                iterable,
                body,
            } => {
                let items = match self.evaluate(iterable)? {
                    Value::Array(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "{} is not iterable",
                            other.type_name()
                        )))
                    }
                };
                for item in items {
                    self.tick()?;
                    let mut scope = IndexMap::new();
                    scope.insert(binding.clone(), item);
                    match self.in_scope(scope, |this| this.exec(body))? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::While { test, body } => {
                loop {
                    self.tick()?;
                    if !self.evaluate(test)?.is_truthy() {
                        break;
                    }
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => {
                let value = self.evaluate(expr)?;
                let message = match &value {
                    Value::Object(fields) => fields
                        .get("message")
                        .map(Value::to_js_string)
                        .unwrap_or_else(|| value.to_json_string()),
                    other => other.to_js_string(),
                };
                Err(ScriptError::Thrown { value: message })
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => out.push_str(text),
                        TemplatePart::Expression(expr) => {
                            out.push_str(&self.evaluate(expr)?.to_js_string())
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Value::Array(values))
            }
            Expr::Object(fields) => {
                let mut map = IndexMap::new();
                for (key, value) in fields {
                    let value = self.evaluate(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expr::Ident(name) => self.resolve_ident(name),
            Expr::This => Ok(self.context.snapshot()),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if matches!(**object, Expr::This) {
                    return Ok(self.context.get(property).cloned().unwrap_or_default());
                }
                if let Expr::Ident(namespace) = &**object {
                    if self.is_namespace(namespace) {
                        return Ok(namespace_constant(namespace, property));
                    }
                }
                let target = self.evaluate(object)?;
                if target.is_nullish() {
                    if *optional {
                        return Ok(Value::Undefined);
                    }
                    return Err(ScriptError::type_error(format!(
                        "cannot read '{}' of {}",
                        property,
                        target.to_js_string()
                    )));
                }
                Ok(get_property(&target, property))
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let target = self.evaluate(object)?;
                let key = property_key(&self.evaluate(index)?);
                if target.is_nullish() {
                    if *optional {
                        return Ok(Value::Undefined);
                    }
                    return Err(ScriptError::type_error(format!(
                        "cannot read '{}' of {}",
                        key,
                        target.to_js_string()
                    )));
                }
                Ok(get_property(&target, &key))
            }
            Expr::Call { callee, arguments } => self.evaluate_call(callee, arguments),
            Expr::Unary { operator, operand } => {
                if *operator == UnaryOp::Typeof {
                    if let Expr::Ident(name) = &**operand {
                        if !self.is_defined(name) {
                            return Ok(Value::string("undefined"));
                        }
                    }
                    let value = self.evaluate(operand)?;
                    return Ok(Value::string(value.type_name()));
                }
                let value = self.evaluate(operand)?;
                Ok(match operator {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::string(value.type_name()),
                })
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                match operator {
                    BinaryOp::And if !left.is_truthy() => Ok(left),
                    BinaryOp::And => self.evaluate(right),
                    BinaryOp::Or if left.is_truthy() => Ok(left),
                    BinaryOp::Or => self.evaluate(right),
                    BinaryOp::Nullish if !left.is_nullish() => Ok(left),
                    BinaryOp::Nullish => self.evaluate(right),
                    op => {
                        let right = self.evaluate(right)?;
                        Ok(binary_op(*op, &left, &right))
                    }
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
            Expr::Assign {
                target,
                operator,
                value,
            } => {
                let value = match operator.binary() {
                    None => self.evaluate(value)?,
                    Some(op) => {
                        let current = self.evaluate(target)?;
                        let rhs = self.evaluate(value)?;
                        binary_op(op, &current, &rhs)
                    }
                };
                self.assign(target, value.clone())?;
                Ok(value)
            }
            Expr::Update {
                target,
                increment,
                prefix,
            } => {
                let old = self.evaluate(target)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
        }
    }

    fn resolve_ident(&self, name: &str) -> ScriptResult<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Ok(value.clone());
            }
        }
        if let Some(value) = self.context.get(name) {
            return Ok(value.clone());
        }
        match name {
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => Err(ScriptError::unknown_identifier(name)),
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    fn is_defined(&self, name: &str) -> bool {
        self.is_local(name) || self.context.contains(name)
    }

    /// A built-in namespace not shadowed by a local or property
    fn is_namespace(&self, name: &str) -> bool {
        NAMESPACES.contains(&name) && !self.is_defined(name)
    }

    fn evaluate_args(&mut self, arguments: &[Expr]) -> ScriptResult<Vec<Value>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }
        Ok(values)
    }

    fn evaluate_call(&mut self, callee: &Expr, arguments: &[Expr]) -> ScriptResult<Value> {
        match callee {
            Expr::Ident(name) => {
                if self.context.has_method(name) && !self.is_local(name) {
                    let args = self.evaluate_args(arguments)?;
                    return self.call_method(name, args);
                }
                let args = self.evaluate_args(arguments)?;
                self.call_global(name, &args)
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if matches!(**object, Expr::This) {
                    let args = self.evaluate_args(arguments)?;
                    if self.context.has_method(property) {
                        return self.call_method(property, args);
                    }
                    return Err(ScriptError::unknown_method(property.as_str()));
                }

                if is_change_handle(object) {
                    return self.call_change_handle(property);
                }

                if let Expr::Ident(namespace) = &**object {
                    if self.is_namespace(namespace) {
                        let args = self.evaluate_args(arguments)?;
                        return self.call_namespace(namespace, property, &args);
                    }
                }

                let args = self.evaluate_args(arguments)?;
                let target = self.evaluate(object)?;

                if matches!(target, Value::Array(_)) && object.is_place() && is_mutating_method(property) {
                    let (root, path) = self.resolve_place(object)?;
                    if let Value::Array(items) = self.place_mut(root, &path)? {
                        return Ok(mutate_array(items, property, args));
                    }
                }

                if target.is_nullish() {
                    if *optional {
                        return Ok(Value::Undefined);
                    }
                    return Err(ScriptError::type_error(format!(
                        "cannot call '{}' on {}",
                        property,
                        target.to_js_string()
                    )));
                }
                call_value_method(&target, property, &args)
            }
            _ => Err(ScriptError::type_error("expression is not callable")),
        }
    }

    fn call_change_handle(&mut self, operation: &str) -> ScriptResult<Value> {
        match operation {
            "markForCheck" => self.context.change.mark_changed(),
            "detectChanges" => self.context.change.detect_changes(),
            "detach" | "reattach" | "checkNoChanges" => {}
            other => return Err(ScriptError::unknown_method(format!("cdr.{}", other))),
        }
        Ok(Value::Undefined)
    }

    fn call_global(&mut self, name: &str, args: &[Value]) -> ScriptResult<Value> {
        let first = args.first().cloned().unwrap_or_default();
        match name {
            "alert" => {
                self.host.alert(&first.to_js_string());
                Ok(Value::Undefined)
            }
            "navigate" => {
                self.host.navigate(&first.to_js_string());
                Ok(Value::Undefined)
            }
            "parseInt" => Ok(Value::Number(parse_int(
                &first.to_js_string(),
                args.get(1).map(Value::to_number),
            ))),
            "parseFloat" => Ok(Value::Number(parse_float(&first.to_js_string()))),
            "String" => Ok(Value::String(first.to_js_string())),
            "Number" => Ok(Value::Number(first.to_number())),
            "Boolean" => Ok(Value::Boolean(first.is_truthy())),
            "isNaN" => Ok(Value::Boolean(first.to_number().is_nan())),
            _ => Err(ScriptError::unknown_method(name)),
        }
    }

    fn call_namespace(&mut self, namespace: &str, name: &str, args: &[Value]) -> ScriptResult<Value> {
        let first = args.first().cloned().unwrap_or_default();
        let unknown = || ScriptError::unknown_method(format!("{}.{}", namespace, name));

        match namespace {
            "console" => {
                let level = ConsoleLevel::from_method(name).ok_or_else(unknown)?;
                let message = args
                    .iter()
                    .map(|arg| match arg {
                        Value::String(s) => s.clone(),
                        other => other.to_js_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                self.host.console(level, &message);
                Ok(Value::Undefined)
            }
            "window" => match name {
                "open" => {
                    self.host.open(&first.to_js_string());
                    Ok(Value::Undefined)
                }
                "alert" => {
                    self.host.alert(&first.to_js_string());
                    Ok(Value::Undefined)
                }
                _ => Err(unknown()),
            },
            "Math" => {
                let numbers: Vec<f64> = args.iter().map(Value::to_number).collect();
                let x = numbers.first().copied().unwrap_or(f64::NAN);
                let result = match name {
                    "floor" => x.floor(),
                    "ceil" => x.ceil(),
                    "round" => (x + 0.5).floor(),
                    "abs" => x.abs(),
                    "trunc" => x.trunc(),
                    "sign" => {
                        if x == 0.0 || x.is_nan() {
                            x
                        } else {
                            x.signum()
                        }
                    }
                    "sqrt" => x.sqrt(),
                    "pow" => x.powf(numbers.get(1).copied().unwrap_or(f64::NAN)),
                    "min" => numbers.iter().copied().fold(f64::INFINITY, js_min),
                    "max" => numbers.iter().copied().fold(f64::NEG_INFINITY, js_max),
                    _ => return Err(unknown()),
                };
                Ok(Value::Number(result))
            }
            "JSON" => match name {
                "stringify" => Ok(match first {
                    Value::Undefined => Value::Undefined,
                    other => Value::String(other.to_json_string()),
                }),
                "parse" => serde_json::from_str::<serde_json::Value>(&first.to_js_string())
                    .map(Value::from)
                    .map_err(|err| ScriptError::Thrown {
                        value: format!("SyntaxError: {}", err),
                    }),
                _ => Err(unknown()),
            },
            "Object" => match (name, first) {
                ("keys", Value::Object(map)) => Ok(Value::Array(
                    map.keys().map(|k| Value::String(k.clone())).collect(),
                )),
                ("values", Value::Object(map)) => Ok(Value::Array(map.into_values().collect())),
                ("entries", Value::Object(map)) => Ok(Value::Array(
                    map.into_iter()
                        .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
                        .collect(),
                )),
                ("keys", Value::Array(items)) => Ok(Value::Array(
                    (0..items.len())
                        .map(|i| Value::String(i.to_string()))
                        .collect(),
                )),
                ("keys" | "values" | "entries", Value::String(_) | Value::Number(_) | Value::Boolean(_)) => {
                    Ok(Value::Array(Vec::new()))
                }
                ("keys" | "values" | "entries", other) => Err(ScriptError::type_error(format!(
                    "cannot convert {} to object",
                    other.to_js_string()
                ))),
                _ => Err(unknown()),
            },
            "Array" => match name {
                "isArray" => Ok(Value::Boolean(matches!(first, Value::Array(_)))),
                _ => Err(unknown()),
            },
            "Number" => match name {
                "isInteger" => Ok(Value::Boolean(matches!(
                    first,
                    Value::Number(n) if n.is_finite() && n.fract() == 0.0
                ))),
                "parseFloat" => Ok(Value::Number(parse_float(&first.to_js_string()))),
                "parseInt" => Ok(Value::Number(parse_int(&first.to_js_string(), None))),
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) -> ScriptResult<()> {
        let (root, path) = self.resolve_place(target)?;
        let slot = self.place_mut(root, &path)?;
        *slot = value;
        Ok(())
    }

    /// Root binding plus property path of an assignable expression
    fn resolve_place(&mut self, expr: &Expr) -> ScriptResult<(PlaceRoot, Vec<String>)> {
        match expr {
            Expr::Ident(name) => {
                let local = self
                    .scopes
                    .iter()
                    .rposition(|scope| scope.contains_key(name));
                let root = match local {
                    Some(index) => PlaceRoot::Local(index, name.clone()),
                    None => PlaceRoot::Property(name.clone()),
                };
                Ok((root, Vec::new()))
            }
            Expr::Member {
                object, property, ..
            } => {
                if matches!(**object, Expr::This) {
                    return Ok((PlaceRoot::Property(property.clone()), Vec::new()));
                }
                let (root, mut path) = self.resolve_place(object)?;
                path.push(property.clone());
                Ok((root, path))
            }
            Expr::Index { object, index, .. } => {
                let key = property_key(&self.evaluate(index)?);
                let (root, mut path) = self.resolve_place(object)?;
                path.push(key);
                Ok((root, path))
            }
            _ => Err(ScriptError::type_error("invalid assignment target")),
        }
    }

    fn place_mut(&mut self, root: PlaceRoot, path: &[String]) -> ScriptResult<&mut Value> {
        let mut slot: &mut Value = match root {
            PlaceRoot::Local(index, name) => self.scopes[index]
                .entry(name)
                .or_insert(Value::Undefined),
            PlaceRoot::Property(name) => self.context.slot(&name),
        };

        for (i, key) in path.iter().enumerate() {
            let last = i + 1 == path.len();
            slot = match slot {
                Value::Object(map) => {
                    if last {
                        map.entry(key.clone()).or_insert(Value::Undefined)
                    } else {
                        map.get_mut(key).ok_or_else(|| {
                            ScriptError::type_error(format!("cannot set properties of undefined ('{}')", key))
                        })?
                    }
                }
                Value::Array(items) => {
                    let index = key.parse::<usize>().map_err(|_| {
                        ScriptError::type_error(format!("invalid array index '{}'", key))
                    })?;
                    if index >= items.len() {
                        if !last {
                            return Err(ScriptError::type_error(format!(
                                "cannot set properties of undefined ('{}')",
                                key
                            )));
                        }
                        items.resize(index + 1, Value::Undefined);
                    }
                    &mut items[index]
                }
                other => {
                    return Err(ScriptError::type_error(format!(
                        "cannot set property '{}' on {}",
                        key,
                        other.to_js_string()
                    )))
                }
            };
        }

        Ok(slot)
    }
}

fn is_change_handle(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Member { object, property, .. }
            if property == "cdr" && matches!(**object, Expr::This)
    )
}

fn namespace_constant(namespace: &str, property: &str) -> Value {
    match (namespace, property) {
        ("Math", "PI") => Value::Number(std::f64::consts::PI),
        ("Math", "E") => Value::Number(std::f64::consts::E),
        ("Number", "MAX_SAFE_INTEGER") => Value::Number(9_007_199_254_740_991.0),
        _ => Value::Undefined,
    }
}

fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_js_string(),
    }
}

fn get_property(target: &Value, property: &str) -> Value {
    match (target, property) {
        (Value::Array(items), "length") => Value::Number(items.len() as f64),
        (Value::String(s), "length") => Value::Number(s.chars().count() as f64),
        (Value::String(s), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        (other, key) => other.get(key).cloned().unwrap_or_default(),
    }
}

fn is_mutating_method(name: &str) -> bool {
    matches!(name, "push" | "pop" | "shift" | "unshift" | "splice" | "reverse" | "sort")
}

fn mutate_array(items: &mut Vec<Value>, method: &str, args: Vec<Value>) -> Value {
    match method {
        "push" => {
            items.extend(args);
            Value::Number(items.len() as f64)
        }
        "pop" => items.pop().unwrap_or_default(),
        "shift" => {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }
        "unshift" => {
            for (i, arg) in args.into_iter().enumerate() {
                items.insert(i, arg);
            }
            Value::Number(items.len() as f64)
        }
        "splice" => {
            let len = items.len() as f64;
            let start = args.first().map(Value::to_number).unwrap_or(0.0);
            let start = relative_index(start, len);
            let count = args
                .get(1)
                .map(|v| v.to_number().max(0.0) as usize)
                .unwrap_or(items.len() - start)
                .min(items.len() - start);
            let inserted: Vec<Value> = args.into_iter().skip(2).collect();
            let removed: Vec<Value> = items.splice(start..start + count, inserted).collect();
            Value::Array(removed)
        }
        "reverse" => {
            items.reverse();
            Value::Array(items.clone())
        }
        "sort" => {
            items.sort_by_key(|v| v.to_js_string());
            Value::Array(items.clone())
        }
        _ => Value::Undefined,
    }
}

fn relative_index(index: f64, len: f64) -> usize {
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let resolved = if index < 0.0 { (len + index).max(0.0) } else { index.min(len) };
    resolved as usize
}

fn call_value_method(target: &Value, method: &str, args: &[Value]) -> ScriptResult<Value> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

    match target {
        Value::Array(items) => match method {
            "includes" => Ok(Value::Boolean(items.iter().any(|v| strict_equals(v, &arg(0))))),
            "indexOf" => Ok(Value::Number(
                items
                    .iter()
                    .position(|v| strict_equals(v, &arg(0)))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            )),
            "join" => {
                let separator = match arg(0) {
                    Value::Undefined => ",".to_string(),
                    other => other.to_js_string(),
                };
                Ok(Value::String(
                    items
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(&separator),
                ))
            }
            "slice" => {
                let len = items.len() as f64;
                let start = relative_index(arg(0).to_number(), len);
                let end = match arg(1) {
                    Value::Undefined => items.len(),
                    other => relative_index(other.to_number(), len),
                };
                Ok(Value::Array(if start < end {
                    items[start..end].to_vec()
                } else {
                    Vec::new()
                }))
            }
            "concat" => {
                let mut out = items.clone();
                for value in args {
                    match value {
                        Value::Array(more) => out.extend(more.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Ok(Value::Array(out))
            }
            "toString" => Ok(Value::String(
                items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","),
            )),
            "map" | "filter" | "forEach" | "find" | "some" | "every" | "reduce" => Err(
                ScriptError::type_error(format!("'{}' needs a callback, which scripts cannot pass", method)),
            ),
            _ => Err(ScriptError::unknown_method(format!("Array.{}", method))),
        },
        Value::String(s) => {
            let text = |i: usize| arg(i).to_js_string();
            match method {
                "toUpperCase" => Ok(Value::String(s.to_uppercase())),
                "toLowerCase" => Ok(Value::String(s.to_lowercase())),
                "trim" => Ok(Value::String(s.trim().to_string())),
                "includes" => Ok(Value::Boolean(s.contains(&text(0)))),
                "startsWith" => Ok(Value::Boolean(s.starts_with(&text(0)))),
                "endsWith" => Ok(Value::Boolean(s.ends_with(&text(0)))),
                "indexOf" => Ok(Value::Number(
                    s.find(&text(0))
                        .map(|byte| s[..byte].chars().count() as f64)
                        .unwrap_or(-1.0),
                )),
                "split" => {
                    let parts: Vec<Value> = match arg(0) {
                        Value::Undefined => vec![Value::String(s.clone())],
                        separator => {
                            let separator = separator.to_js_string();
                            if separator.is_empty() {
                                s.chars().map(|c| Value::String(c.to_string())).collect()
                            } else {
                                s.split(separator.as_str())
                                    .map(|part| Value::String(part.to_string()))
                                    .collect()
                            }
                        }
                    };
                    Ok(Value::Array(parts))
                }
                "replace" => Ok(Value::String(s.replacen(&text(0), &text(1), 1))),
                "slice" | "substring" => {
                    let chars: Vec<char> = s.chars().collect();
                    let len = chars.len() as f64;
                    let start = relative_index(arg(0).to_number(), len);
                    let end = match arg(1) {
                        Value::Undefined => chars.len(),
                        other => relative_index(other.to_number(), len),
                    };
                    Ok(Value::String(if start < end {
                        chars[start..end].iter().collect()
                    } else {
                        String::new()
                    }))
                }
                "charAt" => {
                    let index = arg(0).to_number();
                    let index = if index.is_nan() { 0.0 } else { index };
                    Ok(get_property(target, &format_number(index)))
                }
                "toString" => Ok(target.clone()),
                _ => Err(ScriptError::unknown_method(format!("String.{}", method))),
            }
        }
        Value::Number(n) => match method {
            "toFixed" => {
                let digits = arg(0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 20.0) as usize };
                Ok(Value::String(format!("{:.*}", digits, n)))
            }
            "toString" => Ok(Value::String(format_number(*n))),
            _ => Err(ScriptError::unknown_method(format!("Number.{}", method))),
        },
        other => match method {
            "toString" => Ok(Value::String(other.to_js_string())),
            _ => Err(ScriptError::type_error(format!(
                "{}.{} is not a function",
                other.type_name(),
                method
            ))),
        },
    }
}

pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        _ => left == right,
    }
}

pub fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (a, b) if a.is_nullish() && b.is_nullish() => true,
        (a, b) if a.is_nullish() || b.is_nullish() => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Boolean(_), _)
        | (_, Value::Boolean(_)) => left.to_number() == right.to_number(),
        _ => strict_equals(left, right),
    }
}

fn binary_op(operator: BinaryOp, left: &Value, right: &Value) -> Value {
    let numbers = || (left.to_number(), right.to_number());
    match operator {
        BinaryOp::Add => {
            let stringy = |v: &Value| {
                matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_))
            };
            if stringy(left) || stringy(right) {
                Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
            } else {
                let (a, b) = numbers();
                Value::Number(a + b)
            }
        }
        BinaryOp::Subtract => {
            let (a, b) = numbers();
            Value::Number(a - b)
        }
        BinaryOp::Multiply => {
            let (a, b) = numbers();
            Value::Number(a * b)
        }
        BinaryOp::Divide => {
            let (a, b) = numbers();
            Value::Number(a / b)
        }
        BinaryOp::Remainder => {
            let (a, b) = numbers();
            Value::Number(a % b)
        }
        BinaryOp::LooseEquals => Value::Boolean(loose_equals(left, right)),
        BinaryOp::LooseNotEquals => Value::Boolean(!loose_equals(left, right)),
        BinaryOp::Equals => Value::Boolean(strict_equals(left, right)),
        BinaryOp::NotEquals => Value::Boolean(!strict_equals(left, right)),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => Value::Boolean(compare(operator, left, right)),
        // Short-circuit operators never reach here
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => Value::Undefined,
    }
}

fn compare(operator: BinaryOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match operator {
        BinaryOp::LessThan => ordering.is_lt(),
        BinaryOp::LessThanOrEqual => ordering.is_le(),
        BinaryOp::GreaterThan => ordering.is_gt(),
        BinaryOp::GreaterThanOrEqual => ordering.is_ge(),
        _ => false,
    }
}

fn js_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn js_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn parse_float(text: &str) -> f64 {
    FLOAT_PREFIX_RE
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_int(text: &str, radix: Option<f64>) -> f64 {
    let mut text = text.trim();
    let mut sign = 1.0;
    if let Some(rest) = text.strip_prefix('-') {
        sign = -1.0;
        text = rest;
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest;
    }

    let mut radix = radix.filter(|r| *r != 0.0).map(|r| r as u32).unwrap_or(10);
    if radix == 16 || radix == 10 {
        if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            text = rest;
            radix = 16;
        }
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let digits: String = text.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    i64::from_str_radix(&digits, radix)
        .map(|n| sign * n as f64)
        .unwrap_or(f64::NAN)
}
