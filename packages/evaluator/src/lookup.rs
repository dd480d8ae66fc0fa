use crate::value::Value;

/// Resolve a dotted path against a value
///
/// A key equal to the whole path wins over walking its segments, so data
/// with dots inside its keys stays reachable. Walking stops with `None` at
/// any missing or nullish step.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if let Some(direct) = value.get(path) {
        return Some(direct);
    }
    if !path.contains('.') {
        return None;
    }

    let mut current = value;
    for segment in path.split('.') {
        if current.is_nullish() {
            return None;
        }
        current = current.get(segment)?;
    }
    Some(current)
}

/// Like `lookup_path`, but owned, with `Undefined` for anything missing
///
/// Also answers `.length` on arrays and strings.
pub fn lookup_value(value: &Value, path: &str) -> Value {
    match path.trim() {
        "this" | "." => value.get("this").unwrap_or(value).clone(),
        trimmed if trimmed.ends_with(".length") || trimmed == "length" => {
            length_lookup(value, trimmed).unwrap_or_default()
        }
        trimmed => lookup_path(value, trimmed).cloned().unwrap_or_default(),
    }
}

fn length_lookup(value: &Value, path: &str) -> Option<Value> {
    if let Some(found) = lookup_path(value, path) {
        return Some(found.clone());
    }
    let target = match path.strip_suffix(".length") {
        Some(prefix) => lookup_path(value, prefix)?,
        None => value,
    };
    match target {
        Value::Array(items) => Some(Value::Number(items.len() as f64)),
        Value::String(s) => Some(Value::Number(s.chars().count() as f64)),
        _ => None,
    }
}
