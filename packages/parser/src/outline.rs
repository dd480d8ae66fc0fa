//! Pseudo-class outline extraction
//!
//! Component scripts are authored as the body of an Angular-style class:
//! property initializers (`count = 0;`), methods (`increment() { ... }`) and
//! the `ngOnInit` / `ngOnDestroy` lifecycle hooks. This module splits such a
//! body into its members by pattern matching plus brace balancing. It is a
//! best-effort text scan, not a language parser: anything it cannot make
//! sense of is reported as a diagnostic and skipped, and the members that did
//! parse cleanly are still returned.

use crate::error::ParseError;
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref CLASS_HEADER_RE: Regex =
        Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?class\s+[A-Za-z_$][\w$]*[^{]*\{").unwrap();
    // Members start a line or follow the `;` / `}` that ends the previous one
    static ref METHOD_RE: Regex = Regex::new(
        r"(?m)(?:^|[;}])[ \t]*(?P<sig>(?:(?:public|private|protected|static|async|override)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*\((?P<params>[^()]*)\)\s*(?::\s*[^{;=()]+?)?\s*\{)"
    )
    .unwrap();
    static ref PROPERTY_RE: Regex = Regex::new(
        r"(?m)(?:^|[;}])[ \t]*(?P<sig>(?:(?:public|private|protected|readonly|static|declare)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*(?:[?!]?\s*:\s*[^=;\n]+?)?\s*=)"
    )
    .unwrap();
}

/// Words that look like method signatures but are control flow
const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "else", "do", "with",
];

/// A property initializer found at class level
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySource {
    pub name: String,
    /// Initializer text, trimmed, without the trailing `;`
    pub raw: String,
    pub span: Range<usize>,
}

/// A method (or lifecycle hook) found at class level
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSource {
    pub name: String,
    pub params: Vec<String>,
    /// Text between the braces
    pub body: String,
    /// Byte offset of `body` within the original script
    pub body_offset: usize,
    pub span: Range<usize>,
}

/// Members extracted from a script body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutline {
    pub properties: Vec<PropertySource>,
    pub methods: Vec<MethodSource>,
    pub diagnostics: Vec<ParseError>,
}

impl ScriptOutline {
    pub fn method(&self, name: &str) -> Option<&MethodSource> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Split a pseudo-class script into properties and methods
pub fn extract_outline(code: &str) -> ScriptOutline {
    let mut outline = ScriptOutline::default();
    let (body, base) = unwrap_class(code, &mut outline.diagnostics);

    let mut cursor = 0;
    let mut method_spans: Vec<Range<usize>> = Vec::new();

    while let Some(caps) = METHOD_RE.captures_at(body, cursor) {
        let Some(signature) = caps.name("sig") else {
            break;
        };
        let start = signature.start();
        let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
        let open = signature.end() - 1;

        if NOT_METHODS.contains(&name) || depth_at(body, start) > 0 {
            cursor = signature.end();
            continue;
        }

        match find_matching_brace(body, open) {
            Some(close) => {
                let params = caps
                    .name("params")
                    .map(|m| split_params(m.as_str()))
                    .unwrap_or_default();
                outline.methods.push(MethodSource {
                    name: name.to_string(),
                    params,
                    body: body[open + 1..close].to_string(),
                    body_offset: base + open + 1,
                    span: base + start..base + close + 1,
                });
                method_spans.push(start..close + 1);
                // The closing brace may delimit the next member
                cursor = close;
            }
            None => {
                outline.diagnostics.push(ParseError::UnbalancedBraces {
                    pos: base + open,
                    name: name.to_string(),
                });
                // The rest of the text belongs to the broken member
                method_spans.push(start..body.len());
                break;
            }
        }
    }

    let masked = mask_ranges(body, &method_spans);
    outline.properties = extract_properties(&masked, body, base);
    outline
}

/// Strip an `export class Name { ... }` wrapper if present
fn unwrap_class<'a>(code: &'a str, diagnostics: &mut Vec<ParseError>) -> (&'a str, usize) {
    let Some(header) = CLASS_HEADER_RE.find(code) else {
        return (code, 0);
    };
    let open = header.end() - 1;
    match find_matching_brace(code, open) {
        Some(close) => (&code[open + 1..close], open + 1),
        None => {
            diagnostics.push(ParseError::UnbalancedBraces {
                pos: open,
                name: "class".to_string(),
            });
            (&code[open + 1..], open + 1)
        }
    }
}

fn extract_properties(masked: &str, original: &str, base: usize) -> Vec<PropertySource> {
    let mut properties = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = PROPERTY_RE.captures_at(masked, cursor) {
        let Some(signature) = caps.name("sig") else {
            break;
        };
        let name = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
        let end = signature.end();
        cursor = end;

        // `==` / `=>` are not initializers
        if matches!(masked.as_bytes().get(end), Some(b'=') | Some(b'>')) {
            continue;
        }

        let value_end = find_statement_end(original, end);
        let raw = original[end..value_end].trim();
        properties.push(PropertySource {
            name: name.to_string(),
            raw: raw.to_string(),
            span: base + signature.start()..base + (value_end + 1).min(original.len()),
        });
        // The terminating `;` may delimit the next member
        cursor = value_end.min(masked.len());
    }

    properties
}

/// Index of the `;` ending an initializer, skipping strings and nested brackets
fn find_statement_end(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
            b'[' | b'{' | b'(' => depth += 1,
            b']' | b'}' | b')' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => return i,
            b'\n' if depth == 0 && !text[from..i].trim().is_empty() && !continues(text, i) => {
                return i
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Whether the line after `newline` continues the current expression
fn continues(text: &str, newline: usize) -> bool {
    let rest = text[newline + 1..].trim_start();
    let prev = text[..newline].trim_end();
    rest.starts_with(['.', '+', '-', '*', '/', '?', ':', '|', '&'])
        || prev.ends_with(['=', '+', '-', '*', '/', '?', ':', '|', '&', ','])
}

/// Find the `}` matching the `{` at `open`.
///
/// String literals (single, double, backtick) and `//` / `/* */` comments are
/// skipped, so braces inside them do not count.
pub fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Brace nesting depth at `pos`, ignoring strings and comments
fn depth_at(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < pos.min(bytes.len()) {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    depth
}

/// Index of the closing quote of the string starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b if b == quote => return i,
            b'\n' if quote != b'`' => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len().saturating_sub(1)
}

/// Parameter names with type annotations and defaults removed
fn split_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(|p| {
            p.split(['=', ':'])
                .next()
                .unwrap_or_default()
                .trim()
                .trim_end_matches('?')
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

fn mask_ranges(text: &str, ranges: &[Range<usize>]) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for range in ranges {
        for b in &mut bytes[range.clone()] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    // Range bounds sit on ASCII delimiters, so the result stays valid UTF-8
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_and_methods() {
        let code = r#"
title = 'Hello';
count = 0;
items = ['a', 'b'];

increment(step) {
  this.count = this.count + step;
  if (this.count > 10) { this.count = 0; }
}

ngOnInit() {
  this.title = 'Ready';
}
"#;
        let outline = extract_outline(code);

        let names: Vec<_> = outline.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["title", "count", "items"]);
        assert_eq!(outline.properties[0].raw, "'Hello'");
        assert_eq!(outline.properties[2].raw, "['a', 'b']");

        let increment = outline.method("increment").unwrap();
        assert_eq!(increment.params, vec!["step"]);
        assert!(increment.body.contains("this.count = 0;"));
        assert_eq!(&code[increment.body_offset..increment.body_offset + increment.body.len()], increment.body);

        assert!(outline.method("ngOnInit").is_some());
        assert!(outline.diagnostics.is_empty());
    }

    #[test]
    fn test_assignments_inside_methods_are_not_properties() {
        let code = "reset() {\n  total = 0;\n}\nlabel = \"x\";\n";
        let outline = extract_outline(code);
        assert_eq!(outline.properties.len(), 1);
        assert_eq!(outline.properties[0].name, "label");
    }

    #[test]
    fn test_class_wrapper_and_type_annotations() {
        let code = r#"export class CardComponent {
  private open: boolean = false;
  tags: string[] = ["a"];
  toggle(force?: boolean): void {
    this.open = !this.open;
  }
}"#;
        let outline = extract_outline(code);
        assert_eq!(outline.properties.len(), 2);
        assert_eq!(outline.properties[0].name, "open");
        assert_eq!(outline.properties[0].raw, "false");
        assert_eq!(outline.methods[0].name, "toggle");
        assert_eq!(outline.methods[0].params, vec!["force"]);
    }

    #[test]
    fn test_braces_inside_strings_do_not_count() {
        let code = "greet() {\n  alert('}{');\n}\nafter = 1;\n";
        let outline = extract_outline(code);
        assert_eq!(outline.methods.len(), 1);
        assert!(outline.methods[0].body.contains("'}{'"));
        assert_eq!(outline.properties.len(), 1);
    }

    #[test]
    fn test_unbalanced_method_degrades() {
        let code = "ok = true;\nbroken() {\n  if (x) {\n";
        let outline = extract_outline(code);
        assert_eq!(outline.properties.len(), 1);
        assert!(outline.methods.is_empty());
        assert!(matches!(
            outline.diagnostics[0],
            ParseError::UnbalancedBraces { ref name, .. } if name == "broken"
        ));
    }

    #[test]
    fn test_control_flow_is_not_a_method() {
        let code = "if (x) {\n}\nvalue = 2;\n";
        let outline = extract_outline(code);
        assert!(outline.methods.is_empty());
    }

    #[test]
    fn test_multiline_initializer() {
        let code = "config = {\n  a: 1;\n  b: 'x;y'\n};\nnext = 3;\n";
        let outline = extract_outline(code);
        assert_eq!(outline.properties.len(), 2);
        assert!(outline.properties[0].raw.starts_with('{'));
        assert!(outline.properties[0].raw.ends_with('}'));
        assert_eq!(outline.properties[1].raw, "3");
    }

    #[test]
    fn test_single_line_members() {
        let code = "count = 0; inc() { this.count = this.count + 1; } reset() { this.count = 0; } label = 'x';";
        let outline = extract_outline(code);

        let methods: Vec<_> = outline.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["inc", "reset"]);
        assert_eq!(outline.methods[0].body.trim(), "this.count = this.count + 1;");
        assert_eq!(&code[outline.methods[0].span.clone()], "inc() { this.count = this.count + 1; }");

        let names: Vec<_> = outline.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["count", "label"]);
        assert_eq!(outline.properties[0].raw, "0");
        assert_eq!(&code[outline.properties[0].span.clone()], "count = 0;");
    }

    #[test]
    fn test_nested_object_methods_are_not_members() {
        let code = "helpers = { a: 1; run() { } };\nnext = 2;\n";
        let outline = extract_outline(code);
        assert!(outline.methods.is_empty());
        let names: Vec<_> = outline.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["helpers", "next"]);
    }

    #[test]
    fn test_find_matching_brace_nested() {
        let text = "{ a { b } `${c}` }";
        assert_eq!(find_matching_brace(text, 0), Some(text.len() - 1));
        assert_eq!(find_matching_brace(text, 4), Some(8));
        assert_eq!(find_matching_brace("{ unclosed", 0), None);
    }
}
