pub mod ast;
pub mod error;
pub mod html;
pub mod outline;
pub mod parser;
pub mod tokenizer;

pub use ast::{AssignOp, BinaryOp, Expr, HtmlNode, Stmt, TemplatePart, UnaryOp};
pub use error::{format_errors, ParseError, ParseResult};
pub use html::{is_void_element, parse_html};
pub use outline::{extract_outline, find_matching_brace, MethodSource, PropertySource, ScriptOutline};
pub use parser::{parse_expression, parse_script, Parser};
pub use tokenizer::{tokenize, tokenize_strict, Token};
