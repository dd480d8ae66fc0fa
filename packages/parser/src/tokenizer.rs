use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Token types for component script bodies
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'src> {
    // Keywords
    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("var")]
    Var,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("for")]
    For,

    #[token("of")]
    Of,

    #[token("while")]
    While,

    #[token("return")]
    Return,

    #[token("break")]
    Break,

    #[token("continue")]
    Continue,

    #[token("throw")]
    Throw,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("undefined")]
    Undefined,

    #[token("this")]
    This,

    #[token("typeof")]
    Typeof,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // String literals keep their quotes; the parser unescapes them
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"'([^'\\\n]|\\.)*'", |lex| lex.slice())]
    SingleQuoteString(&'src str),

    #[regex(r"`([^`\\]|\\.)*`", |lex| lex.slice())]
    Template(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Symbols
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("?.")]
    QuestionDot,

    #[token("?")]
    Question,

    #[token("??")]
    QuestionQuestion,

    #[token(":")]
    Colon,

    #[token("=>")]
    Arrow,

    // Operators
    #[token("=")]
    Assign,

    #[token("+=")]
    PlusAssign,

    #[token("-=")]
    MinusAssign,

    #[token("*=")]
    StarAssign,

    #[token("/=")]
    SlashAssign,

    #[token("%=")]
    PercentAssign,

    #[token("==")]
    EqEq,

    #[token("===")]
    EqEqEq,

    #[token("!=")]
    NotEq,

    #[token("!==")]
    NotEqEq,

    #[token("<")]
    Lt,

    #[token("<=")]
    LtEq,

    #[token(">")]
    Gt,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("!")]
    Bang,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Let => write!(f, "let"),
            Token::Const => write!(f, "const"),
            Token::Var => write!(f, "var"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::For => write!(f, "for"),
            Token::Of => write!(f, "of"),
            Token::While => write!(f, "while"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Throw => write!(f, "throw"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Undefined => write!(f, "undefined"),
            Token::This => write!(f, "this"),
            Token::Typeof => write!(f, "typeof"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) | Token::SingleQuoteString(s) => write!(f, "string {}", s),
            Token::Template(s) => write!(f, "template {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::QuestionDot => write!(f, "'?.'"),
            Token::Question => write!(f, "'?'"),
            Token::QuestionQuestion => write!(f, "'??'"),
            Token::Colon => write!(f, "':'"),
            Token::Arrow => write!(f, "'=>'"),
            Token::Assign => write!(f, "'='"),
            Token::PlusAssign => write!(f, "'+='"),
            Token::MinusAssign => write!(f, "'-='"),
            Token::StarAssign => write!(f, "'*='"),
            Token::SlashAssign => write!(f, "'/='"),
            Token::PercentAssign => write!(f, "'%='"),
            Token::EqEq => write!(f, "'=='"),
            Token::EqEqEq => write!(f, "'==='"),
            Token::NotEq => write!(f, "'!='"),
            Token::NotEqEq => write!(f, "'!=='"),
            Token::Lt => write!(f, "'<'"),
            Token::LtEq => write!(f, "'<='"),
            Token::Gt => write!(f, "'>'"),
            Token::GtEq => write!(f, "'>='"),
            Token::AndAnd => write!(f, "'&&'"),
            Token::OrOr => write!(f, "'||'"),
            Token::Bang => write!(f, "'!'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::PlusPlus => write!(f, "'++'"),
            Token::MinusMinus => write!(f, "'--'"),
        }
    }
}

/// Tokenize a source string, dropping anything the lexer does not recognize
pub fn tokenize(source: &str) -> Vec<(Token, Range<usize>)> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

/// Tokenize a source string, failing on the first unrecognized input
pub fn tokenize_strict(source: &str) -> ParseResult<Vec<(Token, Range<usize>)>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(ParseError::LexerError {
                    text: source[span.clone()].to_string(),
                    span,
                })
            }
        }
    }
    Ok(tokens)
}
