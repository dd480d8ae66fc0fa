use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize_strict, Token};
use std::ops::Range;

/// Parse a script snippet (method body, hook body) into statements
pub fn parse_script(source: &str) -> ParseResult<Vec<Stmt>> {
    let mut parser = Parser::new(source)?;
    parser.parse_statements()
}

/// Parse a single expression (binding value, event handler, interpolation)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    parser.match_token(Token::Semicolon);
    if !parser.is_at_end() {
        return Err(ParseError::unexpected_token(
            parser.peek_span(),
            "end of expression",
            Parser::format_token(parser.peek()),
        ));
    }
    Ok(expr)
}

/// Recursive-descent parser for component script bodies
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize_strict(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse statements until the end of input
    pub fn parse_statements(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().map(|(t, _)| t.clone()) {
            Some(Token::LBrace) => self.parse_block(),
            Some(Token::Let) | Some(Token::Const) | Some(Token::Var) => {
                let stmt = self.parse_declaration()?;
                self.match_token(Token::Semicolon);
                Ok(stmt)
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::For) => self.parse_for(),
            Some(Token::While) => {
                self.advance();
                self.expect(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = self.parse_statement()?;
                Ok(Stmt::While {
                    test,
                    body: Box::new(body),
                })
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.is_at_end()
                    || self.check(Token::Semicolon)
                    || self.check(Token::RBrace)
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.match_token(Token::Semicolon);
                Ok(Stmt::Return(value))
            }
            Some(Token::Break) => {
                self.advance();
                self.match_token(Token::Semicolon);
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.advance();
                self.match_token(Token::Semicolon);
                Ok(Stmt::Continue)
            }
            Some(Token::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.match_token(Token::Semicolon);
                Ok(Stmt::Throw(value))
            }
            Some(Token::Semicolon) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.match_token(Token::Semicolon);
                Ok(Stmt::Expr(expr))
            }
            None => Err(ParseError::unexpected_eof(self.source_len, "statement")),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(Token::RBrace) {
            if self.is_at_end() {
                return Err(ParseError::unexpected_eof(self.source_len, "'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(Stmt::Block(statements))
    }

    /// `let name (: Type)? (= init)?`
    fn parse_declaration(&mut self) -> ParseResult<Stmt> {
        self.advance(); // let / const / var
        let name = self.expect_ident()?;

        if self.match_token(Token::Colon) {
            self.skip_type_annotation();
        }

        let init = if self.match_token(Token::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        if self.check(Token::Comma) {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "declare one variable per statement",
            ));
        }

        Ok(Stmt::Let { name, init })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let consequent = self.parse_statement()?;
        let alternate = if self.match_token(Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent: Box::new(consequent),
            alternate,
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;

        let is_declaration = matches!(
            self.peek(),
            Some((Token::Let, _)) | Some((Token::Const, _)) | Some((Token::Var, _))
        );
        let is_for_of = is_declaration
            && matches!(self.peek_ahead(1), Some((Token::Ident(_), _)))
            && matches!(self.peek_ahead(2), Some((Token::Of, _)));

        if is_for_of {
            self.advance();
            let binding = self.expect_ident()?;
            self.expect(Token::Of)?;
            let iterable = self.parse_expression()?;
            self.expect(Token::RParen)?;
            let body = self.parse_statement()?;
            return Ok(Stmt::ForOf {
                binding,
                iterable,
                body: Box::new(body),
            });
        }

        let init = if self.check(Token::Semicolon) {
            None
        } else if is_declaration {
            Some(Box::new(self.parse_declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expression()?)))
        };
        self.expect(Token::Semicolon)?;

        let test = if self.check(Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::Semicolon)?;

        let update = if self.check(Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::RParen)?;

        let body = self.parse_statement()?;
        Ok(Stmt::For {
            init,
            test,
            update,
            body: Box::new(body),
        })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let start = self.peek_span();
        let left = self.parse_conditional()?;

        let operator = match self.peek().map(|(t, _)| t) {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::PlusAssign) => AssignOp::Add,
            Some(Token::MinusAssign) => AssignOp::Subtract,
            Some(Token::StarAssign) => AssignOp::Multiply,
            Some(Token::SlashAssign) => AssignOp::Divide,
            Some(Token::PercentAssign) => AssignOp::Remainder,
            Some(Token::Arrow) => {
                return Err(ParseError::invalid_syntax(
                    self.peek_span(),
                    "arrow functions are not supported",
                ))
            }
            _ => return Ok(left),
        };

        if !left.is_place() {
            return Err(ParseError::invalid_syntax(
                start,
                "invalid assignment target",
            ));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target: Box::new(left),
            operator,
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_nullish()?;
        if !self.match_token(Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_nullish(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_or()?;
        while self.match_token(Token::QuestionQuestion) {
            let right = self.parse_or()?;
            left = binary(left, BinaryOp::Nullish, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(Token::OrOr) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.match_token(Token::AndAnd) {
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let operator = match self.peek().map(|(t, _)| t) {
                Some(Token::EqEq) => BinaryOp::LooseEquals,
                Some(Token::NotEq) => BinaryOp::LooseNotEquals,
                Some(Token::EqEqEq) => BinaryOp::Equals,
                Some(Token::NotEqEq) => BinaryOp::NotEquals,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek().map(|(t, _)| t) {
                Some(Token::Lt) => BinaryOp::LessThan,
                Some(Token::LtEq) => BinaryOp::LessThanOrEqual,
                Some(Token::Gt) => BinaryOp::GreaterThan,
                Some(Token::GtEq) => BinaryOp::GreaterThanOrEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek().map(|(t, _)| t) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek().map(|(t, _)| t) {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Remainder,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, operator, right);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let operator = match self.peek().map(|(t, _)| t) {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Typeof) => UnaryOp::Typeof,
            Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                let increment = self.check(Token::PlusPlus);
                let start = self.peek_span();
                self.advance();
                let target = self.parse_unary()?;
                if !target.is_place() {
                    return Err(ParseError::invalid_syntax(start, "invalid update target"));
                }
                return Ok(Expr::Update {
                    target: Box::new(target),
                    increment,
                    prefix: true,
                });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call_member()?;
        let increment = match self.peek().map(|(t, _)| t) {
            Some(Token::PlusPlus) => true,
            Some(Token::MinusMinus) => false,
            _ => return Ok(expr),
        };
        if !expr.is_place() {
            return Err(ParseError::invalid_syntax(
                self.peek_span(),
                "invalid update target",
            ));
        }
        self.advance();
        Ok(Expr::Update {
            target: Box::new(expr),
            increment,
            prefix: false,
        })
    }

    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().map(|(t, _)| t.clone()) {
                Some(Token::Dot) => {
                    self.advance();
                    let property = self.expect_property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                    };
                }
                Some(Token::QuestionDot) => {
                    self.advance();
                    if self.match_token(Token::LBracket) {
                        let index = self.parse_expression()?;
                        self.expect(Token::RBracket)?;
                        expr = Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: true,
                        };
                    } else if self.check(Token::LParen) {
                        // `fn?.()` calls behave like plain calls here
                        let arguments = self.parse_arguments()?;
                        expr = Expr::Call {
                            callee: Box::new(expr),
                            arguments,
                        };
                    } else {
                        let property = self.expect_property_name()?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property,
                            optional: true,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: false,
                    };
                }
                Some(Token::LParen) => {
                    let arguments = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        arguments,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut arguments = Vec::new();
        while !self.check(Token::RParen) {
            arguments.push(self.parse_assignment()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some((token, span)) = self.advance().cloned() else {
            return Err(ParseError::unexpected_eof(self.source_len, "expression"));
        };

        match token {
            Token::Number(text) => text.parse::<f64>().map(Expr::Number).map_err(|_| {
                ParseError::invalid_syntax(span, format!("invalid number '{}'", text))
            }),
            Token::String(text) | Token::SingleQuoteString(text) => {
                Ok(Expr::Str(unescape(&text[1..text.len() - 1])))
            }
            Token::Template(text) => parse_template(&text[1..text.len() - 1], span.start + 1),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Null => Ok(Expr::Null),
            Token::Undefined => Ok(Expr::Undefined),
            Token::This => Ok(Expr::This),
            Token::Ident(name) => Ok(Expr::Ident(name.to_string())),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut elements = Vec::new();
                while !self.check(Token::RBracket) {
                    elements.push(self.parse_assignment()?);
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expr::Array(elements))
            }
            Token::LBrace => self.parse_object_literal(),
            other => Err(ParseError::unexpected_token(
                span,
                "expression",
                other.to_string(),
            )),
        }
    }

    /// Object literal body; the opening brace is already consumed
    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let mut properties = Vec::new();
        while !self.check(Token::RBrace) {
            let key_span = self.peek_span();
            let key = match self.advance().cloned() {
                Some((Token::String(s), _)) | Some((Token::SingleQuoteString(s), _)) => {
                    unescape(&s[1..s.len() - 1])
                }
                Some((Token::Number(n), _)) => n.to_string(),
                Some((token, _)) => token_name(&token).ok_or_else(|| {
                    ParseError::unexpected_token(key_span.clone(), "property name", token.to_string())
                })?,
                None => return Err(ParseError::unexpected_eof(self.source_len, "'}'")),
            };

            let value = if self.match_token(Token::Colon) {
                self.parse_assignment()?
            } else {
                // Shorthand `{ name }`
                Expr::Ident(key.clone())
            };
            properties.push((key, value));

            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Expr::Object(properties))
    }

    /// Skip a TypeScript type annotation up to `=`, `;`, `)` or `,` at depth 0
    fn skip_type_annotation(&mut self) {
        let mut depth = 0usize;
        while let Some((token, _)) = self.peek() {
            match token {
                Token::Lt | Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::Gt | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
                Token::RParen if depth > 0 => depth -= 1,
                Token::Assign | Token::Semicolon | Token::RParen | Token::Comma
                    if depth == 0 =>
                {
                    return
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::unexpected_eof(self.source_len, token.to_string()))
        } else {
            Err(ParseError::unexpected_token(
                self.peek_span(),
                token.to_string(),
                Self::format_token(self.peek()),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(self.source_len, "identifier")),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "identifier",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// Property names after `.` may be keywords (`item.for`, `list.of`)
    fn expect_property_name(&mut self) -> ParseResult<String> {
        let span = self.peek_span();
        match self.advance().cloned() {
            Some((token, _)) => token_name(&token).ok_or_else(|| {
                ParseError::unexpected_token(span, "property name", token.to_string())
            }),
            None => Err(ParseError::unexpected_eof(self.source_len, "property name")),
        }
    }

    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    fn format_token(token: Option<&(Token, Range<usize>)>) -> String {
        match token {
            Some((t, _)) => t.to_string(),
            None => "end of input".to_string(),
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Identifier-like spelling of a token, for property names
fn token_name(token: &Token) -> Option<String> {
    let name = match token {
        Token::Ident(s) => return Some(s.to_string()),
        Token::Let => "let",
        Token::Const => "const",
        Token::Var => "var",
        Token::If => "if",
        Token::Else => "else",
        Token::For => "for",
        Token::Of => "of",
        Token::While => "while",
        Token::Return => "return",
        Token::Break => "break",
        Token::Continue => "continue",
        Token::Throw => "throw",
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::Undefined => "undefined",
        Token::This => "this",
        Token::Typeof => "typeof",
        _ => return None,
    };
    Some(name.to_string())
}

/// Resolve backslash escapes inside a string literal body
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Split a backtick template body into literal and `${...}` parts
fn parse_template(body: &str, base: usize) -> ParseResult<Expr> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let bytes = body.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            literal.push_str(&body[i..i + 2]);
            i += 2;
            continue;
        }
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            let open = i + 1;
            let close = crate::outline::find_matching_brace(body, open).ok_or(
                ParseError::UnbalancedBraces {
                    pos: base + i,
                    name: "template expression".to_string(),
                },
            )?;
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(unescape(&literal)));
                literal.clear();
            }
            let inner = &body[open + 1..close];
            let expr = parse_expression(inner).map_err(|e| e.offset(base + open + 1))?;
            parts.push(TemplatePart::Expression(expr));
            i = close + 1;
            continue;
        }
        let ch_len = body[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        literal.push_str(&body[i..i + ch_len]);
        i += ch_len;
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(unescape(&literal)));
    }
    Ok(Expr::Template(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member_assignment() {
        let stmts = parse_script("this.count = this.count + 1;").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Expr(Expr::Assign {
                target, operator, ..
            }) => {
                assert_eq!(*operator, AssignOp::Assign);
                assert!(matches!(**target, Expr::Member { ref property, .. } if property == "count"));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
            let total = 0;
            for (const item of this.items) {
                if (item.active) { total += item.price; } else continue;
            }
            for (let i = 0; i < 3; i++) total++;
            while (total > 10) { total -= 1; break; }
            return total;
        "#;
        let stmts = parse_script(source).unwrap();
        assert_eq!(stmts.len(), 5);
        assert!(matches!(stmts[1], Stmt::ForOf { ref binding, .. } if binding == "item"));
        assert!(matches!(stmts[2], Stmt::For { .. }));
        assert!(matches!(stmts[3], Stmt::While { .. }));
        assert!(matches!(stmts[4], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_parse_throw() {
        let stmts = parse_script("if (!this.ready) throw 'not ready';").unwrap();
        match &stmts[0] {
            Stmt::If { consequent, .. } => {
                assert!(matches!(**consequent, Stmt::Throw(Expr::Str(ref s)) if s == "not ready"));
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("a + b * c > 2 && !done").unwrap();
        match expr {
            Expr::Binary {
                operator: BinaryOp::And,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { operator: BinaryOp::GreaterThan, .. }));
                assert!(matches!(*right, Expr::Unary { operator: UnaryOp::Not, .. }));
            }
            other => panic!("Expected &&, got {:?}", other),
        }
    }

    #[test]
    fn test_object_and_array_literals() {
        let expr = parse_expression("{ active: isOn, 'text-bold': true, count }").unwrap();
        match expr {
            Expr::Object(props) => {
                let keys: Vec<_> = props.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["active", "text-bold", "count"]);
            }
            other => panic!("Expected object, got {:?}", other),
        }

        let expr = parse_expression("[1, 'two', [3],]").unwrap();
        assert!(matches!(expr, Expr::Array(ref items) if items.len() == 3));
    }

    #[test]
    fn test_template_literal() {
        let expr = parse_expression("`Hello ${user.name}!`").unwrap();
        match expr {
            Expr::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::Literal("Hello ".to_string()));
                assert!(matches!(parts[1], TemplatePart::Expression(Expr::Member { .. })));
                assert_eq!(parts[2], TemplatePart::Literal("!".to_string()));
            }
            other => panic!("Expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_chaining_and_calls() {
        let expr = parse_expression("user?.profile.name.toUpperCase()").unwrap();
        assert!(matches!(expr, Expr::Call { .. }));
    }

    #[test]
    fn test_typed_declaration() {
        let stmts = parse_script("const names: string[] = [];").unwrap();
        assert!(matches!(stmts[0], Stmt::Let { ref name, init: Some(_) } if name == "names"));
    }

    #[test]
    fn test_arrow_functions_rejected() {
        let err = parse_script("this.items.map(x => x * 2);").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { ref message, .. } if message.contains("arrow")));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse_expression("1 = 2").is_err());
        assert!(parse_expression("foo() = 2").is_err());
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse_script("if (a) { b = 1;").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"it\'s\n"), "it's\n");
        assert_eq!(unescape(r"A"), "A");
    }
}
