//! Hand-rolled lexer + recursive-descent parser for script sources.
//!
//! Spans are half-open byte ranges into the original source string. The
//! parser never recovers; the first error aborts the unit, which is reported
//! at load time (instrumentation-time failures never reach the host program).

use xray_model::{BinaryOp, Span, UnaryOp};

use crate::ast::{Expr, ExprKind, FnDecl, Module, Stmt, StmtKind};
use crate::error::ParseError;

pub fn parse_module(input: &str) -> Result<Module, ParseError> {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.tokenize()?;
    let mut p = ParserImpl::new(tokens);
    p.parse_module()
}

/// Parse a single expression; used by decomposition tests and the bench
/// harness, not by the loading pipeline.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.tokenize()?;
    let mut p = ParserImpl::new(tokens);
    let expr = p.parse_expr()?;
    p.expect(TokenKind::End)?;
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    span: Span,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    Assign,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    End,
}

fn token_desc(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Ident(name) => format!("'{name}'"),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Semi => "';'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::Percent => "'%'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
        TokenKind::AndAnd => "'&&'".to_string(),
        TokenKind::OrOr => "'||'".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::Ne => "'!='".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Le => "'<='".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Ge => "'>='".to_string(),
        TokenKind::End => "end of input".to_string(),
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
                continue;
            }
            if self.peek_str("//") {
                self.skip_line_comment();
                continue;
            }

            let start = self.pos;
            let kind = match ch {
                '(' => {
                    self.pos += 1;
                    TokenKind::LParen
                }
                ')' => {
                    self.pos += 1;
                    TokenKind::RParen
                }
                '{' => {
                    self.pos += 1;
                    TokenKind::LBrace
                }
                '}' => {
                    self.pos += 1;
                    TokenKind::RBrace
                }
                '[' => {
                    self.pos += 1;
                    TokenKind::LBracket
                }
                ']' => {
                    self.pos += 1;
                    TokenKind::RBracket
                }
                ',' => {
                    self.pos += 1;
                    TokenKind::Comma
                }
                ';' => {
                    self.pos += 1;
                    TokenKind::Semi
                }
                ':' => {
                    self.pos += 1;
                    TokenKind::Colon
                }
                '+' => {
                    self.pos += 1;
                    TokenKind::Plus
                }
                '-' => {
                    self.pos += 1;
                    TokenKind::Minus
                }
                '*' => {
                    self.pos += 1;
                    TokenKind::Star
                }
                '/' => {
                    self.pos += 1;
                    TokenKind::Slash
                }
                '%' => {
                    self.pos += 1;
                    TokenKind::Percent
                }
                '&' => {
                    if self.peek_str("&&") {
                        self.pos += 2;
                        TokenKind::AndAnd
                    } else {
                        return Err(ParseError::UnexpectedChar {
                            ch,
                            span: Span::new(start, start + 1),
                        });
                    }
                }
                '|' => {
                    if self.peek_str("||") {
                        self.pos += 2;
                        TokenKind::OrOr
                    } else {
                        return Err(ParseError::UnexpectedChar {
                            ch,
                            span: Span::new(start, start + 1),
                        });
                    }
                }
                '!' => {
                    if self.peek_str("!=") {
                        self.pos += 2;
                        TokenKind::Ne
                    } else {
                        self.pos += 1;
                        TokenKind::Bang
                    }
                }
                '=' => {
                    if self.peek_str("==") {
                        self.pos += 2;
                        TokenKind::EqEq
                    } else {
                        self.pos += 1;
                        TokenKind::Assign
                    }
                }
                '<' => {
                    if self.peek_str("<=") {
                        self.pos += 2;
                        TokenKind::Le
                    } else {
                        self.pos += 1;
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.peek_str(">=") {
                        self.pos += 2;
                        TokenKind::Ge
                    } else {
                        self.pos += 1;
                        TokenKind::Gt
                    }
                }
                '"' => self.lex_string()?,
                '.' => {
                    // Leading-decimal numeric literal (`.5`) vs field access.
                    let next_is_digit = self.input[self.pos + 1..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_digit());
                    if next_is_digit {
                        self.lex_number()?
                    } else {
                        self.pos += 1;
                        TokenKind::Dot
                    }
                }
                '0'..='9' => self.lex_number()?,
                _ if is_ident_start(ch) => self.lex_ident(),
                _ => {
                    return Err(ParseError::UnexpectedChar {
                        ch,
                        span: Span::new(start, start + ch.len_utf8()),
                    })
                }
            };
            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
        tokens.push(Token {
            kind: TokenKind::End,
            span: Span::new(self.pos, self.pos),
        });
        Ok(tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
            if ch == '\n' {
                break;
            }
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        TokenKind::Ident(self.input[start..self.pos].to_string())
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut saw_dot = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => self.pos += 1,
                '.' if !saw_dot => {
                    // A dot followed by an identifier is field access on a
                    // number literal, not a fraction.
                    let next = self.input[self.pos + 1..].chars().next();
                    if next.is_some_and(|c| c.is_ascii_digit()) {
                        saw_dot = true;
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                'E' | 'e' => {
                    self.pos += 1;
                    if matches!(self.peek_char(), Some('+') | Some('-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let s = &self.input[start..self.pos];
        let n: f64 = s.parse().map_err(|_| ParseError::InvalidNumber {
            text: s.to_string(),
            span: Span::new(start, self.pos),
        })?;
        Ok(TokenKind::Number(n))
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        // Consume opening quote.
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.pos += 1;
                    return Ok(TokenKind::Str(out));
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek_char() {
                        Some('n') => {
                            out.push('\n');
                            self.pos += 1;
                        }
                        Some('t') => {
                            out.push('\t');
                            self.pos += 1;
                        }
                        Some(ch) => {
                            out.push(ch);
                            self.pos += ch.len_utf8();
                        }
                        None => {
                            return Err(ParseError::UnterminatedString {
                                span: Span::new(start, self.pos),
                            })
                        }
                    }
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
                None => {
                    return Err(ParseError::UnterminatedString {
                        span: Span::new(start, self.pos),
                    })
                }
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_continue(ch)
}

struct ParserImpl {
    tokens: Vec<Token>,
    pos: usize,
}

impl ParserImpl {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut functions = Vec::new();
        let mut body = Vec::new();
        while !matches!(self.peek().kind, TokenKind::End) {
            if self.at_keyword("fn") {
                functions.push(self.parse_fn()?);
            } else {
                body.push(self.parse_stmt()?);
            }
        }
        Ok(Module { functions, body })
    }

    fn parse_fn(&mut self) -> Result<FnDecl, ParseError> {
        let fn_tok = self.next();
        let (name, name_span) = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RParen) {
            loop {
                let (param, _) = self.expect_ident("parameter name")?;
                params.push(param);
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let (body, body_span) = self.parse_block()?;
        Ok(FnDecl {
            name,
            name_span,
            params,
            body,
            span: fn_tok.span.merge(body_span),
        })
    }

    /// `{ stmt* }`, returning the statements and the span of the braces.
    fn parse_block(&mut self) -> Result<(Vec<Stmt>, Span), ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::End) {
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok((stmts, open.span.merge(close.span)))
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.at_keyword("let") {
            let let_tok = self.next();
            let (name, _) = self.expect_ident("variable name")?;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expr()?;
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt {
                span: let_tok.span.merge(semi.span),
                kind: StmtKind::Let { name, value },
            });
        }
        if self.at_keyword("return") {
            let ret_tok = self.next();
            let value = if matches!(self.peek().kind, TokenKind::Semi) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt {
                span: ret_tok.span.merge(semi.span),
                kind: StmtKind::Return { value },
            });
        }
        if self.at_keyword("if") {
            return self.parse_if();
        }
        if self.at_keyword("while") {
            let while_tok = self.next();
            let cond = self.parse_expr()?;
            let (body, body_span) = self.parse_block()?;
            return Ok(Stmt {
                span: while_tok.span.merge(body_span),
                kind: StmtKind::While { cond, body },
            });
        }

        let expr = self.parse_expr()?;
        if matches!(self.peek().kind, TokenKind::Assign) {
            let name = match &expr.kind {
                ExprKind::Name(name) => name.clone(),
                _ => {
                    let tok = self.peek().clone();
                    return Err(ParseError::Expected {
                        expected: "assignable name before '='".to_string(),
                        found: token_desc(&tok.kind),
                        span: tok.span,
                    });
                }
            };
            self.next();
            let value = self.parse_expr()?;
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt {
                span: expr.span.merge(semi.span),
                kind: StmtKind::Assign { name, value },
            });
        }
        let semi = self.expect(TokenKind::Semi)?;
        Ok(Stmt {
            span: expr.span.merge(semi.span),
            kind: StmtKind::Expr { value: expr },
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let if_tok = self.next();
        let cond = self.parse_expr()?;
        let (then_body, mut end_span) = self.parse_block()?;
        let mut else_body = Vec::new();
        if self.at_keyword("else") {
            self.next();
            if self.at_keyword("if") {
                let nested = self.parse_if()?;
                end_span = nested.span;
                else_body.push(nested);
            } else {
                let (body, body_span) = self.parse_block()?;
                end_span = body_span;
                else_body = body;
            }
        }
        Ok(Stmt {
            span: if_tok.span.merge(end_span),
            kind: StmtKind::If {
                cond,
                then_body,
                else_body,
            },
        })
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::OrOr) {
            self.next();
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_compare()?;
        while matches!(self.peek().kind, TokenKind::AndAnd) {
            self.next();
            let right = self.parse_compare()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_sub()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.next();
            let right = self.parse_add_sub()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_add_sub(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_div()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_mul_div()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.next();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let tok = self.next();
        let operand = self.parse_unary()?;
        Ok(Expr {
            span: tok.span.merge(operand.span),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    let (callee, callee_span) = match &expr.kind {
                        ExprKind::Name(name) => (name.clone(), expr.span),
                        _ => {
                            let tok = self.peek().clone();
                            return Err(ParseError::Expected {
                                expected: "function name before '('".to_string(),
                                found: token_desc(&tok.kind),
                                span: tok.span,
                            });
                        }
                    };
                    self.next();
                    let mut args = Vec::new();
                    if !matches!(self.peek().kind, TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.peek().kind, TokenKind::Comma) {
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    let close = self.expect(TokenKind::RParen)?;
                    expr = Expr {
                        span: callee_span.merge(close.span),
                        kind: ExprKind::Call {
                            callee,
                            callee_span,
                            args,
                        },
                    };
                }
                TokenKind::Dot => {
                    self.next();
                    let (field, field_span) = self.expect_ident("field name")?;
                    expr = Expr {
                        span: expr.span.merge(field_span),
                        kind: ExprKind::Field {
                            base: Box::new(expr),
                            field,
                        },
                    };
                }
                TokenKind::LBracket => {
                    self.next();
                    let index = self.parse_expr()?;
                    let close = self.expect(TokenKind::RBracket)?;
                    expr = Expr {
                        span: expr.span.merge(close.span),
                        kind: ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Number(n) => {
                self.next();
                Ok(Expr {
                    span: tok.span,
                    kind: ExprKind::Number(*n),
                })
            }
            TokenKind::Str(s) => {
                self.next();
                Ok(Expr {
                    span: tok.span,
                    kind: ExprKind::Text(s.clone()),
                })
            }
            TokenKind::Ident(name) => {
                self.next();
                let kind = match name.as_str() {
                    "true" => ExprKind::Bool(true),
                    "false" => ExprKind::Bool(false),
                    "null" => ExprKind::Null,
                    _ => ExprKind::Name(name.clone()),
                };
                Ok(Expr {
                    span: tok.span,
                    kind,
                })
            }
            TokenKind::LParen => {
                let open = self.next();
                let inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen)?;
                // Keep the inner node but widen its span to the parentheses
                // so report labels quote the grouped source text.
                Ok(Expr {
                    span: open.span.merge(close.span),
                    kind: inner.kind,
                })
            }
            TokenKind::LBracket => {
                let open = self.next();
                let mut items = Vec::new();
                if !matches!(self.peek().kind, TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if matches!(self.peek().kind, TokenKind::Comma) {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RBracket)?;
                Ok(Expr {
                    span: open.span.merge(close.span),
                    kind: ExprKind::List(items),
                })
            }
            TokenKind::LBrace => {
                let open = self.next();
                let mut fields = Vec::new();
                if !matches!(self.peek().kind, TokenKind::RBrace) {
                    loop {
                        let (name, _) = self.expect_ident("field name")?;
                        self.expect(TokenKind::Colon)?;
                        fields.push((name, self.parse_expr()?));
                        if matches!(self.peek().kind, TokenKind::Comma) {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RBrace)?;
                Ok(Expr {
                    span: open.span.merge(close.span),
                    kind: ExprKind::Record(fields),
                })
            }
            _ => Err(ParseError::Expected {
                expected: "expression".to_string(),
                found: token_desc(&tok.kind),
                span: tok.span,
            }),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == kw)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.peek().clone();
        if tok.kind == expected {
            Ok(self.next())
        } else {
            Err(ParseError::Expected {
                expected: token_desc(&expected),
                found: token_desc(&tok.kind),
                span: tok.span,
            })
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(name) => {
                self.next();
                Ok((name, tok.span))
            }
            _ => Err(ParseError::Expected {
                expected: expected.to_string(),
                found: token_desc(&tok.kind),
                span: tok.span,
            }),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr {
        span: left.span.merge(right.span),
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_cover_source_text() {
        let src = "g(a) / (b - 5)";
        let expr = parse_expression(src).expect("parse");
        assert_eq!(expr.span, Span::new(0, src.len()));
        match expr.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Div);
                assert_eq!(&src[left.span.start..left.span.end], "g(a)");
                assert_eq!(&src[right.span.start..right.span.end], "(b - 5)");
            }
            other => panic!("expected division, got {other:?}"),
        }
    }

    #[test]
    fn short_circuit_binds_looser_than_comparison() {
        let expr = parse_expression("a == 1 || b < 2 && c").expect("parse");
        match expr.kind {
            ExprKind::Binary { op: BinaryOp::Or, right, .. } => match right.kind {
                ExprKind::Binary { op: BinaryOp::And, .. } => {}
                other => panic!("expected '&&' on the right of '||', got {other:?}"),
            },
            other => panic!("expected '||' at the root, got {other:?}"),
        }
    }

    #[test]
    fn postfix_chains_nest_left_to_right() {
        let expr = parse_expression("rows[0].name").expect("parse");
        match expr.kind {
            ExprKind::Field { base, field } => {
                assert_eq!(field, "name");
                assert!(matches!(base.kind, ExprKind::Index { .. }));
            }
            other => panic!("expected field access, got {other:?}"),
        }
    }

    #[test]
    fn module_parses_functions_and_top_level_statements() {
        let src = "fn add(a, b) { return a + b; }\nlet total = add(1, 2);\n";
        let module = parse_module(src).expect("parse");
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].params, vec!["a", "b"]);
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn call_on_non_name_is_rejected() {
        let err = parse_expression("(a + b)(1)").expect_err("should fail");
        assert!(matches!(err, ParseError::Expected { .. }));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let err = parse_expression("\"abc").expect_err("should fail");
        assert!(matches!(err, ParseError::UnterminatedString { .. }));
    }
}
