// theta-parser - Parser for Theta
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent parser for Theta source code.
//!
//! Produces a root [`Decl`] whose main part is the program body. Within a
//! main part, declarations must precede statements; consecutive statements
//! are folded into a sequence.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Decl, DeclKind, Expr, ExprKind, MainPart, Stmt};
use crate::lexer::{LexError, Lexer, SourceLoc, SourceRange, Token};
use crate::symbol::Symbol;

/// Parser error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub loc: SourceLoc,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at {}: {}", self.loc, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            loc: e.loc,
        }
    }
}

/// The parser converts tokens into declaration and statement nodes.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    current_range: SourceRange,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code.
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let (current, current_range) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            current_range,
        })
    }

    /// Parse a whole program: a main part body terminated by end of input.
    ///
    /// The result is an unnamed `Pattern` declaration whose main part is the
    /// program body.
    pub fn parse_program(&mut self) -> Result<Rc<Decl>, ParseError> {
        let begin = self.current_range;
        let main_part = self.parse_main_part_body(begin)?;

        if self.current != Token::Eof {
            return Err(self.error(format!("unexpected '{}', expected a declaration", self.current)));
        }

        let mut decl = Decl::new(DeclKind::Pattern, main_part.range, None);
        decl.main_part = Some(main_part);
        Ok(Rc::new(decl))
    }

    /// Parse a program from a string (convenience function).
    pub fn parse_program_str(source: &str) -> Result<Rc<Decl>, ParseError> {
        let mut parser = Parser::new(source)?;
        parser.parse_program()
    }

    // ========================================================================
    // Internal parsing methods
    // ========================================================================

    fn advance(&mut self) -> Result<Token, ParseError> {
        let (next, next_range) = self.lexer.next_token()?;
        self.current_range = next_range;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            loc: self.current_range.loc(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!(
                "unexpected '{}', expected '{}'",
                self.current, expected
            )))
        }
    }

    fn read_if(&mut self, token: &Token) -> Result<bool, ParseError> {
        if &self.current == token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_identifier(&mut self) -> Result<(Symbol, SourceRange), ParseError> {
        let range = self.current_range;
        match self.current.clone() {
            Token::Identifier(name) => {
                self.advance()?;
                Ok((name, range))
            }
            other => Err(self.error(format!("unexpected '{}', expected an identifier", other))),
        }
    }

    fn parse_name_ref(&mut self, name: Symbol, range: SourceRange) -> Rc<Expr> {
        Expr::new(ExprKind::Name(name), range)
    }

    fn parse_leaf_expr(&mut self) -> Result<Rc<Expr>, ParseError> {
        match self.current.clone() {
            Token::Identifier(_) => {
                let (name, range) = self.read_identifier()?;
                Ok(self.parse_name_ref(name, range))
            }
            other => Err(self.error(format!("unexpected '{}', expected an expression", other))),
        }
    }

    fn parse_postfix_suffix(&mut self, mut expr: Rc<Expr>) -> Result<Rc<Expr>, ParseError> {
        loop {
            match self.current {
                Token::Dot => {
                    let dot_range = self.current_range;
                    self.advance()?;
                    let (name, _) = self.read_identifier()?;
                    expr = Expr::new(ExprKind::Member { base: expr, name }, dot_range);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Rc<Expr>, ParseError> {
        let leaf = self.parse_leaf_expr()?;
        self.parse_postfix_suffix(leaf)
    }

    fn parse_expr_from(&mut self, name: Symbol, range: SourceRange) -> Result<Rc<Expr>, ParseError> {
        let leaf = self.parse_name_ref(name, range);
        self.parse_postfix_suffix(leaf)
    }

    /// Parse a parameter: `name ":" typeExpr`.
    fn parse_param(&mut self) -> Result<Rc<Decl>, ParseError> {
        let (name, range) = self.read_identifier()?;
        self.expect(&Token::Colon)?;
        let type_expr = self.parse_expr()?;

        let decl = Decl::new(DeclKind::Param, range, Some(name));
        *decl.type_expr.borrow_mut() = Some(type_expr);
        Ok(Rc::new(decl))
    }

    /// Parse the pattern-shaped tail of a declaration: optional bases,
    /// optional params, then a `{ … }` main part or `;`.
    fn parse_decl_pattern(&mut self, decl: &mut Decl) -> Result<(), ParseError> {
        // Bases, if any
        if matches!(self.current, Token::Identifier(_)) {
            let mut bases = vec![self.parse_expr()?];
            while self.read_if(&Token::Comma)? {
                bases.push(self.parse_expr()?);
            }
            *decl.bases.borrow_mut() = bases;
        }

        // Params, if any
        if self.read_if(&Token::LParen)? {
            let mut params = Vec::new();
            if self.current != Token::RParen {
                params.push(self.parse_param()?);
                while self.read_if(&Token::Comma)? {
                    params.push(self.parse_param()?);
                }
            }
            self.expect(&Token::RParen)?;
            decl.params = params;
        }

        if self.current == Token::LCurly {
            let open_range = self.current_range;
            self.advance()?;

            let main_part = self.parse_main_part_body(open_range)?;
            self.expect(&Token::RCurly)?;

            decl.main_part = Some(main_part);
        } else {
            self.expect(&Token::Semicolon)?;
        }
        Ok(())
    }

    /// Parse a declaration, the `name ":"` prefix already consumed. A
    /// leading `@` marks an inline value declaration.
    fn parse_decl(&mut self, name: Symbol, range: SourceRange) -> Result<Rc<Decl>, ParseError> {
        let kind = if self.read_if(&Token::At)? {
            DeclKind::InlineValue
        } else {
            DeclKind::Pattern
        };

        let mut decl = Decl::new(kind, range, Some(name));
        self.parse_decl_pattern(&mut decl)?;
        Ok(Rc::new(decl))
    }

    /// Parse a statement beginning with the already-consumed identifier.
    fn parse_stmt(&mut self, name: Symbol, range: SourceRange) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr_from(name, range)?;
        self.expect(&Token::Semicolon)?;
        Ok(Stmt::Expr(expr))
    }

    /// Fold a new statement into a main part under construction.
    fn add_stmt(stmt_slot: &mut Option<Stmt>, new_stmt: Stmt) {
        match stmt_slot.take() {
            None => *stmt_slot = Some(new_stmt),
            Some(Stmt::Seq(range, mut stmts)) => {
                stmts.push(new_stmt);
                *stmt_slot = Some(Stmt::Seq(range, stmts));
            }
            Some(old_stmt) => {
                let range = old_stmt.range();
                *stmt_slot = Some(Stmt::Seq(range, vec![old_stmt, new_stmt]));
            }
        }
    }

    fn parse_main_part_body(&mut self, begin: SourceRange) -> Result<MainPart, ParseError> {
        let mut decls: Vec<Rc<Decl>> = Vec::new();
        let mut stmt: Option<Stmt> = None;

        loop {
            match self.current {
                Token::Eof | Token::RCurly => break,

                Token::Identifier(_) => {
                    // A leading identifier either introduces a declaration in
                    // the form `name: …`, or begins a statement.
                    let (name, range) = self.read_identifier()?;

                    if self.read_if(&Token::Colon)? {
                        let decl = self.parse_decl(name, range)?;
                        if stmt.is_some() {
                            return Err(ParseError {
                                message: "cannot put declarations after statements".to_string(),
                                loc: range.loc(),
                            });
                        }
                        decls.push(decl);
                    } else {
                        let new_stmt = self.parse_stmt(name, range)?;
                        Self::add_stmt(&mut stmt, new_stmt);
                    }
                }

                _ => {
                    return Err(self.error(format!(
                        "unexpected '{}', expected a declaration",
                        self.current
                    )));
                }
            }
        }

        let range = SourceRange::new(begin.begin, self.current_range.begin);
        Ok(MainPart::new(range, decls, stmt))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Rc<Decl> {
        Parser::parse_program_str(source).expect("parse error")
    }

    fn root_decls(decl: &Rc<Decl>) -> Vec<Rc<Decl>> {
        decl.main_part.as_ref().expect("root main part").decls.clone()
    }

    #[test]
    fn test_empty_program() {
        let root = parse("");
        assert_eq!(root.kind, DeclKind::Pattern);
        assert!(root.name.is_none());
        let main_part = root.main_part.as_ref().unwrap();
        assert!(main_part.decls.is_empty());
        assert!(main_part.stmt.borrow().is_none());
    }

    #[test]
    fn test_pattern_decl() {
        let root = parse("x: { }");
        let decls = root_decls(&root);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].kind, DeclKind::Pattern);
        assert_eq!(decls[0].name, Some(Symbol::new("x")));
        assert!(decls[0].main_part.is_some());
        assert!(decls[0].bases.borrow().is_empty());
    }

    #[test]
    fn test_inline_value_decl() {
        let root = parse("x: { } y: @ x;");
        let decls = root_decls(&root);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].kind, DeclKind::InlineValue);
        assert!(decls[1].main_part.is_none());
        assert_eq!(decls[1].bases.borrow().len(), 1);
    }

    #[test]
    fn test_bases() {
        let root = parse("A: { } B: { } C: A, B;");
        let decls = root_decls(&root);
        let bases = decls[2].bases.borrow();
        assert_eq!(bases.len(), 2);
        assert!(matches!(bases[0].kind, ExprKind::Name(ref n) if *n == Symbol::new("A")));
        assert!(matches!(bases[1].kind, ExprKind::Name(ref n) if *n == Symbol::new("B")));
    }

    #[test]
    fn test_nested_decl() {
        let root = parse("A: { f: { } }");
        let decls = root_decls(&root);
        let inner = &decls[0].main_part.as_ref().unwrap().decls;
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name, Some(Symbol::new("f")));
    }

    #[test]
    fn test_member_expr_stmt() {
        let root = parse("a: { b: { } } a.b;");
        let main_part = root.main_part.as_ref().unwrap();
        let stmt = main_part.stmt.borrow();
        let Some(Stmt::Expr(expr)) = &*stmt else {
            panic!("expected an expression statement");
        };
        assert!(matches!(expr.kind, ExprKind::Member { ref name, .. } if *name == Symbol::new("b")));
    }

    #[test]
    fn test_stmt_sequence() {
        let root = parse("a: { } a; a; a;");
        let main_part = root.main_part.as_ref().unwrap();
        let stmt = main_part.stmt.borrow();
        let Some(Stmt::Seq(_, stmts)) = &*stmt else {
            panic!("expected a statement sequence");
        };
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_params() {
        let root = parse("A: { } f: (x: A, y: A) { }");
        let decls = root_decls(&root);
        let f = &decls[1];
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].kind, DeclKind::Param);
        assert_eq!(f.params[0].name, Some(Symbol::new("x")));
        assert!(f.params[0].type_expr.borrow().is_some());
    }

    #[test]
    fn test_decl_after_stmt_rejected() {
        let err = Parser::parse_program_str("a: { } a; b: { }").unwrap_err();
        assert!(err.message.contains("declarations after statements"));
    }

    #[test]
    fn test_unexpected_token() {
        let err = Parser::parse_program_str("x: @ {").unwrap_err();
        assert!(err.message.contains("unexpected"));
    }

    #[test]
    fn test_missing_semicolon() {
        assert!(Parser::parse_program_str("x: @ y").is_err());
    }
}
