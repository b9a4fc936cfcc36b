// theta-parser - Lexer and parser for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # theta-parser
//!
//! Lexer, parser, and syntax model for the Theta programming language.
//! Produces a [`ast::Decl`] tree from source code strings; the semantic
//! checker and bytecode compiler live in the `theta-vm` crate.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod symbol;

pub use ast::{
    Classifier, ClassifierKind, Decl, DeclKind, Expr, ExprKind, MainPart, MixinPath, StaticMixin,
    StaticPattern, Stmt,
};
pub use lexer::{LexError, Lexer, SourceLoc, SourceRange, Token};
pub use parser::{ParseError, Parser};
pub use symbol::Symbol;
