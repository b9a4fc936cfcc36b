// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Theta AST to bytecode.
//!
//! The compiler operates in two phases:
//! 1. Checking: resolve names against the mixin model, build static
//!    patterns, assign slots
//! 2. Code generation: emit per-declaration init and body chunks

pub mod check;
pub mod codegen;
pub mod types;

use std::rc::Rc;

use theta_parser::ast::Decl;

use crate::chunk::BCDecl;

pub use check::Checker;
pub use codegen::Emitter;
pub use types::{CompileError, Result};

/// Check and emit a program in one step.
pub fn compile(program: &Rc<Decl>) -> Result<Rc<BCDecl>> {
    Checker::new().check_program(program)?;
    Emitter::new().emit_program(program)
}
