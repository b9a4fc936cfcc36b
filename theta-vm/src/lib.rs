// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Theta.
//!
//! The compiler checks a parsed declaration tree against the mixin object
//! model and lowers it to per-declaration bytecode chunks; the VM then
//! materialises objects as flat sequences of per-mixin parts and runs their
//! initialisation and body code.

pub mod chunk;
pub mod compiler;
pub mod opcode;
pub mod value;
pub mod vm;
pub mod writer;

pub use chunk::{BCDecl, CodeChunk};
pub use compiler::{Checker, CompileError, Emitter, compile};
pub use opcode::Opcode;
pub use value::Value;
pub use vm::{Heap, Mixin, ObjectRef, PartRef, Pattern, RuntimeError, VM};
pub use writer::dump_object;
