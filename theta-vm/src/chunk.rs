// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode chunks and compiled declarations.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use theta_parser::Symbol;

use crate::opcode::Opcode;
use crate::value::Value;

/// A chunk of bytecode with its constant pool.
///
/// Instructions are one byte; `Constant`, `GetPartSlot` and `SetPartSlot`
/// carry a one-byte immediate.
#[derive(Default, Debug)]
pub struct CodeChunk {
    /// The encoded instructions.
    pub bytes: Vec<u8>,
    /// Constant pool.
    pub constants: Vec<Value>,
}

impl CodeChunk {
    /// Create a new empty chunk.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Emit an instruction.
    pub fn emit_op(&mut self, op: Opcode) {
        self.bytes.push(op as u8);
    }

    /// Emit a raw byte (an immediate operand).
    pub fn emit_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Add a constant to the pool and return its index.
    ///
    /// Returns `None` if the constant pool is full (immediates are one byte).
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        let index = self.constants.len();
        if index > u8::MAX as usize {
            return None;
        }
        self.constants.push(value);
        Some(index as u8)
    }

    /// Append a human-readable disassembly of this chunk to `out`, one
    /// instruction per line.
    pub fn disassemble(&self, out: &mut String) {
        let mut cursor = self.bytes.iter();
        while let Some(&byte) = cursor.next() {
            let Some(op) = Opcode::from_byte(byte) else {
                let _ = writeln!(out, "!!INVALID {}", byte);
                return;
            };
            if op.has_operand() {
                match cursor.next() {
                    Some(&operand) => {
                        let _ = writeln!(out, "{} {}", op.mnemonic(), operand);
                    }
                    None => {
                        let _ = writeln!(out, "{} !!TRUNCATED", op.mnemonic());
                        return;
                    }
                }
            } else {
                let _ = writeln!(out, "{}", op.mnemonic());
            }
        }
    }
}

/// A compiled declaration: the bytecode counterpart of an AST declaration
/// with a main part or a slot.
///
/// `init_code` runs once per enclosing object being constructed, with self =
/// the part whose mixin encloses the declaration; `body_code` runs as a link
/// of the `Inner` chain on objects of the enclosing pattern.
#[derive(Debug)]
pub struct BCDecl {
    pub name: Option<Symbol>,
    parent: RefCell<Option<Weak<BCDecl>>>,

    /// Nested member declarations, in source order.
    pub members: Vec<Rc<BCDecl>>,

    /// The number of slots a part created from this declaration needs.
    pub slot_count: usize,

    /// Code to initialise this member when its enclosing part is constructed.
    pub init_code: CodeChunk,

    /// The "do" part of this declaration.
    pub body_code: CodeChunk,
}

impl BCDecl {
    /// Create an empty compiled declaration.
    pub fn new(name: Option<Symbol>) -> Self {
        Self {
            name,
            parent: RefCell::new(None),
            members: Vec::new(),
            slot_count: 0,
            init_code: CodeChunk::new(),
            body_code: CodeChunk::new(),
        }
    }

    /// Link this declaration to its enclosing declaration. Called once by the
    /// emitter after the tree below `parent` is built.
    pub fn set_parent(&self, parent: &Rc<BCDecl>) {
        *self.parent.borrow_mut() = Some(Rc::downgrade(parent));
    }

    /// The enclosing compiled declaration, if any.
    pub fn parent(&self) -> Option<Rc<BCDecl>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// `parent::…::name`, with `_` for unnamed declarations.
    pub fn qualified_name(&self) -> String {
        let mut out = String::new();
        if let Some(parent) = self.parent() {
            out.push_str(&parent.qualified_name());
            out.push_str("::");
        }
        match &self.name {
            Some(name) => out.push_str(name.name()),
            None => out.push('_'),
        }
        out
    }

    /// A dump of this declaration's chunks and, recursively, its members.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out);
        out
    }

    fn dump_into(&self, out: &mut String) {
        let _ = writeln!(out, "BCDecl(name: {})", self.qualified_name());
        out.push_str("INIT: {\n");
        self.init_code.disassemble(out);
        out.push_str("}\n");
        out.push_str("DO: {\n");
        self.body_code.disassemble(out);
        out.push_str("}\n");

        for member in &self.members {
            member.dump_into(out);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
