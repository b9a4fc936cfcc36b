// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors.

use std::fmt;

/// Runtime error during VM execution.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// A decoded byte does not match any opcode.
    InvalidOpcode(u8),
    /// Operand stack underflow.
    StackUnderflow,
    /// An opcode popped a value of the wrong variant.
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    /// A slot index is outside its part.
    SlotOutOfBounds { index: usize, count: usize },
    /// Internal error - invariant violation.
    Internal(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::InvalidOpcode(byte) => write!(f, "Invalid opcode {}", byte),
            RuntimeError::StackUnderflow => write!(f, "Stack underflow"),
            RuntimeError::TypeError { expected, got } => {
                write!(f, "Type error: expected {}, got {}", expected, got)
            }
            RuntimeError::SlotOutOfBounds { index, count } => {
                write!(f, "Slot index {} out of bounds for part with {} slots", index, count)
            }
            RuntimeError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
