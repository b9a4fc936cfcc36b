// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.
//!
//! Instructions are encoded as one byte each; `Constant`, `GetPartSlot` and
//! `SetPartSlot` are followed by a one-byte immediate. Instructions operate
//! on the current frame's value stack and reify the mixin object model: a
//! frame always runs on behalf of some *self part*, and patterns, mixins,
//! parts and objects are first-class stack values.

use std::fmt;

/// Bytecode instructions for the Theta VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// No operation.
    Nop,

    /// Leave the current frame; if no frame remains, halt.
    Return,

    /// Push constants[n] onto the stack (one-byte immediate).
    Constant,

    /// Pop a pattern, allocate and initialise an object of it, push the object.
    CreateObject,

    /// Pop and discard the top of the stack.
    Pop,

    /// Pop a part, push the value of its slot n (one-byte immediate).
    GetPartSlot,

    /// Pop a value, pop a part, store the value into the part's slot n
    /// (one-byte immediate).
    SetPartSlot,

    /// Push a single-mixin pattern made from the current declaration, with
    /// the current self part as its origin.
    CreatePatternFromMainPart,

    /// Pop a base pattern, push the pattern extending it with a mixin for the
    /// current declaration and self part.
    CreatePatternFromBaseAndMainPart,

    /// Push the process-wide empty pattern.
    GetEmptyPattern,

    /// Push the part currently being initialised or run.
    GetSelfPart,

    /// Pop a part, push its mixin.
    GetMixinFromPart,

    /// Pop a mixin, push its origin part.
    GetOriginPartFromMixin,

    /// Schedule execution of the next more-specialised mixin's body. A no-op
    /// when the current mixin is already the most specialised.
    Inner,
}

impl Opcode {
    /// Decode a byte into an opcode, if it matches one.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            b if b == Opcode::Nop as u8 => Some(Opcode::Nop),
            b if b == Opcode::Return as u8 => Some(Opcode::Return),
            b if b == Opcode::Constant as u8 => Some(Opcode::Constant),
            b if b == Opcode::CreateObject as u8 => Some(Opcode::CreateObject),
            b if b == Opcode::Pop as u8 => Some(Opcode::Pop),
            b if b == Opcode::GetPartSlot as u8 => Some(Opcode::GetPartSlot),
            b if b == Opcode::SetPartSlot as u8 => Some(Opcode::SetPartSlot),
            b if b == Opcode::CreatePatternFromMainPart as u8 => {
                Some(Opcode::CreatePatternFromMainPart)
            }
            b if b == Opcode::CreatePatternFromBaseAndMainPart as u8 => {
                Some(Opcode::CreatePatternFromBaseAndMainPart)
            }
            b if b == Opcode::GetEmptyPattern as u8 => Some(Opcode::GetEmptyPattern),
            b if b == Opcode::GetSelfPart as u8 => Some(Opcode::GetSelfPart),
            b if b == Opcode::GetMixinFromPart as u8 => Some(Opcode::GetMixinFromPart),
            b if b == Opcode::GetOriginPartFromMixin as u8 => Some(Opcode::GetOriginPartFromMixin),
            b if b == Opcode::Inner as u8 => Some(Opcode::Inner),
            _ => None,
        }
    }

    /// True if this opcode is followed by a one-byte immediate.
    pub fn has_operand(&self) -> bool {
        matches!(
            self,
            Opcode::Constant | Opcode::GetPartSlot | Opcode::SetPartSlot
        )
    }

    /// The mnemonic used in bytecode dumps.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Return => "RETURN",
            Opcode::Constant => "CONSTANT",
            Opcode::CreateObject => "CREATE_OBJECT",
            Opcode::Pop => "POP",
            Opcode::GetPartSlot => "GET_PART_SLOT",
            Opcode::SetPartSlot => "SET_PART_SLOT",
            Opcode::CreatePatternFromMainPart => "CREATE_PATTERN_FROM_MAIN_PART",
            Opcode::CreatePatternFromBaseAndMainPart => "CREATE_PATTERN_FROM_BASE_AND_MAIN_PART",
            Opcode::GetEmptyPattern => "GET_EMPTY_PATTERN",
            Opcode::GetSelfPart => "GET_SELF_PART",
            Opcode::GetMixinFromPart => "GET_MIXIN_FROM_PART",
            Opcode::GetOriginPartFromMixin => "GET_ORIGIN_PART_FROM_MIXIN",
            Opcode::Inner => "INNER",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let all = [
            Opcode::Nop,
            Opcode::Return,
            Opcode::Constant,
            Opcode::CreateObject,
            Opcode::Pop,
            Opcode::GetPartSlot,
            Opcode::SetPartSlot,
            Opcode::CreatePatternFromMainPart,
            Opcode::CreatePatternFromBaseAndMainPart,
            Opcode::GetEmptyPattern,
            Opcode::GetSelfPart,
            Opcode::GetMixinFromPart,
            Opcode::GetOriginPartFromMixin,
            Opcode::Inner,
        ];
        for op in all {
            assert_eq!(Opcode::from_byte(op as u8), Some(op));
        }
    }

    #[test]
    fn test_unknown_byte() {
        assert_eq!(Opcode::from_byte(0xff), None);
    }

    #[test]
    fn test_operands() {
        assert!(Opcode::Constant.has_operand());
        assert!(Opcode::GetPartSlot.has_operand());
        assert!(Opcode::SetPartSlot.has_operand());
        assert!(!Opcode::Inner.has_operand());
        assert!(!Opcode::Return.has_operand());
    }
}
