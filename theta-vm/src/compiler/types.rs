// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared error types for the semantic checker and the bytecode emitter.

use std::fmt;

use theta_parser::{SourceLoc, Symbol};

/// Error during semantic checking or bytecode emission. All compile errors
/// are fatal: the pipeline stops at the first one.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// A name lookup found nothing.
    Undefined { name: Symbol, loc: SourceLoc },
    /// Two sibling mixins both declare the looked-up name.
    Ambiguous { name: Symbol, loc: SourceLoc },
    /// A pattern was required (base or parameter-type position).
    ExpectedPattern { loc: SourceLoc },
    /// A value was required (member access on a non-value).
    ExpectedValue { loc: SourceLoc },
    /// A declaration has two or more bases; pattern merging is not supported.
    UnhandledMerge { loc: SourceLoc },
    /// Declaration kind not supported by this phase.
    UnhandledDecl { loc: SourceLoc },
    /// Expression kind not supported by this phase.
    UnhandledExpr { loc: SourceLoc },
    /// Statement kind not supported by this phase.
    UnhandledStmt { loc: SourceLoc },
    /// A part needs more slots than a one-byte slot index can address.
    TooManySlots { loc: SourceLoc },
}

impl CompileError {
    /// The source location the error points at.
    pub fn loc(&self) -> SourceLoc {
        match self {
            CompileError::Undefined { loc, .. }
            | CompileError::Ambiguous { loc, .. }
            | CompileError::ExpectedPattern { loc }
            | CompileError::ExpectedValue { loc }
            | CompileError::UnhandledMerge { loc }
            | CompileError::UnhandledDecl { loc }
            | CompileError::UnhandledExpr { loc }
            | CompileError::UnhandledStmt { loc }
            | CompileError::TooManySlots { loc } => *loc,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Undefined { name, loc } => {
                write!(f, "Undefined identifier '{}' at {}", name, loc)
            }
            CompileError::Ambiguous { name, loc } => {
                write!(f, "Ambiguous lookup of '{}' at {}", name, loc)
            }
            CompileError::ExpectedPattern { loc } => {
                write!(f, "Expected a pattern at {}", loc)
            }
            CompileError::ExpectedValue { loc } => {
                write!(f, "Expected a value at {}", loc)
            }
            CompileError::UnhandledMerge { loc } => {
                write!(f, "Unhandled merge case (more than one base) at {}", loc)
            }
            CompileError::UnhandledDecl { loc } => {
                write!(f, "Unhandled declaration kind at {}", loc)
            }
            CompileError::UnhandledExpr { loc } => {
                write!(f, "Unhandled expression kind at {}", loc)
            }
            CompileError::UnhandledStmt { loc } => {
                write!(f, "Unhandled statement kind at {}", loc)
            }
            CompileError::TooManySlots { loc } => {
                write!(f, "Too many slots in one part at {}", loc)
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
