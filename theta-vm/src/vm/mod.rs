// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Theta bytecode.
//!
//! The VM owns the object heap and a frame stack. Creating an object runs
//! every member's init chunk, part by part in precedence order, on a fresh
//! frame stack; running an object pushes the most-general part's body chunk
//! and lets `Inner` thread control into more-specialised parts.

pub mod error;
pub mod frame;
pub mod heap;

use std::mem;
use std::rc::Rc;

use crate::chunk::BCDecl;
use crate::opcode::Opcode;
use crate::value::Value;

pub use error::{Result, RuntimeError};
pub use frame::{ChunkKind, Frame};
pub use heap::{Heap, Mixin, ObjectRef, PartRef, Pattern};

/// The Theta virtual machine.
pub struct VM {
    /// All allocated objects.
    heap: Heap,

    /// Frame stack; the last frame is the one executing.
    frames: Vec<Frame>,
}

impl VM {
    /// Create a new VM.
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            frames: Vec::new(),
        }
    }

    /// The VM's object heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The runtime pattern of a compiled program: a single mixin with no
    /// origin.
    pub fn load_program(&self, program: &Rc<BCDecl>) -> Pattern {
        Pattern::root(program)
    }

    /// Load, instantiate and run a compiled program, returning its object.
    pub fn run_program(&mut self, program: &Rc<BCDecl>) -> Result<ObjectRef> {
        let pattern = self.load_program(program);
        let object = self.create_object(&pattern)?;
        self.run_object(object)?;
        Ok(object)
    }

    /// Allocate a zeroed object of `pattern` and run its member
    /// initialisation code.
    ///
    /// Initialisation runs on a fresh frame stack, so an allocation performed
    /// mid-opcode leaves the invoking frames untouched.
    pub fn create_object(&mut self, pattern: &Pattern) -> Result<ObjectRef> {
        let object = self.heap.alloc(pattern);

        let saved_frames = mem::take(&mut self.frames);
        let result = self.init_object(object);
        self.frames = saved_frames;
        result?;

        Ok(object)
    }

    fn init_object(&mut self, object: ObjectRef) -> Result<()> {
        let part_count = self.heap.object(object).parts.len();
        for part_index in 0..part_count {
            let part = PartRef {
                object,
                part: part_index,
            };
            let members = self.heap.part_mixin(part).decl.members.clone();
            for member in members {
                self.frames.push(Frame::new(member, ChunkKind::Init, part));
                self.execute()?;
            }
        }
        Ok(())
    }

    /// Run an object's body code: the most-general part's body first, with
    /// `Inner` chaining towards the most-specialised.
    pub fn run_object(&mut self, object: ObjectRef) -> Result<()> {
        if self.heap.pattern(object).is_empty() {
            return Ok(());
        }

        let part = PartRef { object, part: 0 };
        let decl = Rc::clone(&self.heap.part_mixin(part).decl);
        self.frames.push(Frame::new(decl, ChunkKind::Body, part));
        self.execute()
    }

    // ========================================================================
    // Interpreter loop
    // ========================================================================

    fn execute(&mut self) -> Result<()> {
        loop {
            let byte = self.read_byte()?;
            let op = Opcode::from_byte(byte).ok_or(RuntimeError::InvalidOpcode(byte))?;

            match op {
                Opcode::Nop => {}

                Opcode::Return => {
                    self.frames.pop();
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                }

                Opcode::Constant => {
                    let index = self.read_byte()? as usize;
                    let frame = self.frame()?;
                    let value = frame
                        .code()
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or_else(|| {
                            RuntimeError::Internal("constant index out of bounds".to_string())
                        })?;
                    self.push(value)?;
                }

                Opcode::Pop => {
                    self.pop()?;
                }

                Opcode::CreateObject => {
                    let pattern = self.pop_pattern()?;
                    let object = self.create_object(&pattern)?;
                    self.push(Value::Object(object))?;
                }

                Opcode::GetPartSlot => {
                    let index = self.read_byte()? as usize;
                    let part = self.pop_part()?;
                    let value = self.heap.get_slot(part, index)?;
                    self.push(value)?;
                }

                Opcode::SetPartSlot => {
                    let index = self.read_byte()? as usize;
                    let value = self.pop()?;
                    let part = self.pop_part()?;
                    self.heap.set_slot(part, index, value)?;
                }

                Opcode::CreatePatternFromMainPart => {
                    let frame = self.frame()?;
                    let pattern = Pattern::from_main_part(&frame.decl, frame.self_part);
                    self.push(Value::Pattern(pattern))?;
                }

                Opcode::CreatePatternFromBaseAndMainPart => {
                    let base = self.pop_pattern()?;
                    let frame = self.frame()?;
                    let pattern = Pattern::extend(&base, &frame.decl, frame.self_part);
                    self.push(Value::Pattern(pattern))?;
                }

                Opcode::GetEmptyPattern => {
                    self.push(Value::Pattern(Pattern::Empty))?;
                }

                Opcode::GetSelfPart => {
                    let part = self.frame()?.self_part;
                    self.push(Value::Part(part))?;
                }

                Opcode::GetMixinFromPart => {
                    let part = self.pop_part()?;
                    let mixin = self.heap.part_mixin(part);
                    self.push(Value::Mixin(mixin))?;
                }

                Opcode::GetOriginPartFromMixin => {
                    let mixin = self.pop_mixin()?;
                    let origin = mixin.origin.ok_or_else(|| {
                        RuntimeError::Internal("mixin has no origin part".to_string())
                    })?;
                    self.push(Value::Part(origin))?;
                }

                Opcode::Inner => {
                    let current = self.frame()?.self_part;
                    let inner = PartRef {
                        object: current.object,
                        part: current.part + 1,
                    };
                    if inner.part < self.heap.object(current.object).parts.len() {
                        let decl = Rc::clone(&self.heap.part_mixin(inner).decl);
                        self.frames.push(Frame::new(decl, ChunkKind::Body, inner));
                    }
                }
            }
        }
    }

    // ========================================================================
    // Frame and stack helpers
    // ========================================================================

    fn frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::Internal("no active frame".to_string()))
    }

    fn read_byte(&mut self) -> Result<u8> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".to_string()))?;
        let byte = frame.code().bytes.get(frame.ip).copied().ok_or_else(|| {
            RuntimeError::Internal("instruction pointer out of bounds".to_string())
        })?;
        frame.ip += 1;
        Ok(byte)
    }

    fn push(&mut self, value: Value) -> Result<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".to_string()))?;
        frame.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".to_string()))?;
        frame.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn pop_part(&mut self) -> Result<PartRef> {
        match self.pop()? {
            Value::Part(part) => Ok(part),
            other => Err(RuntimeError::TypeError {
                expected: "part",
                got: other.type_name(),
            }),
        }
    }

    fn pop_pattern(&mut self) -> Result<Pattern> {
        match self.pop()? {
            Value::Pattern(pattern) => Ok(pattern),
            other => Err(RuntimeError::TypeError {
                expected: "pattern",
                got: other.type_name(),
            }),
        }
    }

    fn pop_mixin(&mut self) -> Result<Rc<Mixin>> {
        match self.pop()? {
            Value::Mixin(mixin) => Ok(mixin),
            other => Err(RuntimeError::TypeError {
                expected: "mixin",
                got: other.type_name(),
            }),
        }
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
