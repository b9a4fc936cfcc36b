// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime patterns, mixins, objects and parts.
//!
//! An object's storage is a flat sequence of *parts*, one per mixin of its
//! pattern, each holding the slots declared by that mixin's declaration.
//! Mixins are shared and immutable once constructed; objects live in a heap
//! arena owned by the VM and are referenced by index handles. Objects are
//! never freed.
//!
//! Layout bookkeeping mirrors the flat in-memory picture: each mixin records
//! the byte offset of its part within an instance, and a pattern records the
//! total instance size
//! `size_of::<Object>() + Σ (size_of::<Part>() + slot_count · size_of::<Value>())`,
//! with the first part at offset `size_of::<Object>()`.

use std::mem;
use std::rc::Rc;

use crate::chunk::BCDecl;
use crate::value::Value;
use crate::vm::error::{Result, RuntimeError};

/// A handle to an object in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(usize);

impl ObjectRef {
    /// The object's arena index. Identity of an object is this index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A handle to one part of an object: the object plus the part's position in
/// the pattern's precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartRef {
    pub object: ObjectRef,
    pub part: usize,
}

/// A runtime pattern: empty, or a precedence-ordered mixin list
/// (most-general first, most-specialised last).
#[derive(Clone)]
pub enum Pattern {
    Empty,
    Mixins(Rc<MixinChain>),
}

/// The mixin list of a non-empty pattern, with its cached instance size.
pub struct MixinChain {
    pub mixins: Vec<Rc<Mixin>>,
    pub instance_size: usize,
}

/// One mixin of a runtime pattern.
pub struct Mixin {
    /// The declaration that corresponds to this link in the mixin sequence.
    pub decl: Rc<BCDecl>,
    /// The enclosing-scope part this mixin's code runs against; `None` only
    /// for the program root's mixin.
    pub origin: Option<PartRef>,
    /// Byte offset of this mixin's part within any instance of a pattern
    /// sharing this mixin prefix.
    pub part_offset: usize,
}

impl Mixin {
    pub fn slot_count(&self) -> usize {
        self.decl.slot_count
    }

    /// Size of the part this mixin contributes to an instance.
    pub fn part_size(&self) -> usize {
        mem::size_of::<Part>() + self.slot_count() * mem::size_of::<Value>()
    }
}

impl Pattern {
    /// The pattern for a program root: a single mixin with no origin.
    pub fn root(decl: &Rc<BCDecl>) -> Pattern {
        Pattern::extend_impl(&Pattern::Empty, decl, None)
    }

    /// A single-mixin pattern from a declaration's main part.
    pub fn from_main_part(decl: &Rc<BCDecl>, origin: PartRef) -> Pattern {
        Pattern::extend_impl(&Pattern::Empty, decl, Some(origin))
    }

    /// Extend a base pattern with one more (most-specialised) mixin. The base
    /// mixins are shared, not copied; their offsets are prefix-determined and
    /// so remain valid.
    pub fn extend(base: &Pattern, decl: &Rc<BCDecl>, origin: PartRef) -> Pattern {
        Pattern::extend_impl(base, decl, Some(origin))
    }

    fn extend_impl(base: &Pattern, decl: &Rc<BCDecl>, origin: Option<PartRef>) -> Pattern {
        let mut mixins = base.mixins().to_vec();
        let part_offset = base.instance_size();
        let mixin = Rc::new(Mixin {
            decl: Rc::clone(decl),
            origin,
            part_offset,
        });
        let instance_size = part_offset + mixin.part_size();
        mixins.push(mixin);
        Pattern::Mixins(Rc::new(MixinChain {
            mixins,
            instance_size,
        }))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Pattern::Empty)
    }

    /// All mixins in precedence order (empty slice for the empty pattern).
    pub fn mixins(&self) -> &[Rc<Mixin>] {
        match self {
            Pattern::Empty => &[],
            Pattern::Mixins(chain) => &chain.mixins,
        }
    }

    /// Total size, in bytes, of an instance of this pattern.
    pub fn instance_size(&self) -> usize {
        match self {
            Pattern::Empty => mem::size_of::<Object>(),
            Pattern::Mixins(chain) => chain.instance_size,
        }
    }

    /// Identity comparison: two handles to the same pattern.
    pub fn same_pattern(&self, other: &Pattern) -> bool {
        match (self, other) {
            (Pattern::Empty, Pattern::Empty) => true,
            (Pattern::Mixins(a), Pattern::Mixins(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// An object: its pattern plus one part per mixin, in precedence order.
pub struct Object {
    pub pattern: Pattern,
    pub parts: Vec<Part>,
}

/// The per-mixin slice of an object's storage.
pub struct Part {
    pub mixin: Rc<Mixin>,
    pub slots: Vec<Value>,
}

/// The arena all objects are allocated from. Objects are created zeroed
/// (every slot `Nil`) and never freed.
#[derive(Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            objects: Vec::new(),
        }
    }

    /// Allocate a zeroed object of the given pattern.
    pub fn alloc(&mut self, pattern: &Pattern) -> ObjectRef {
        let parts = pattern
            .mixins()
            .iter()
            .map(|mixin| Part {
                mixin: Rc::clone(mixin),
                slots: vec![Value::Nil; mixin.slot_count()],
            })
            .collect();
        self.objects.push(Object {
            pattern: pattern.clone(),
            parts,
        });
        ObjectRef(self.objects.len() - 1)
    }

    pub fn object(&self, object: ObjectRef) -> &Object {
        &self.objects[object.0]
    }

    pub fn pattern(&self, object: ObjectRef) -> &Pattern {
        &self.object(object).pattern
    }

    pub fn part(&self, part: PartRef) -> &Part {
        &self.object(part.object).parts[part.part]
    }

    /// The mixin a part was created from.
    pub fn part_mixin(&self, part: PartRef) -> Rc<Mixin> {
        Rc::clone(&self.part(part).mixin)
    }

    /// The part of `object` corresponding to `mixin`, if the object's pattern
    /// contains it.
    pub fn part_for_mixin(&self, object: ObjectRef, mixin: &Rc<Mixin>) -> Option<PartRef> {
        self.object(object)
            .parts
            .iter()
            .position(|part| Rc::ptr_eq(&part.mixin, mixin))
            .map(|part| PartRef { object, part })
    }

    pub fn get_slot(&self, part: PartRef, index: usize) -> Result<Value> {
        let slots = &self.part(part).slots;
        slots
            .get(index)
            .cloned()
            .ok_or(RuntimeError::SlotOutOfBounds {
                index,
                count: slots.len(),
            })
    }

    pub fn set_slot(&mut self, part: PartRef, index: usize, value: Value) -> Result<()> {
        let slots = &mut self.objects[part.object.0].parts[part.part].slots;
        let count = slots.len();
        match slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::SlotOutOfBounds { index, count }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decl_with_slots(slot_count: usize) -> Rc<BCDecl> {
        let mut decl = BCDecl::new(None);
        decl.slot_count = slot_count;
        Rc::new(decl)
    }

    #[test]
    fn test_instance_size_formula() {
        let a = decl_with_slots(2);
        let b = decl_with_slots(3);

        let root = Pattern::root(&a);
        let heap_base = mem::size_of::<Object>();
        let part_header = mem::size_of::<Part>();
        let slot = mem::size_of::<Value>();

        assert_eq!(root.instance_size(), heap_base + part_header + 2 * slot);

        let mut heap = Heap::new();
        let obj = heap.alloc(&root);
        let origin = PartRef { object: obj, part: 0 };

        let extended = Pattern::extend(&root, &b, origin);
        assert_eq!(
            extended.instance_size(),
            heap_base + (part_header + 2 * slot) + (part_header + 3 * slot)
        );

        // Part offsets: first at the object header, each next after the
        // previous part.
        let mixins = extended.mixins();
        assert_eq!(mixins[0].part_offset, heap_base);
        assert_eq!(mixins[1].part_offset, heap_base + part_header + 2 * slot);
    }

    #[test]
    fn test_empty_pattern() {
        let empty = Pattern::Empty;
        assert!(empty.is_empty());
        assert_eq!(empty.mixins().len(), 0);
        assert_eq!(empty.instance_size(), mem::size_of::<Object>());

        let mut heap = Heap::new();
        let obj = heap.alloc(&empty);
        assert_eq!(heap.object(obj).parts.len(), 0);
    }

    #[test]
    fn test_extend_shares_base_mixins() {
        let a = decl_with_slots(0);
        let b = decl_with_slots(0);

        let base = Pattern::root(&a);
        let mut heap = Heap::new();
        let obj = heap.alloc(&base);
        let origin = PartRef { object: obj, part: 0 };

        let derived = Pattern::extend(&base, &b, origin);
        assert_eq!(derived.mixins().len(), 2);
        assert!(Rc::ptr_eq(&derived.mixins()[0], &base.mixins()[0]));
    }

    #[test]
    fn test_part_round_trip() {
        let a = decl_with_slots(1);
        let b = decl_with_slots(2);

        let mut heap = Heap::new();
        let root = Pattern::root(&a);
        let outer = heap.alloc(&root);
        let origin = PartRef { object: outer, part: 0 };

        let pattern = Pattern::extend(&root, &b, origin);
        let obj = heap.alloc(&pattern);

        for mixin in pattern.mixins() {
            let part = heap.part_for_mixin(obj, mixin).expect("part for mixin");
            assert_eq!(part.object, obj);
            assert!(Rc::ptr_eq(&heap.part_mixin(part), mixin));
        }
    }

    #[test]
    fn test_slot_access() {
        let a = decl_with_slots(2);
        let mut heap = Heap::new();
        let obj = heap.alloc(&Pattern::root(&a));
        let part = PartRef { object: obj, part: 0 };

        assert_eq!(heap.get_slot(part, 0).unwrap(), Value::Nil);
        heap.set_slot(part, 1, Value::Symbol(theta_parser::Symbol::new("s")))
            .unwrap();
        assert_eq!(
            heap.get_slot(part, 1).unwrap(),
            Value::Symbol(theta_parser::Symbol::new("s"))
        );
        assert!(matches!(
            heap.get_slot(part, 5),
            Err(RuntimeError::SlotOutOfBounds { .. })
        ));
    }
}
