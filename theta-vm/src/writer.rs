// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pretty-printer for the object graph.
//!
//! Objects render as a `%name` followed by an indented block listing each
//! part under a `[<mixin-name>]` header, one slot per line. Mixin names are
//! qualified by their origin part. Every printed entity gets a unique
//! `%name`: the first use of a declared name is bare, later same-named
//! entities get a per-name counter suffix; unnamed entities use a default
//! (`obj`, `decl`) and are always numbered.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use theta_parser::Symbol;

use crate::chunk::BCDecl;
use crate::value::Value;
use crate::vm::heap::{Heap, Mixin, ObjectRef, PartRef, Pattern};

/// Render `object` (and every object reachable from its slots) as text.
pub fn dump_object(heap: &Heap, object: ObjectRef) -> String {
    let mut writer = Writer::new(heap);
    writer.write_object(object);
    writer.finish()
}

/// Identity of a printed entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum RefKey {
    Object(usize),
    Decl(*const BCDecl),
}

struct Writer<'a> {
    heap: &'a Heap,
    out: String,
    indent: usize,
    at_line_start: bool,
    name_counters: HashMap<Symbol, usize>,
    ids: HashMap<RefKey, usize>,
    seen: HashSet<RefKey>,
}

impl<'a> Writer<'a> {
    fn new(heap: &'a Heap) -> Self {
        Self {
            heap,
            out: String::new(),
            indent: 0,
            at_line_start: true,
            name_counters: HashMap::new(),
            ids: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    fn finish(self) -> String {
        self.out
    }

    // ========================================================================
    // Low-level output
    // ========================================================================

    fn write(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.out.push('\n');
                self.at_line_start = true;
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.indent {
                    self.out.push_str("  ");
                }
                self.at_line_start = false;
            }
            self.out.push(c);
        }
    }

    fn increase_indent(&mut self) {
        self.indent += 1;
    }

    fn decrease_indent(&mut self) {
        self.indent -= 1;
    }

    // ========================================================================
    // Unique names
    // ========================================================================

    fn ref_id(&mut self, key: RefKey, name: &Symbol) -> usize {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }

        let counter = self.name_counters.entry(name.clone()).or_insert(0);
        let id = *counter;
        *counter += 1;

        self.ids.insert(key, id);
        id
    }

    fn write_unique_name(&mut self, key: RefKey, name: Option<&Symbol>, default_name: &str) {
        let n = match name {
            Some(name) => name.clone(),
            None => Symbol::new(default_name),
        };
        let id = self.ref_id(key, &n);

        self.write("%");
        self.write(n.name());
        if name.is_none() || id != 0 {
            self.write(&id.to_string());
        }
    }

    fn seen_before(&mut self, key: RefKey) -> bool {
        !self.seen.insert(key)
    }

    // ========================================================================
    // Names and references
    // ========================================================================

    fn write_decl_name(&mut self, decl: &Rc<BCDecl>) {
        let key = RefKey::Decl(Rc::as_ptr(decl));
        let name = decl.name.clone();
        self.write_unique_name(key, name.as_ref(), "decl");
    }

    fn write_mixin_name(&mut self, mixin: &Rc<Mixin>) {
        if let Some(origin) = mixin.origin {
            self.write_part_name(origin);
            self.write(".");
        }
        let decl = Rc::clone(&mixin.decl);
        self.write_decl_name(&decl);
    }

    fn write_part_name(&mut self, part: PartRef) {
        self.write_object_name(part.object);
        self.write("[");
        let mixin = self.heap.part_mixin(part);
        self.write_mixin_name(&mixin);
        self.write("]");
    }

    fn write_object_name(&mut self, object: ObjectRef) {
        self.write_unique_name(RefKey::Object(object.index()), None, "obj");
    }

    fn write_pattern_name(&mut self, pattern: &Pattern) {
        self.write("[");
        self.increase_indent();

        let mixins: Vec<Rc<Mixin>> = pattern.mixins().to_vec();
        for (i, mixin) in mixins.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write_mixin_name(mixin);
        }

        self.decrease_indent();
        self.write("]");
    }

    // ========================================================================
    // Values and objects
    // ========================================================================

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Nil => self.write("null"),
            Value::Symbol(sym) => {
                self.write("symbol ");
                self.write(sym.name());
            }
            Value::Pattern(pattern) => {
                self.write("pattern ");
                self.write_pattern_name(pattern);
            }
            Value::Mixin(mixin) => {
                self.write("mixin ");
                self.write_mixin_name(mixin);
            }
            Value::Object(object) => {
                self.write("object ");
                self.write_object(*object);
            }
            Value::Part(part) => self.write_part_name(*part),
        }
    }

    fn write_object(&mut self, object: ObjectRef) {
        self.write_object_name(object);
        if self.seen_before(RefKey::Object(object.index())) {
            return;
        }

        self.write("\n{");
        self.increase_indent();

        let part_count = self.heap.object(object).parts.len();
        for part_index in 0..part_count {
            self.write("\n");

            let part = PartRef {
                object,
                part: part_index,
            };
            let mixin = self.heap.part_mixin(part);

            self.decrease_indent();
            self.write("[");
            self.write_mixin_name(&mixin);
            self.write("]");
            self.increase_indent();

            self.increase_indent();

            let slots: Vec<Value> = self.heap.part(part).slots.clone();
            for slot in &slots {
                self.write("\n");
                self.write_value(slot);
            }
            if !slots.is_empty() {
                self.write("\n");
            }

            self.decrease_indent();
        }
        if part_count > 0 {
            self.write("\n");
        }

        self.decrease_indent();
        self.write("}");
    }
}
