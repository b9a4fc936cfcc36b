// theta-vm - End-to-end pipeline tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! End-to-end tests: parse, check, emit, run, then inspect the object graph.

use theta_parser::{Parser, Symbol};
use theta_vm::{ObjectRef, PartRef, VM, Value, compile, dump_object};

fn run(source: &str) -> (VM, ObjectRef) {
    let program = Parser::parse_program_str(source).expect("parse error");
    let bc_program = compile(&program).expect("compile error");
    let mut vm = VM::new();
    let object = vm.run_program(&bc_program).expect("runtime error");
    (vm, object)
}

fn slot(vm: &VM, object: ObjectRef, part: usize, index: usize) -> Value {
    vm.heap()
        .get_slot(PartRef { object, part }, index)
        .expect("slot")
}

#[test]
fn test_empty_program() {
    // One root part, zero slots.
    let (vm, object) = run("");
    let heap = vm.heap();
    assert_eq!(heap.pattern(object).mixins().len(), 1);
    assert_eq!(heap.object(object).parts.len(), 1);
    assert_eq!(heap.part(PartRef { object, part: 0 }).slots.len(), 0);
}

#[test]
fn test_single_slot() {
    // `x` installs a pattern into slot 0, `y` an object of that pattern into
    // slot 1.
    let (vm, object) = run("x: { } y: @ x;");

    let Value::Pattern(x_pattern) = slot(&vm, object, 0, 0) else {
        panic!("slot 0 should hold a pattern");
    };
    assert_eq!(x_pattern.mixins().len(), 1);
    assert_eq!(x_pattern.mixins()[0].decl.name, Some(Symbol::new("x")));

    let Value::Object(y) = slot(&vm, object, 0, 1) else {
        panic!("slot 1 should hold an object");
    };
    let y_pattern = vm.heap().pattern(y);
    assert!(y_pattern.same_pattern(&x_pattern));
    assert_eq!(vm.heap().object(y).parts.len(), 1);
    assert_eq!(vm.heap().part(PartRef { object: y, part: 0 }).slots.len(), 0);
}

#[test]
fn test_base_inheritance() {
    // `b` is an object of pattern B = A + B's own mixin: two parts, most
    // general first.
    let (vm, object) = run("A: { f: { } } B: A { g: A { } } b: @ B;");

    let Value::Object(b) = slot(&vm, object, 0, 2) else {
        panic!("slot 2 should hold an object");
    };

    let heap = vm.heap();
    let parts = &heap.object(b).parts;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].mixin.decl.name, Some(Symbol::new("A")));
    assert_eq!(parts[1].mixin.decl.name, Some(Symbol::new("B")));

    // A's part: slot `f` holds the pattern of f's own main part.
    let Value::Pattern(f_pattern) = slot(&vm, b, 0, 0) else {
        panic!("A.f should hold a pattern");
    };
    assert_eq!(f_pattern.mixins().len(), 1);
    assert_eq!(f_pattern.mixins()[0].decl.name, Some(Symbol::new("f")));

    // B's part: slot `g` holds A's mixins plus g's own.
    let Value::Pattern(g_pattern) = slot(&vm, b, 1, 0) else {
        panic!("B.g should hold a pattern");
    };
    assert_eq!(g_pattern.mixins().len(), 2);
    assert_eq!(g_pattern.mixins()[0].decl.name, Some(Symbol::new("A")));
    assert_eq!(g_pattern.mixins()[1].decl.name, Some(Symbol::new("g")));
}

#[test]
fn test_both_parts_initialised() {
    // Initialisation covers every mixin of a derived pattern, precedence
    // order first.
    let (vm, object) = run("A: { f: { } } B: A { g: { } } b: @ B;");

    let Value::Object(b) = slot(&vm, object, 0, 2) else {
        panic!("slot 2 should hold an object");
    };
    assert!(matches!(slot(&vm, b, 0, 0), Value::Pattern(_)));
    assert!(matches!(slot(&vm, b, 1, 0), Value::Pattern(_)));
}

#[test]
fn test_member_init_order() {
    // `y`'s init reads the slot `x`'s init wrote; wrong ordering would leave
    // nil there and fail object creation.
    let (vm, object) = run("x: ; y: @ x;");

    let Value::Pattern(x_pattern) = slot(&vm, object, 0, 0) else {
        panic!("slot 0 should hold a pattern");
    };
    assert!(x_pattern.is_empty());

    let Value::Object(y) = slot(&vm, object, 0, 1) else {
        panic!("slot 1 should hold an object");
    };
    assert_eq!(vm.heap().object(y).parts.len(), 0);
}

#[test]
fn test_empty_base_extension() {
    // Extending the empty pattern contributes no inherited mixins.
    let (vm, object) = run("x: ; y: x { } v: @ y;");

    let Value::Object(v) = slot(&vm, object, 0, 2) else {
        panic!("slot 2 should hold an object");
    };
    let pattern = vm.heap().pattern(v);
    assert_eq!(pattern.mixins().len(), 1);
    assert_eq!(pattern.mixins()[0].decl.name, Some(Symbol::new("y")));
}

#[test]
fn test_body_statement_runs() {
    // The root body executes its statements against the root part.
    let (vm, object) = run("x: { } x; x;");
    assert!(matches!(slot(&vm, object, 0, 0), Value::Pattern(_)));
}

#[test]
fn test_origin_of_nested_pattern() {
    // A pattern created inside A's scope records A's part as its origin.
    let (vm, object) = run("A: { f: { } } a: @ A;");

    let Value::Object(a) = slot(&vm, object, 0, 1) else {
        panic!("slot 1 should hold an object");
    };
    let Value::Pattern(f_pattern) = slot(&vm, a, 0, 0) else {
        panic!("A.f should hold a pattern");
    };

    let origin = f_pattern.mixins()[0].origin.expect("origin part");
    assert_eq!(origin.object, a);
    assert_eq!(origin.part, 0);
}

#[test]
fn test_layout_size() {
    let (vm, object) = run("A: { f: { } } B: A { g: { } } b: @ B;");
    let Value::Object(b) = slot(&vm, object, 0, 2) else {
        panic!("slot 2 should hold an object");
    };

    let pattern = vm.heap().pattern(b);
    let expected: usize = std::mem::size_of::<theta_vm::vm::heap::Object>()
        + pattern
            .mixins()
            .iter()
            .map(|m| {
                std::mem::size_of::<theta_vm::vm::heap::Part>()
                    + m.decl.slot_count * std::mem::size_of::<Value>()
            })
            .sum::<usize>();
    assert_eq!(pattern.instance_size(), expected);
}

#[test]
fn test_part_round_trip() {
    let (vm, object) = run("A: { f: { } } B: A { } b: @ B;");
    let Value::Object(b) = slot(&vm, object, 0, 2) else {
        panic!("slot 2 should hold an object");
    };

    let heap = vm.heap();
    let pattern = heap.pattern(b).clone();
    for mixin in pattern.mixins() {
        let part = heap.part_for_mixin(b, mixin).expect("part for mixin");
        assert_eq!(part.object, b);
    }
}

#[test]
fn test_bytecode_dump() {
    let program = Parser::parse_program_str("x: { } y: @ x;").expect("parse error");
    let bc_program = compile(&program).expect("compile error");
    let dump = bc_program.dump();

    assert!(dump.contains("BCDecl(name: _)"));
    assert!(dump.contains("BCDecl(name: _::x)"));
    assert!(dump.contains("BCDecl(name: _::y)"));
    assert!(dump.contains("CREATE_PATTERN_FROM_MAIN_PART"));
    assert!(dump.contains("CREATE_OBJECT"));
    assert!(dump.contains("SET_PART_SLOT 1"));
    assert!(dump.contains("INNER"));
}

#[test]
fn test_object_dump() {
    let (vm, object) = run("x: { } y: @ x;");
    let dump = dump_object(vm.heap(), object);

    // The root object, its single part, and the two slot values.
    assert!(dump.starts_with("%obj0"));
    assert!(dump.contains("pattern ["));
    assert!(dump.contains("object %obj1"));
    assert!(dump.contains("%x"));
}

#[test]
fn test_object_dump_empty() {
    let (vm, object) = run("");
    let dump = dump_object(vm.heap(), object);
    assert_eq!(dump, "%obj0\n{\n[%decl0]\n}");
}

#[test]
fn test_run_is_deterministic() {
    let (vm_a, object_a) = run("A: { f: { } } B: A { g: A { } } b: @ B;");
    let (vm_b, object_b) = run("A: { f: { } } B: A { g: A { } } b: @ B;");
    assert_eq!(
        dump_object(vm_a.heap(), object_a),
        dump_object(vm_b.heap(), object_b)
    );
}
