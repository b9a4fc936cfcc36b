// theta-parser - Property-based tests for symbol interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for symbol interning.
//!
//! Tests the fundamental interning contract: `intern(s) == intern(t)` exactly
//! when `s == t`, and hashing is consistent with equality.

use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use theta_parser::Symbol;

fn compute_hash(sym: &Symbol) -> u64 {
    let mut hasher = DefaultHasher::new();
    sym.hash(&mut hasher);
    hasher.finish()
}

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z_]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Interning the same text twice yields the same symbol.
    #[test]
    fn intern_same_text_is_equal(s in identifier()) {
        let a = Symbol::new(&s);
        let b = Symbol::new(&s);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(compute_hash(&a), compute_hash(&b));
    }

    /// Interning distinct texts yields distinct symbols.
    #[test]
    fn intern_distinct_text_is_distinct(s in identifier(), t in identifier()) {
        prop_assume!(s != t);
        let a = Symbol::new(&s);
        let b = Symbol::new(&t);
        prop_assert_ne!(a, b);
    }

    /// A symbol round-trips its text.
    #[test]
    fn symbol_preserves_text(s in identifier()) {
        let sym = Symbol::new(&s);
        prop_assert_eq!(sym.name(), s.as_str());
        prop_assert_eq!(sym.to_string(), s);
    }
}
