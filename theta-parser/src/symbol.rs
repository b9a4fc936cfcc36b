// theta-parser - Symbol type with interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Symbols are interned identifiers.
//!
//! # Interning
//!
//! Symbols are interned using a global string interner, meaning that two
//! symbols with the same text share the same underlying storage. This
//! provides several benefits:
//!
//! - **O(1) equality**: Comparing symbols is a pointer comparison, not string comparison
//! - **O(1) hashing**: Hash is computed from the pointer address
//! - **Memory efficiency**: Identical symbols share storage
//!
//! # Memory Behaviour
//!
//! **Important**: Interned symbols are never deallocated. The global interner
//! maintains strong references (`Arc`) to all symbols created during the
//! program's lifetime, so memory usage grows monotonically with unique
//! symbols. This is intentional: a program's identifier set is bounded by its
//! source text and symbols are reused heavily across the pipeline.
//!
//! # Thread Safety
//!
//! The interner is protected by a `Mutex`, making symbol creation
//! thread-safe. Symbol comparison and hashing are lock-free after creation.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

/// An interned identifier.
///
/// Two symbols created from equal text are the same symbol; equality and
/// hashing are by identity of the interned storage.
#[derive(Clone)]
pub struct Symbol {
    text: Arc<str>,
}

/// Global symbol interner
static SYMBOL_INTERNER: OnceLock<Mutex<SymbolInterner>> = OnceLock::new();

struct SymbolInterner {
    /// Map from text to its interned storage
    symbols: HashMap<String, Arc<str>>,
}

impl SymbolInterner {
    fn new() -> Self {
        SymbolInterner {
            symbols: HashMap::new(),
        }
    }

    fn intern(&mut self, text: &str) -> Arc<str> {
        if let Some(interned) = self.symbols.get(text) {
            Arc::clone(interned)
        } else {
            let interned: Arc<str> = Arc::from(text);
            self.symbols
                .insert(text.to_string(), Arc::clone(&interned));
            interned
        }
    }
}

fn get_interner() -> &'static Mutex<SymbolInterner> {
    SYMBOL_INTERNER.get_or_init(|| Mutex::new(SymbolInterner::new()))
}

impl Symbol {
    /// Intern `text`, returning the canonical symbol for it.
    pub fn new(text: &str) -> Self {
        let text = get_interner()
            .lock()
            .expect(
                "Symbol interner mutex poisoned: another thread panicked while holding the lock",
            )
            .intern(text);
        Symbol { text }
    }

    /// Get the symbol's text.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        // Due to interning, pointer comparison is sufficient
        Arc::ptr_eq(&self.text, &other.text)
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.text.as_ref().cmp(other.text.as_ref())
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Use pointer hash for interned symbols
        Arc::as_ptr(&self.text).hash(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
