// theta-parser - Syntax tree and static model for Theta
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Syntax tree and static model for Theta.
//!
//! The parser produces a tree of [`Decl`], [`Expr`] and [`Stmt`] nodes. The
//! semantic checker then mutates that tree in exactly two ways: it attaches a
//! [`Classifier`] to expressions (at most once per node; an unset classifier
//! is the "unknown" state), and it assigns slot indices and slot counts to
//! slot-introducing declarations and their main parts. Untyped name and
//! member expressions are replaced wholesale by typed path expressions, so
//! base-expression lists and statements sit behind `RefCell`.
//!
//! The static model ([`StaticPattern`], [`StaticMixin`], [`MixinPath`]) is
//! the checker's view of a pattern: a flattened, precedence-ordered mixin
//! list together with the path from a viewing part to each mixin.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::lexer::SourceRange;
use crate::symbol::Symbol;

// ============================================================================
// Declarations
// ============================================================================

/// The kind of a declaration.
///
/// Only `Pattern` and `InlineValue` are producible from source; the remaining
/// kinds are part of the declaration model and are rejected as unhandled by
/// the phases that do not support them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Pattern,
    VirtualPattern,
    FurtherPattern,
    Object,
    InlineValue,
    ReferenceValue,
    Var,
    Let,
    Param,
    Syntax,
}

/// The body of a pattern-like declaration: member declarations followed by an
/// optional statement.
pub struct MainPart {
    pub range: SourceRange,
    pub decls: Vec<Rc<Decl>>,
    /// The "do" statement of this main part, replaced by its checked form
    /// during semantic analysis.
    pub stmt: RefCell<Option<Stmt>>,
    /// Number of slots a part created from this main part needs. Set by the
    /// checker.
    pub slot_count: Cell<usize>,
}

impl MainPart {
    pub fn new(range: SourceRange, decls: Vec<Rc<Decl>>, stmt: Option<Stmt>) -> Self {
        Self {
            range,
            decls,
            stmt: RefCell::new(stmt),
            slot_count: Cell::new(0),
        }
    }
}

/// A declaration.
///
/// All declaration kinds share one shape; which fields are meaningful depends
/// on the kind. The root of a program is an unnamed `Pattern` declaration
/// whose main part is the program body.
pub struct Decl {
    pub kind: DeclKind,
    pub range: SourceRange,
    /// The declared name; `None` only for the program root.
    pub name: Option<Symbol>,
    /// Base expressions, replaced by their checked forms during semantic
    /// analysis.
    pub bases: RefCell<Vec<Rc<Expr>>>,
    /// Declared parameters (`Param` declarations).
    pub params: Vec<Rc<Decl>>,
    /// Declared type for value declarations (`Var`/`Let`/`Param`), replaced
    /// by its checked form during semantic analysis.
    pub type_expr: RefCell<Option<Rc<Expr>>>,
    pub main_part: Option<MainPart>,
    /// Index of the slot this declaration introduces in its enclosing part.
    /// Set by the checker; `FurtherPattern` declarations and the program
    /// root never get one.
    pub slot_index: Cell<Option<usize>>,
}

impl Decl {
    pub fn new(kind: DeclKind, range: SourceRange, name: Option<Symbol>) -> Self {
        Self {
            kind,
            range,
            name,
            bases: RefCell::new(Vec::new()),
            params: Vec::new(),
            type_expr: RefCell::new(None),
            main_part: None,
            slot_index: Cell::new(None),
        }
    }
}

impl fmt::Debug for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Decl({:?} {})", self.kind, name),
            None => write!(f, "Decl({:?})", self.kind),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// The resolved semantic category of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// The expression denotes a runtime value (an object or part).
    Value,
    /// The expression denotes a pattern.
    Type,
}

/// An expression's classifier: its kind together with its static pattern.
///
/// An expression whose classifier has not been set yet is "unknown"; after
/// checking, every live expression has one.
#[derive(Clone)]
pub struct Classifier {
    pub kind: ClassifierKind,
    pub pattern: StaticPattern,
}

impl Classifier {
    pub fn new(kind: ClassifierKind, pattern: StaticPattern) -> Self {
        Self { kind, pattern }
    }
}

/// An expression node.
pub enum ExprKind {
    /// An unresolved name reference.
    Name(Symbol),
    /// An unresolved member access `base.name`.
    Member { base: Rc<Expr>, name: Symbol },

    // Typed paths, inserted by the checker.
    /// The part for the given enclosing declaration. The checker's scope
    /// stack is a chain of these, linked through `parent`.
    SelfPart {
        decl: Rc<Decl>,
        parent: Option<Rc<Expr>>,
    },
    /// A single slot of the part denoted by `base`.
    Slot { base: Rc<Expr>, decl: Rc<Decl> },
    /// The origin part of the part denoted by `base` (through its mixin).
    Origin { base: Rc<Expr> },
    /// A cast from a part to the part for one of its statically-identified
    /// bases.
    CastToBase { base: Rc<Expr>, base_index: usize },
}

pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
    classifier: OnceCell<Classifier>,
}

impl Expr {
    /// Create an expression with no classifier yet.
    pub fn new(kind: ExprKind, range: SourceRange) -> Rc<Expr> {
        Rc::new(Expr {
            kind,
            range,
            classifier: OnceCell::new(),
        })
    }

    /// Create an expression that is typed at the point it is created.
    pub fn typed(kind: ExprKind, range: SourceRange, classifier: Classifier) -> Rc<Expr> {
        let expr = Expr {
            kind,
            range,
            classifier: OnceCell::new(),
        };
        let _ = expr.classifier.set(classifier);
        Rc::new(expr)
    }

    /// The expression's classifier, if it has been resolved.
    pub fn classifier(&self) -> Option<&Classifier> {
        self.classifier.get()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Name(name) => write!(f, "Name({})", name),
            ExprKind::Member { name, .. } => write!(f, "Member(.{})", name),
            ExprKind::SelfPart { decl, .. } => write!(f, "SelfPart({:?})", decl),
            ExprKind::Slot { decl, .. } => write!(f, "Slot({:?})", decl),
            ExprKind::Origin { .. } => write!(f, "Origin"),
            ExprKind::CastToBase { base_index, .. } => write!(f, "CastToBase({})", base_index),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A statement: an expression evaluated for effect, or an ordered sequence.
#[derive(Clone)]
pub enum Stmt {
    Expr(Rc<Expr>),
    Seq(SourceRange, Vec<Stmt>),
}

impl Stmt {
    pub fn range(&self) -> SourceRange {
        match self {
            Stmt::Expr(expr) => expr.range,
            Stmt::Seq(range, _) => *range,
        }
    }
}

// ============================================================================
// Static model
// ============================================================================

/// A statically-resolved pattern: empty, or a flattened mixin list in
/// precedence order (most-general first). The last mixin is always the
/// pattern's own mixin.
#[derive(Clone)]
pub enum StaticPattern {
    Empty,
    Mixins(Rc<Vec<Rc<StaticMixin>>>),
}

impl StaticPattern {
    /// All mixins in precedence order (empty slice for the empty pattern).
    pub fn mixins(&self) -> &[Rc<StaticMixin>] {
        match self {
            StaticPattern::Empty => &[],
            StaticPattern::Mixins(mixins) => mixins,
        }
    }

    /// The pattern's own mixin: the last, most-specialised entry.
    pub fn own_mixin(&self) -> Option<&Rc<StaticMixin>> {
        self.mixins().last()
    }
}

impl fmt::Debug for StaticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticPattern::Empty => write!(f, "StaticPattern[]"),
            StaticPattern::Mixins(mixins) => {
                write!(f, "StaticPattern[")?;
                for (i, mixin) in mixins.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", mixin.decl)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One mixin of a static pattern.
pub struct StaticMixin {
    /// The declaration introducing this mixin.
    pub decl: Rc<Decl>,
    /// The part expression acting as the enclosing self when this mixin's
    /// code runs; `None` only at the outermost scope.
    pub origin: Option<Rc<Expr>>,
    /// How to reach this mixin from a part viewing the whole pattern.
    pub relative_path: MixinPath,
    /// The statically-evaluated base patterns of the declaration. Indexed by
    /// `MixinPath` base edges.
    pub bases: Vec<StaticPattern>,
}

impl fmt::Debug for StaticMixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StaticMixin({:?})", self.decl)
    }
}

/// A path from a view part to one of its statically-known mixins, as a
/// sequence of indexed base edges.
#[derive(Clone)]
pub enum MixinPath {
    Empty,
    Base { base_index: usize, rest: Rc<MixinPath> },
}

impl MixinPath {
    pub fn base(base_index: usize, rest: MixinPath) -> MixinPath {
        MixinPath::Base {
            base_index,
            rest: Rc::new(rest),
        }
    }
}

impl fmt::Debug for MixinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixinPath::Empty => write!(f, "·"),
            MixinPath::Base { base_index, rest } => {
                write!(f, "base[{}].{:?}", base_index, rest)
            }
        }
    }
}
