// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Semantic analysis pass: name resolution over the mixin object model.
//!
//! The checker walks the declaration tree with a stack of *self* path
//! expressions, one per lexically enclosing declaration. For each
//! declaration it:
//!
//! 1. Checks that the base expressions resolve to patterns, replacing them
//!    with typed path expressions.
//! 2. Builds the declaration's static pattern: the flattened,
//!    precedence-ordered mixin list, each mixin carrying the path from a
//!    viewing part back to it.
//! 3. Assigns slot indices to the members of its main part.
//! 4. Resolves every name and member expression to a typed path
//!    (`SelfPart` / `Slot` / `Origin` / `CastToBase`), attaching a
//!    classifier as it goes.
//!
//! Lookup views one object through the part the code at hand lives in: the
//! viewing part shadows its sibling mixins, and a name found in two sibling
//! mixins with no shadowing declaration is ambiguous.

use std::rc::Rc;

use theta_parser::ast::{
    Classifier, ClassifierKind, Decl, DeclKind, Expr, ExprKind, MainPart, MixinPath, StaticMixin,
    StaticPattern, Stmt,
};
use theta_parser::lexer::SourceRange;
use theta_parser::symbol::Symbol;

use super::types::{CompileError, Result};

/// The semantic checker.
pub struct Checker {
    /// Innermost self expression; scope stack links through
    /// `ExprKind::SelfPart::parent`. `None` at the outermost scope.
    self_expr: Option<Rc<Expr>>,
}

impl Checker {
    /// Create a new checker.
    pub fn new() -> Self {
        Self { self_expr: None }
    }

    /// Check a whole program (the unnamed root declaration).
    pub fn check_program(&mut self, program: &Rc<Decl>) -> Result<()> {
        self.check_decl(program)
    }

    // ========================================================================
    // Classifiers and static patterns
    // ========================================================================

    fn classifier_kind(&self, decl: &Decl) -> Result<ClassifierKind> {
        match decl.kind {
            DeclKind::InlineValue
            | DeclKind::ReferenceValue
            | DeclKind::Var
            | DeclKind::Let
            | DeclKind::Param => Ok(ClassifierKind::Value),

            DeclKind::Pattern
            | DeclKind::VirtualPattern
            | DeclKind::FurtherPattern
            | DeclKind::Object => Ok(ClassifierKind::Type),

            DeclKind::Syntax => Err(CompileError::UnhandledDecl {
                loc: decl.range.loc(),
            }),
        }
    }

    /// The classifier for `decl` as seen through `part`.
    fn get_classifier(&self, decl: &Rc<Decl>, part: Option<&Rc<Expr>>) -> Result<Classifier> {
        let kind = self.classifier_kind(decl)?;
        let pattern = self.create_static_pattern(part, decl)?;
        Ok(Classifier::new(kind, pattern))
    }

    /// Build the static pattern of `decl` relative to the part expression
    /// `origin`.
    ///
    /// The result lists the mixins contributed by the (single) base first, in
    /// the base's own order, then the declaration's own mixin. Each copied
    /// mixin's path gains one base edge: follow base 0 of the viewing
    /// declaration, then the mixin's path within that base.
    fn create_static_pattern(
        &self,
        origin: Option<&Rc<Expr>>,
        decl: &Rc<Decl>,
    ) -> Result<StaticPattern> {
        let base_exprs = decl.bases.borrow();
        let mut bases = Vec::with_capacity(base_exprs.len());
        for base_expr in base_exprs.iter() {
            bases.push(self.eval_static_pattern(base_expr, origin)?);
        }
        drop(base_exprs);

        let loc = decl.range.loc();

        if decl.main_part.is_none() {
            let mut bases = bases;
            return match bases.len() {
                0 => Ok(StaticPattern::Empty),
                1 => Ok(bases.remove(0)),
                _ => Err(CompileError::UnhandledMerge { loc }),
            };
        }

        if bases.len() > 1 {
            return Err(CompileError::UnhandledMerge { loc });
        }

        let mut mixins: Vec<Rc<StaticMixin>> = Vec::new();
        if let Some(base) = bases.first() {
            for mixin in base.mixins() {
                mixins.push(Rc::new(StaticMixin {
                    decl: Rc::clone(&mixin.decl),
                    origin: mixin.origin.clone(),
                    relative_path: MixinPath::base(0, mixin.relative_path.clone()),
                    bases: mixin.bases.clone(),
                }));
            }
        }
        mixins.push(Rc::new(StaticMixin {
            decl: Rc::clone(decl),
            origin: origin.cloned(),
            relative_path: MixinPath::Empty,
            bases,
        }));

        Ok(StaticPattern::Mixins(Rc::new(mixins)))
    }

    // ========================================================================
    // Scope stack
    // ========================================================================

    fn push_scope(&mut self, decl: &Rc<Decl>) -> Result<()> {
        debug_assert!(decl.main_part.is_some());

        let origin = self.self_expr.clone();

        let mut classifier = self.get_classifier(decl, origin.as_ref())?;
        // The self part is a value even when the declaration denotes a type
        classifier.kind = ClassifierKind::Value;

        self.self_expr = Some(Expr::typed(
            ExprKind::SelfPart {
                decl: Rc::clone(decl),
                parent: origin,
            },
            decl.range,
            classifier,
        ));
        Ok(())
    }

    fn pop_scope(&mut self) {
        let parent = self.self_expr.as_ref().and_then(|expr| match &expr.kind {
            ExprKind::SelfPart { parent, .. } => parent.clone(),
            _ => None,
        });
        self.self_expr = parent;
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look `name` up among the members of the single mixin `part` views the
    /// object through.
    fn look_up_in_single_part(
        &self,
        range: SourceRange,
        name: &Symbol,
        part: &Rc<Expr>,
    ) -> Result<Option<Rc<Expr>>> {
        let Some(classifier) = part.classifier() else {
            return Ok(None);
        };
        if classifier.kind != ClassifierKind::Value {
            return Err(CompileError::ExpectedValue {
                loc: part.range.loc(),
            });
        }

        let Some(own) = classifier.pattern.own_mixin() else {
            return Ok(None);
        };
        let Some(main_part) = own.decl.main_part.as_ref() else {
            return Ok(None);
        };

        for member in &main_part.decls {
            if member.name.as_ref() != Some(name) {
                continue;
            }

            // The classifier of the member as seen through `part`, so that
            // its pattern is expressed relative to the viewing object.
            let classifier = self.get_classifier(member, Some(part))?;
            return Ok(Some(Expr::typed(
                ExprKind::Slot {
                    base: Rc::clone(part),
                    decl: Rc::clone(member),
                },
                range,
                classifier,
            )));
        }

        Ok(None)
    }

    /// Look `name` up in the object viewed through `view_part`: first the
    /// viewing mixin itself (which shadows its siblings), then every mixin of
    /// the viewed pattern, signalling ambiguity on a second hit.
    fn look_up_in_object(
        &self,
        range: SourceRange,
        name: &Symbol,
        view_part: &Rc<Expr>,
    ) -> Result<Option<Rc<Expr>>> {
        if let Some(direct) = self.look_up_in_single_part(range, name, view_part)? {
            return Ok(Some(direct));
        }

        let Some(classifier) = view_part.classifier() else {
            return Ok(None);
        };
        let pattern = classifier.pattern.clone();

        let mut existing: Option<Rc<Expr>> = None;
        for mixin in pattern.mixins() {
            let other_part = self.static_eval_path(&mixin.relative_path, view_part)?;

            let Some(result) = self.look_up_in_single_part(range, name, &other_part)? else {
                continue;
            };

            if existing.is_some() {
                return Err(CompileError::Ambiguous {
                    name: name.clone(),
                    loc: range.loc(),
                });
            }
            existing = Some(result);
        }

        Ok(existing)
    }

    /// Look `name` up through the scope stack, innermost first.
    fn look_up(&self, range: SourceRange, name: &Symbol) -> Result<Rc<Expr>> {
        let mut scope = self.self_expr.clone();
        while let Some(part) = scope {
            if let Some(result) = self.look_up_in_object(range, name, &part)? {
                return Ok(result);
            }
            scope = match &part.kind {
                ExprKind::SelfPart { parent, .. } => parent.clone(),
                _ => None,
            };
        }

        Err(CompileError::Undefined {
            name: name.clone(),
            loc: range.loc(),
        })
    }

    // ========================================================================
    // Static evaluation
    // ========================================================================

    /// Walk a mixin path from the part expression `origin`, producing a chain
    /// of base casts.
    fn static_eval_path(&self, path: &MixinPath, origin: &Rc<Expr>) -> Result<Rc<Expr>> {
        match path {
            MixinPath::Empty => Ok(Rc::clone(origin)),

            MixinPath::Base { base_index, rest } => {
                let loc = origin.range.loc();
                let own = origin
                    .classifier()
                    .and_then(|classifier| classifier.pattern.own_mixin())
                    .ok_or(CompileError::UnhandledExpr { loc })?;
                let base_pattern = own
                    .bases
                    .get(*base_index)
                    .ok_or(CompileError::UnhandledExpr { loc })?
                    .clone();

                let cast = Expr::typed(
                    ExprKind::CastToBase {
                        base: Rc::clone(origin),
                        base_index: *base_index,
                    },
                    origin.range,
                    Classifier::new(ClassifierKind::Value, base_pattern),
                );
                self.static_eval_path(rest, &cast)
            }
        }
    }

    /// Re-base a checked path expression onto a new origin part: a self path
    /// becomes the origin itself, a slot path re-slots its member on the
    /// origin.
    fn static_eval_expr(&self, expr: &Rc<Expr>, origin: Option<&Rc<Expr>>) -> Result<Rc<Expr>> {
        let loc = expr.range.loc();
        match &expr.kind {
            ExprKind::SelfPart { .. } => origin
                .map(Rc::clone)
                .ok_or(CompileError::UnhandledExpr { loc }),

            ExprKind::Slot { decl, .. } => {
                let origin = origin.ok_or(CompileError::UnhandledExpr { loc })?;
                let classifier = self.get_classifier(decl, Some(origin))?;
                Ok(Expr::typed(
                    ExprKind::Slot {
                        base: Rc::clone(origin),
                        decl: Rc::clone(decl),
                    },
                    expr.range,
                    classifier,
                ))
            }

            _ => Err(CompileError::UnhandledExpr { loc }),
        }
    }

    /// Statically evaluate a checked base expression relative to `origin` and
    /// require a pattern.
    fn eval_static_pattern(
        &self,
        expr: &Rc<Expr>,
        origin: Option<&Rc<Expr>>,
    ) -> Result<StaticPattern> {
        let pattern_ref = self.static_eval_expr(expr, origin)?;
        match pattern_ref.classifier() {
            Some(classifier) if classifier.kind == ClassifierKind::Type => {
                Ok(classifier.pattern.clone())
            }
            _ => Err(CompileError::ExpectedPattern {
                loc: expr.range.loc(),
            }),
        }
    }

    // ========================================================================
    // Checking
    // ========================================================================

    fn check_expr(&self, expr: &Rc<Expr>) -> Result<Rc<Expr>> {
        match &expr.kind {
            ExprKind::Name(name) => self.look_up(expr.range, name),

            ExprKind::Member { base, name } => {
                let base = self.check_expr(base)?;
                self.look_up_in_object(expr.range, name, &base)?
                    .ok_or_else(|| CompileError::Undefined {
                        name: name.clone(),
                        loc: expr.range.loc(),
                    })
            }

            _ => Err(CompileError::UnhandledExpr {
                loc: expr.range.loc(),
            }),
        }
    }

    /// Check an expression in a position requiring a pattern.
    fn check_pattern_expr(&self, expr: &Rc<Expr>) -> Result<Rc<Expr>> {
        let checked = self.check_expr(expr)?;
        match checked.classifier() {
            Some(classifier) if classifier.kind == ClassifierKind::Type => Ok(checked),
            _ => Err(CompileError::ExpectedPattern {
                loc: checked.range.loc(),
            }),
        }
    }

    fn check_stmt(&self, stmt: &Stmt) -> Result<Stmt> {
        match stmt {
            Stmt::Expr(expr) => Ok(Stmt::Expr(self.check_expr(expr)?)),
            Stmt::Seq(range, stmts) => {
                let mut checked = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    checked.push(self.check_stmt(stmt)?);
                }
                Ok(Stmt::Seq(*range, checked))
            }
        }
    }

    fn check_decl(&mut self, decl: &Rc<Decl>) -> Result<()> {
        // Bases must resolve to patterns; replace them with checked forms.
        let bases: Vec<Rc<Expr>> = decl.bases.borrow().clone();
        let mut checked_bases = Vec::with_capacity(bases.len());
        for base in &bases {
            checked_bases.push(self.check_pattern_expr(base)?);
        }
        *decl.bases.borrow_mut() = checked_bases;

        // Parameter types are pattern positions as well.
        for param in &decl.params {
            let type_expr = param.type_expr.borrow().clone();
            if let Some(type_expr) = type_expr {
                let checked = self.check_pattern_expr(&type_expr)?;
                *param.type_expr.borrow_mut() = Some(checked);
            }
        }

        if let Some(main_part) = &decl.main_part {
            self.push_scope(decl)?;
            let result = self.check_main_part(main_part);
            self.pop_scope();
            result?;
        }

        Ok(())
    }

    fn check_main_part(&mut self, main_part: &MainPart) -> Result<()> {
        // Slot assignment: members take consecutive slots in source order;
        // further-bindings take none.
        let mut slot_counter = 0;
        for member in &main_part.decls {
            match member.kind {
                DeclKind::FurtherPattern => {}
                _ => {
                    member.slot_index.set(Some(slot_counter));
                    slot_counter += 1;
                }
            }
        }
        main_part.slot_count.set(slot_counter);

        for member in &main_part.decls {
            self.check_decl(member)?;
        }

        let stmt = main_part.stmt.borrow().clone();
        if let Some(stmt) = stmt {
            let checked = self.check_stmt(&stmt)?;
            *main_part.stmt.borrow_mut() = Some(checked);
        }

        Ok(())
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
