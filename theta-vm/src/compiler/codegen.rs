// theta-vm - Bytecode compiler and virtual machine for the Theta programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: checked AST to the `BCDecl` tree.
//!
//! Every declaration compiles to two chunks. The *init* chunk runs once per
//! construction of an enclosing object, with self = the part whose mixin
//! encloses the declaration, and installs the declaration's slot value (a
//! pattern, or a freshly created object for inline values). The *body* chunk
//! is one link of the `Inner` chain run over finished objects.
//!
//! Emission happens under a stack of enclosing declarations; a self path
//! compiles to `GetSelfPart` plus one origin hop per scope level between the
//! innermost scope and the one the path names.

use std::rc::Rc;

use theta_parser::ast::{Decl, DeclKind, Expr, ExprKind, MainPart, Stmt};
use theta_parser::lexer::SourceRange;

use crate::chunk::{BCDecl, CodeChunk};
use crate::opcode::Opcode;

use super::types::{CompileError, Result};

/// The bytecode emitter.
pub struct Emitter {
    /// Enclosing declarations, outermost first.
    scopes: Vec<Rc<Decl>>,
}

impl Emitter {
    /// Create a new emitter.
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Emit a whole checked program. The root declaration is emitted like any
    /// other; the result is the program.
    pub fn emit_program(&mut self, program: &Rc<Decl>) -> Result<Rc<BCDecl>> {
        self.emit_decl(program)
    }

    fn emit_decl(&mut self, ast_decl: &Rc<Decl>) -> Result<Rc<BCDecl>> {
        let mut bc_decl = BCDecl::new(ast_decl.name.clone());

        if let Some(main_part) = &ast_decl.main_part {
            self.scopes.push(Rc::clone(ast_decl));
            let result = self.emit_main_part(main_part, &mut bc_decl);
            self.scopes.pop();
            result?;
        }

        // Init code is emitted in the enclosing scope: it runs against the
        // enclosing part, not a part of this declaration's own pattern.
        self.emit_init(ast_decl, &mut bc_decl.init_code)?;

        let bc_decl = Rc::new(bc_decl);
        for member in &bc_decl.members {
            member.set_parent(&bc_decl);
        }
        Ok(bc_decl)
    }

    fn emit_main_part(&mut self, main_part: &MainPart, bc_decl: &mut BCDecl) -> Result<()> {
        bc_decl.slot_count = main_part.slot_count.get();

        for member in &main_part.decls {
            let bc_member = self.emit_decl(member)?;
            bc_decl.members.push(bc_member);
        }

        let chunk = &mut bc_decl.body_code;
        let stmt = main_part.stmt.borrow();
        match &*stmt {
            Some(stmt) => self.emit_stmt(chunk, stmt)?,
            None => chunk.emit_op(Opcode::Inner),
        }
        chunk.emit_op(Opcode::Return);
        Ok(())
    }

    fn emit_init(&self, ast_decl: &Rc<Decl>, chunk: &mut CodeChunk) -> Result<()> {
        match ast_decl.kind {
            DeclKind::InlineValue => {
                chunk.emit_op(Opcode::GetSelfPart);
                self.emit_pattern(chunk, ast_decl)?;
                chunk.emit_op(Opcode::CreateObject);
                chunk.emit_op(Opcode::SetPartSlot);
                chunk.emit_byte(self.slot_byte(ast_decl, ast_decl.range)?);
            }

            DeclKind::Pattern => {
                // The program root introduces no slot and its init code never
                // runs; every other pattern declaration installs its pattern.
                if ast_decl.slot_index.get().is_some() {
                    chunk.emit_op(Opcode::GetSelfPart);
                    self.emit_pattern(chunk, ast_decl)?;
                    chunk.emit_op(Opcode::SetPartSlot);
                    chunk.emit_byte(self.slot_byte(ast_decl, ast_decl.range)?);
                }
            }

            _ => {
                return Err(CompileError::UnhandledDecl {
                    loc: ast_decl.range.loc(),
                });
            }
        }

        chunk.emit_op(Opcode::Return);
        Ok(())
    }

    /// Emit code that constructs the pattern for `decl` on the stack.
    fn emit_pattern(&self, chunk: &mut CodeChunk, decl: &Rc<Decl>) -> Result<()> {
        let bases = decl.bases.borrow();
        let loc = decl.range.loc();

        if decl.main_part.is_some() {
            match bases.len() {
                0 => chunk.emit_op(Opcode::CreatePatternFromMainPart),
                1 => {
                    self.emit_expr(chunk, &bases[0])?;
                    chunk.emit_op(Opcode::CreatePatternFromBaseAndMainPart);
                }
                _ => return Err(CompileError::UnhandledMerge { loc }),
            }
        } else {
            match bases.len() {
                0 => chunk.emit_op(Opcode::GetEmptyPattern),
                1 => self.emit_expr(chunk, &bases[0])?,
                _ => return Err(CompileError::UnhandledMerge { loc }),
            }
        }
        Ok(())
    }

    fn emit_expr(&self, chunk: &mut CodeChunk, expr: &Rc<Expr>) -> Result<()> {
        match &expr.kind {
            ExprKind::Slot { base, decl } => {
                self.emit_expr(chunk, base)?;
                chunk.emit_op(Opcode::GetPartSlot);
                chunk.emit_byte(self.slot_byte(decl, expr.range)?);
            }

            ExprKind::SelfPart { decl, .. } => {
                chunk.emit_op(Opcode::GetSelfPart);

                // One origin hop per scope level between the innermost scope
                // and the one the path names.
                for scope in self.scopes.iter().rev() {
                    if Rc::ptr_eq(scope, decl) {
                        break;
                    }
                    chunk.emit_op(Opcode::GetMixinFromPart);
                    chunk.emit_op(Opcode::GetOriginPartFromMixin);
                }
            }

            ExprKind::Origin { base } => {
                self.emit_expr(chunk, base)?;
                chunk.emit_op(Opcode::GetMixinFromPart);
                chunk.emit_op(Opcode::GetOriginPartFromMixin);
            }

            // Cross-part casts have no lowering (reserved GetPartFromObject).
            _ => {
                return Err(CompileError::UnhandledExpr {
                    loc: expr.range.loc(),
                });
            }
        }
        Ok(())
    }

    fn emit_stmt(&self, chunk: &mut CodeChunk, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => {
                self.emit_expr(chunk, expr)?;
                chunk.emit_op(Opcode::Pop);
            }
            Stmt::Seq(_, stmts) => {
                for stmt in stmts {
                    self.emit_stmt(chunk, stmt)?;
                }
            }
        }
        Ok(())
    }

    fn slot_byte(&self, decl: &Rc<Decl>, range: SourceRange) -> Result<u8> {
        let index = decl.slot_index.get().ok_or(CompileError::UnhandledDecl {
            loc: range.loc(),
        })?;
        u8::try_from(index).map_err(|_| CompileError::TooManySlots { loc: range.loc() })
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::check::Checker;
    use theta_parser::Parser;

    fn compile(source: &str) -> Rc<BCDecl> {
        let program = Parser::parse_program_str(source).expect("parse error");
        Checker::new().check_program(&program).expect("check error");
        Emitter::new().emit_program(&program).expect("emit error")
    }

    fn compile_err(source: &str) -> CompileError {
        let program = Parser::parse_program_str(source).expect("parse error");
        Checker::new().check_program(&program).expect("check error");
        Emitter::new()
            .emit_program(&program)
            .expect_err("expected an emit error")
    }

    fn disassembly(chunk: &CodeChunk) -> String {
        let mut out = String::new();
        chunk.disassemble(&mut out);
        out
    }

    #[test]
    fn test_root_init_is_bare_return() {
        let program = compile("");
        assert_eq!(disassembly(&program.init_code), "RETURN\n");
        assert_eq!(disassembly(&program.body_code), "INNER\nRETURN\n");
    }

    #[test]
    fn test_pattern_decl_init() {
        let program = compile("x: { }");
        let x = &program.members[0];
        assert_eq!(
            disassembly(&x.init_code),
            "GET_SELF_PART\nCREATE_PATTERN_FROM_MAIN_PART\nSET_PART_SLOT 0\nRETURN\n"
        );
    }

    #[test]
    fn test_empty_pattern_decl_init() {
        let program = compile("x: ;");
        let x = &program.members[0];
        assert_eq!(
            disassembly(&x.init_code),
            "GET_SELF_PART\nGET_EMPTY_PATTERN\nSET_PART_SLOT 0\nRETURN\n"
        );
    }

    #[test]
    fn test_inline_value_init() {
        let program = compile("x: { } y: @ x;");
        let y = &program.members[1];
        assert_eq!(
            disassembly(&y.init_code),
            "GET_SELF_PART\nGET_SELF_PART\nGET_PART_SLOT 0\nCREATE_OBJECT\nSET_PART_SLOT 1\nRETURN\n"
        );
    }

    #[test]
    fn test_base_and_main_part() {
        let program = compile("A: { } B: A { }");
        let b = &program.members[1];
        assert_eq!(
            disassembly(&b.init_code),
            "GET_SELF_PART\nGET_SELF_PART\nGET_PART_SLOT 0\n\
             CREATE_PATTERN_FROM_BASE_AND_MAIN_PART\nSET_PART_SLOT 1\nRETURN\n"
        );
    }

    #[test]
    fn test_self_path_origin_hops() {
        // Inside A, the base `x` of f lives one scope out: the emitted path
        // hops from f's enclosing part to the root part.
        let program = compile("x: { } A: { f: x { } }");
        let f = &program.members[1].members[0];
        assert_eq!(
            disassembly(&f.init_code),
            "GET_SELF_PART\nGET_SELF_PART\nGET_MIXIN_FROM_PART\nGET_ORIGIN_PART_FROM_MIXIN\n\
             GET_PART_SLOT 0\nCREATE_PATTERN_FROM_BASE_AND_MAIN_PART\nSET_PART_SLOT 0\nRETURN\n"
        );
    }

    #[test]
    fn test_body_statement() {
        let program = compile("x: { } x; x;");
        assert_eq!(
            disassembly(&program.body_code),
            "GET_SELF_PART\nGET_PART_SLOT 0\nPOP\nGET_SELF_PART\nGET_PART_SLOT 0\nPOP\nRETURN\n"
        );
    }

    #[test]
    fn test_member_tree_shape() {
        let program = compile("A: { f: { } } b: @ A;");
        assert_eq!(program.members.len(), 2);
        assert_eq!(program.members[0].members.len(), 1);
        assert_eq!(program.slot_count, 2);
        assert_eq!(program.members[0].slot_count, 1);
        assert_eq!(program.members[0].members[0].qualified_name(), "_::A::f");
    }

    #[test]
    fn test_unhandled_decl_kind() {
        // Declaration kinds with no emission rule are rejected.
        use theta_parser::ast::MainPart;
        use theta_parser::lexer::SourceRange;
        use theta_parser::symbol::Symbol;

        let range = SourceRange::default();
        let var = Rc::new(Decl::new(DeclKind::Var, range, Some(Symbol::new("v"))));

        let mut root = Decl::new(DeclKind::Pattern, range, None);
        root.main_part = Some(MainPart::new(range, vec![var], None));
        let root = Rc::new(root);

        Checker::new().check_program(&root).expect("check error");
        let err = Emitter::new()
            .emit_program(&root)
            .expect_err("expected an emit error");
        assert!(matches!(err, CompileError::UnhandledDecl { .. }));
    }

    #[test]
    fn test_unhandled_merge() {
        // Two bases survive checking only when the declaration has no main
        // part; the emitter rejects them when building its pattern.
        let err = compile_err("A: { } B: { } C: A, B;");
        assert!(matches!(err, CompileError::UnhandledMerge { .. }));
    }

    #[test]
    fn test_inherited_reference_is_unhandled() {
        // A name resolved through an inherited sibling mixin needs a
        // cross-part cast, which has no lowering.
        let err = compile_err("A: { f: { } } B: A { g: f { } }");
        assert!(matches!(err, CompileError::UnhandledExpr { .. }));
    }
}
