//! Pass 3: control-flow and return validation.
//!
//! Works entirely from the annotations the earlier passes left behind:
//! return statements are checked against the enclosing function, stamped
//! `break`/`continue` nodes are checked for loop context, and non-void
//! functions must contain at least one return on some path (the check is
//! existential, not per-branch).

use crate::frontend::ast::*;
use crate::frontend::diagnostics::Diagnostics;

use super::{CurrentFunction, SemanticAnalyzer};

impl SemanticAnalyzer {
    pub(crate) fn validate_program(&mut self, program: &mut Program, sink: &mut Diagnostics) {
        for decl in &mut program.declarations {
            self.validate_decl(decl, sink);
        }
    }

    fn validate_decl(&mut self, decl: &mut Decl, sink: &mut Diagnostics) {
        match decl {
            Decl::Fun(fun) => self.validate_fun(fun, sink),
            Decl::Class(class) => {
                for member in &mut class.body.declarations {
                    self.validate_decl(member, sink);
                }
            }
            Decl::Var(_) | Decl::Enum(_) => {}
        }
    }

    fn validate_fun(&mut self, fun: &mut FunDecl, sink: &mut Diagnostics) {
        let return_type = fun.return_type.clone().unwrap_or_else(TypeNode::void);
        let enclosing = self.current_function.replace(CurrentFunction {
            name: fun.name.clone(),
            return_type: return_type.clone(),
        });
        self.validate_stmts(&mut fun.body.statements, sink);
        self.current_function = enclosing;

        if !return_type.is_void() && !block_has_return(&fun.body) {
            self.error(
                sink,
                fun.loc,
                format!(
                    "Function '{}' with return type '{}' lacks return statement",
                    fun.name, return_type
                ),
            );
        }
    }

    fn validate_stmts(&mut self, statements: &mut [Stmt], sink: &mut Diagnostics) {
        for stmt in statements {
            self.validate_stmt(stmt, sink);
        }
    }

    fn validate_stmt(&mut self, stmt: &mut Stmt, sink: &mut Diagnostics) {
        match stmt {
            Stmt::Decl(decl) => self.validate_decl(decl, sink),
            Stmt::Return(ret) => self.validate_return(ret, sink),
            Stmt::If(s) => {
                self.validate_stmts(&mut s.then_branch.statements, sink);
                if let Some(else_branch) = &mut s.else_branch {
                    self.validate_stmts(&mut else_branch.statements, sink);
                }
            }
            Stmt::While(s) => self.validate_stmts(&mut s.body.statements, sink),
            Stmt::For(s) => self.validate_stmts(&mut s.body.statements, sink),
            Stmt::Switch(s) => {
                for case in &mut s.cases {
                    self.validate_stmts(&mut case.body.statements, sink);
                }
                if let Some(default) = &mut s.default {
                    self.validate_stmts(&mut default.statements, sink);
                }
            }
            Stmt::Break(s) => {
                if !s.inside_loop {
                    self.error(sink, s.loc, "Break statement outside loop");
                }
            }
            Stmt::Continue(s) => {
                if !s.inside_loop {
                    self.error(sink, s.loc, "Continue statement outside loop");
                }
            }
            Stmt::Expr(_) => {}
        }
    }

    fn validate_return(&mut self, ret: &mut ReturnStmt, sink: &mut Diagnostics) {
        let Some(current) = self.current_function.clone() else {
            self.error(sink, ret.loc, "Return statement outside function");
            return;
        };

        let actual = match ret.expression.as_ref() {
            Some(expr) => match self.expression_type(expr, sink) {
                Some(ty) => ty,
                // The value's type is unknown after earlier errors; nothing
                // more to check here.
                None => return,
            },
            None => TypeNode::void(),
        };

        if !current.return_type.is_compatible_with(&actual) {
            self.error(
                sink,
                ret.loc,
                format!("Return type mismatch in function {}", current.name),
            );
        }
    }
}

/// Existential return search. Nested function declarations are skipped:
/// their returns satisfy only themselves.
fn block_has_return(block: &Block) -> bool {
    block.statements.iter().any(stmt_has_return)
}

fn stmt_has_return(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If(s) => {
            block_has_return(&s.then_branch)
                || s.else_branch.as_ref().is_some_and(block_has_return)
        }
        Stmt::While(s) => block_has_return(&s.body),
        Stmt::For(s) => block_has_return(&s.body),
        Stmt::Switch(s) => {
            s.cases.iter().any(|case| block_has_return(&case.body))
                || s.default.as_ref().is_some_and(block_has_return)
        }
        Stmt::Decl(_) | Stmt::Expr(_) | Stmt::Break(_) | Stmt::Continue(_) => false,
    }
}
