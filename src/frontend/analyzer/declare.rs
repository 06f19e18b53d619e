//! Pass 1: scope construction and symbol registration.
//!
//! Walks every declaration-bearing container in source order, creates the
//! scope tree, and registers each declared name in its scope. Scope ids are
//! recorded on the owning nodes so the later passes re-enter the same
//! scopes instead of rebuilding them.

use crate::frontend::ast::*;
use crate::frontend::diagnostics::Diagnostics;
use crate::frontend::symbols::{ScopeKind, Symbol, SymbolKind, GLOBAL_SCOPE};

use super::SemanticAnalyzer;

impl SemanticAnalyzer {
    pub(crate) fn declare_program(&mut self, program: &mut Program, sink: &mut Diagnostics) {
        for decl in &mut program.declarations {
            self.declare_decl(decl, sink);
        }
    }

    fn declare_decl(&mut self, decl: &mut Decl, sink: &mut Diagnostics) {
        match decl {
            Decl::Var(var) => self.declare_var(var, sink),
            Decl::Fun(fun) => self.declare_fun(fun, sink),
            Decl::Class(class) => self.declare_class(class, sink),
            Decl::Enum(decl) => self.declare_enum(decl, sink),
        }
    }

    pub(crate) fn declare_var(&mut self, var: &mut VarDecl, sink: &mut Diagnostics) {
        var.symbol = None;
        if self.symbols.lookup_local(&var.name).is_some() {
            self.error(
                sink,
                var.loc,
                format!("Duplicate variable declaration: {}", var.name),
            );
            return;
        }
        let Some(declared) = var.declared_type.clone() else {
            self.error(
                sink,
                var.loc,
                format!("Missing type annotation for variable: {}", var.name),
            );
            return;
        };

        let id = self.symbols.define(Symbol {
            name: var.name.clone(),
            kind: SymbolKind::Variable,
            ty: Some(declared),
            declared_at: var.loc,
            scope: GLOBAL_SCOPE, // fixed up by define
            own_scope: None,
            is_initialized: var.initializer.is_some(),
        });
        var.symbol = Some(id);
    }

    fn declare_fun(&mut self, fun: &mut FunDecl, sink: &mut Diagnostics) {
        fun.symbol = None;
        if self.symbols.lookup_local(&fun.name).is_some() {
            self.error(
                sink,
                fun.loc,
                format!("Duplicate function declaration: {}", fun.name),
            );
        } else {
            let return_type = fun.return_type.clone().unwrap_or_else(TypeNode::void);
            let id = self.symbols.define(Symbol {
                name: fun.name.clone(),
                kind: SymbolKind::Function,
                ty: Some(return_type),
                declared_at: fun.loc,
                scope: GLOBAL_SCOPE,
                own_scope: None,
                is_initialized: true,
            });
            fun.symbol = Some(id);
        }

        // Scopes are built even when the definition itself was skipped as a
        // duplicate, so the later passes can still walk the body.
        let (param_scope, (body_scope, ())) =
            self.with_new_scope(ScopeKind::Parameters, |this| {
                for param in &fun.parameters {
                    if this.symbols.lookup_local(&param.name).is_some() {
                        this.error(
                            sink,
                            param.loc,
                            format!("Duplicate variable declaration: {}", param.name),
                        );
                        continue;
                    }
                    this.symbols.define(Symbol {
                        name: param.name.clone(),
                        kind: SymbolKind::Variable,
                        ty: Some(param.ty.clone()),
                        declared_at: param.loc,
                        scope: GLOBAL_SCOPE,
                        own_scope: None,
                        is_initialized: true,
                    });
                }
                this.with_new_scope(ScopeKind::FunctionBody, |this| {
                    this.declare_stmts(&mut fun.body.statements, sink);
                })
            });

        fun.param_scope = Some(param_scope);
        fun.body_scope = Some(body_scope);
        // The function body block shares the function-body scope.
        fun.body.scope = Some(body_scope);
        if let Some(id) = fun.symbol {
            self.symbols.get_mut(id).own_scope = Some(param_scope);
        }
    }

    fn declare_class(&mut self, class: &mut ClassDecl, sink: &mut Diagnostics) {
        class.symbol = None;
        if self.symbols.lookup_local(&class.name).is_some() {
            self.error(
                sink,
                class.loc,
                format!("Duplicate class declaration: {}", class.name),
            );
        } else {
            let id = self.symbols.define(Symbol {
                name: class.name.clone(),
                kind: SymbolKind::Class,
                ty: Some(TypeNode::new(&class.name)),
                declared_at: class.loc,
                scope: GLOBAL_SCOPE,
                own_scope: None,
                is_initialized: true,
            });
            class.symbol = Some(id);
        }

        let (scope, ()) = self.with_new_scope(ScopeKind::Class, |this| {
            for decl in &mut class.body.declarations {
                this.declare_decl(decl, sink);
            }
        });
        class.own_scope = Some(scope);
        if let Some(id) = class.symbol {
            self.symbols.get_mut(id).own_scope = Some(scope);
        }
    }

    fn declare_enum(&mut self, decl: &mut EnumDecl, sink: &mut Diagnostics) {
        decl.symbol = None;
        if self.symbols.lookup_local(&decl.name).is_some() {
            self.error(
                sink,
                decl.loc,
                format!("Duplicate enum declaration: {}", decl.name),
            );
        } else {
            let id = self.symbols.define(Symbol {
                name: decl.name.clone(),
                kind: SymbolKind::Enum,
                ty: Some(TypeNode::new(&decl.name)),
                declared_at: decl.loc,
                scope: GLOBAL_SCOPE,
                own_scope: None,
                is_initialized: true,
            });
            decl.symbol = Some(id);
        }

        // Each value lives in the enum's own scope and carries the enum type.
        let enum_type = TypeNode::new(&decl.name);
        let (scope, ()) = self.with_new_scope(ScopeKind::Enum, |this| {
            for value in &decl.values {
                if this.symbols.lookup_local(value).is_some() {
                    this.error(
                        sink,
                        decl.loc,
                        format!("Duplicate variable declaration: {value}"),
                    );
                    continue;
                }
                this.symbols.define(Symbol {
                    name: value.clone(),
                    kind: SymbolKind::Variable,
                    ty: Some(enum_type.clone()),
                    declared_at: decl.loc,
                    scope: GLOBAL_SCOPE,
                    own_scope: None,
                    is_initialized: true,
                });
            }
        });
        decl.own_scope = Some(scope);
        if let Some(id) = decl.symbol {
            self.symbols.get_mut(id).own_scope = Some(scope);
        }
    }

    fn declare_stmts(&mut self, statements: &mut [Stmt], sink: &mut Diagnostics) {
        for stmt in statements {
            self.declare_stmt(stmt, sink);
        }
    }

    fn declare_stmt(&mut self, stmt: &mut Stmt, sink: &mut Diagnostics) {
        match stmt {
            Stmt::Decl(decl) => self.declare_decl(decl, sink),
            Stmt::If(s) => {
                self.declare_block(&mut s.then_branch, sink);
                if let Some(else_branch) = &mut s.else_branch {
                    self.declare_block(else_branch, sink);
                }
            }
            Stmt::While(s) => self.declare_block(&mut s.body, sink),
            Stmt::For(s) => {
                // The for-initializer declares into the enclosing scope.
                if let Some(init) = &mut s.init {
                    self.declare_var(init, sink);
                }
                self.declare_block(&mut s.body, sink);
            }
            Stmt::Switch(s) => {
                for case in &mut s.cases {
                    self.declare_block(&mut case.body, sink);
                }
                if let Some(default) = &mut s.default {
                    self.declare_block(default, sink);
                }
            }
            Stmt::Expr(_) | Stmt::Return(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn declare_block(&mut self, block: &mut Block, sink: &mut Diagnostics) {
        let (scope, ()) = self.with_new_scope(ScopeKind::Block, |this| {
            this.declare_stmts(&mut block.statements, sink);
        });
        block.scope = Some(scope);
    }
}
