//! Pass 2: type resolution.
//!
//! Re-enters the scopes recorded by the declaration pass, resolves every
//! identifier through the lexical chain, and attaches evaluated types to the
//! typeable expression forms. Loop conditions are checked here and
//! `break`/`continue` are stamped with their loop context while the loop
//! depth is live.

use crate::frontend::ast::*;
use crate::frontend::diagnostics::Diagnostics;
use crate::frontend::symbols::SymbolKind;

use super::SemanticAnalyzer;

impl SemanticAnalyzer {
    pub(crate) fn resolve_program(&mut self, program: &mut Program, sink: &mut Diagnostics) {
        for decl in &mut program.declarations {
            self.resolve_decl(decl, sink);
        }
    }

    fn resolve_decl(&mut self, decl: &mut Decl, sink: &mut Diagnostics) {
        match decl {
            Decl::Var(var) => self.resolve_var(var, sink),
            Decl::Fun(fun) => self.resolve_fun(fun, sink),
            Decl::Class(class) => self.resolve_class(class, sink),
            Decl::Enum(_) => {}
        }
    }

    pub(crate) fn resolve_var(&mut self, var: &mut VarDecl, sink: &mut Diagnostics) {
        let declared = var.declared_type.clone();
        if let Some(init) = var.initializer.as_mut() {
            self.resolve_expr(init, declared.as_ref(), sink);
            let inferred = self.expression_type(init, sink);
            if let (Some(declared), Some(inferred)) = (&declared, &inferred) {
                if !declared.is_compatible_with(inferred) {
                    self.error(
                        sink,
                        var.loc,
                        format!(
                            "Type mismatch in variable '{}'. Declared: {}, Inferred: {}",
                            var.name, declared, inferred
                        ),
                    );
                }
            }
        }
        // The resolved type follows the annotation even when the
        // initializer disagreed; the mismatch is already on record.
        var.resolved_type = var.declared_type.clone();
    }

    fn resolve_fun(&mut self, fun: &mut FunDecl, sink: &mut Diagnostics) {
        let param_scope = fun.param_scope;
        let body_scope = fun.body_scope;
        self.with_scope(param_scope, |this| {
            this.with_scope(body_scope, |this| {
                this.resolve_stmts(&mut fun.body.statements, sink);
            })
        });
    }

    fn resolve_class(&mut self, class: &mut ClassDecl, sink: &mut Diagnostics) {
        let scope = class.own_scope;
        self.with_scope(scope, |this| {
            for decl in &mut class.body.declarations {
                this.resolve_decl(decl, sink);
            }
        });
    }

    fn resolve_stmts(&mut self, statements: &mut [Stmt], sink: &mut Diagnostics) {
        for stmt in statements {
            self.resolve_stmt(stmt, sink);
        }
    }

    fn resolve_block(&mut self, block: &mut Block, sink: &mut Diagnostics) {
        let scope = block.scope;
        self.with_scope(scope, |this| this.resolve_stmts(&mut block.statements, sink));
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt, sink: &mut Diagnostics) {
        match stmt {
            Stmt::Decl(decl) => self.resolve_decl(decl, sink),
            Stmt::Expr(stmt) => self.resolve_expr(&mut stmt.expression, None, sink),
            Stmt::Return(ret) => {
                if let Some(expr) = ret.expression.as_mut() {
                    self.resolve_expr(expr, None, sink);
                }
            }
            Stmt::If(s) => {
                self.resolve_expr(&mut s.condition, None, sink);
                self.resolve_block(&mut s.then_branch, sink);
                if let Some(else_branch) = &mut s.else_branch {
                    self.resolve_block(else_branch, sink);
                }
            }
            Stmt::While(s) => {
                self.resolve_expr(&mut s.condition, None, sink);
                if let Some(ty) = self.expression_type(&s.condition, sink) {
                    if ty.name != "bool" {
                        self.error(sink, s.condition.loc(), "While condition must be boolean");
                    }
                }
                self.loop_depth += 1;
                self.resolve_block(&mut s.body, sink);
                self.loop_depth -= 1;
            }
            Stmt::For(s) => {
                if let Some(init) = &mut s.init {
                    self.resolve_var(init, sink);
                }
                self.resolve_expr(&mut s.condition, None, sink);
                if let Some(ty) = self.expression_type(&s.condition, sink) {
                    if ty.name != "bool" {
                        self.error(sink, s.condition.loc(), "For loop condition must be boolean");
                    }
                }
                self.resolve_expr(&mut s.update, None, sink);
                self.loop_depth += 1;
                self.resolve_block(&mut s.body, sink);
                self.loop_depth -= 1;
            }
            Stmt::Switch(s) => {
                self.resolve_expr(&mut s.discriminant, None, sink);
                for case in &mut s.cases {
                    self.resolve_expr(&mut case.value, None, sink);
                    self.resolve_block(&mut case.body, sink);
                }
                if let Some(default) = &mut s.default {
                    self.resolve_block(default, sink);
                }
            }
            // Switch arms deliberately do not alter the loop depth; `break`
            // relates to loops only.
            Stmt::Break(s) => s.inside_loop = self.loop_depth > 0,
            Stmt::Continue(s) => s.inside_loop = self.loop_depth > 0,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Resolve an expression tree. `expected` is a context hint used only
    /// by array literals (to give empty literals an element type).
    pub(crate) fn resolve_expr(
        &mut self,
        expr: &mut Expr,
        expected: Option<&TypeNode>,
        sink: &mut Diagnostics,
    ) {
        match expr {
            Expr::Identifier(ident) => self.resolve_identifier(ident, sink),
            Expr::Literal(_) => {}
            Expr::Binary(binary) => self.resolve_binary(binary, sink),
            Expr::Unary(unary) => self.resolve_expr(&mut unary.operand, None, sink),
            Expr::Array(array) => self.resolve_array(array, expected, sink),
            Expr::Member(access) => self.resolve_member(access, sink),
            Expr::Index(index) => {
                self.resolve_expr(&mut index.object, None, sink);
                self.resolve_expr(&mut index.index, None, sink);
            }
            Expr::Call(call) => {
                if let Some(instantiation) = self.resolve_call(call, sink) {
                    *expr = Expr::New(instantiation);
                }
            }
            Expr::New(inst) => self.resolve_new(inst, sink),
        }
    }

    fn resolve_identifier(&mut self, ident: &mut Identifier, sink: &mut Diagnostics) {
        match self.symbols.lookup(&ident.name) {
            Some(id) => {
                ident.resolved_symbol = Some(id);
                ident.evaluated_type = self.symbols.get(id).ty.clone();
            }
            None => {
                ident.resolved_symbol = None;
                ident.evaluated_type = None;
                self.error(
                    sink,
                    ident.loc,
                    format!("Undefined identifier: {}", ident.name),
                );
            }
        }
    }

    fn resolve_binary(&mut self, binary: &mut BinaryExpr, sink: &mut Diagnostics) {
        self.resolve_expr(&mut binary.left, None, sink);
        self.resolve_expr(&mut binary.right, None, sink);

        let left_type = self.expression_type(&binary.left, sink);
        let right_type = self.expression_type(&binary.right, sink);

        if binary.op == BinaryOp::Assign {
            if let (Some(left), Some(right)) = (&left_type, &right_type) {
                if !left.is_compatible_with(right) {
                    self.error(sink, binary.loc, "Assignment type mismatch");
                }
            }
            binary.evaluated_type = left_type;
            return;
        }

        if let (Some(left), Some(right)) = (&left_type, &right_type) {
            if !left.is_compatible_with(right) {
                self.error(sink, binary.loc, "Operand type mismatch in binary expression");
            }
        }

        binary.evaluated_type = if binary.op.produces_bool() {
            Some(TypeNode::new("bool"))
        } else {
            // Arithmetic, bitwise, and shift results follow the left operand.
            left_type
        };
    }

    fn resolve_array(
        &mut self,
        array: &mut ArrayLiteral,
        expected: Option<&TypeNode>,
        sink: &mut Diagnostics,
    ) {
        let element_hint = expected.and_then(|t| t.element_name()).map(TypeNode::new);
        for element in &mut array.elements {
            self.resolve_expr(element, element_hint.as_ref(), sink);
        }

        if array.elements.is_empty() {
            match expected {
                Some(context) if context.is_array() => {
                    array.evaluated_type = Some(TypeNode::new(&context.name));
                }
                _ => {
                    array.evaluated_type = None;
                    self.error(
                        sink,
                        array.loc,
                        "Cannot infer element type of empty array literal",
                    );
                }
            }
            return;
        }

        let Some(first) = self.expression_type(&array.elements[0], sink) else {
            array.evaluated_type = None;
            return;
        };
        for element in &array.elements[1..] {
            if let Some(ty) = self.expression_type(element, sink) {
                if !first.is_compatible_with(&ty) {
                    self.error(sink, element.loc(), "Array element type mismatch");
                }
            }
        }
        array.evaluated_type = Some(TypeNode::array_of(&first.name));
    }

    fn resolve_member(&mut self, access: &mut MemberAccess, sink: &mut Diagnostics) {
        self.resolve_expr(&mut access.object, None, sink);
        access.member_symbol = None;
        access.object_type = self.value_type_of(&access.object);

        // Object errors were already reported while resolving it.
        let Some(object_type) = access.object_type.clone() else {
            return;
        };

        let member_scope = self
            .symbols
            .lookup(&object_type.name)
            .and_then(|id| self.symbols.get(id).own_scope);
        let Some(member_scope) = member_scope else {
            self.error(
                sink,
                access.loc,
                format!("Undefined identifier: {}", access.member),
            );
            return;
        };

        match self.symbols.lookup_local_in(member_scope, &access.member) {
            Some(id) => access.member_symbol = Some(id),
            None => self.error(
                sink,
                access.loc,
                format!("Undefined identifier: {}", access.member),
            ),
        }
    }

    /// Resolve a call. Returns the replacement node when the callee name
    /// turns out to be a class, making this an instantiation.
    fn resolve_call(
        &mut self,
        call: &mut FunctionCall,
        sink: &mut Diagnostics,
    ) -> Option<ObjectInstantiation> {
        for argument in &mut call.arguments {
            self.resolve_expr(argument, None, sink);
        }

        if let Some(callee) = call.callee.as_deref_mut() {
            self.resolve_expr(callee, None, sink);
            call.resolved_function = None;
            call.evaluated_type = None;
            // A chained call types as the member function it lands on.
            if let Expr::Member(access) = callee {
                if let Some(member_id) = access.member_symbol {
                    let member = self.symbols.get(member_id);
                    if member.kind == SymbolKind::Function {
                        call.resolved_function = Some(member_id);
                        call.evaluated_type = member.ty.clone();
                    }
                }
            }
            return None;
        }

        match self.symbols.lookup(&call.name) {
            None => {
                call.resolved_function = None;
                call.evaluated_type = None;
                self.error(
                    sink,
                    call.loc,
                    format!("Undefined identifier: {}", call.name),
                );
                None
            }
            Some(id) => match self.symbols.get(id).kind {
                SymbolKind::Class => Some(ObjectInstantiation {
                    loc: call.loc,
                    name: std::mem::take(&mut call.name),
                    arguments: std::mem::take(&mut call.arguments),
                    class_symbol: Some(id),
                    evaluated_type: self.symbols.get(id).ty.clone(),
                }),
                SymbolKind::Function => {
                    call.resolved_function = Some(id);
                    call.evaluated_type = self.symbols.get(id).ty.clone();
                    None
                }
                _ => {
                    call.resolved_function = None;
                    call.evaluated_type = None;
                    self.error(
                        sink,
                        call.loc,
                        format!("Cannot call non-function: {}", call.name),
                    );
                    None
                }
            },
        }
    }

    /// Resolution for trees that already carry instantiation nodes, so a
    /// second analysis run reaches the same result.
    fn resolve_new(&mut self, inst: &mut ObjectInstantiation, sink: &mut Diagnostics) {
        for argument in &mut inst.arguments {
            self.resolve_expr(argument, None, sink);
        }
        match self.symbols.lookup(&inst.name) {
            Some(id) if self.symbols.get(id).kind == SymbolKind::Class => {
                inst.class_symbol = Some(id);
                inst.evaluated_type = self.symbols.get(id).ty.clone();
            }
            _ => {
                inst.class_symbol = None;
                inst.evaluated_type = None;
                self.error(
                    sink,
                    inst.loc,
                    format!("Undefined identifier: {}", inst.name),
                );
            }
        }
    }

    // ========================================================================
    // Expression typing
    // ========================================================================

    /// The type of an already-resolved expression, for the forms the typing
    /// domain covers. Any other form reports `Unsupported expression type`
    /// and yields nothing.
    pub(crate) fn expression_type(
        &self,
        expr: &Expr,
        sink: &mut Diagnostics,
    ) -> Option<TypeNode> {
        match expr {
            Expr::Literal(literal) => Some(literal_type(literal)),
            Expr::Identifier(ident) => ident.evaluated_type.clone(),
            Expr::Binary(binary) => binary.evaluated_type.clone(),
            Expr::Call(call) => call.evaluated_type.clone(),
            Expr::New(inst) => inst.evaluated_type.clone(),
            Expr::Array(array) => array.evaluated_type.clone(),
            Expr::Unary(_) | Expr::Member(_) | Expr::Index(_) => {
                self.error(sink, expr.loc(), "Unsupported expression type");
                None
            }
        }
    }

    /// Internal, non-diagnosing view of an expression's value type; used for
    /// member lookup, where a missing type is not itself an error.
    fn value_type_of(&self, expr: &Expr) -> Option<TypeNode> {
        match expr {
            Expr::Literal(literal) => Some(literal_type(literal)),
            Expr::Identifier(ident) => ident.evaluated_type.clone(),
            Expr::Binary(binary) => binary.evaluated_type.clone(),
            Expr::Call(call) => call.evaluated_type.clone(),
            Expr::New(inst) => inst.evaluated_type.clone(),
            Expr::Array(array) => array.evaluated_type.clone(),
            Expr::Member(access) => access
                .member_symbol
                .and_then(|id| self.symbols.get(id).ty.clone()),
            Expr::Unary(_) | Expr::Index(_) => None,
        }
    }
}

/// Literal inference keyed on the token class the literal came from: string
/// tokens are stored unquoted, so the shape of the text alone cannot tell a
/// string from a number.
fn literal_type(literal: &Literal) -> TypeNode {
    match literal.kind {
        LiteralKind::String => TypeNode::new("string"),
        LiteralKind::Bool => TypeNode::new("bool"),
        LiteralKind::Number if literal.value.contains('.') => TypeNode::new("float"),
        LiteralKind::Number => TypeNode::new("int"),
    }
}
