//! Token-stream and AST debug dumps.
//!
//! Consumers of the front-end's data, used by the `tokens` and `ast` CLI
//! subcommands. Both render to a `String` so tests can snapshot them.

use std::fmt::Write;

use crate::frontend::ast::*;
use crate::frontend::lexer::Token;

/// One line per token: kind, lexeme, and location.
pub fn dump_tokens(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in tokens {
        let _ = writeln!(
            out,
            "{:<12} [{}] at {}:{}",
            format!("{:?}", token.kind),
            token.lexeme,
            token.line,
            token.column
        );
    }
    out
}

/// Indented tree rendering of a program, including resolved types where the
/// analyzer filled them in.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Program");
    for decl in &program.declarations {
        dump_decl(&mut out, decl, 1);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn type_suffix(ty: &Option<TypeNode>) -> String {
    match ty {
        Some(ty) => format!(" : {ty}"),
        None => String::new(),
    }
}

fn dump_decl(out: &mut String, decl: &Decl, depth: usize) {
    indent(out, depth);
    match decl {
        Decl::Var(var) => {
            let keyword = if var.is_const { "let" } else { "var" };
            let _ = writeln!(
                out,
                "{keyword} {}{}",
                var.name,
                type_suffix(&var.resolved_type.clone().or_else(|| var.declared_type.clone()))
            );
            if let Some(init) = &var.initializer {
                dump_expr(out, init, depth + 1);
            }
        }
        Decl::Fun(fun) => {
            let params: Vec<String> = fun
                .parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect();
            let _ = writeln!(
                out,
                "fun {}({}){}",
                fun.name,
                params.join(", "),
                type_suffix(&fun.return_type)
            );
            dump_block(out, &fun.body, depth + 1);
        }
        Decl::Class(class) => {
            let _ = writeln!(out, "class {}", class.name);
            for member in &class.body.declarations {
                dump_decl(out, member, depth + 1);
            }
        }
        Decl::Enum(decl) => {
            let _ = writeln!(out, "enum {} {{ {} }}", decl.name, decl.values.join(", "));
        }
    }
}

fn dump_block(out: &mut String, block: &Block, depth: usize) {
    indent(out, depth);
    let _ = writeln!(out, "block");
    for stmt in &block.statements {
        dump_stmt(out, stmt, depth + 1);
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::Decl(decl) => dump_decl(out, decl, depth),
        Stmt::Expr(stmt) => dump_expr(out, &stmt.expression, depth),
        Stmt::Return(ret) => {
            indent(out, depth);
            let _ = writeln!(out, "return");
            if let Some(expr) = &ret.expression {
                dump_expr(out, expr, depth + 1);
            }
        }
        Stmt::If(s) => {
            indent(out, depth);
            let _ = writeln!(out, "if");
            dump_expr(out, &s.condition, depth + 1);
            dump_block(out, &s.then_branch, depth + 1);
            if let Some(else_branch) = &s.else_branch {
                indent(out, depth);
                let _ = writeln!(out, "else");
                dump_block(out, else_branch, depth + 1);
            }
        }
        Stmt::While(s) => {
            indent(out, depth);
            let _ = writeln!(out, "while");
            dump_expr(out, &s.condition, depth + 1);
            dump_block(out, &s.body, depth + 1);
        }
        Stmt::For(s) => {
            indent(out, depth);
            let _ = writeln!(out, "for");
            if let Some(init) = &s.init {
                dump_decl(out, &Decl::Var(init.clone()), depth + 1);
            }
            dump_expr(out, &s.condition, depth + 1);
            dump_expr(out, &s.update, depth + 1);
            dump_block(out, &s.body, depth + 1);
        }
        Stmt::Switch(s) => {
            indent(out, depth);
            let _ = writeln!(out, "switch");
            dump_expr(out, &s.discriminant, depth + 1);
            for case in &s.cases {
                indent(out, depth + 1);
                let _ = writeln!(out, "case");
                dump_expr(out, &case.value, depth + 2);
                dump_block(out, &case.body, depth + 2);
            }
            if let Some(default) = &s.default {
                indent(out, depth + 1);
                let _ = writeln!(out, "default");
                dump_block(out, default, depth + 2);
            }
        }
        Stmt::Break(_) => {
            indent(out, depth);
            let _ = writeln!(out, "break");
        }
        Stmt::Continue(_) => {
            indent(out, depth);
            let _ = writeln!(out, "continue");
        }
    }
}

fn dump_expr(out: &mut String, expr: &Expr, depth: usize) {
    indent(out, depth);
    match expr {
        Expr::Binary(e) => {
            let _ = writeln!(out, "binary {}{}", e.op, type_suffix(&e.evaluated_type));
            dump_expr(out, &e.left, depth + 1);
            dump_expr(out, &e.right, depth + 1);
        }
        Expr::Unary(e) => {
            let _ = writeln!(out, "unary {}", e.op);
            dump_expr(out, &e.operand, depth + 1);
        }
        Expr::Literal(e) => {
            let _ = writeln!(out, "literal {:?}", e.value);
        }
        Expr::Identifier(e) => {
            let _ = writeln!(out, "identifier {}{}", e.name, type_suffix(&e.evaluated_type));
        }
        Expr::Array(e) => {
            let _ = writeln!(out, "array{}", type_suffix(&e.evaluated_type));
            for element in &e.elements {
                dump_expr(out, element, depth + 1);
            }
        }
        Expr::Member(e) => {
            let _ = writeln!(out, "member .{}", e.member);
            dump_expr(out, &e.object, depth + 1);
        }
        Expr::Index(e) => {
            let _ = writeln!(out, "index");
            dump_expr(out, &e.object, depth + 1);
            dump_expr(out, &e.index, depth + 1);
        }
        Expr::Call(e) => {
            if e.callee.is_some() {
                let _ = writeln!(out, "call{}", type_suffix(&e.evaluated_type));
            } else {
                let _ = writeln!(out, "call {}{}", e.name, type_suffix(&e.evaluated_type));
            }
            if let Some(callee) = &e.callee {
                dump_expr(out, callee, depth + 1);
            }
            for argument in &e.arguments {
                dump_expr(out, argument, depth + 1);
            }
        }
        Expr::New(e) => {
            let _ = writeln!(out, "new {}{}", e.name, type_suffix(&e.evaluated_type));
            for argument in &e.arguments {
                dump_expr(out, argument, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::diagnostics::Diagnostics;
    use crate::frontend::{lexer, parser};

    #[test]
    fn token_dump_lists_every_token() {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex("let x: int = 1;", &mut sink);
        let dump = dump_tokens(&tokens);
        assert_eq!(dump.lines().count(), tokens.len());
        assert!(dump.contains("Keyword"));
        assert!(dump.contains("[let] at 1:1"));
        assert!(dump.contains("EndOfFile"));
    }

    #[test]
    fn program_dump_nests_children() {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex("fun f(): int { return 1 + 2; }", &mut sink);
        let program = parser::parse(&tokens, &mut sink);
        assert!(!sink.has_errors());
        let dump = dump_program(&program);
        assert!(dump.contains("fun f() : int"));
        assert!(dump.contains("return"));
        assert!(dump.contains("binary +"));
        assert!(dump.contains("literal \"1\""));
    }
}
