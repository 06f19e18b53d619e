//! Integration tests for the Mica compiler front-end
//!
//! Exercises the full pipeline (`lex → parse → analyze`) and the invariants
//! every accepted program must satisfy.

use mica::analyzer::{self, SemanticAnalyzer};
use mica::ast::*;
use mica::diagnostics::{Diagnostics, Phase, Severity};
use mica::lexer::{self, TokenKind};
use mica::parser;

/// Run the full pipeline on a source string.
fn compile(source: &str) -> (Program, Diagnostics, bool) {
    let mut sink = Diagnostics::new();
    let tokens = lexer::lex(source, &mut sink);
    let mut program = parser::parse(&tokens, &mut sink);
    let accepted = analyzer::analyze(&mut program, &mut sink) && !sink.has_errors();
    (program, sink, accepted)
}

fn messages(sink: &Diagnostics) -> Vec<&str> {
    sink.iter().map(|d| d.message.as_str()).collect()
}

// ============================================================================
// Tree walking helpers
// ============================================================================

fn walk_program_exprs(program: &Program, visit: &mut impl FnMut(&Expr)) {
    for decl in &program.declarations {
        walk_decl_exprs(decl, visit);
    }
}

fn walk_decl_exprs(decl: &Decl, visit: &mut impl FnMut(&Expr)) {
    match decl {
        Decl::Var(var) => {
            if let Some(init) = &var.initializer {
                walk_expr(init, visit);
            }
        }
        Decl::Fun(fun) => walk_block_exprs(&fun.body, visit),
        Decl::Class(class) => {
            for member in &class.body.declarations {
                walk_decl_exprs(member, visit);
            }
        }
        Decl::Enum(_) => {}
    }
}

fn walk_block_exprs(block: &Block, visit: &mut impl FnMut(&Expr)) {
    for stmt in &block.statements {
        walk_stmt_exprs(stmt, visit);
    }
}

fn walk_stmt_exprs(stmt: &Stmt, visit: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Decl(decl) => walk_decl_exprs(decl, visit),
        Stmt::Expr(s) => walk_expr(&s.expression, visit),
        Stmt::Return(s) => {
            if let Some(expr) = &s.expression {
                walk_expr(expr, visit);
            }
        }
        Stmt::If(s) => {
            walk_expr(&s.condition, visit);
            walk_block_exprs(&s.then_branch, visit);
            if let Some(else_branch) = &s.else_branch {
                walk_block_exprs(else_branch, visit);
            }
        }
        Stmt::While(s) => {
            walk_expr(&s.condition, visit);
            walk_block_exprs(&s.body, visit);
        }
        Stmt::For(s) => {
            if let Some(init) = &s.init {
                if let Some(expr) = &init.initializer {
                    walk_expr(expr, visit);
                }
            }
            walk_expr(&s.condition, visit);
            walk_expr(&s.update, visit);
            walk_block_exprs(&s.body, visit);
        }
        Stmt::Switch(s) => {
            walk_expr(&s.discriminant, visit);
            for case in &s.cases {
                walk_expr(&case.value, visit);
                walk_block_exprs(&case.body, visit);
            }
            if let Some(default) = &s.default {
                walk_block_exprs(default, visit);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn walk_expr(expr: &Expr, visit: &mut impl FnMut(&Expr)) {
    visit(expr);
    match expr {
        Expr::Binary(e) => {
            walk_expr(&e.left, visit);
            walk_expr(&e.right, visit);
        }
        Expr::Unary(e) => walk_expr(&e.operand, visit),
        Expr::Array(e) => {
            for element in &e.elements {
                walk_expr(element, visit);
            }
        }
        Expr::Member(e) => walk_expr(&e.object, visit),
        Expr::Index(e) => {
            walk_expr(&e.object, visit);
            walk_expr(&e.index, visit);
        }
        Expr::Call(e) => {
            if let Some(callee) = &e.callee {
                walk_expr(callee, visit);
            }
            for argument in &e.arguments {
                walk_expr(argument, visit);
            }
        }
        Expr::New(e) => {
            for argument in &e.arguments {
                walk_expr(argument, visit);
            }
        }
        Expr::Literal(_) | Expr::Identifier(_) => {}
    }
}

fn walk_program_vars(program: &Program, visit: &mut impl FnMut(&VarDecl)) {
    for decl in &program.declarations {
        walk_decl_vars(decl, visit);
    }
}

fn walk_decl_vars(decl: &Decl, visit: &mut impl FnMut(&VarDecl)) {
    match decl {
        Decl::Var(var) => visit(var),
        Decl::Fun(fun) => walk_block_vars(&fun.body, visit),
        Decl::Class(class) => {
            for member in &class.body.declarations {
                walk_decl_vars(member, visit);
            }
        }
        Decl::Enum(_) => {}
    }
}

fn walk_block_vars(block: &Block, visit: &mut impl FnMut(&VarDecl)) {
    for stmt in &block.statements {
        match stmt {
            Stmt::Decl(decl) => walk_decl_vars(decl, visit),
            Stmt::If(s) => {
                walk_block_vars(&s.then_branch, visit);
                if let Some(else_branch) = &s.else_branch {
                    walk_block_vars(else_branch, visit);
                }
            }
            Stmt::While(s) => walk_block_vars(&s.body, visit),
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    visit(init);
                }
                walk_block_vars(&s.body, visit);
            }
            Stmt::Switch(s) => {
                for case in &s.cases {
                    walk_block_vars(&case.body, visit);
                }
                if let Some(default) = &s.default {
                    walk_block_vars(default, visit);
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Seed scenarios
// ============================================================================

#[test]
fn s1_constant_declaration_is_accepted() {
    let (program, sink, accepted) = compile("let pi: float = 3.14;");
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
    assert_eq!(program.declarations.len(), 1);
    let var = match &program.declarations[0] {
        Decl::Var(v) => v,
        other => panic!("expected variable declaration, got {other:?}"),
    };
    assert_eq!(var.name, "pi");
    assert_eq!(var.resolved_type.as_ref().unwrap().name, "float");
    assert!(var.declared_type.as_ref().unwrap().is_const);
    match var.initializer.as_ref().unwrap() {
        Expr::Literal(lit) => {
            assert_eq!(lit.value, "3.14");
            assert_eq!(lit.kind, LiteralKind::Number);
        }
        other => panic!("expected literal initializer, got {other:?}"),
    }
}

#[test]
fn s2_initializer_type_mismatch() {
    let (_, sink, accepted) = compile("let a: int = \"text\";");
    assert!(!accepted);
    let message = &sink.entries()[0].message;
    assert!(message.contains("Type mismatch in variable 'a'"));
    assert!(message.contains("Declared: int"));
    assert!(message.contains("Inferred: string"));
}

#[test]
fn s3_duplicate_declaration() {
    let (program, sink, accepted) = compile("var x: int = 1; var x: int = 2;");
    assert!(!accepted);
    assert_eq!(messages(&sink), vec!["Duplicate variable declaration: x"]);
    let second = match &program.declarations[1] {
        Decl::Var(v) => v,
        _ => unreachable!(),
    };
    assert!(second.symbol.is_none());
    let first = match &program.declarations[0] {
        Decl::Var(v) => v,
        _ => unreachable!(),
    };
    assert!(first.symbol.is_some());
}

#[test]
fn s4_precedence_of_the_initializer_tree() {
    let (program, sink, accepted) = compile("var r: int = 1 + 2 * 3;");
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
    let var = match &program.declarations[0] {
        Decl::Var(v) => v,
        _ => unreachable!(),
    };
    let root = match var.initializer.as_ref().unwrap() {
        Expr::Binary(b) => b,
        other => panic!("expected binary root, got {other:?}"),
    };
    assert_eq!(root.op, BinaryOp::Add);
    assert!(matches!(&*root.left, Expr::Literal(lit) if lit.value == "1"));
    match &*root.right {
        Expr::Binary(b) => {
            assert_eq!(b.op, BinaryOp::Multiply);
            assert!(matches!(&*b.left, Expr::Literal(lit) if lit.value == "2"));
            assert!(matches!(&*b.right, Expr::Literal(lit) if lit.value == "3"));
        }
        other => panic!("expected binary right child, got {other:?}"),
    }
}

#[test]
fn s5_missing_return_in_non_void_function() {
    let (_, sink, accepted) = compile("fun f(): int { var x: int = 0; }");
    assert!(!accepted);
    assert_eq!(
        messages(&sink),
        vec!["Function 'f' with return type 'int' lacks return statement"]
    );
}

#[test]
fn s6_break_outside_loop() {
    let (_, sink, accepted) = compile("fun g() { break; }");
    assert!(!accepted);
    assert_eq!(messages(&sink), vec!["Break statement outside loop"]);
}

#[test]
fn s7_unterminated_string() {
    let (_, sink, accepted) = compile("var s: string = \"hi");
    assert!(!accepted);
    let lexical: Vec<_> = sink.iter().filter(|d| d.phase == Phase::Lexer).collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!(lexical[0].message, "Unterminated string literal");
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn token_stream_ends_with_exactly_one_eof() {
    for source in ["", "// comment", "var x: int = 1;", "fun f() { g(); }", "\"unterminated"] {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(source, &mut sink);
        let eof_count = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::EndOfFile)
            .count();
        assert_eq!(eof_count, 1, "source {source:?}");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
    }
}

#[test]
fn every_identifier_is_resolved_or_reported() {
    let source = "var a: int = 1;\n\
                  fun f(b: int): int { return a + b + mystery; }";
    let (program, sink, accepted) = compile(source);
    assert!(!accepted);

    let mut unresolved = Vec::new();
    walk_program_exprs(&program, &mut |expr| {
        if let Expr::Identifier(ident) = expr {
            if ident.resolved_symbol.is_none() {
                unresolved.push(ident.name.clone());
            }
        }
    });
    for name in unresolved {
        assert!(
            messages(&sink).contains(&format!("Undefined identifier: {name}").as_str()),
            "unresolved identifier {name} has no diagnostic"
        );
    }
}

#[test]
fn comparison_and_logical_operators_evaluate_to_bool() {
    let source = "fun f(a: int, b: int, p: bool, q: bool): bool {\n\
                  \x20 return (a < b) && (a == b) || (p != q);\n\
                  }";
    let (program, sink, accepted) = compile(source);
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());

    let mut checked = 0;
    walk_program_exprs(&program, &mut |expr| {
        if let Expr::Binary(binary) = expr {
            if binary.op.produces_bool() {
                assert_eq!(binary.evaluated_type.as_ref().unwrap().name, "bool");
                checked += 1;
            }
        }
    });
    assert!(checked >= 5);
}

#[test]
fn accepted_variables_resolve_to_their_declared_type() {
    let source = "var a: int = 1;\n\
                  let b: float = 2.0;\n\
                  fun f() { var c: [string] = [\"x\"]; }";
    let (program, sink, accepted) = compile(source);
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());

    let mut seen = 0;
    walk_program_vars(&program, &mut |var| {
        let declared = var.declared_type.as_ref().unwrap();
        let resolved = var.resolved_type.as_ref().unwrap();
        assert_eq!(declared.name, resolved.name);
        seen += 1;
    });
    assert_eq!(seen, 3);
}

#[test]
fn scope_cursor_returns_to_global_after_analysis() {
    let mut sink = Diagnostics::new();
    let tokens = lexer::lex(
        "class C { var x: int = 0; fun m() { while (true) { break; } } }",
        &mut sink,
    );
    let mut program = parser::parse(&tokens, &mut sink);
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze(&mut program, &mut sink);
    assert!(analyzer.symbols().at_global_scope());
}

#[test]
fn reanalysis_produces_identical_diagnostics() {
    let source = "class Point { var x: float = 0.0; }\n\
                  var p: Point = Point();\n\
                  var bad: int = \"nope\";\n\
                  fun f(): int { }\n\
                  fun g() { break; }\n";
    let mut sink = Diagnostics::new();
    let tokens = lexer::lex(source, &mut sink);
    let mut program = parser::parse(&tokens, &mut sink);
    assert!(!sink.has_errors());

    let mut first = Diagnostics::new();
    analyzer::analyze(&mut program, &mut first);
    let mut second = Diagnostics::new();
    analyzer::analyze(&mut program, &mut second);
    assert_eq!(first.entries(), second.entries());
    assert!(first.has_errors());
}

// ============================================================================
// Boundary behaviors
// ============================================================================

#[test]
fn empty_source_is_accepted() {
    let (program, sink, accepted) = compile("");
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
    assert!(program.declarations.is_empty());
}

#[test]
fn comment_only_source_is_accepted() {
    let (program, sink, accepted) = compile("// just a note\n");
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
    assert!(program.declarations.is_empty());
}

#[test]
fn trailing_dot_number_is_a_float() {
    let (_, sink, accepted) = compile("var x: float = 0.;");
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
}

// ============================================================================
// Error accumulation and ordering
// ============================================================================

#[test]
fn parser_reports_multiple_errors_after_recovery() {
    let source = "var a: int = ;\n\
                  var b: int = 1;\n\
                  fun f() { return }\n";
    let (_, sink, accepted) = compile(source);
    assert!(!accepted);
    let parser_errors = sink.iter().filter(|d| d.phase == Phase::Parser).count();
    assert!(parser_errors >= 2, "expected at least two parse errors: {:?}", sink.entries());
}

#[test]
fn semantic_errors_accumulate_in_one_run() {
    let source = "var a: int = \"one\";\n\
                  var b: bool = missing;\n\
                  fun f(): int { }\n\
                  fun g() { continue; }\n";
    let (_, sink, accepted) = compile(source);
    assert!(!accepted);
    let semantic = messages(&sink);
    assert!(semantic.iter().any(|m| m.contains("Type mismatch in variable 'a'")));
    assert!(semantic.contains(&"Undefined identifier: missing"));
    assert!(semantic
        .contains(&"Function 'f' with return type 'int' lacks return statement"));
    assert!(semantic.contains(&"Continue statement outside loop"));
}

#[test]
fn phases_report_in_pipeline_order() {
    // One error per phase: a bad character, a bad statement, an undefined name.
    let source = "var a: int = 1 $ ;\nfun f() { g = missing; }";
    let (_, sink, _) = compile(source);
    let phases: Vec<Phase> = sink.iter().map(|d| d.phase).collect();
    let mut sorted = phases.clone();
    sorted.sort_by_key(|p| match p {
        Phase::Lexer => 0,
        Phase::Parser => 1,
        Phase::Semantic => 2,
    });
    assert_eq!(phases, sorted, "diagnostics out of phase order: {phases:?}");
    assert!(sink.iter().all(|d| d.severity == Severity::Error));
}

// ============================================================================
// End-to-end acceptance
// ============================================================================

#[test]
fn realistic_program_is_accepted() {
    let source = r#"
// Orbital bookkeeping, Mica style.
enum Phase { Ascent, Coast, Landed, }

class Probe {
    var altitude: float = 0.0;
    var battery: int = 100;

    fun drained(): bool {
        return battery <= 0;
    }
}

let limit: int = 3;

fun countdown(start: int): int {
    var t: int = start;
    while (t > 0) {
        t = t - 1;
        if (t == 1) {
            break;
        }
    }
    return t;
}

fun survey(samples: [int], scale: const int): int {
    var total: int = 0;
    for (var i: int = 0; i < 10; i = i + 1) {
        total = total + scale;
        if (total > 100) {
            continue;
        }
    }
    switch (total) {
        case 0: {
            total = 1;
        }
        default: {
            total = total + 1;
        }
    }
    return total;
}

fun report(phase: Phase) {
}

fun main() {
    var p: Probe = Probe();
    report(Phase.Ascent);
    var readings: [int] = [1, 2, 3];
    var empty: [float] = [];
    var n: int = countdown(limit);
    survey(readings, 2);
}
"#;
    let (_, sink, accepted) = compile(source);
    assert!(accepted, "unexpected diagnostics: {:?}", sink.entries());
}
