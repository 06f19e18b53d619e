//! Semantic analyzer for the Mica programming language.
//!
//! Walks the AST three times and annotates it in place:
//!
//! 1. **Declaration** ([`declare`]) - builds the scope tree and registers
//!    every declared name.
//! 2. **Type resolution** ([`resolve`]) - resolves identifiers, assigns
//!    types to typeable expressions, checks loop conditions, and stamps
//!    `break`/`continue` with their loop context.
//! 3. **Validation** ([`validate`]) - return placement and typing,
//!    loop-control placement, and the missing-return check.
//!
//! Errors accumulate in the shared [`Diagnostics`] sink so one run reports
//! as many problems as possible. Scopes are pushed through closure-based
//! guards ([`SemanticAnalyzer::with_new_scope`]) that pop on every exit
//! path, so the scope cursor is back at the global scope at each pass
//! boundary.

mod declare;
mod resolve;
mod validate;

use crate::frontend::ast::{Loc, Program, TypeNode};
use crate::frontend::diagnostics::{Diagnostic, Diagnostics, Phase};
use crate::frontend::symbols::{ScopeId, ScopeKind, SymbolTable};

/// The function whose body is being validated, for return checking.
#[derive(Debug, Clone)]
struct CurrentFunction {
    name: String,
    return_type: TypeNode,
}

/// Analyzer state: the symbol table it owns plus traversal context.
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    loop_depth: usize,
    current_function: Option<CurrentFunction>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            loop_depth: 0,
            current_function: None,
        }
    }

    /// The symbol table populated during analysis. AST annotations index
    /// into it, so keep the analyzer alive for as long as they are read.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Run all three passes over `program`, annotating it in place.
    ///
    /// Returns `true` iff no error-severity diagnostics were added. The
    /// analyzer resets its per-run state first, so running it again over an
    /// already-annotated tree yields the identical diagnostic set.
    pub fn analyze(&mut self, program: &mut Program, sink: &mut Diagnostics) -> bool {
        self.symbols = SymbolTable::new();
        self.loop_depth = 0;
        self.current_function = None;

        let errors_before = sink.error_count();

        self.declare_program(program, sink);
        debug_assert!(self.symbols.at_global_scope());

        self.resolve_program(program, sink);
        debug_assert!(self.symbols.at_global_scope());

        self.validate_program(program, sink);
        debug_assert!(self.symbols.at_global_scope());

        sink.error_count() == errors_before
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn error(&self, sink: &mut Diagnostics, loc: Loc, message: impl Into<String>) {
        sink.push(Diagnostic::error(Phase::Semantic, loc.line, loc.column, message));
    }

    /// Create a scope, run `f` inside it, and pop it again on the way out.
    /// Returns the created scope's id alongside `f`'s result.
    fn with_new_scope<R>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> R,
    ) -> (ScopeId, R) {
        let id = self.symbols.enter_new_scope(kind);
        let result = f(self);
        self.symbols.exit_scope();
        (id, result)
    }

    /// Re-enter a scope recorded by the declaration pass. A missing
    /// annotation (possible after upstream errors) runs `f` in place.
    fn with_scope<R>(&mut self, scope: Option<ScopeId>, f: impl FnOnce(&mut Self) -> R) -> R {
        match scope {
            Some(id) => {
                self.symbols.enter_scope(id);
                let result = f(self);
                self.symbols.exit_scope();
                result
            }
            None => f(self),
        }
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function: analyze with a throwaway analyzer.
///
/// Returns `true` iff the analyzer added no errors. Callers that need the
/// symbol table afterwards should hold a [`SemanticAnalyzer`] instead.
#[tracing::instrument(skip_all, fields(decl_count = program.declarations.len()))]
pub fn analyze(program: &mut Program, sink: &mut Diagnostics) -> bool {
    SemanticAnalyzer::new().analyze(program, sink)
}

// ============================================================================
// TESTS
// ============================================================================
