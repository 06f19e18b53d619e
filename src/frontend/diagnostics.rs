//! Diagnostics and error reporting for Mica
//!
//! Every stage of the pipeline appends structured diagnostics to a shared
//! [`Diagnostics`] sink instead of aborting. Rendering with source context
//! lives here too, but only the CLI calls it; the core stages never print.

use std::fmt;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    Semantic,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexer => write!(f, "lexer"),
            Phase::Parser => write!(f, "parser"),
            Phase::Semantic => write!(f, "semantic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A single compile-time diagnostic with its source location.
///
/// Messages are human-readable; no stable machine-readable code is promised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(phase: Phase, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            phase,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(phase: Phase, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            phase,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Line {}, Column {}] {}: {}",
            self.line, self.column, self.severity, self.message
        )
    }
}

/// Append-only collector shared by all pipeline stages.
///
/// Diagnostics keep source order within a phase and phase order across
/// phases, because each stage runs to completion before the next starts.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count()
    }
}

/// Render a diagnostic with the offending source line and a caret.
///
/// ANSI-colored, in the style of mainstream compilers. The renderer is a
/// consumer of the core's output; nothing in the pipeline depends on it.
pub fn render_diagnostic(file_name: &str, source: &str, diagnostic: &Diagnostic) -> String {
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let yellow = "\x1b[33m";
    let bold = "\x1b[1m";
    let reset = "\x1b[0m";

    let color = match diagnostic.severity {
        Severity::Error => red,
        Severity::Warning => yellow,
    };

    let mut out = String::new();

    out.push_str(&format!(
        "{bold}{color}{severity}{reset}{bold} ({phase}): {message}{reset}\n",
        severity = diagnostic.severity,
        phase = diagnostic.phase,
        message = diagnostic.message,
    ));
    out.push_str(&format!(
        "  {cyan}-->{reset} {file}:{line}:{col}\n",
        file = file_name,
        line = diagnostic.line,
        col = diagnostic.column,
    ));

    if let Some(line_text) = source.lines().nth(diagnostic.line.saturating_sub(1)) {
        let width = diagnostic.line.to_string().len();
        out.push_str(&format!("  {cyan}{:>width$} |{reset}\n", "", width = width));
        out.push_str(&format!(
            "  {cyan}{} |{reset} {}\n",
            diagnostic.line, line_text
        ));
        let caret_pad = diagnostic.column.saturating_sub(1).min(line_text.len());
        out.push_str(&format!(
            "  {cyan}{:>width$} |{reset} {}{color}^{reset}\n",
            "",
            " ".repeat(caret_pad),
            width = width,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_bracketed_location() {
        let diag = Diagnostic::error(Phase::Parser, 3, 7, "Expected declaration.");
        assert_eq!(
            diag.to_string(),
            "[Line 3, Column 7] Error: Expected declaration."
        );
    }

    #[test]
    fn sink_counts_errors_only() {
        let mut sink = Diagnostics::new();
        sink.push(Diagnostic::warning(Phase::Semantic, 1, 1, "unused"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error(Phase::Lexer, 1, 1, "Unrecognized character: '$'"));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn render_points_at_column() {
        let source = "let x: int = $;\n";
        let diag = Diagnostic::error(Phase::Lexer, 1, 14, "Unrecognized character: '$'");
        let rendered = render_diagnostic("test.mica", source, &diag);
        assert!(rendered.contains("test.mica:1:14"));
        assert!(rendered.contains("let x: int = $;"));
        assert!(rendered.contains('^'));
    }
}
