//! Mica Programming Language Compiler Front-End
//!
//! Mica is a small statically typed, C-like scripting language. This crate
//! provides the front-end: lexer, recursive-descent parser, and a three-pass
//! semantic analyzer that either annotates the tree in place or rejects the
//! program with a list of diagnostics. The CLI driver and debug dumps are
//! thin consumers of that core.

pub mod cli;
pub mod dump;
pub mod frontend;

pub use frontend::analyzer;
pub use frontend::ast;
pub use frontend::diagnostics;
pub use frontend::lexer;
pub use frontend::parser;
pub use frontend::symbols;
