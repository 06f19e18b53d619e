//! Abstract syntax tree definitions for Mica
//!
//! The tree is built by the parser and annotated in place by the semantic
//! analyzer: nodes own their children, while the `Option<SymbolId>` /
//! `Option<ScopeId>` fields are non-owning references into the analyzer's
//! symbol table. Structural children are never replaced after parsing, with
//! one exception: a call whose name resolves to a class is rewritten into an
//! [`ObjectInstantiation`] carrying the same children.

use std::fmt;

use crate::frontend::symbols::{ScopeId, SymbolId};

/// 1-based source position of a node's first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub type Ident = String;

// ============================================================================
// Types
// ============================================================================

/// A type reference as written in source (or synthesized during analysis).
///
/// `name` is a primitive keyword (`int`, `uint`, `float`, `bool`, `string`),
/// a user-defined identifier, or the textual array form `[Element]`. Arrays
/// nest one level only, so the element of an array is never itself an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: String,
    pub is_const: bool,
}

impl TypeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_const: false,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_const: true,
        }
    }

    /// Array of the given element type, e.g. `array_of("int")` is `[int]`.
    pub fn array_of(element: &str) -> Self {
        Self::new(format!("[{element}]"))
    }

    /// Internal sentinel for "no return value"; never spelled in source.
    pub fn void() -> Self {
        Self::new("void")
    }

    pub fn is_void(&self) -> bool {
        self.name == "void"
    }

    pub fn is_array(&self) -> bool {
        self.name.len() > 2 && self.name.starts_with('[') && self.name.ends_with(']')
    }

    /// Element type name for array types, `None` otherwise.
    pub fn element_name(&self) -> Option<&str> {
        if self.is_array() {
            Some(&self.name[1..self.name.len() - 1])
        } else {
            None
        }
    }

    /// Symmetric compatibility: equal names, or arrays of compatible elements.
    /// No implicit numeric coercion and no subtyping.
    pub fn is_compatible_with(&self, other: &TypeNode) -> bool {
        if self.name == other.name {
            return true;
        }
        match (self.element_name(), other.element_name()) {
            (Some(a), Some(b)) => TypeNode::new(a).is_compatible_with(&TypeNode::new(b)),
            _ => false,
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================================================
// Program and declarations
// ============================================================================

/// Root node: an ordered sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub declarations: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Fun(FunDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
}

impl Decl {
    pub fn loc(&self) -> Loc {
        match self {
            Decl::Var(v) => v.loc,
            Decl::Fun(f) => f.loc,
            Decl::Class(c) => c.loc,
            Decl::Enum(e) => e.loc,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Decl::Var(v) => &v.name,
            Decl::Fun(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::Enum(e) => &e.name,
        }
    }
}

/// `let name: T = init;` or `var name: T [= init];`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub loc: Loc,
    pub name: Ident,
    pub declared_type: Option<TypeNode>,
    pub initializer: Option<Expr>,
    pub is_const: bool,
    // analyzer annotations
    pub resolved_type: Option<TypeNode>,
    pub symbol: Option<SymbolId>,
}

impl VarDecl {
    pub fn new(loc: Loc, name: Ident, declared_type: TypeNode, is_const: bool) -> Self {
        Self {
            loc,
            name,
            declared_type: Some(declared_type),
            initializer: None,
            is_const,
            resolved_type: None,
            symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub loc: Loc,
    pub name: Ident,
    pub ty: TypeNode,
}

/// `fun name(params) [: T] { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub loc: Loc,
    pub name: Ident,
    pub parameters: Vec<Param>,
    pub return_type: Option<TypeNode>,
    pub body: Block,
    // analyzer annotations
    pub symbol: Option<SymbolId>,
    pub param_scope: Option<ScopeId>,
    pub body_scope: Option<ScopeId>,
}

/// `class Name { member declarations }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub loc: Loc,
    pub name: Ident,
    pub body: ClassBlock,
    // analyzer annotations
    pub symbol: Option<SymbolId>,
    pub own_scope: Option<ScopeId>,
}

/// `enum Name { A, B, C }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub loc: Loc,
    pub name: Ident,
    pub values: Vec<Ident>,
    // analyzer annotations
    pub symbol: Option<SymbolId>,
    pub own_scope: Option<ScopeId>,
}

// ============================================================================
// Blocks and statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub scope: Option<ScopeId>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            statements,
            scope: None,
        }
    }
}

/// Class bodies hold declarations only, no free statements.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassBlock {
    pub declarations: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Decl(Decl),
    Expr(ExprStmt),
    Return(ReturnStmt),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    Switch(SwitchStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
}

/// An expression in statement position; only assignments and calls qualify,
/// which the parser enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub loc: Loc,
    pub expression: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
}

/// C-style loop: `for (var i: int = 0; cond; update) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<VarDecl>,
    pub condition: Expr,
    pub update: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
}

/// `switch (expr) { case e: { ... } default: { ... } }`; no fallthrough.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub loc: Loc,
    pub discriminant: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStmt {
    pub loc: Loc,
    /// Stamped by the analyzer while loop depth is tracked.
    pub inside_loop: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStmt {
    pub loc: Loc,
    pub inside_loop: bool,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Literal(Literal),
    Identifier(Identifier),
    Array(ArrayLiteral),
    Member(MemberAccess),
    Index(IndexAccess),
    Call(FunctionCall),
    New(ObjectInstantiation),
}

impl Expr {
    pub fn loc(&self) -> Loc {
        match self {
            Expr::Binary(e) => e.loc,
            Expr::Unary(e) => e.loc,
            Expr::Literal(e) => e.loc,
            Expr::Identifier(e) => e.loc,
            Expr::Array(e) => e.loc,
            Expr::Member(e) => e.loc,
            Expr::Index(e) => e.loc,
            Expr::Call(e) => e.loc,
            Expr::New(e) => e.loc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Assign,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    /// Operators whose result type is always `bool`.
    pub fn produces_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::LogicalOr
                | BinaryOp::LogicalAnd
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Assign => "=",
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub loc: Loc,
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    // analyzer annotation
    pub evaluated_type: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub loc: Loc,
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

/// Which token class a literal came from. String lexemes are stored without
/// their quotes, so the token class is what distinguishes `"42"` from `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    Bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub loc: Loc,
    pub kind: LiteralKind,
    /// Raw lexeme text as it appeared in source.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub loc: Loc,
    pub name: Ident,
    // analyzer annotations
    pub resolved_symbol: Option<SymbolId>,
    pub evaluated_type: Option<TypeNode>,
}

impl Identifier {
    pub fn new(loc: Loc, name: Ident) -> Self {
        Self {
            loc,
            name,
            resolved_symbol: None,
            evaluated_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub loc: Loc,
    pub elements: Vec<Expr>,
    // analyzer annotation
    pub evaluated_type: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub loc: Loc,
    pub object: Box<Expr>,
    pub member: Ident,
    // analyzer annotations
    pub member_symbol: Option<SymbolId>,
    pub object_type: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccess {
    pub loc: Loc,
    pub object: Box<Expr>,
    pub index: Box<Expr>,
}

/// `name(args)` or a call on a postfix chain (`callee` set, `name` empty).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub loc: Loc,
    pub callee: Option<Box<Expr>>,
    pub name: Ident,
    pub arguments: Vec<Expr>,
    // analyzer annotations
    pub resolved_function: Option<SymbolId>,
    pub evaluated_type: Option<TypeNode>,
}

/// `ClassName(args)`; produced by the analyzer when a call's name resolves
/// to a class symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstantiation {
    pub loc: Loc,
    pub name: Ident,
    pub arguments: Vec<Expr>,
    // analyzer annotations
    pub class_symbol: Option<SymbolId>,
    pub evaluated_type: Option<TypeNode>,
}
