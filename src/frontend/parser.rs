//! Parser for the Mica programming language
//!
//! Converts the token stream into an AST following the fixed
//! operator-precedence grammar. Parse errors are accumulated: the parser
//! records a diagnostic and synchronizes at the next statement or
//! declaration boundary, so one bad statement does not hide the rest of the
//! file. The returned [`Program`] may be partial when errors occurred.

use crate::frontend::ast::*;
use crate::frontend::diagnostics::{Diagnostic, Diagnostics, Phase};
use crate::frontend::lexer::{Token, TokenKind, TYPE_KEYWORDS};

type ParseResult<T> = Result<T, Diagnostic>;

/// Keywords the parser resynchronizes on after an error.
const SYNC_KEYWORDS: &[&str] = &[
    "let", "var", "fun", "class", "enum", "if", "for", "while", "return", "break", "continue",
    "switch",
];

/// Keywords that can begin a declaration inside a block or at top level.
const DECL_KEYWORDS: &[&str] = &["let", "var", "fun", "class", "enum"];

/// Parser state: a cursor into the token vector plus accumulated errors.
pub struct Parser<'t, 'src> {
    tokens: &'t [Token<'src>],
    pos: usize,
    errors: Vec<Diagnostic>,
}

impl<'t, 'src> Parser<'t, 'src> {
    pub fn new(tokens: &'t [Token<'src>]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the entire token stream into a program, draining accumulated
    /// errors into `sink`.
    pub fn parse_program(mut self, sink: &mut Diagnostics) -> Program {
        let mut declarations = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(decl) => declarations.push(decl),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        for error in self.errors {
            sink.push(error);
        }
        Program { declarations }
    }

    // ========================================================================
    // Cursor primitives
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.tokens.is_empty() || self.peek().kind == TokenKind::EndOfFile
    }

    fn peek(&self) -> Token<'src> {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        self.tokens[idx]
    }

    fn previous(&self) -> Token<'src> {
        self.tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token<'src> {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_keyword(&self, expected: &str) -> bool {
        self.check_kind(TokenKind::Keyword) && self.peek().lexeme == expected
    }

    fn match_keyword(&mut self, expected: &str) -> bool {
        if self.check_keyword(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_punctuation(&self, expected: &str) -> bool {
        self.check_kind(TokenKind::Punctuation) && self.peek().lexeme == expected
    }

    fn match_punctuation(&mut self, expected: &str) -> bool {
        if self.check_punctuation(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_operator(&self, expected: &str) -> bool {
        self.check_kind(TokenKind::Operator) && self.peek().lexeme == expected
    }

    fn match_operator(&mut self, expected: &str) -> bool {
        if self.check_operator(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The pending operator lexeme, if the next token is an operator.
    fn peek_operator(&self) -> Option<&'src str> {
        if self.check_kind(TokenKind::Operator) {
            Some(self.peek().lexeme)
        } else {
            None
        }
    }

    fn consume_kind(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token<'src>> {
        if self.check_kind(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn consume_punctuation(&mut self, expected: &str, message: &str) -> ParseResult<Token<'src>> {
        if self.check_punctuation(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: &str) -> Diagnostic {
        let token = self.peek();
        Diagnostic::error(Phase::Parser, token.line, token.column, message)
    }

    fn loc_of(token: Token<'_>) -> Loc {
        Loc::new(token.line, token.column)
    }

    /// Skip forward to a statement/declaration boundary after a parse error:
    /// just past a `;`, or before a keyword that can start a statement, a
    /// closing `}`, or end of input.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            let prev = self.previous();
            if prev.kind == TokenKind::Punctuation && prev.lexeme == ";" {
                return;
            }
            if self.check_punctuation("}") {
                return;
            }
            if self.check_kind(TokenKind::Keyword) && SYNC_KEYWORDS.contains(&self.peek().lexeme) {
                return;
            }
            self.advance();
        }
    }

    fn at_declaration_keyword(&self) -> bool {
        self.check_kind(TokenKind::Keyword) && DECL_KEYWORDS.contains(&self.peek().lexeme)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declaration(&mut self) -> ParseResult<Decl> {
        if self.match_keyword("let") {
            return Ok(Decl::Var(self.var_declaration(true)?));
        }
        if self.match_keyword("var") {
            return Ok(Decl::Var(self.var_declaration(false)?));
        }
        if self.match_keyword("fun") {
            return Ok(Decl::Fun(self.fun_declaration()?));
        }
        if self.match_keyword("class") {
            return Ok(Decl::Class(self.class_declaration()?));
        }
        if self.match_keyword("enum") {
            return Ok(Decl::Enum(self.enum_declaration()?));
        }
        Err(self.error_at_current("Expected declaration."))
    }

    /// Called with the `let`/`var` keyword already consumed.
    fn var_declaration(&mut self, is_const: bool) -> ParseResult<VarDecl> {
        let loc = Self::loc_of(self.previous());
        let name = self
            .consume_kind(TokenKind::Identifier, "Expected variable name.")?
            .lexeme
            .to_string();
        self.consume_punctuation(":", "Expected ':' after variable name.")?;
        let declared_type = self.parse_type(is_const, true)?;

        let initializer = if self.match_operator("=") {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume_punctuation(";", "Expected ';' after variable declaration.")?;

        Ok(VarDecl {
            loc,
            name,
            declared_type: Some(declared_type),
            initializer,
            is_const,
            resolved_type: None,
            symbol: None,
        })
    }

    /// A type is a primitive keyword, a user identifier, or `[T]` where `T`
    /// is a non-array type; arrays nest one level only.
    fn parse_type(&mut self, is_const: bool, allow_array: bool) -> ParseResult<TypeNode> {
        if self.check_kind(TokenKind::Keyword) && TYPE_KEYWORDS.contains(self.peek().lexeme) {
            let name = self.advance().lexeme.to_string();
            return Ok(TypeNode { name, is_const });
        }
        if self.check_kind(TokenKind::Identifier) {
            let name = self.advance().lexeme.to_string();
            return Ok(TypeNode { name, is_const });
        }
        if self.check_punctuation("[") {
            if !allow_array {
                return Err(self.error_at_current("Nested arrays not supported."));
            }
            self.advance();
            let element = self.parse_type(false, false)?;
            self.consume_punctuation("]", "Expected ']' after array element type.")?;
            return Ok(TypeNode {
                name: format!("[{}]", element.name),
                is_const,
            });
        }
        Err(self.error_at_current("Expected type name."))
    }

    fn fun_declaration(&mut self) -> ParseResult<FunDecl> {
        let loc = Self::loc_of(self.previous());
        let name = self
            .consume_kind(TokenKind::Identifier, "Expected function name.")?
            .lexeme
            .to_string();
        self.consume_punctuation("(", "Expected '(' after function name.")?;

        let parameters = if self.check_kind(TokenKind::Identifier) {
            self.parameter_list()?
        } else {
            Vec::new()
        };
        self.consume_punctuation(")", "Expected ')' after parameters.")?;

        let return_type = if self.match_punctuation(":") {
            Some(self.parse_type(false, true)?)
        } else {
            None
        };

        let body = self.block()?;

        Ok(FunDecl {
            loc,
            name,
            parameters,
            return_type,
            body,
            symbol: None,
            param_scope: None,
            body_scope: None,
        })
    }

    fn parameter_list(&mut self) -> ParseResult<Vec<Param>> {
        let mut parameters = vec![self.parameter("Expected parameter name.")?];
        while self.match_punctuation(",") {
            parameters.push(self.parameter("Expected parameter name after comma.")?);
        }
        Ok(parameters)
    }

    fn parameter(&mut self, name_message: &str) -> ParseResult<Param> {
        let token = self.consume_kind(TokenKind::Identifier, name_message)?;
        let loc = Self::loc_of(token);
        let name = token.lexeme.to_string();
        self.consume_punctuation(":", "Expected ':' after parameter name.")?;
        // `const` marks the parameter immutable-by-contract.
        let is_const = self.match_keyword("const");
        let ty = self.parse_type(is_const, true)?;
        Ok(Param { loc, name, ty })
    }

    fn class_declaration(&mut self) -> ParseResult<ClassDecl> {
        let loc = Self::loc_of(self.previous());
        let name = self
            .consume_kind(TokenKind::Identifier, "Expected class name.")?
            .lexeme
            .to_string();
        let body = self.class_block()?;
        Ok(ClassDecl {
            loc,
            name,
            body,
            symbol: None,
            own_scope: None,
        })
    }

    fn class_block(&mut self) -> ParseResult<ClassBlock> {
        self.consume_punctuation("{", "Expected '{' to start a class block.")?;
        let mut declarations = Vec::new();
        while !self.check_punctuation("}") && !self.is_at_end() {
            if self.at_declaration_keyword() {
                match self.declaration() {
                    Ok(decl) => declarations.push(decl),
                    Err(e) => {
                        self.errors.push(e);
                        self.synchronize();
                    }
                }
            } else {
                let error = self.error_at_current("Expected declaration.");
                self.errors.push(error);
                self.synchronize();
            }
        }
        self.consume_punctuation("}", "Expected '}' to close class block.")?;
        Ok(ClassBlock { declarations })
    }

    fn enum_declaration(&mut self) -> ParseResult<EnumDecl> {
        let loc = Self::loc_of(self.previous());
        let name = self
            .consume_kind(TokenKind::Identifier, "Expected enum name.")?
            .lexeme
            .to_string();
        let values = self.enum_block()?;
        Ok(EnumDecl {
            loc,
            name,
            values,
            symbol: None,
            own_scope: None,
        })
    }

    fn enum_block(&mut self) -> ParseResult<Vec<Ident>> {
        self.consume_punctuation("{", "Expected '{' to start enum body.")?;
        let mut values = Vec::new();

        if self.match_punctuation("}") {
            return Ok(values);
        }

        loop {
            let value = self
                .consume_kind(TokenKind::Identifier, "Expected enum value name.")?
                .lexeme
                .to_string();
            values.push(value);

            if self.match_punctuation(",") {
                // trailing comma before the closing brace
                if self.check_punctuation("}") {
                    break;
                }
            } else {
                break;
            }
        }

        self.consume_punctuation("}", "Expected '}' to close enum body.")?;
        Ok(values)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self) -> ParseResult<Block> {
        self.consume_punctuation("{", "Expected '{' to start a block.")?;
        let mut statements = Vec::new();
        while !self.check_punctuation("}") && !self.is_at_end() {
            let item = if self.at_declaration_keyword() {
                self.declaration().map(Stmt::Decl)
            } else {
                self.statement()
            };
            match item {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        self.consume_punctuation("}", "Expected '}' to close block.")?;
        Ok(Block::new(statements))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_keyword("if") {
            return self.if_statement();
        }
        if self.match_keyword("for") {
            return self.for_statement();
        }
        if self.match_keyword("while") {
            return self.while_statement();
        }
        if self.match_keyword("return") {
            return self.return_statement();
        }
        if self.match_keyword("break") {
            let loc = Self::loc_of(self.previous());
            self.consume_punctuation(";", "Expected ';' after 'break'.")?;
            return Ok(Stmt::Break(BreakStmt {
                loc,
                inside_loop: false,
            }));
        }
        if self.match_keyword("continue") {
            let loc = Self::loc_of(self.previous());
            self.consume_punctuation(";", "Expected ';' after 'continue'.")?;
            return Ok(Stmt::Continue(ContinueStmt {
                loc,
                inside_loop: false,
            }));
        }
        if self.match_keyword("switch") {
            return self.switch_statement();
        }

        // Anything else must be an expression statement, and only
        // assignments and calls may stand alone.
        let expression = self.expression()?;
        let is_assignment = matches!(&expression, Expr::Binary(b) if b.op == BinaryOp::Assign);
        if is_assignment || matches!(expression, Expr::Call(_)) {
            self.consume_punctuation(";", "Expected ';' after expression statement.")?;
            Ok(Stmt::Expr(ExprStmt { expression }))
        } else {
            Err(self.error_at_current("Expected statement."))
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume_punctuation("(", "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume_punctuation(")", "Expected ')' after if condition.")?;
        let then_branch = self.block()?;
        let else_branch = if self.match_keyword("else") {
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume_punctuation("(", "Expected '(' after 'for'.")?;
        // The initializer consumes its own terminating `;`.
        let init = if self.match_keyword("var") {
            Some(self.var_declaration(false)?)
        } else {
            None
        };
        let condition = self.expression()?;
        self.consume_punctuation(";", "Expected ';' after for condition.")?;
        let update = self.expression()?;
        self.consume_punctuation(")", "Expected ')' after for clauses.")?;
        let body = self.block()?;
        Ok(Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
        }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume_punctuation("(", "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume_punctuation(")", "Expected ')' after while condition.")?;
        let body = self.block()?;
        Ok(Stmt::While(WhileStmt { condition, body }))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let loc = Self::loc_of(self.previous());
        let expression = if !self.check_punctuation(";") {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume_punctuation(";", "Expected ';' after return statement.")?;
        Ok(Stmt::Return(ReturnStmt { loc, expression }))
    }

    fn switch_statement(&mut self) -> ParseResult<Stmt> {
        let loc = Self::loc_of(self.previous());
        self.consume_punctuation("(", "Expected '(' after 'switch'.")?;
        let discriminant = self.expression()?;
        self.consume_punctuation(")", "Expected ')' after switch expression.")?;
        self.consume_punctuation("{", "Expected '{' to start switch body.")?;

        let mut cases = Vec::new();
        let mut default = None;

        while !self.check_punctuation("}") && !self.is_at_end() {
            if self.match_keyword("case") {
                let value = self.expression()?;
                self.consume_punctuation(":", "Expected ':' after case expression.")?;
                let body = self.block()?;
                cases.push(SwitchCase { value, body });
            } else if self.match_keyword("default") {
                let default_loc = self.previous();
                self.consume_punctuation(":", "Expected ':' after 'default'.")?;
                let body = self.block()?;
                if default.is_some() {
                    self.errors.push(Diagnostic::error(
                        Phase::Parser,
                        default_loc.line,
                        default_loc.column,
                        "Multiple default clauses in switch statement.",
                    ));
                } else {
                    default = Some(body);
                }
            } else {
                return Err(self.error_at_current("Expected 'case' or 'default' in switch statement."));
            }
        }

        self.consume_punctuation("}", "Expected '}' to close switch body.")?;
        Ok(Stmt::Switch(SwitchStmt {
            loc,
            discriminant,
            cases,
            default,
        }))
    }

    // ========================================================================
    // Expressions (precedence ladder, lowest binding first)
    // ========================================================================

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            loc: left.loc(),
            left: Box::new(left),
            op,
            right: Box::new(right),
            evaluated_type: None,
        })
    }

    /// Right-associative: `a = b = c` is `a = (b = c)`.
    fn assignment(&mut self) -> ParseResult<Expr> {
        let left = self.logical_or()?;
        if self.match_operator("=") {
            let right = self.assignment()?;
            return Ok(Self::binary(left, BinaryOp::Assign, right));
        }
        Ok(left)
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logical_and()?;
        while self.match_operator("||") {
            let right = self.logical_and()?;
            expr = Self::binary(expr, BinaryOp::LogicalOr, right);
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.bitwise_or()?;
        while self.match_operator("&&") {
            let right = self.bitwise_or()?;
            expr = Self::binary(expr, BinaryOp::LogicalAnd, right);
        }
        Ok(expr)
    }

    fn bitwise_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.bitwise_xor()?;
        while self.match_operator("|") {
            let right = self.bitwise_xor()?;
            expr = Self::binary(expr, BinaryOp::BitOr, right);
        }
        Ok(expr)
    }

    fn bitwise_xor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.bitwise_and()?;
        while self.match_operator("^") {
            let right = self.bitwise_and()?;
            expr = Self::binary(expr, BinaryOp::BitXor, right);
        }
        Ok(expr)
    }

    fn bitwise_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_operator("&") {
            let right = self.equality()?;
            expr = Self::binary(expr, BinaryOp::BitAnd, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.relational()?;
        loop {
            let op = match self.peek_operator() {
                Some("==") => BinaryOp::Equal,
                Some("!=") => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    /// Non-chaining: at most one relational operator applies, so `a < b < c`
    /// does not parse as a chain and must be parenthesized.
    fn relational(&mut self) -> ParseResult<Expr> {
        let expr = self.shift()?;
        let op = match self.peek_operator() {
            Some("<") => BinaryOp::Less,
            Some(">") => BinaryOp::Greater,
            Some("<=") => BinaryOp::LessEqual,
            Some(">=") => BinaryOp::GreaterEqual,
            _ => return Ok(expr),
        };
        self.advance();
        let right = self.shift()?;
        Ok(Self::binary(expr, op, right))
    }

    fn shift(&mut self) -> ParseResult<Expr> {
        let mut expr = self.additive()?;
        loop {
            let op = match self.peek_operator() {
                Some("<<") => BinaryOp::ShiftLeft,
                Some(">>") => BinaryOp::ShiftRight,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek_operator() {
                Some("+") => BinaryOp::Add,
                Some("-") => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek_operator() {
                Some("*") => BinaryOp::Multiply,
                Some("/") => BinaryOp::Divide,
                Some("%") => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = Self::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_operator() {
            Some("-") => Some(UnaryOp::Negate),
            Some("!") => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryExpr {
                loc: Self::loc_of(token),
                op,
                operand: Box::new(operand),
            }));
        }
        self.primary()
    }

    fn argument_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();
        if !self.check_punctuation(")") {
            arguments.push(self.expression()?);
            while self.match_punctuation(",") {
                arguments.push(self.expression()?);
            }
        }
        Ok(arguments)
    }

    fn expression_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut expressions = vec![self.expression()?];
        while self.match_punctuation(",") {
            expressions.push(self.expression()?);
        }
        Ok(expressions)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_kind(TokenKind::Identifier) {
            let token = self.previous();
            let loc = Self::loc_of(token);
            let name = token.lexeme.to_string();

            // Direct call: `name(args)`.
            if self.check_punctuation("(") {
                self.advance();
                let arguments = self.argument_list()?;
                self.consume_punctuation(")", "Expected ')' after arguments")?;
                return Ok(Expr::Call(FunctionCall {
                    loc,
                    callee: None,
                    name,
                    arguments,
                    resolved_function: None,
                    evaluated_type: None,
                }));
            }

            // A left-value optionally extended by a postfix chain.
            let mut expr = Expr::Identifier(Identifier::new(loc, name));
            loop {
                if self.match_punctuation(".") {
                    let member = self
                        .consume_kind(TokenKind::Identifier, "Expected member name after '.'")?
                        .lexeme
                        .to_string();
                    let loc = expr.loc();
                    expr = Expr::Member(MemberAccess {
                        loc,
                        object: Box::new(expr),
                        member,
                        member_symbol: None,
                        object_type: None,
                    });
                } else if self.check_punctuation("(") {
                    self.advance();
                    let arguments = self.argument_list()?;
                    self.consume_punctuation(")", "Expected ')' after arguments")?;
                    let loc = expr.loc();
                    expr = Expr::Call(FunctionCall {
                        loc,
                        callee: Some(Box::new(expr)),
                        name: String::new(),
                        arguments,
                        resolved_function: None,
                        evaluated_type: None,
                    });
                } else if self.match_punctuation("[") {
                    let index = self.expression()?;
                    self.consume_punctuation("]", "Expected ']' after index expression.")?;
                    let loc = expr.loc();
                    expr = Expr::Index(IndexAccess {
                        loc,
                        object: Box::new(expr),
                        index: Box::new(index),
                    });
                } else {
                    break;
                }
            }
            return Ok(expr);
        }

        if self.match_kind(TokenKind::Number) {
            let token = self.previous();
            return Ok(Expr::Literal(Literal {
                loc: Self::loc_of(token),
                kind: LiteralKind::Number,
                value: token.lexeme.to_string(),
            }));
        }

        if self.match_kind(TokenKind::String) {
            let token = self.previous();
            return Ok(Expr::Literal(Literal {
                loc: Self::loc_of(token),
                kind: LiteralKind::String,
                value: token.lexeme.to_string(),
            }));
        }

        // Only the boolean keywords may appear in expression position.
        if self.check_kind(TokenKind::Keyword)
            && (self.peek().lexeme == "true" || self.peek().lexeme == "false")
        {
            let token = self.advance();
            return Ok(Expr::Literal(Literal {
                loc: Self::loc_of(token),
                kind: LiteralKind::Bool,
                value: token.lexeme.to_string(),
            }));
        }

        if self.match_punctuation("(") {
            let expr = self.expression()?;
            self.consume_punctuation(")", "Expected ')' after expression.")?;
            return Ok(expr);
        }

        if self.match_punctuation("[") {
            let loc = Self::loc_of(self.previous());
            if self.match_punctuation("]") {
                return Ok(Expr::Array(ArrayLiteral {
                    loc,
                    elements: Vec::new(),
                    evaluated_type: None,
                }));
            }
            let elements = self.expression_list()?;
            self.consume_punctuation("]", "Expected ']' after array elements.")?;
            return Ok(Expr::Array(ArrayLiteral {
                loc,
                elements,
                evaluated_type: None,
            }));
        }

        Err(self.error_at_current("Expected expression"))
    }
}

/// Convenience function to parse a token stream into `sink`.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token<'_>], sink: &mut Diagnostics) -> Program {
    Parser::new(tokens).parse_program(sink)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer;

    fn parse_source(source: &str) -> (Program, Diagnostics) {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(source, &mut sink);
        let program = parse(&tokens, &mut sink);
        (program, sink)
    }

    fn parse_ok(source: &str) -> Program {
        let (program, sink) = parse_source(source);
        assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.entries());
        program
    }

    fn only_var(program: &Program) -> &VarDecl {
        match &program.declarations[0] {
            Decl::Var(v) => v,
            other => panic!("expected variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn empty_source_parses_to_empty_program() {
        let program = parse_ok("");
        assert!(program.declarations.is_empty());
    }

    #[test]
    fn let_declaration_is_const() {
        let program = parse_ok("let pi: float = 3.14;");
        let var = only_var(&program);
        assert_eq!(var.name, "pi");
        assert!(var.is_const);
        let ty = var.declared_type.as_ref().unwrap();
        assert_eq!(ty.name, "float");
        assert!(ty.is_const);
        assert!(matches!(
            var.initializer,
            Some(Expr::Literal(Literal { kind: LiteralKind::Number, ref value, .. })) if value == "3.14"
        ));
    }

    #[test]
    fn var_declaration_without_initializer() {
        let program = parse_ok("var count: int;");
        let var = only_var(&program);
        assert!(!var.is_const);
        assert!(var.initializer.is_none());
    }

    #[test]
    fn array_type_annotation() {
        let program = parse_ok("var xs: [int] = [1, 2];");
        let var = only_var(&program);
        assert_eq!(var.declared_type.as_ref().unwrap().name, "[int]");
        match var.initializer.as_ref().unwrap() {
            Expr::Array(array) => assert_eq!(array.elements.len(), 2),
            other => panic!("expected array literal, got {other:?}"),
        }
    }

    #[test]
    fn nested_array_types_are_rejected() {
        let (_, sink) = parse_source("var xs: [[int]] = [];");
        assert!(sink
            .iter()
            .any(|d| d.message == "Nested arrays not supported."));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse_ok("var r: int = 1 + 2 * 3;");
        let var = only_var(&program);
        let root = match var.initializer.as_ref().unwrap() {
            Expr::Binary(b) => b,
            other => panic!("expected binary root, got {other:?}"),
        };
        assert_eq!(root.op, BinaryOp::Add);
        assert!(matches!(
            &*root.left,
            Expr::Literal(Literal { ref value, .. }) if value == "1"
        ));
        let right = match &*root.right {
            Expr::Binary(b) => b,
            other => panic!("expected binary right child, got {other:?}"),
        };
        assert_eq!(right.op, BinaryOp::Multiply);
    }

    #[test]
    fn shift_binds_between_relational_and_additive() {
        let program = parse_ok("var r: bool = 1 << 2 < 3 + 4;");
        let var = only_var(&program);
        let root = match var.initializer.as_ref().unwrap() {
            Expr::Binary(b) => b,
            other => panic!("expected binary root, got {other:?}"),
        };
        assert_eq!(root.op, BinaryOp::Less);
        assert!(matches!(&*root.left, Expr::Binary(b) if b.op == BinaryOp::ShiftLeft));
        assert!(matches!(&*root.right, Expr::Binary(b) if b.op == BinaryOp::Add));
    }

    #[test]
    fn relational_does_not_chain() {
        let (_, sink) = parse_source("var r: bool = 1 < 2 < 3;");
        assert!(sink.has_errors(), "a < b < c must not parse");
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_ok("fun f() { a = b = 1; }");
        let fun = match &program.declarations[0] {
            Decl::Fun(f) => f,
            other => panic!("expected function, got {other:?}"),
        };
        let expr = match &fun.body.statements[0] {
            Stmt::Expr(e) => &e.expression,
            other => panic!("expected expression statement, got {other:?}"),
        };
        let outer = match expr {
            Expr::Binary(b) => b,
            other => panic!("expected assignment, got {other:?}"),
        };
        assert_eq!(outer.op, BinaryOp::Assign);
        assert!(matches!(&*outer.right, Expr::Binary(b) if b.op == BinaryOp::Assign));
    }

    #[test]
    fn bare_expression_statement_is_rejected() {
        let (_, sink) = parse_source("fun f() { 1 + 2; }");
        assert!(sink.iter().any(|d| d.message == "Expected statement."));
    }

    #[test]
    fn call_statement_is_accepted() {
        let program = parse_ok("fun f() { g(1, 2); }");
        let fun = match &program.declarations[0] {
            Decl::Fun(f) => f,
            _ => unreachable!(),
        };
        match &fun.body.statements[0] {
            Stmt::Expr(e) => match &e.expression {
                Expr::Call(call) => {
                    assert_eq!(call.name, "g");
                    assert_eq!(call.arguments.len(), 2);
                    assert!(call.callee.is_none());
                }
                other => panic!("expected call, got {other:?}"),
            },
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn member_chain_with_call_and_index() {
        let program = parse_ok("fun f() { a.b.run(); }");
        let fun = match &program.declarations[0] {
            Decl::Fun(f) => f,
            _ => unreachable!(),
        };
        let call = match &fun.body.statements[0] {
            Stmt::Expr(e) => match &e.expression {
                Expr::Call(c) => c,
                other => panic!("expected call, got {other:?}"),
            },
            _ => unreachable!(),
        };
        assert!(call.callee.is_some());
        assert!(call.name.is_empty());
        match call.callee.as_deref().unwrap() {
            Expr::Member(access) => assert_eq!(access.member, "run"),
            other => panic!("expected member access callee, got {other:?}"),
        }
    }

    #[test]
    fn keyword_literals_parse_other_keywords_do_not() {
        let program = parse_ok("let flag: bool = true;");
        let var = only_var(&program);
        assert!(matches!(
            var.initializer,
            Some(Expr::Literal(Literal { kind: LiteralKind::Bool, ref value, .. })) if value == "true"
        ));

        let (_, sink) = parse_source("let bad: int = while;");
        assert!(sink.iter().any(|d| d.message == "Expected expression"));
    }

    #[test]
    fn if_else_and_loops() {
        let program = parse_ok(
            "fun f() {\n\
             \x20 if (a < 1) { b = 2; } else { b = 3; }\n\
             \x20 while (a < 10) { a = a + 1; }\n\
             \x20 for (var i: int = 0; i < 3; i = i + 1) { poll(); }\n\
             }",
        );
        let fun = match &program.declarations[0] {
            Decl::Fun(f) => f,
            _ => unreachable!(),
        };
        assert!(matches!(fun.body.statements[0], Stmt::If(_)));
        assert!(matches!(fun.body.statements[1], Stmt::While(_)));
        match &fun.body.statements[2] {
            Stmt::For(for_stmt) => {
                assert!(for_stmt.init.is_some());
                assert_eq!(for_stmt.init.as_ref().unwrap().name, "i");
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn switch_with_cases_and_default() {
        let program = parse_ok(
            "fun f() { switch (x) { case 1: { a(); } case 2: { b(); } default: { c(); } } }",
        );
        let fun = match &program.declarations[0] {
            Decl::Fun(f) => f,
            _ => unreachable!(),
        };
        match &fun.body.statements[0] {
            Stmt::Switch(switch) => {
                assert_eq!(switch.cases.len(), 2);
                assert!(switch.default.is_some());
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_default_clause_is_reported() {
        let (_, sink) =
            parse_source("fun f() { switch (x) { default: { a(); } default: { b(); } } }");
        assert!(sink
            .iter()
            .any(|d| d.message == "Multiple default clauses in switch statement."));
    }

    #[test]
    fn enum_body_allows_trailing_comma() {
        let program = parse_ok("enum Color { Red, Green, Blue, }");
        match &program.declarations[0] {
            Decl::Enum(e) => assert_eq!(e.values, vec!["Red", "Green", "Blue"]),
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn class_block_holds_declarations_only() {
        let program = parse_ok(
            "class Point {\n\
             \x20 var x: float = 0.0;\n\
             \x20 var y: float = 0.0;\n\
             \x20 fun length(): float { return x; }\n\
             }",
        );
        match &program.declarations[0] {
            Decl::Class(class) => {
                assert_eq!(class.name, "Point");
                assert_eq!(class.body.declarations.len(), 3);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn const_parameter_marks_the_type() {
        let program = parse_ok("fun draw(shape: const string) { render(shape); }");
        match &program.declarations[0] {
            Decl::Fun(fun) => {
                assert_eq!(fun.parameters.len(), 1);
                assert!(fun.parameters[0].ty.is_const);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn parser_recovers_and_reports_multiple_errors() {
        let (program, sink) = parse_source(
            "var a: int = ;\n\
             var ok: int = 1;\n\
             var b: = 2;\n",
        );
        assert!(sink.error_count() >= 2, "expected two parse errors, got {:?}", sink.entries());
        // The healthy declaration in between still survives.
        assert!(program
            .declarations
            .iter()
            .any(|d| matches!(d, Decl::Var(v) if v.name == "ok")));
    }

    #[test]
    fn top_level_statement_is_a_diagnostic() {
        let (_, sink) = parse_source("return 1;");
        assert!(sink.iter().any(|d| d.message == "Expected declaration."));
    }
}
