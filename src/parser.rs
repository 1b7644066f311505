use crate::{
    ast::{
        Access, BinaryOperator, Block, Class, Expr, ExprKind, Ident, Member, MemberKind, Method,
        Param, Program, Stmt, StmtKind, TypeName, UnaryOperator, Untyped, VarDecl,
    },
    diagnostic::{Classify, DiagnosticKind},
    lexer::extract,
    token::{Span, Spanned, Token, TokenKind},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole program out of the tokens produced by
/// [`crate::lexer::tokenize`].
///
/// Parsing stops at the first syntax error; there is no recovery.
pub fn parse_program(src: &str, tokens: &[Token]) -> Result<Program<Untyped>> {
    let program = Parser::new(src, tokens).parse_program()?;
    log::debug!("parsed {} classes", program.classes.len());
    Ok(program)
}

/// Parses a single expression, which must span the whole input.
pub fn parse_expr(src: &str, tokens: &[Token]) -> Result<Expr<Untyped>> {
    let mut p = Parser::new(src, tokens);
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

/// Deepest nesting of blocks and expressions that is accepted. Later stages
/// recurse over the tree, so this bounds them as well.
pub const MAX_NESTING: usize = 128;

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    /// Nesting level of the construct being parsed.
    depth: usize,
    /// Highest level reached by the current expression. Operators lift their
    /// node above it, since left operands are built before their parents.
    peak: usize,
}

impl Parser<'_, '_> {
    fn parse_program(&mut self) -> Result<Program<Untyped>> {
        let mut classes = Vec::with_capacity(4);
        while !self.is(TokenKind::Eof) {
            classes.push(self.parse_class()?);
        }
        Ok(Program { classes })
    }

    fn parse_class(&mut self) -> Result<Class<Untyped>> {
        self.consume(TokenKind::Class)?;
        let name = self.parse_ident()?;

        let parent = if self.take(TokenKind::Extends) {
            Some(self.parse_ident()?)
        } else {
            None
        };

        self.consume(TokenKind::LBrace)?;
        let mut members = Vec::new();
        loop {
            let access = match self
                .consume_any(&[TokenKind::Public, TokenKind::Private, TokenKind::RBrace])?
                .kind
            {
                TokenKind::Public => Access::Public,
                TokenKind::Private => Access::Private,
                _ => break,
            };
            self.consume(TokenKind::Colon)?;
            while self.except([TokenKind::Public, TokenKind::Private, TokenKind::RBrace]) {
                let kind = self.parse_member()?;
                members.push(Member { access, kind });
            }
        }

        Ok(Class {
            name,
            parent,
            members,
        })
    }

    fn parse_member(&mut self) -> Result<MemberKind<Untyped>> {
        if self.take(TokenKind::Func) {
            return self.parse_method().map(MemberKind::Method);
        }
        let property = self.parse_var_decl()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(MemberKind::Property(property))
    }

    fn parse_method(&mut self) -> Result<Method<Untyped>> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_param)?;
        self.consume(TokenKind::RParen)?;
        let return_ty = if self.take(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Method {
            name,
            params,
            return_ty,
            body,
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        Ok(Param { ty, name })
    }

    /// Parses `type ID ['=' expr]`, without the trailing semicolon.
    fn parse_var_decl(&mut self) -> Result<VarDecl<Untyped>> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let initializer = if self.take(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(VarDecl {
            ty,
            name,
            initializer,
        })
    }

    fn parse_type(&mut self) -> Result<TypeName> {
        let token = self.advance();
        let ty = match token.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Float => Type::Float,
            TokenKind::String => Type::String,
            TokenKind::Bool => Type::Bool,
            TokenKind::Void => Type::Void,
            TokenKind::Identifier => Type::Class(extract::ident(token, self.src).into()),
            TokenKind::Array => return Err(token.span.wrap(Error::UnsupportedArray)),
            actual => return Err(token.span.wrap(Error::ExpectedType { actual })),
        };
        Ok(TypeName {
            ty,
            span: token.span,
        })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident::new(extract::ident(token, self.src), token.span))
    }

    fn parse_block(&mut self) -> Result<Block<Untyped>> {
        self.nested("block", |p| {
            let start = p.consume(TokenKind::LBrace)?;
            let mut stmts = Vec::new();
            while p.except([TokenKind::RBrace]) {
                stmts.push(p.parse_stmt()?);
            }
            let end = p.consume(TokenKind::RBrace)?;
            Ok(Block {
                stmts,
                span: start.span.to(end.span),
            })
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt<Untyped>> {
        let start = self.peek();
        let kind = match start.kind {
            // If: if ( expr ) block [else block]
            TokenKind::If => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let predicate = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let then_block = self.parse_block()?;
                let else_block = if !self.take(TokenKind::Else) {
                    None
                } else if self.is(TokenKind::If) {
                    // `else if` is sugar for an else block holding the if.
                    let nested = self.nested("statement", Parser::parse_stmt)?;
                    let span = nested.span;
                    Some(Block {
                        stmts: vec![nested],
                        span,
                    })
                } else {
                    Some(self.parse_block()?)
                };
                StmtKind::If {
                    predicate,
                    then_block,
                    else_block,
                }
            }

            // While: while ( expr ) block
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let predicate = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let body = self.parse_block()?;
                StmtKind::While { predicate, body }
            }

            // For: for ( init ; expr ; expr ) block
            TokenKind::For => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let init = self.parse_simple_stmt()?;
                self.consume(TokenKind::Semicolon)?;
                let predicate = self.parse_expr()?;
                self.consume(TokenKind::Semicolon)?;
                let update = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let body = self.parse_block()?;
                StmtKind::For {
                    init: Box::new(init),
                    predicate,
                    update,
                    body,
                }
            }

            // Return: return [expr] ;
            TokenKind::Return => {
                self.advance();
                let value = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                StmtKind::Return(value)
            }

            // Print: print ( [expr [, expr]*] ) ;
            TokenKind::Print => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let args =
                    self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                self.consume(TokenKind::RParen)?;
                self.consume(TokenKind::Semicolon)?;
                StmtKind::Print(args)
            }

            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),

            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.consume(TokenKind::Semicolon)?;
                stmt.kind
            }
        };
        Ok(Stmt {
            kind,
            span: start.span.to(self.previous().span),
        })
    }

    /// Parses a variable declaration or an expression, without the trailing
    /// semicolon. Used directly by `for` headers.
    fn parse_simple_stmt(&mut self) -> Result<Stmt<Untyped>> {
        let start = self.peek();
        let kind = if self.starts_var_decl() {
            StmtKind::VarDecl(self.parse_var_decl()?)
        } else {
            StmtKind::Expr(self.parse_expr()?)
        };
        Ok(Stmt {
            kind,
            span: start.span.to(self.previous().span),
        })
    }

    /// A declaration starts with a type: either a type keyword or a class
    /// name followed by the variable name.
    fn starts_var_decl(&self) -> bool {
        let current = self.peek().kind;
        current.is_primitive_type()
            || current == TokenKind::Array
            || (current == TokenKind::Identifier && self.nth(1).kind == TokenKind::Identifier)
    }

    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr<Untyped>> {
        let outer_peak = self.peak;
        let expr = self.nested("expression", |p| {
            p.peak = p.depth;
            p.parse_operators(min_bp)
        });
        self.peak = self.peak.max(outer_peak);
        expr
    }

    fn parse_operators(&mut self, min_bp: u8) -> Result<Expr<Untyped>> {
        let depth = self.depth;
        let lhs_token = self.advance();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();

            if let Some((lbp, rbp)) = Self::infix_binding_power(op_token.kind) {
                if lbp < min_bp {
                    // Operator binds less tightly than the minimum required
                    break;
                }

                self.advance(); // Operator
                lhs = self.parse_led(op_token, lhs, rbp)?;

                // The new node sits above both of its operands.
                self.depth = self.peak + 1;
                self.peak = self.depth;
                if self.depth > MAX_NESTING {
                    return Err(op_token.span.wrap(Error::NestedTooDeeply("expression")));
                }
                self.depth = depth;
            } else {
                // Not an infix operator
                break;
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    fn parse_nud(&mut self, token: Token) -> Result<Expr<Untyped>> {
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let ident = Ident::new(extract::ident(token, self.src), token.span);
                (ExprKind::Id(ident, ()), token.span)
            }
            TokenKind::IntLiteral => {
                let Ok(parsed) = extract::int(token, self.src) else {
                    return Err(token.span.wrap(Error::IntOutOfRange));
                };
                (ExprKind::Int(parsed), token.span)
            }
            TokenKind::FloatLiteral => {
                // Overflowing literals parse as infinity, which has no C++ literal.
                let parsed = match extract::float(token, self.src) {
                    Ok(parsed) if parsed.is_finite() => parsed,
                    _ => return Err(token.span.wrap(Error::InvalidFloat)),
                };
                (ExprKind::Float(parsed), token.span)
            }
            TokenKind::StringLiteral => (
                ExprKind::String(extract::string(token, self.src)),
                token.span,
            ),
            TokenKind::True => (ExprKind::Bool(true), token.span),
            TokenKind::False => (ExprKind::Bool(false), token.span),
            TokenKind::This => (ExprKind::This, token.span),

            // Grouping: ( expr )
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (expr.kind, token.span.to(end.span))
            }

            // New: new ID ( [expr [, expr]*] )
            TokenKind::New => {
                let class = self.parse_ident()?;
                self.consume(TokenKind::LParen)?;
                let args =
                    self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RParen)?;
                (ExprKind::New { class, args }, token.span.to(end.span))
            }

            // Prefix operators: !, -
            kind @ (TokenKind::Bang | TokenKind::Minus) => {
                let op = match kind {
                    TokenKind::Bang => UnaryOperator::Not,
                    _ => UnaryOperator::Neg,
                };
                let expr = self.parse_expr_bp(Self::PREFIX_BINDING_POWER)?;
                let span = token.span.to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            TokenKind::Array => return Err(token.span.wrap(Error::UnsupportedArray)),

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                return Err(token.span.wrap(error));
            }
        };

        Ok(Expr { kind, span, ty: () })
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix/postfix operators)
    fn parse_led(&mut self, op_token: Token, lhs: Expr<Untyped>, rbp: u8) -> Result<Expr<Untyped>> {
        let (kind, span) = match op_token.kind {
            // Assignment: (ID | expr.ID) = expr
            TokenKind::Assign => {
                if !matches!(lhs.kind, ExprKind::Id(..) | ExprKind::MemberAccess { .. }) {
                    return Err(lhs.span.wrap(Error::InvalidAssignmentTarget));
                }
                let value = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(value.span);
                let assign = ExprKind::Assignment {
                    target: Box::new(lhs),
                    value: Box::new(value),
                };
                (assign, span)
            }

            // Member access: expr . ID
            TokenKind::Dot => {
                let member = self.parse_ident()?;
                let span = lhs.span.to(member.span);
                let access = ExprKind::MemberAccess {
                    object: Box::new(lhs),
                    member,
                };
                (access, span)
            }

            // Call: ID ( args ) or expr . ID ( args )
            TokenKind::LParen => {
                let (receiver, method) = match lhs.kind {
                    ExprKind::Id(method, ()) => (None, method),
                    ExprKind::MemberAccess { object, member } => (Some(object), member),
                    _ => return Err(lhs.span.wrap(Error::NotCallable)),
                };
                // LParen was already consumed above.
                let args =
                    self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RParen)?;
                let call = ExprKind::Call {
                    receiver,
                    method,
                    args,
                    binding: (),
                };
                (call, lhs.span.to(end.span))
            }

            TokenKind::LBracket => return Err(op_token.span.wrap(Error::UnsupportedArray)),

            // Binary operators
            kind => {
                let Some(op) = Self::binary_operator(kind) else {
                    let error = Error::UnexpectedTokenInExpr { token: kind };
                    return Err(op_token.span.wrap(error));
                };
                // Parse right operand with correct precedence
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(rhs.span);
                let binary = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (binary, span)
            }
        };

        Ok(Expr { kind, span, ty: () })
    }

    /// Parses `item (separator item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        if self.is(end_delim) {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            if self.take(separator) {
                continue;
            }
            if self.is(end_delim) {
                break;
            }
            let c = self.peek();
            return Err(c.span.wrap(Error::UnexpectedAny {
                actual: c.kind,
                expected: Box::from([separator, end_delim]),
            }));
        }
        Ok(items)
    }

    const PREFIX_BINDING_POWER: u8 = 15;

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        let bp = match kind {
            // Assignment (right-associative)
            TokenKind::Assign => (2, 1),

            // Logical (left-associative)
            TokenKind::OrOr => (3, 4),
            TokenKind::AndAnd => (5, 6),

            // Equality and comparisons (left-associative)
            TokenKind::EqEq | TokenKind::NotEq => (7, 8),
            TokenKind::Less | TokenKind::Greater | TokenKind::LessEq | TokenKind::GreaterEq => {
                (9, 10)
            }

            // Addition/Subtraction (left-associative)
            TokenKind::Plus | TokenKind::Minus => (11, 12),

            // Multiplication/Division (left-associative)
            TokenKind::Star | TokenKind::Slash => (13, 14),

            // Prefix operators sit at 15 (see `PREFIX_BINDING_POWER`).

            // Member access / call, and indexing (rejected in `parse_led`)
            TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket => (17, 18),

            _ => return None,
        };
        Some(bp)
    }

    fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
        let op = match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Sub,
            TokenKind::Star => BinaryOperator::Mul,
            TokenKind::Slash => BinaryOperator::Div,
            TokenKind::Less => BinaryOperator::Lt,
            TokenKind::Greater => BinaryOperator::Gt,
            TokenKind::LessEq => BinaryOperator::Le,
            TokenKind::GreaterEq => BinaryOperator::Ge,
            TokenKind::EqEq => BinaryOperator::Eq,
            TokenKind::NotEq => BinaryOperator::Ne,
            TokenKind::AndAnd => BinaryOperator::And,
            TokenKind::OrOr => BinaryOperator::Or,
            _ => return None,
        };
        Some(op)
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok [Token]) -> Parser<'src, 'tok> {
        Parser {
            src,
            tokens,
            cursor: 0,
            depth: 0,
            peak: 0,
        }
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        what: &'static str,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let depth = self.depth;
        self.depth += 1;
        let result = if self.depth > MAX_NESTING {
            Err(self.peek().span.wrap(Error::NestedTooDeeply(what)))
        } else {
            parse(self)
        };
        self.depth = depth;
        result
    }

    /// Returns the current token.
    ///
    /// Past the end of the buffer this is an end of input token.
    fn peek(&self) -> Token {
        self.nth(0)
    }

    /// Returns the token `n` positions ahead of the current one.
    fn nth(&self, n: usize) -> Token {
        match self.tokens.get(self.cursor + n) {
            Some(token) => *token,
            None => self.eof(),
        }
    }

    /// Returns the last consumed token.
    fn previous(&self) -> Token {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .copied()
            .unwrap_or_else(|| self.eof())
    }

    fn eof(&self) -> Token {
        let span = match self.tokens.last() {
            Some(last) => Span {
                lo: last.span.hi(),
                len: 0,
                col: last.span.col + last.span.len,
                ..last.span
            },
            None => Span::new(self.src.len(), 0, 1, 1),
        };
        Token::new(TokenKind::Eof, span)
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not, fails.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(c.span.wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }))
        }
    }

    /// Advances if the current token matches any of the provided tokens. If
    /// not, fails.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(*t) {
                return Ok(self.advance());
            }
        }
        let c = self.peek();
        Err(c.span.wrap(Error::UnexpectedAny {
            actual: c.kind,
            expected: Box::from(expect),
        }))
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek().kind;
        c != TokenKind::Eof && except.into_iter().all(|e| c != e)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected {expected}, but found {actual}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("expected one of {}, but found {actual}", one_of(.expected))]
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    #[error("expected a type, but found {actual}")]
    ExpectedType { actual: TokenKind },
    #[error("unexpected {token} in expression")]
    UnexpectedTokenInExpr { token: TokenKind },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("expression is not callable")]
    NotCallable,
    #[error("integer literal out of range")]
    IntOutOfRange,
    #[error("invalid float literal")]
    InvalidFloat,
    #[error("arrays are not supported")]
    UnsupportedArray,
    #[error("{0} nested too deeply")]
    NestedTooDeeply(&'static str),
}

impl Classify for Error {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::SyntaxError
    }
}

fn one_of(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::MAX_NESTING;
    use crate::{
        lexer,
        util::test_utils::{format_errors, tree_tests},
    };

    #[track_caller]
    fn expr_errors(src: &str) -> Vec<String> {
        let tokens = lexer::tokenize(src).unwrap();
        match super::parse_expr(src, &tokens) {
            Ok(_) => vec![],
            Err(error) => format_errors([error]),
        }
    }

    #[track_caller]
    fn program_errors(src: &str) -> Vec<String> {
        let tokens = lexer::tokenize(src).unwrap();
        match super::parse_program(src, &tokens) {
            Ok(_) => vec![],
            Err(error) => format_errors([error]),
        }
    }

    #[test]
    fn test_grouping_depth_limit() {
        let parens = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        let too_deep = format!(
            "1:{}: SyntaxError: expression nested too deeply",
            MAX_NESTING + 1
        );
        assert_eq!(expr_errors(&parens(MAX_NESTING - 1)), Vec::<String>::new());
        assert_eq!(expr_errors(&parens(MAX_NESTING)), [too_deep.clone()]);
        assert_eq!(expr_errors(&parens(3000)), [too_deep]);
    }

    #[test]
    fn test_operator_chain_depth_limit() {
        // Every operator adds a level on top of its left operand.
        let chain = |ops: usize| format!("1{}", "+1".repeat(ops));
        let too_deep = format!(
            "1:{}: SyntaxError: expression nested too deeply",
            2 * (MAX_NESTING - 1)
        );
        assert_eq!(expr_errors(&chain(MAX_NESTING - 2)), Vec::<String>::new());
        assert_eq!(expr_errors(&chain(MAX_NESTING - 1)), [too_deep.clone()]);
        assert_eq!(expr_errors(&chain(100_000)), [too_deep]);
    }

    #[test]
    fn test_block_depth_limit() {
        let method = |n: usize| {
            format!("class A {{ public: func f() {}{} }}", "{".repeat(n), "}".repeat(n))
        };
        assert_eq!(program_errors(&method(MAX_NESTING)), Vec::<String>::new());
        assert_eq!(
            program_errors(&method(3000)),
            [format!("1:{}: SyntaxError: block nested too deeply", 28 + MAX_NESTING)]
        );
    }

    #[test]
    fn test_overflowing_float_literal() {
        let literal = format!("{}.0", "9".repeat(400));
        assert_eq!(expr_errors(&literal), ["1:1: SyntaxError: invalid float literal"]);
        assert_eq!(expr_errors(&format!("1.{}", "9".repeat(400))), Vec::<String>::new());
    }

    tree_tests!(
        use parser;

        fn test_precedence_mul_plus() {
            let expr = "1 + 2 * 3";
            let tree_ok = "
                binary Add
                  int 1
                  binary Mul
                    int 2
                    int 3
            ";
        }

        fn test_parentheses_override_precedence() {
            let expr = "(1 + 2) * 3";
            let tree_ok = "
                binary Mul
                  binary Add
                    int 1
                    int 2
                  int 3
            ";
        }

        fn test_left_associativity() {
            let expr = "a - b - c";
            let tree_ok = "
                binary Sub
                  binary Sub
                    ident a
                    ident b
                  ident c
            ";
        }

        fn test_assignment_is_right_associative() {
            let expr = "a = b = c + d";
            let tree_ok = "
                assignment
                  ident a
                  assignment
                    ident b
                    binary Add
                      ident c
                      ident d
            ";
        }

        fn test_logical_and_comparison_levels() {
            let expr = "a < b || c == d && !e";
            let tree_ok = "
                binary Or
                  binary Lt
                    ident a
                    ident b
                  binary And
                    binary Eq
                      ident c
                      ident d
                    unary Not
                      ident e
            ";
        }

        fn test_negative_literal_is_unary() {
            let expr = "-4 * x";
            let tree_ok = "
                binary Mul
                  unary Neg
                    int 4
                  ident x
            ";
        }

        fn test_literals() {
            let expr = r#"f(1, 2.5, "a\"b", true, false, this)"#;
            let tree_ok = r#"
                call f
                  arguments
                    int 1
                    float 2.5
                    string "a\"b"
                    bool true
                    bool false
                    this
            "#;
        }

        fn test_member_and_call_chain() {
            let expr = "a.b.c(1).d";
            let tree_ok = "
                member d
                  call c
                    receiver
                      member b
                        ident a
                    arguments
                      int 1
            ";
        }

        fn test_member_assignment() {
            let expr = "this.r = p.x + 1";
            let tree_ok = "
                assignment
                  member r
                    this
                  binary Add
                    member x
                      ident p
                    int 1
            ";
        }

        fn test_new_expression() {
            let expr = "new Circle(2.0, r)";
            let tree_ok = "
                new Circle
                  float 2
                  ident r
            ";
        }

        fn test_empty_class() {
            let program = "class A extends B {}";
            let tree_ok = "class A extends B";
        }

        fn test_calc_class() {
            let program = "
                class Calc {
                public:
                    int r;
                    func Calc() { r = 0; }
                    func add(int a, int b): int {
                        r = a + b;
                        return r;
                    }
                }
            ";
            let tree_ok = "
                class Calc
                  public property r: int
                  public method Calc()
                    assignment
                      ident r
                      int 0
                  public method add(a: int, b: int): int
                    assignment
                      ident r
                      binary Add
                        ident a
                        ident b
                    return
                      ident r
            ";
        }

        fn test_access_sections() {
            let program = "
                class Account {
                private:
                    float balance = 0.5;
                    string owner;
                public:
                    func deposit(float amount) { balance = balance + amount; }
                private:
                    func audit() {}
                }
            ";
            let tree_ok = "
                class Account
                  private property balance: float
                    float 0.5
                  private property owner: string
                  public method deposit(amount: float)
                    assignment
                      ident balance
                      binary Add
                        ident balance
                        ident amount
                  private method audit()
            ";
        }

        fn test_statements() {
            let program = "
                class S {
                public:
                    func run(int n): int {
                        Point p = new Point(1, 2);
                        if (n > 0) { print(n, \"positive\"); } else { return 0; }
                        while (n > 0) { n = n - 1; }
                        for (int i = 0; i < 3; i = i + 1) { }
                        { int x = 1; }
                        return;
                    }
                }
            ";
            let tree_ok = r#"
                class S
                  public method run(n: int): int
                    var p: Point
                      new Point
                        int 1
                        int 2
                    if
                      binary Gt
                        ident n
                        int 0
                      then
                        print
                          ident n
                          string "positive"
                      else
                        return
                          int 0
                    while
                      binary Gt
                        ident n
                        int 0
                      do
                        assignment
                          ident n
                          binary Sub
                            ident n
                            int 1
                    for
                      init
                        var i: int
                          int 0
                      binary Lt
                        ident i
                        int 3
                      update
                        assignment
                          ident i
                          binary Add
                            ident i
                            int 1
                      do
                    block
                      var x: int
                        int 1
                    return
            "#;
        }

        fn test_else_if_chain() {
            let program = "
                class E {
                public:
                    func f(int n) {
                        if (n == 1) { } else if (n == 2) { } else { n = 3; }
                    }
                }
            ";
            let tree_ok = "
                class E
                  public method f(n: int)
                    if
                      binary Eq
                        ident n
                        int 1
                      then
                      else
                        if
                          binary Eq
                            ident n
                            int 2
                          then
                          else
                            assignment
                              ident n
                              int 3
            ";
        }

        fn test_error_missing_semicolon() {
            let program = "class A { public: int x }";
            let expected_errors = &["1:25: SyntaxError: expected `;`, but found `}`"];
        }

        fn test_error_missing_brace() {
            let program = "class A  public: }";
            let expected_errors = &["1:10: SyntaxError: expected `{`, but found `public`"];
        }

        fn test_error_member_without_access_section() {
            let program = "class A { int x; }";
            let expected_errors =
                &["1:11: SyntaxError: expected one of `public`, `private`, `}`, but found `int`"];
        }

        fn test_error_unclosed_class() {
            let program = "class A { public: int x;";
            let expected_errors = &[
                "1:25: SyntaxError: expected one of `public`, `private`, `}`, but found end of input",
            ];
        }

        fn test_error_missing_paren_in_call() {
            let expr = "f(1 2)";
            let expected_errors =
                &["1:5: SyntaxError: expected one of `,`, `)`, but found integer literal"];
        }

        fn test_error_unexpected_token_in_expr() {
            let expr = "1 + ;";
            let expected_errors = &["1:5: SyntaxError: unexpected `;` in expression"];
        }

        fn test_error_invalid_assignment_target() {
            let expr = "1 = 2";
            let expected_errors = &["1:1: SyntaxError: invalid assignment target"];
        }

        fn test_error_not_callable() {
            let expr = "(a + b)(1)";
            let expected_errors = &["1:1: SyntaxError: expression is not callable"];
        }

        fn test_error_int_out_of_range() {
            let expr = "99999999999999999999";
            let expected_errors = &["1:1: SyntaxError: integer literal out of range"];
        }

        fn test_error_array_type() {
            let program = "class A { public: array xs; }";
            let expected_errors = &["1:19: SyntaxError: arrays are not supported"];
        }

        fn test_error_indexing() {
            let expr = "xs[0]";
            let expected_errors = &["1:3: SyntaxError: arrays are not supported"];
        }

        fn test_error_bad_type() {
            let program = "class A { public: func f(1 x) {} }";
            let expected_errors = &["1:26: SyntaxError: expected a type, but found integer literal"];
        }

        fn test_error_lexer_first() {
            let program = "class A { public: string s = \"oops; }";
            let expected_errors = &["1:30: LexError: unterminated string literal"];
        }

        fn test_error_stops_at_first() {
            let program = "class A { public: int x } class B { public: int y }";
            let expected_errors = &["1:25: SyntaxError: expected `;`, but found `}`"];
        }
    );
}
