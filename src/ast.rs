// program   ::= class*
// class     ::= 'class' ID ['extends' ID] '{' (access ':' member*)* '}'
// access    ::= 'public' | 'private'
// member    ::= type ID ['=' expr] ';'
//             | 'func' ID '(' [type ID (',' type ID)*] ')' [':' type] block
// block     ::= '{' stmt* '}'
// stmt      ::= 'if' '(' expr ')' block ['else' block]
//             | 'while' '(' expr ')' block
//             | 'for' '(' simple ';' expr ';' expr ')' block
//             | 'return' [expr] ';'
//             | 'print' '(' [expr (',' expr)*] ')' ';'
//             | type ID ['=' expr] ';'
//             | block
//             | expr ';'
// type      ::= 'int' | 'float' | 'string' | 'bool' | 'void' | ID

// Precedence (loosest first)
//
// =         (right)
// ||
// &&
// == !=
// < > <= >=
// + -
// * /
// ! -       (prefix)
// . ()      (postfix)

use std::{fmt, rc::Rc};

use crate::{token::Span, types::Type};

/// Identifiers are shared between the tree, the class table and the types.
pub type Symbol = Rc<str>;

/// The information a tree carries depends on the compilation phase. The
/// parser produces [`Untyped`] trees; the type checker consumes them and
/// produces [`Typed`] ones, where every expression knows its type and every
/// name knows what it is bound to.
pub trait Info {
    type Ty: fmt::Debug + Clone + PartialEq;
    type Binding: fmt::Debug + Clone + PartialEq;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Untyped;

impl Info for Untyped {
    type Ty = ();
    type Binding = ();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typed;

impl Info for Typed {
    type Ty = Type;
    type Binding = Binding;
}

/// What a name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Local,
    Param,
    Property { owner: Symbol },
    Method { owner: Symbol },
    /// Resolution failed. Only found in trees that are rejected by the
    /// checker, so never seen past it.
    Unresolved,
}

#[derive(Debug, PartialEq)]
pub struct Program<I: Info> {
    pub classes: Vec<Class<I>>,
}

impl<I: Info> Default for Program<I> {
    fn default() -> Self {
        Program {
            classes: Vec::new(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Class<I: Info> {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub members: Vec<Member<I>>,
}

impl<I: Info> Class<I> {
    pub fn methods(&self) -> impl Iterator<Item = (Access, &Method<I>)> {
        self.members.iter().filter_map(|member| match &member.kind {
            MemberKind::Method(method) => Some((member.access, method)),
            MemberKind::Property(_) => None,
        })
    }

    pub fn properties(&self) -> impl Iterator<Item = (Access, &VarDecl<I>)> {
        self.members.iter().filter_map(|member| match &member.kind {
            MemberKind::Property(property) => Some((member.access, property)),
            MemberKind::Method(_) => None,
        })
    }

    /// Returns the constructor, that is, a method named after the class.
    pub fn constructor(&self) -> Option<(Access, &Method<I>)> {
        self.methods()
            .find(|(_, method)| method.name.name == self.name.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str("public"),
            Access::Private => f.write_str("private"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Member<I: Info> {
    pub access: Access,
    pub kind: MemberKind<I>,
}

#[derive(Debug, PartialEq)]
pub enum MemberKind<I: Info> {
    Property(VarDecl<I>),
    Method(Method<I>),
}

#[derive(Debug, PartialEq)]
pub struct Method<I: Info> {
    pub name: Ident,
    pub params: Vec<Param>,
    /// Absent means `void` (and is required for constructors).
    pub return_ty: Option<TypeName>,
    pub body: Block<I>,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub ty: TypeName,
    pub name: Ident,
}

/// A typed name with an optional initializer. Used both for properties and
/// for local variables.
#[derive(Debug, PartialEq)]
pub struct VarDecl<I: Info> {
    pub ty: TypeName,
    pub name: Ident,
    pub initializer: Option<Expr<I>>,
}

#[derive(Debug, PartialEq)]
pub struct Block<I: Info> {
    pub stmts: Vec<Stmt<I>>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Stmt<I: Info> {
    pub kind: StmtKind<I>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind<I: Info> {
    If {
        predicate: Expr<I>,
        then_block: Block<I>,
        else_block: Option<Block<I>>,
    },
    While {
        predicate: Expr<I>,
        body: Block<I>,
    },
    For {
        /// Either a [`StmtKind::VarDecl`] or a [`StmtKind::Expr`].
        init: Box<Stmt<I>>,
        predicate: Expr<I>,
        update: Expr<I>,
        body: Block<I>,
    },
    Return(Option<Expr<I>>),
    VarDecl(VarDecl<I>),
    Print(Vec<Expr<I>>),
    Block(Block<I>),
    Expr(Expr<I>),
}

#[derive(Debug, PartialEq)]
pub struct Expr<I: Info> {
    pub kind: ExprKind<I>,
    pub span: Span,
    pub ty: I::Ty,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind<I: Info> {
    Int(i64),
    Float(f64),
    String(Box<str>),
    Bool(bool),
    Id(Ident, I::Binding),
    This,
    Unary {
        op: UnaryOperator,
        expr: Box<Expr<I>>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr<I>>,
        rhs: Box<Expr<I>>,
    },
    /// The target is either an [`ExprKind::Id`] or an
    /// [`ExprKind::MemberAccess`].
    Assignment {
        target: Box<Expr<I>>,
        value: Box<Expr<I>>,
    },
    /// `method(args)` when there is no receiver, `receiver.method(args)`
    /// otherwise.
    Call {
        receiver: Option<Box<Expr<I>>>,
        method: Ident,
        args: Vec<Expr<I>>,
        binding: I::Binding,
    },
    MemberAccess {
        object: Box<Expr<I>>,
        member: Ident,
    },
    New {
        class: Ident,
        args: Vec<Expr<I>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            And => "&&",
            Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Add | Sub | Mul | Div)
    }

    pub fn is_relational(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Lt | Gt | Le | Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

/// A type as written in the source. Class names are not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

impl Ident {
    pub fn new(name: &str, span: Span) -> Ident {
        Ident {
            name: Rc::from(name),
            span,
        }
    }
}
