use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token { kind, span }
    }

    /// Returns the literal source text of this token.
    pub fn text<'src>(&self, src: &'src str) -> &'src str {
        self.span.substr(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span)
    }
}

/// A source region. Besides the byte bounds (used to slice the source), a
/// span also records the 1-based line and column of its first character,
/// which is what diagnostics report.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub const fn new(lo: usize, len: u32, line: u32, col: u32) -> Span {
        Span { lo, len, line, col }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    pub fn substr<'src>(&self, src: &'src str) -> &'src str {
        &src[self.lo..self.hi()]
    }

    /// Shrinks the span by `start` bytes on the left and `end` bytes on the
    /// right. Line and column are kept, since they only locate diagnostics.
    pub fn shrink(&self, start: u32, end: u32) -> Span {
        debug_assert!(start + end <= self.len);
        Span {
            lo: self.lo + start as usize,
            len: self.len - start - end,
            ..*self
        }
    }

    /// Returns a span starting at `self` and finishing at the end of `other`.
    pub fn to(&self, other: Span) -> Span {
        let hi = other.hi().max(self.hi());
        Span {
            len: u32::try_from(hi - self.lo).unwrap_or(u32::MAX),
            ..*self
        }
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, {}..{})", self.lo, self.hi())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.inner)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Class,
    Extends,
    Func,
    Return,
    If,
    Else,
    While,
    For,
    New,
    This,
    Public,
    Private,
    Int,
    Float,
    String,
    Bool,
    Void,
    True,
    False,
    Print,
    /// Reserved. Arrays are not part of the language yet.
    Array,

    Identifier,
    IntLiteral,
    FloatLiteral,
    /// A string literal; quotes included in the span, escapes not yet
    /// resolved (see [`crate::lexer::extract::string`]).
    StringLiteral,

    Plus,
    Minus,
    Star,
    Slash,
    /// `!`
    Bang,
    /// `=`
    Assign,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,

    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Class
                | Extends
                | Func
                | Return
                | If
                | Else
                | While
                | For
                | New
                | This
                | Public
                | Private
                | Int
                | Float
                | String
                | Bool
                | Void
                | True
                | False
                | Print
                | Array
        )
    }

    /// Whether the token can only start a type (used to tell declarations
    /// from expression statements).
    pub fn is_primitive_type(self) -> bool {
        use TokenKind::*;
        matches!(self, Int | Float | String | Bool | Void)
    }

    /// The fixed spelling of the token, if it has one.
    pub fn spelling(self) -> Option<&'static str> {
        use TokenKind::*;
        let s = match self {
            Class => "class",
            Extends => "extends",
            Func => "func",
            Return => "return",
            If => "if",
            Else => "else",
            While => "while",
            For => "for",
            New => "new",
            This => "this",
            Public => "public",
            Private => "private",
            Int => "int",
            Float => "float",
            String => "string",
            Bool => "bool",
            Void => "void",
            True => "true",
            False => "false",
            Print => "print",
            Array => "array",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Bang => "!",
            Assign => "=",
            EqEq => "==",
            NotEq => "!=",
            Less => "<",
            LessEq => "<=",
            Greater => ">",
            GreaterEq => ">=",
            AndAnd => "&&",
            OrOr => "||",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Dot => ".",
            Identifier | IntLiteral | FloatLiteral | StringLiteral | Eof => return None,
        };
        Some(s)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::IntLiteral => f.write_str("integer literal"),
            TokenKind::FloatLiteral => f.write_str("float literal"),
            TokenKind::StringLiteral => f.write_str("string literal"),
            TokenKind::Eof => f.write_str("end of input"),
            other => write!(f, "`{}`", other.spelling().unwrap_or_default()),
        }
    }
}

/// Keywords are case sensitive.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "class" => TokenKind::Class,
    "extends" => TokenKind::Extends,
    "func" => TokenKind::Func,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "new" => TokenKind::New,
    "this" => TokenKind::This,
    "public" => TokenKind::Public,
    "private" => TokenKind::Private,
    "int" => TokenKind::Int,
    "float" => TokenKind::Float,
    "string" => TokenKind::String,
    "bool" => TokenKind::Bool,
    "void" => TokenKind::Void,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "print" => TokenKind::Print,
    "array" => TokenKind::Array,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_matches_spelling() {
        for (word, kind) in &KEYWORDS {
            assert!(kind.is_keyword());
            assert_eq!(kind.spelling(), Some(*word));
        }
        assert_eq!(KEYWORDS.len(), 21);
    }

    #[test]
    fn span_merging_keeps_start_position() {
        let a = Span::new(4, 3, 2, 5);
        let b = Span::new(10, 2, 2, 11);
        let merged = a.to(b);
        assert_eq!(merged.lo, 4);
        assert_eq!(merged.hi(), 12);
        assert_eq!(merged.to_string(), "2:5");
    }
}
