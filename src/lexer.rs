use std::{
    iter::{FusedIterator, Peekable},
    num::{ParseFloatError, ParseIntError},
};

use crate::{
    diagnostic::{Classify, DiagnosticKind},
    token::{Span, Spanned, Token, TokenKind, KEYWORDS},
};

/// Lexes the whole source string, stopping at the first lexical error.
///
/// On success the last token is always [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, Spanned<Error>> {
    let mut tokens = Vec::with_capacity(src.len() / 4 + 1);
    for token in Lexer::new(src) {
        tokens.push(token?);
    }
    log::debug!("lexed {} tokens from {} bytes", tokens.len(), src.len());
    Ok(tokens)
}

/// The Lakbay lexer.
///
/// This is a lazy iterator over the source tokens. It yields the end of input
/// token exactly once and then stops; it also stops right after yielding an
/// error. Whitespace and `//` comments are skipped and never produced.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    line: u32,
    col: u32,
    mark: Span,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            line: 1,
            col: 1,
            mark: Span::new(0, 0, 1, 1),
            finished: false,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, Spanned<Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let scanned = self.scan_token();
        self.finished = match &scanned {
            Ok(token) => token.is_eof(),
            Err(_) => true,
        };
        Some(scanned)
    }
}

impl FusedIterator for Lexer<'_> {}

impl Lexer<'_> {
    /// Scans the next token, skipping any trivia before it.
    fn scan_token(&mut self) -> Result<Token, Spanned<Error>> {
        use TokenKind::*;
        self.skip_trivia();
        self.mark();
        let Some(c) = self.advance() else {
            return Ok(self.produce(Eof));
        };
        let kind = match c {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '!' => self.either('=', NotEq, Bang),
            '=' => self.either('=', EqEq, Assign),
            '<' => self.either('=', LessEq, Less),
            '>' => self.either('=', GreaterEq, Greater),
            '&' if self.take('&') => AndAnd,
            '|' if self.take('|') => OrOr,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ',' => Comma,
            ';' => Semicolon,
            ':' => Colon,
            '.' => Dot,
            '"' => self.string()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            other => return Err(self.span().wrap(Error::UnexpectedChar(other))),
        };
        Ok(self.produce(kind))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Lexes a string token, whose opening quote was already consumed.
    ///
    /// Escapes are only validated for termination here; they are resolved by
    /// [`extract::string`] when the parser needs the value.
    fn string(&mut self) -> Result<TokenKind, Spanned<Error>> {
        let mut is_escaping = false;
        loop {
            match (is_escaping, self.advance()) {
                (_, None) => return Err(self.span().wrap(Error::UnterminatedString)),
                (false, Some('"')) => return Ok(TokenKind::StringLiteral),
                (false, Some('\\')) => is_escaping = true,
                (_, Some(_)) => is_escaping = false,
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let substr = self.span().substr(self.src);
        KEYWORDS
            .get(substr)
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    /// A digit run is an integer, unless it is followed by a dot and at least
    /// one more digit.
    fn number(&mut self) -> TokenKind {
        self.digits();
        let rest = self.rest().as_bytes();
        if rest.len() >= 2 && rest[0] == b'.' && rest[1].is_ascii_digit() {
            self.advance();
            self.digits();
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }
}

impl Lexer<'_> {
    /// Starts a new token mark at the current position.
    fn mark(&mut self) {
        self.mark = Span::new(self.cursor, 0, self.line, self.col);
    }

    /// Returns the next character and advances, keeping line and column
    /// up to date.
    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Advances if the next character is `expected`.
    fn take(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns `matched` (consuming `next`) if the next character is `next`,
    /// otherwise `single`.
    fn either(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.take(next) {
            matched
        } else {
            single
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    fn rest(&self) -> &str {
        &self.src[self.cursor..]
    }

    /// Returns the span from the current mark up to the cursor.
    fn span(&self) -> Span {
        let len = u32::try_from(self.cursor - self.mark.lo).unwrap_or(u32::MAX);
        Span { len, ..self.mark }
    }

    fn produce(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
}

impl Classify for Error {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::LexError
    }
}

/// Recovers literal values from tokens.
pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::IntLiteral);
        token.text(src).parse()
    }

    pub fn float(token: Token, src: &str) -> Result<f64, ParseFloatError> {
        debug_assert_eq!(token.kind, TokenKind::FloatLiteral);
        token.text(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.text(src)
    }

    /// Returns the string value without the surrounding quotes, with every
    /// escape sequence resolved.
    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::StringLiteral);
        let raw = token.span.shrink(1, 1).substr(src);
        if raw.contains('\\') {
            perform_escape(raw).into_boxed_str()
        } else {
            raw.into()
        }
    }
}

fn perform_escape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut escaped = false;
    for char in raw.chars() {
        let char = match (escaped, char) {
            (true, 'n') => '\n',
            (true, 't') => '\t',
            (true, 'r') => '\r',
            (false, '\\') => {
                escaped = true;
                continue;
            }
            // `\"`, `\\` and any other escaped character stand for themselves.
            (_, char) => char,
        };
        escaped = false;
        buf.push(char);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn positions(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| (t.kind, t.span.to_string()))
            .collect()
    }

    #[test]
    fn operators_longest_match_first() {
        use TokenKind::*;
        assert_eq!(
            kinds("== != <= >= && || = ! < > + - * /"),
            [
                EqEq, NotEq, LessEq, GreaterEq, AndAnd, OrOr, Assign, Bang, Less, Greater, Plus,
                Minus, Star, Slash, Eof,
            ]
        );
        assert_eq!(kinds("a<=b"), [Identifier, LessEq, Identifier, Eof]);
        assert_eq!(kinds("!!="), [Bang, NotEq, Eof]);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        use TokenKind::*;
        assert_eq!(
            kinds("class Class CLASS extends func this print array"),
            [Class, Identifier, Identifier, Extends, Func, This, Print, Array, Eof]
        );
        assert_eq!(kinds("true false True"), [True, False, Identifier, Eof]);
        assert_eq!(kinds("_private private_ x1"), [Identifier, Identifier, Identifier, Eof]);
    }

    #[test]
    fn numbers() {
        use TokenKind::*;
        assert_eq!(kinds("12 3.5 0.25"), [IntLiteral, FloatLiteral, FloatLiteral, Eof]);
        // A dot must be followed by a digit to make a float.
        assert_eq!(kinds("1.x"), [IntLiteral, Dot, Identifier, Eof]);
        assert_eq!(kinds("1."), [IntLiteral, Dot, Eof]);
        // Negative literals are unary expressions.
        assert_eq!(kinds("-4"), [Minus, IntLiteral, Eof]);
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("a // the rest is ignored ; {\nb"),
            [Identifier, Identifier, Eof]
        );
        assert_eq!(kinds("// only a comment"), [Eof]);
        assert_eq!(kinds("a / b"), [Identifier, Slash, Identifier, Eof]);
    }

    #[test]
    fn tracks_lines_and_columns() {
        use TokenKind::*;
        let src = "class A {\n  int x;\n}";
        assert_eq!(
            positions(src),
            [
                (Class, "1:1".to_owned()),
                (Identifier, "1:7".to_owned()),
                (LBrace, "1:9".to_owned()),
                (Int, "2:3".to_owned()),
                (Identifier, "2:7".to_owned()),
                (Semicolon, "2:8".to_owned()),
                (RBrace, "3:1".to_owned()),
                (Eof, "3:2".to_owned()),
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        let src = r#""plain" "a\"b" "tab\there" "back\\slash" "line\n""#;
        let tokens = tokenize(src).unwrap();
        let values: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::StringLiteral)
            .map(|t| extract::string(*t, src))
            .collect();
        assert_eq!(
            values,
            [
                Box::from("plain"),
                Box::from("a\"b"),
                Box::from("tab\there"),
                Box::from("back\\slash"),
                Box::from("line\n"),
            ]
        );
        assert_eq!(tokens[0].text(src), "\"plain\"");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let error = tokenize("x = \"abc").unwrap_err();
        assert_eq!(error.inner, Error::UnterminatedString);
        assert_eq!(error.span.to_string(), "1:5");

        // An escaped quote does not close the string.
        let error = tokenize(r#""abc\""#).unwrap_err();
        assert_eq!(error.inner, Error::UnterminatedString);
    }

    #[test]
    fn unexpected_character_stops_lexing() {
        let error = tokenize("int a;\n  a = 1 # 2;").unwrap_err();
        assert_eq!(error.inner, Error::UnexpectedChar('#'));
        assert_eq!(error.to_string(), "2:9: unexpected character '#'");

        let error = tokenize("a & b").unwrap_err();
        assert_eq!(error.inner, Error::UnexpectedChar('&'));
    }

    #[test]
    fn iterator_is_lazy_and_fused() {
        let mut lexer = Lexer::new("a $ b");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Identifier);
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());

        let mut lexer = Lexer::new("");
        assert!(lexer.next().unwrap().unwrap().is_eof());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn extracts_numeric_values() {
        let src = "42 2.5";
        let tokens = tokenize(src).unwrap();
        assert_eq!(extract::int(tokens[0], src), Ok(42));
        assert_eq!(extract::float(tokens[1], src), Ok(2.5));
        assert!(extract::int(
            tokenize("99999999999999999999").unwrap()[0],
            "99999999999999999999"
        )
        .is_err());
    }
}
