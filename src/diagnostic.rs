use std::fmt;

use crate::token::{Span, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    LexError,
    SyntaxError,
    NameError,
    AccessError,
    TypeError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::LexError => "LexError",
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::NameError => "NameError",
            DiagnosticKind::AccessError => "AccessError",
            DiagnosticKind::TypeError => "TypeError",
        };
        f.write_str(s)
    }
}

/// Implemented by the error types of every stage.
pub trait Classify {
    fn kind(&self) -> DiagnosticKind;
}

/// A stage-independent error record, as handed over to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn col(&self) -> u32 {
        self.span.col
    }
}

impl<E> From<Spanned<E>> for Diagnostic
where
    E: Classify + fmt::Display,
{
    fn from(Spanned { span, inner }: Spanned<E>) -> Self {
        Diagnostic {
            kind: inner.kind(),
            message: inner.to_string(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}
