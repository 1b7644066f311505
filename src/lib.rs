//! A compiler from Lakbay, a small statically typed language with classes
//! and single inheritance, to C++.
//!
//! The pipeline runs four stages, each consuming the whole output of the
//! previous one: [`lexer`], [`parser`], [`type_checker`] and [`codegen`].
//! Lexing and parsing stop at the first error; the checker reports every
//! error it finds. Code is only generated for programs without errors.

use crate::{
    ast::{Program, Typed, Untyped},
    codegen::Options,
    diagnostic::Diagnostic,
    type_checker::Checker,
    types::ClassTable,
};

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The type checker takes an untyped AST, resolves its names, checks the
/// soundness of its types, and maps it into a typed AST.
pub mod type_checker;

/// The code generator maps a typed AST into C++ source.
pub mod codegen;

pub mod ast;
pub mod diagnostic;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt {
        pub mod tree;
    }
    #[cfg(test)]
    pub(crate) mod test_utils;
}

/// Compiles Lakbay source into C++ source, with the default options.
pub fn compile(src: &str) -> Result<String, Vec<Diagnostic>> {
    compile_with(src, &Options::default())
}

pub fn compile_with(src: &str, options: &Options) -> Result<String, Vec<Diagnostic>> {
    let program = parse(src).map_err(|error| vec![error])?;
    let (program, classes) = check(program)?;
    Ok(codegen::generate_string(&program, &classes, options))
}

/// Lexes and parses the source.
pub fn parse(src: &str) -> Result<Program<Untyped>, Diagnostic> {
    let tokens = lexer::tokenize(src)?;
    Ok(parser::parse_program(src, &tokens)?)
}

/// Checks a parsed program, returning every error found.
pub fn check(
    program: Program<Untyped>,
) -> Result<(Program<Typed>, ClassTable), Vec<Diagnostic>> {
    Checker::new()
        .check(program)
        .map_err(|errors| errors.into_iter().map(Diagnostic::from).collect())
}
