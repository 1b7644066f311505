use std::io;

use crate::{
    ast::{Access, Program, Typed},
    types::{ClassTable, MemberInfoKind, Type},
};

mod cpp;


pub use cpp::Generator;

/// Code generation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Spaces per indentation level.
    pub indent: usize,
    pub entry: EntryPoint,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            indent: 4,
            entry: EntryPoint::Auto,
        }
    }
}

/// Whether a C++ `main` function is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPoint {
    /// Generated when the program follows the entry convention: a class
    /// `Main`, constructible without arguments, with a public `main()`
    /// returning `void` or `int`.
    #[default]
    Auto,
    /// Always produce a library-only translation unit.
    Never,
}

/// Writes the C++ translation of a checked program.
pub fn generate<W>(
    writer: W,
    program: &Program<Typed>,
    classes: &ClassTable,
    options: &Options,
) -> io::Result<()>
where
    W: io::Write,
{
    Generator::new(writer, classes, options).generate(program)
}

pub fn generate_string(
    program: &Program<Typed>,
    classes: &ClassTable,
    options: &Options,
) -> String {
    let mut buf = Vec::with_capacity(4 * 1024);
    // Writing into a `Vec` can't fail.
    _ = generate(&mut buf, program, classes, options);
    log::debug!("generated {} bytes of C++", buf.len());
    String::from_utf8_lossy(&buf).into_owned()
}

/// Returns the return type of `Main.main` if the program follows the entry
/// convention.
pub(crate) fn entry_point(classes: &ClassTable) -> Option<Type> {
    let main = classes.get("Main")?;
    let constructible = match &main.constructor {
        None => true,
        Some((access, signature)) => *access == Access::Public && signature.params.is_empty(),
    };
    let method = main.member("main")?;
    let MemberInfoKind::Method(signature) = &method.kind else {
        return None;
    };
    let callable = method.access == Access::Public
        && signature.params.is_empty()
        && matches!(signature.ret, Type::Int | Type::Void);
    log::trace!("entry point: constructible={constructible}, callable={callable}");
    (constructible && callable).then(|| signature.ret.clone())
}
