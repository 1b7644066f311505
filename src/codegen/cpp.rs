use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::{self, Write as _},
    format_args as f, io,
};

use crate::{
    ast::{
        Access, Binding, BinaryOperator, Block, Class, Expr, ExprKind, MemberKind, Method, Param,
        Program, Stmt, StmtKind, Typed, UnaryOperator, VarDecl,
    },
    codegen::{self, EntryPoint, Options},
    types::{ClassTable, Type},
};

/// Emits one C++ translation unit.
///
/// The layout is: includes, forward declarations of every class, class
/// definitions (parents first) holding only member declarations, then every
/// member function definition, then `main`. Keeping bodies out of line lets
/// them refer to any class regardless of definition order.
pub struct Generator<'a, W> {
    writer: W,
    classes: &'a ClassTable,
    options: &'a Options,
    level: usize,
}

impl<'a, W> Generator<'a, W>
where
    W: io::Write,
{
    pub fn new(writer: W, classes: &'a ClassTable, options: &'a Options) -> Generator<'a, W> {
        Generator {
            writer,
            classes,
            options,
            level: 0,
        }
    }

    pub fn generate(mut self, program: &Program<Typed>) -> io::Result<()> {
        let by_name: HashMap<&str, &Class<Typed>> = program
            .classes
            .iter()
            .map(|class| (&*class.name.name, class))
            .collect();
        // Parents first.
        let ordered: Vec<_> = self
            .classes
            .order()
            .iter()
            .filter_map(|name| by_name.get(&**name).copied())
            .collect();

        self.out("#include <iostream>")?;
        self.out("#include <string>")?;

        self.out_line()?;
        for class in &program.classes {
            self.out(f!("class {};", ident(&class.name.name)))?;
        }

        for class in &ordered {
            self.out_line()?;
            self.g_class_definition(class)?;
        }

        for class in &ordered {
            self.g_member_definitions(class)?;
        }

        if self.options.entry == EntryPoint::Auto {
            if let Some(ret) = codegen::entry_point(self.classes) {
                self.out_line()?;
                self.g_entry_point(&ret)?;
            }
        }
        self.writer.flush()
    }
}

/// Class definitions.
impl<W> Generator<'_, W>
where
    W: io::Write,
{
    fn g_class_definition(&mut self, class: &Class<Typed>) -> io::Result<()> {
        let name = ident(&class.name.name);
        match &class.parent {
            Some(parent) => self.out(f!("class {name} : public {} {{", ident(&parent.name)))?,
            None => self.out(f!("class {name} {{"))?,
        }

        let mut section = None;
        for member in &class.members {
            self.section(&mut section, access_label(member.access))?;
            self.indented(|this| match &member.kind {
                MemberKind::Property(property) => {
                    let ty = cpp_type(&property.ty.ty);
                    this.out(f!("{ty} {}{{}};", ident(&property.name.name)))
                }
                MemberKind::Method(method) => {
                    let params = params(&method.params);
                    let name = ident(&method.name.name);
                    if is_constructor(class, method) {
                        this.out(f!("{name}({params});"))
                    } else {
                        let ret = return_type(method);
                        this.out(f!("{ret} {name}({params});"))
                    }
                }
            })?;
        }

        if let Some(access) = synthesized_constructor(class) {
            self.section(&mut section, access)?;
            self.indented(|this| this.out(f!("{name}();")))?;
        }

        self.out("};")
    }

    /// Opens an access section unless it is the current one.
    fn section(
        &mut self,
        current: &mut Option<&'static str>,
        label: &'static str,
    ) -> io::Result<()> {
        if *current == Some(label) {
            return Ok(());
        }
        *current = Some(label);
        self.out(f!("{label}:"))
    }
}

/// Member function definitions.
impl<W> Generator<'_, W>
where
    W: io::Write,
{
    fn g_member_definitions(&mut self, class: &Class<Typed>) -> io::Result<()> {
        let class_name = ident(&class.name.name);
        let initializers = mem_initializers(class);

        for (_, method) in class.methods() {
            self.out_line()?;
            let name = ident(&method.name.name);
            let params = params(&method.params);
            if is_constructor(class, method) {
                self.out(f!("{class_name}::{name}({params}){initializers} {{"))?;
            } else {
                let ret = return_type(method);
                self.out(f!("{ret} {class_name}::{name}({params}) {{"))?;
            }
            self.g_body(&method.body)?;
            self.out("}")?;
        }

        if synthesized_constructor(class).is_some() {
            self.out_line()?;
            self.out(f!("{class_name}::{class_name}(){initializers} {{"))?;
            self.out("}")?;
        }
        Ok(())
    }

    fn g_entry_point(&mut self, ret: &Type) -> io::Result<()> {
        let class = class_ref("Main");
        let method = ident("main");
        self.out("int main() {")?;
        self.indented(|this| {
            this.out(f!("{class}* program = new {class}();"))?;
            if *ret == Type::Int {
                this.out(f!("return program->{method}();"))
            } else {
                this.out(f!("program->{method}();"))?;
                this.out("return 0;")
            }
        })?;
        self.out("}")
    }
}

/// Statements.
impl<W> Generator<'_, W>
where
    W: io::Write,
{
    fn g_body(&mut self, block: &Block<Typed>) -> io::Result<()> {
        self.indented(|this| {
            for stmt in &block.stmts {
                this.g_stmt(stmt)?;
            }
            Ok(())
        })
    }

    fn g_stmt(&mut self, stmt: &Stmt<Typed>) -> io::Result<()> {
        match &stmt.kind {
            StmtKind::If {
                predicate,
                then_block,
                else_block,
            } => self.g_if("", predicate, then_block, else_block.as_ref()),
            StmtKind::While { predicate, body } => {
                self.out(f!("while ({}) {{", expr(predicate)))?;
                self.g_body(body)?;
                self.out("}")
            }
            StmtKind::For {
                init,
                predicate,
                update,
                body,
            } => {
                let init = match &init.kind {
                    StmtKind::VarDecl(decl) => var_decl(decl),
                    StmtKind::Expr(init) => expr(init),
                    _ => String::new(),
                };
                self.out(f!("for ({init}; {}; {}) {{", expr(predicate), expr(update)))?;
                self.g_body(body)?;
                self.out("}")
            }
            StmtKind::Return(Some(value)) => self.out(f!("return {};", expr(value))),
            StmtKind::Return(None) => self.out("return;"),
            StmtKind::VarDecl(decl) => self.out(f!("{};", var_decl(decl))),
            StmtKind::Print(args) => {
                let mut line = String::from("std::cout");
                for arg in args {
                    // `<<` binds looser than arithmetic but tighter than
                    // comparisons.
                    line.push_str(" << ");
                    write_operand(&mut line, arg, Prec::Additive);
                }
                line.push_str(" << std::endl;");
                self.out(line)
            }
            StmtKind::Block(block) => {
                self.out("{")?;
                self.g_body(block)?;
                self.out("}")
            }
            StmtKind::Expr(e) => self.out(f!("{};", expr(e))),
        }
    }

    /// An `else` block holding nothing but another `if` is emitted as
    /// `else if`.
    fn g_if(
        &mut self,
        prefix: &str,
        predicate: &Expr<Typed>,
        then_block: &Block<Typed>,
        else_block: Option<&Block<Typed>>,
    ) -> io::Result<()> {
        self.out(f!("{prefix}if ({}) {{", expr(predicate)))?;
        self.g_body(then_block)?;
        let Some(else_block) = else_block else {
            return self.out("}");
        };
        if let [Stmt {
            kind:
                StmtKind::If {
                    predicate,
                    then_block,
                    else_block,
                },
            ..
        }] = else_block.stmts.as_slice()
        {
            return self.g_if("} else ", predicate, then_block, else_block.as_ref());
        }
        self.out("} else {")?;
        self.g_body(else_block)?;
        self.out("}")
    }
}

/// Utility functions.
impl<W> Generator<'_, W>
where
    W: io::Write,
{
    /// Prints a line at the current indentation.
    fn out(&mut self, line: impl fmt::Display) -> io::Result<()> {
        let width = self.level * self.options.indent;
        writeln!(self.writer, "{:width$}{line}", "")
    }

    /// Prints an empty line.
    fn out_line(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    /// Writes one indentation level deeper.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> io::Result<T>) -> io::Result<T> {
        self.level += 1;
        let res = f(self);
        self.level -= 1;
        res
    }
}

fn is_constructor(class: &Class<Typed>, method: &Method<Typed>) -> bool {
    method.name.name == class.name.name
}

/// Every class gets a default constructor, which also runs the property
/// initializers. It is public if the class declares no constructor, and
/// protected (for subclasses) if the declared one takes parameters.
fn synthesized_constructor(class: &Class<Typed>) -> Option<&'static str> {
    match class.constructor() {
        None => Some("public"),
        Some((_, method)) if !method.params.is_empty() => Some("protected"),
        Some(_) => None,
    }
}

/// The ` : a(1), b(2)` part of constructor definitions.
fn mem_initializers(class: &Class<Typed>) -> String {
    let mut buf = String::new();
    let initialized = class.properties().filter_map(|(_, property)| {
        let init = property.initializer.as_ref()?;
        Some((&property.name, init))
    });
    for (idx, (name, init)) in initialized.enumerate() {
        buf.push_str(if idx == 0 { " : " } else { ", " });
        _ = write!(buf, "{}({})", ident(&name.name), expr(init));
    }
    buf
}

fn access_label(access: Access) -> &'static str {
    match access {
        Access::Public => "public",
        Access::Private => "private",
    }
}

fn params(params: &[Param]) -> String {
    let params: Vec<_> = params
        .iter()
        .map(|param| format!("{} {}", cpp_type(&param.ty.ty), ident(&param.name.name)))
        .collect();
    params.join(", ")
}

fn return_type(method: &Method<Typed>) -> Cow<'static, str> {
    match &method.return_ty {
        Some(ty) => cpp_type(&ty.ty),
        None => Cow::Borrowed("void"),
    }
}

fn var_decl(decl: &VarDecl<Typed>) -> String {
    let ty = cpp_type(&decl.ty.ty);
    let name = ident(&decl.name.name);
    match &decl.initializer {
        Some(init) => format!("{ty} {name} = {}", expr(init)),
        // Value-initialized: zero, empty string, false or null.
        None => format!("{ty} {name}{{}}"),
    }
}

fn cpp_type(ty: &Type) -> Cow<'static, str> {
    match ty {
        Type::Int => Cow::Borrowed("int"),
        Type::Float => Cow::Borrowed("float"),
        Type::String => Cow::Borrowed("std::string"),
        Type::Bool => Cow::Borrowed("bool"),
        // Checked programs never hold unknown types.
        Type::Void | Type::Unknown => Cow::Borrowed("void"),
        Type::Class(name) => Cow::Owned(format!("{}*", class_ref(name))),
    }
}

/// A class named from a type or `new` position. Values may share a class's
/// name, and would hide it from an unqualified reference.
fn class_ref(name: &str) -> String {
    format!("::{}", ident(name))
}

/// Avoids clashes with C++ reserved words.
fn ident(name: &str) -> Cow<'_, str> {
    if CPP_RESERVED.contains(name) {
        Cow::Owned(format!("{name}_"))
    } else {
        Cow::Borrowed(name)
    }
}

static CPP_RESERVED: phf::Set<&'static str> = phf::phf_set! {
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq", "NULL", "std",
};

/// C++ precedence levels of the operators that can be emitted, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Assign,
    Or,
    And,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Postfix,
    Primary,
}

impl Prec {
    fn of(e: &Expr<Typed>) -> Prec {
        match &e.kind {
            ExprKind::Assignment { .. } => Prec::Assign,
            ExprKind::Binary { op, .. } => Prec::of_binary(*op),
            ExprKind::Unary { .. } | ExprKind::New { .. } => Prec::Unary,
            // `this->x`
            ExprKind::Id(_, Binding::Property { .. })
            | ExprKind::Call { .. }
            | ExprKind::MemberAccess { .. } => Prec::Postfix,
            // `std::string("...")` is a call as well
            ExprKind::String(_) => Prec::Postfix,
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Id(..)
            | ExprKind::This => Prec::Primary,
        }
    }

    fn of_binary(op: BinaryOperator) -> Prec {
        use BinaryOperator::*;
        match op {
            Or => Prec::Or,
            And => Prec::And,
            Eq | Ne => Prec::Equality,
            Lt | Gt | Le | Ge => Prec::Relational,
            Add | Sub => Prec::Additive,
            Mul | Div => Prec::Multiplicative,
        }
    }
}

fn expr(e: &Expr<Typed>) -> String {
    let mut buf = String::with_capacity(32);
    write_expr(&mut buf, e);
    buf
}

/// Writes `e`, parenthesized if it binds looser than `min`.
fn write_operand(buf: &mut String, e: &Expr<Typed>, min: Prec) {
    if Prec::of(e) < min {
        buf.push('(');
        write_expr(buf, e);
        buf.push(')');
    } else {
        write_expr(buf, e);
    }
}

fn write_expr(buf: &mut String, e: &Expr<Typed>) {
    match &e.kind {
        ExprKind::Int(val) => {
            _ = write!(buf, "{val}");
        }
        // The debug form always has a decimal point or an exponent.
        ExprKind::Float(val) => {
            _ = write!(buf, "{val:?}");
        }
        ExprKind::String(val) => {
            buf.push_str("std::string(\"");
            escape_into(buf, val);
            buf.push_str("\")");
        }
        ExprKind::Bool(val) => {
            _ = write!(buf, "{val}");
        }
        ExprKind::This => buf.push_str("this"),
        ExprKind::Id(name, Binding::Property { .. }) => {
            _ = write!(buf, "this->{}", ident(&name.name));
        }
        ExprKind::Id(name, _) => buf.push_str(&ident(&name.name)),
        ExprKind::Unary { op, expr } => {
            buf.push_str(match op {
                UnaryOperator::Neg => "-",
                UnaryOperator::Not => "!",
            });
            // `- -x` and `-(-x)` are both fine, `--x` is not.
            let min = match expr.kind {
                ExprKind::Unary { .. } => Prec::Postfix,
                _ => Prec::Unary,
            };
            write_operand(buf, expr, min);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let prec = Prec::of_binary(*op);
            write_operand(buf, lhs, prec);
            _ = write!(buf, " {} ", op.symbol());
            // Left-associative: an equally binding right operand needs
            // parentheses.
            write_operand(buf, rhs, next(prec));
        }
        ExprKind::Assignment { target, value } => {
            write_expr(buf, target);
            buf.push_str(" = ");
            write_operand(buf, value, Prec::Assign);
        }
        ExprKind::Call {
            receiver,
            method,
            args,
            ..
        } => {
            match receiver {
                Some(receiver) => write_operand(buf, receiver, Prec::Postfix),
                None => buf.push_str("this"),
            }
            _ = write!(buf, "->{}(", ident(&method.name));
            write_args(buf, args);
            buf.push(')');
        }
        ExprKind::MemberAccess { object, member } => {
            write_operand(buf, object, Prec::Postfix);
            _ = write!(buf, "->{}", ident(&member.name));
        }
        ExprKind::New { class, args } => {
            _ = write!(buf, "new {}(", class_ref(&class.name));
            write_args(buf, args);
            buf.push(')');
        }
    }
}

fn write_args(buf: &mut String, args: &[Expr<Typed>]) {
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            buf.push_str(", ");
        }
        write_operand(buf, arg, Prec::Assign);
    }
}

fn next(prec: Prec) -> Prec {
    match prec {
        Prec::Assign => Prec::Or,
        Prec::Or => Prec::And,
        Prec::And => Prec::Equality,
        Prec::Equality => Prec::Relational,
        Prec::Relational => Prec::Additive,
        Prec::Additive => Prec::Multiplicative,
        Prec::Multiplicative => Prec::Unary,
        Prec::Unary => Prec::Postfix,
        Prec::Postfix | Prec::Primary => Prec::Primary,
    }
}

fn escape_into(buf: &mut String, val: &str) {
    for c in val.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\t' => buf.push_str("\\t"),
            '\r' => buf.push_str("\\r"),
            c if c.is_ascii_control() => {
                _ = write!(buf, "\\{:03o}", u32::from(c));
            }
            c => buf.push(c),
        }
    }
}
