//! Indented dump of a program tree, used by `--emit ast` and by the parser
//! and checker tests.

use std::io::Write;

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

pub fn print_program_string<I: InfoWriter>(program: &Program<I>) -> String {
    let mut buf = Vec::with_capacity(1024);
    // Writing into a `Vec` can't fail.
    _ = print_program(&mut buf, program);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn print_expr_string<I: InfoWriter>(expr: &Expr<I>) -> String {
    let mut buf = Vec::with_capacity(512);
    _ = print_expr(&mut buf, 0, expr);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn print_program<I: InfoWriter>(
    w: &mut impl Write,
    program: &Program<I>,
) -> std::io::Result<()> {
    for class in &program.classes {
        print_class(w, 0, class)?;
    }
    Ok(())
}

fn print_class<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    class: &Class<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    write!(w, "class {}", class.name.name)?;
    if let Some(parent) = &class.parent {
        write!(w, " extends {}", parent.name)?;
    }
    writeln!(w)?;
    for member in &class.members {
        print_member(w, i + 1, member)?;
    }
    Ok(())
}

fn print_member<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    member: &Member<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    match &member.kind {
        MemberKind::Property(decl) => {
            write!(w, "{} property ", member.access)?;
            print_var_decl(w, i, decl)?;
        }
        MemberKind::Method(Method {
            name,
            params,
            return_ty,
            body,
        }) => {
            write!(w, "{} method {}(", member.access, name.name)?;
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{}: {}", param.name.name, param.ty.ty)?;
            }
            write!(w, ")")?;
            if let Some(ty) = return_ty {
                write!(w, ": {}", ty.ty)?;
            }
            writeln!(w)?;
            print_stmts(w, i + 1, &body.stmts)?;
        }
    }
    Ok(())
}

fn print_var_decl<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    decl: &VarDecl<I>,
) -> std::io::Result<()> {
    writeln!(w, "{}: {}", decl.name.name, decl.ty.ty)?;
    if let Some(initializer) = &decl.initializer {
        print_expr(w, i + 1, initializer)?;
    }
    Ok(())
}

fn print_stmts<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    stmts: &[Stmt<I>],
) -> std::io::Result<()> {
    for stmt in stmts {
        print_stmt(w, i, stmt)?;
    }
    Ok(())
}

fn print_stmt<I: InfoWriter>(w: &mut impl Write, i: usize, stmt: &Stmt<I>) -> std::io::Result<()> {
    match &stmt.kind {
        StmtKind::If {
            predicate,
            then_block,
            else_block,
        } => {
            sp(w, i)?;
            writeln!(w, "if")?;
            print_expr(w, i + 1, predicate)?;
            sp(w, i + 1)?;
            writeln!(w, "then")?;
            print_stmts(w, i + 2, &then_block.stmts)?;
            if let Some(else_block) = else_block {
                sp(w, i + 1)?;
                writeln!(w, "else")?;
                print_stmts(w, i + 2, &else_block.stmts)?;
            }
        }
        StmtKind::While { predicate, body } => {
            sp(w, i)?;
            writeln!(w, "while")?;
            print_expr(w, i + 1, predicate)?;
            sp(w, i + 1)?;
            writeln!(w, "do")?;
            print_stmts(w, i + 2, &body.stmts)?;
        }
        StmtKind::For {
            init,
            predicate,
            update,
            body,
        } => {
            sp(w, i)?;
            writeln!(w, "for")?;
            sp(w, i + 1)?;
            writeln!(w, "init")?;
            print_stmt(w, i + 2, init)?;
            print_expr(w, i + 1, predicate)?;
            sp(w, i + 1)?;
            writeln!(w, "update")?;
            print_expr(w, i + 2, update)?;
            sp(w, i + 1)?;
            writeln!(w, "do")?;
            print_stmts(w, i + 2, &body.stmts)?;
        }
        StmtKind::Return(value) => {
            sp(w, i)?;
            writeln!(w, "return")?;
            if let Some(value) = value {
                print_expr(w, i + 1, value)?;
            }
        }
        StmtKind::VarDecl(decl) => {
            sp(w, i)?;
            write!(w, "var ")?;
            print_var_decl(w, i, decl)?;
        }
        StmtKind::Print(args) => {
            sp(w, i)?;
            writeln!(w, "print")?;
            for arg in args {
                print_expr(w, i + 1, arg)?;
            }
        }
        StmtKind::Block(block) => {
            sp(w, i)?;
            writeln!(w, "block")?;
            print_stmts(w, i + 1, &block.stmts)?;
        }
        StmtKind::Expr(expr) => print_expr(w, i, expr)?,
    }
    Ok(())
}

pub fn print_expr<I: InfoWriter>(
    w: &mut impl Write,
    i: usize,
    expr: &Expr<I>,
) -> std::io::Result<()> {
    sp(w, i)?;
    let info = I::write_ty(&expr.ty); // inferred type, for typed trees
    match &expr.kind {
        ExprKind::Int(val) => writeln!(w, "int {val}{info}")?,
        ExprKind::Float(val) => writeln!(w, "float {val}{info}")?,
        ExprKind::String(val) => writeln!(w, "string {val:?}{info}")?,
        ExprKind::Bool(val) => writeln!(w, "bool {val}{info}")?,
        ExprKind::This => writeln!(w, "this{info}")?,
        ExprKind::Id(ident, binding) => {
            let binding = I::write_binding(binding);
            writeln!(w, "ident {}{binding}{info}", ident.name)?;
        }
        ExprKind::Unary {
            op,
            expr: inner_expr,
        } => {
            writeln!(w, "unary {op:?}{info}")?;
            print_expr(w, i + 1, inner_expr)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?}{info}")?;
            print_expr(w, i + 1, lhs)?;
            print_expr(w, i + 1, rhs)?;
        }
        ExprKind::Assignment { target, value } => {
            writeln!(w, "assignment{info}")?;
            print_expr(w, i + 1, target)?;
            print_expr(w, i + 1, value)?;
        }
        ExprKind::Call {
            receiver,
            method,
            args,
            binding,
        } => {
            let binding = I::write_binding(binding);
            writeln!(w, "call {}{binding}{info}", method.name)?;

            if let Some(receiver) = receiver {
                sp(w, i + 1)?;
                writeln!(w, "receiver")?;
                print_expr(w, i + 2, receiver)?;
            }

            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, i + 2, arg)?;
                }
            }
        }
        ExprKind::MemberAccess { object, member } => {
            writeln!(w, "member {}{info}", member.name)?;
            print_expr(w, i + 1, object)?;
        }
        ExprKind::New { class, args } => {
            writeln!(w, "new {}{info}", class.name)?;
            for arg in args {
                print_expr(w, i + 1, arg)?;
            }
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

/// Renders the phase-specific parts of a tree. Untyped trees render nothing.
pub trait InfoWriter: Info {
    fn write_ty(ty: &Self::Ty) -> String;

    fn write_binding(binding: &Self::Binding) -> String;
}

impl InfoWriter for Untyped {
    fn write_ty(_: &()) -> String {
        String::new()
    }

    fn write_binding(_: &()) -> String {
        String::new()
    }
}

impl InfoWriter for Typed {
    fn write_ty(ty: &crate::types::Type) -> String {
        format!(" : {ty}")
    }

    fn write_binding(binding: &Binding) -> String {
        match binding {
            Binding::Local => " [local]".into(),
            Binding::Param => " [param]".into(),
            Binding::Property { owner } => format!(" [property of {owner}]"),
            Binding::Method { owner } => format!(" [method of {owner}]"),
            Binding::Unresolved => " [unresolved]".into(),
        }
    }
}
