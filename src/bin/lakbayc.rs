use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use lakbay::{
    codegen::{self, EntryPoint, Options},
    diagnostic::Diagnostic,
    lexer,
    util::fmt::tree,
};

/// Translates a Lakbay program into C++.
#[derive(Parser, Debug)]
#[command(name = "lakbayc", version)]
struct Cli {
    /// Source file; standard input if absent.
    input: Option<PathBuf>,

    /// Output file; standard output if absent.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to write.
    #[arg(long, value_enum, default_value_t = Emit::Cpp)]
    emit: Emit,

    /// Don't generate a C++ `main` function, even if `Main.main` exists.
    #[arg(long)]
    no_entry: bool,

    /// Spaces per indentation level of the generated code.
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Log the work of each stage.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    /// C++ source.
    Cpp,
    /// The checked program tree.
    Ast,
    /// The token stream.
    Tokens,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(diagnostics) if diagnostics.is_empty() => ExitCode::SUCCESS,
        Ok(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            log::debug!("rejected with {} diagnostic(s)", diagnostics.len());
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns the diagnostics of a rejected program; nothing is written then.
fn run(cli: &Cli) -> anyhow::Result<Vec<Diagnostic>> {
    let src = read_input(cli)?;
    let text = match translate(cli, &src) {
        Ok(text) => text,
        Err(diagnostics) => return Ok(diagnostics),
    };
    write_output(cli, &text)?;
    Ok(Vec::new())
}

fn translate(cli: &Cli, src: &str) -> Result<String, Vec<Diagnostic>> {
    match cli.emit {
        Emit::Tokens => {
            let tokens = lexer::tokenize(src).map_err(|error| vec![Diagnostic::from(error)])?;
            Ok(tokens.iter().map(|token| format!("{token:?}\n")).collect())
        }
        Emit::Ast => {
            let program = lakbay::parse(src).map_err(|error| vec![error])?;
            let (program, _) = lakbay::check(program)?;
            Ok(tree::print_program_string(&program))
        }
        Emit::Cpp => {
            let options = Options {
                indent: cli.indent,
                entry: if cli.no_entry {
                    EntryPoint::Never
                } else {
                    EntryPoint::Auto
                },
            };
            let program = lakbay::parse(src).map_err(|error| vec![error])?;
            let (program, classes) = lakbay::check(program)?;
            Ok(codegen::generate_string(&program, &classes, &options))
        }
    }
}

fn read_input(cli: &Cli) -> anyhow::Result<String> {
    match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display())),
        None => {
            let mut src = String::new();
            io::stdin()
                .read_to_string(&mut src)
                .context("failed to read standard input")?;
            Ok(src)
        }
    }
}

fn write_output(cli: &Cli, text: &str) -> anyhow::Result<()> {
    match &cli.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write `{}`", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write standard output")
        }
    }
}
