#![forbid(unsafe_code)]

mod manifest;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use toy_ast::Program;
use toy_backend_x86::EmitOptions;
use toy_core::{CheckOptions, CheckedProgram, Checker};
use toy_interpret::{Interpreter, InterpreterConfig};
use toy_lex::{Lexer, Token};
use toy_rt::WriteSink;

use manifest::ResolvedConfig;

/// Stack for the interpreter thread; deep guard recursion runs on the host stack.
const RUN_STACK_BYTES: usize = 256 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "toyc", version, about = "Guard-clause language compiler for 32-bit x86 (NASM)")]
struct Cli {
    /// Configuration file. Defaults to the nearest `toy.toml` above the input file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report each pipeline stage and its duration on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check and emit NASM assembly
    Build {
        /// Input source file
        path: PathBuf,

        /// Output file (default: input with `.asm` extension, or `[build] output`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entry label. Overrides `[build] entry`.
        #[arg(long)]
        entry: Option<String>,

        /// Target triple. Overrides `[build] target`.
        #[arg(long)]
        target: Option<String>,
    },

    /// Lex, parse and check without emitting anything
    Check {
        path: PathBuf,

        /// Treat leaked heap values as errors. Overrides `[check] deny_leaks`.
        #[arg(long)]
        deny_leaks: bool,
    },

    /// Evaluate with the reference interpreter; exits with the program's status
    Run {
        path: PathBuf,

        /// Recursion limit. Overrides `[run] max_depth`.
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Dump the token stream
    Tokens { path: PathBuf },

    /// Dump the parsed syntax tree
    Ast { path: PathBuf },
}

fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    let log = StageLog {
        verbose: cli.verbose,
    };

    match cli.cmd {
        Cmd::Build {
            path,
            output,
            entry,
            target,
        } => {
            let resolved = resolve_config(&path, cli.config.as_deref(), &log)?;
            let session = Session::open(&path, log)?;
            let checked = session.check(&check_options(&resolved, false))?;

            let options = EmitOptions {
                entry: entry.unwrap_or_else(|| resolved.config.build.entry.clone()),
                target: target.unwrap_or_else(|| resolved.config.build.target.clone()),
            };
            let t0 = Instant::now();
            let asm = toy_backend_x86::emit_program(&checked, &options)
                .map_err(|e| miette::Report::new(e).with_source_code(session.named()))?;
            log.stage(t0, format_args!("emitted {} lines of assembly", asm.lines().count()));

            let out = output.unwrap_or_else(|| resolved.output_for(&path));
            if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).into_diagnostic()?;
            }
            fs::write(&out, asm).into_diagnostic()?;
            println!("wrote {}", out.display());
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Check { path, deny_leaks } => {
            let resolved = resolve_config(&path, cli.config.as_deref(), &log)?;
            let session = Session::open(&path, log)?;
            let checked = session.check(&check_options(&resolved, deny_leaks))?;
            println!(
                "{}: ok ({} functions, {} warnings)",
                display_path(&path),
                checked.program.functions().count(),
                checked.warnings.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Run { path, max_depth } => {
            let resolved = resolve_config(&path, cli.config.as_deref(), &log)?;
            let session = Session::open(&path, log)?;
            let checked = session.check(&check_options(&resolved, false))?;
            let config = InterpreterConfig {
                max_depth: max_depth.unwrap_or(resolved.config.run.max_depth),
            };

            let t0 = Instant::now();
            let status = std::thread::Builder::new()
                .name("toyc-run".to_string())
                .stack_size(RUN_STACK_BYTES)
                .spawn(move || {
                    let sink = WriteSink::new(io::stdout().lock());
                    let mut interp = Interpreter::with_config(sink, config);
                    interp.run(&checked).map(|outcome| outcome.exit_status)
                })
                .into_diagnostic()?
                .join()
                .map_err(|_| miette::miette!("interpreter thread panicked"))?
                .map_err(|e| miette::Report::new(e).with_source_code(session.named()))?;
            log.stage(t0, format_args!("evaluated to exit status {status}"));

            // The process status keeps the low byte, as `exit` does natively.
            Ok(ExitCode::from(status as u8))
        }
        Cmd::Tokens { path } => {
            let session = Session::open(&path, log)?;
            for tok in session.lex()? {
                println!("{tok}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Ast { path } => {
            let session = Session::open(&path, log)?;
            let tokens = session.lex()?;
            let program = session.parse(&tokens)?;
            println!("{program:#?}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct StageLog {
    verbose: bool,
}

impl StageLog {
    fn stage(&self, since: Instant, what: fmt::Arguments<'_>) {
        if self.verbose {
            eprintln!("toyc: {what} in {:?}", since.elapsed());
        }
    }

    fn note(&self, what: fmt::Arguments<'_>) {
        if self.verbose {
            eprintln!("toyc: {what}");
        }
    }
}

fn resolve_config(
    path: &Path,
    explicit: Option<&Path>,
    log: &StageLog,
) -> miette::Result<ResolvedConfig> {
    let resolved = manifest::load_config(path, explicit)?;
    match &resolved.manifest_path {
        Some(p) => log.note(format_args!("using config {}", p.display())),
        None => log.note(format_args!("no {} found; using defaults", manifest::MANIFEST_NAME)),
    }
    Ok(resolved)
}

fn check_options(resolved: &ResolvedConfig, deny_leaks: bool) -> CheckOptions {
    CheckOptions {
        deny_leaks: deny_leaks || resolved.config.check.deny_leaks,
    }
}

/// One input file moving through the front end. Every diagnostic it produces carries
/// the file's source.
struct Session {
    name: String,
    src: String,
    log: StageLog,
}

impl Session {
    fn open(path: &Path, log: StageLog) -> miette::Result<Session> {
        let src = fs::read_to_string(path)
            .map_err(|e| miette::miette!("failed to read {}: {e}", path.display()))?;
        Ok(Session {
            name: display_path(path),
            src,
            log,
        })
    }

    fn named(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.src.clone())
    }

    fn lex(&self) -> miette::Result<Vec<Token>> {
        let t0 = Instant::now();
        let tokens = Lexer::new(&self.src)
            .lex()
            .map_err(|e| miette::Report::new(e).with_source_code(self.named()))?;
        self.log
            .stage(t0, format_args!("lexed {} tokens", tokens.len()));
        Ok(tokens)
    }

    fn parse(&self, tokens: &[Token]) -> miette::Result<Program> {
        let t0 = Instant::now();
        let program = toy_parse::Parser::new(tokens)
            .parse_program()
            .map_err(|e| miette::Report::new(e).with_source_code(self.named()))?;
        self.log
            .stage(t0, format_args!("parsed {} items", program.items.len()));
        Ok(program)
    }

    fn check(&self, options: &CheckOptions) -> miette::Result<CheckedProgram> {
        let tokens = self.lex()?;
        let program = self.parse(&tokens)?;

        let t0 = Instant::now();
        let checked = Checker::with_options(*options)
            .check_program(&program)
            .map_err(|e| miette::Report::new(e).with_source_code(self.named()))?;
        self.log.stage(
            t0,
            format_args!("checked with {} warnings", checked.warnings.len()),
        );

        for warning in &checked.warnings {
            let report = miette::Report::new(warning.clone()).with_source_code(self.named());
            eprintln!("{report:?}");
        }
        Ok(checked)
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
