use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use false_core::instructions;
use false_core::interpreter::{ExecutionObserver, Interpreter, Machine};
use false_core::sources::load_sources;
use false_core::{Operation, compile, compile_file, load_program};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line front end of the FALSE toolchain.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate source files or directories and print every diagnostic
    Check {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Compile a source file into bytecode
    Build {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run a source or bytecode file
    Run {
        file: PathBuf,

        #[arg(long, help = "Print the stack to stderr after every operation")]
        trace_stack: bool,

        #[arg(long, help = "Print the variables to stderr after every operation")]
        trace_variables: bool,
    },
    /// Print a program back as compact source
    Disasm { file: PathBuf },
    /// Print the language reference
    Reference,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    execute(cli)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { paths } => check(&paths),
        Commands::Build { input, output } => {
            let program = compile_file(&input)
                .with_context(|| format!("failed to compile {}", input.display()))?;
            write_output(&output, &program.encode())?;
            info!(output = %output.display(), "bytecode written");
            Ok(())
        }
        Commands::Run {
            file,
            trace_stack,
            trace_variables,
        } => run(&file, trace_stack, trace_variables),
        Commands::Disasm { file } => {
            let program = load_program(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            println!("{}", program.disassemble());
            Ok(())
        }
        Commands::Reference => {
            print!("{}", instructions::reference());
            Ok(())
        }
    }
}

fn check(paths: &[PathBuf]) -> Result<()> {
    let mut total = 0usize;
    let mut failed = 0usize;
    for root in paths {
        let files = load_sources(root)
            .with_context(|| format!("failed to read sources from {}", root.display()))?;
        for file in files {
            total += 1;
            match compile(&file.contents) {
                Ok(_) => println!("{}: ok", file.path.display()),
                Err(diagnostics) => {
                    failed += 1;
                    println!("{}:\n{}", file.path.display(), diagnostics);
                }
            }
        }
    }
    debug!(total, failed, "check finished");
    if failed > 0 {
        bail!("{failed} of {total} files failed validation");
    }
    Ok(())
}

fn run(file: &Path, trace_stack: bool, trace_variables: bool) -> Result<()> {
    let program =
        load_program(file).with_context(|| format!("failed to load {}", file.display()))?;

    let mut interpreter = Interpreter::stdio();
    let abort = interpreter.abort_handle();
    ctrlc::set_handler(move || abort.request()).context("failed to install Ctrl-C handler")?;

    let mut observer = TraceObserver {
        stack: trace_stack,
        variables: trace_variables,
    };
    interpreter
        .run(&program, &mut observer)
        .with_context(|| format!("{} stopped with a runtime fault", file.display()))?;
    if interpreter.is_aborted() {
        eprintln!("execution aborted");
    }
    Ok(())
}

/// Dumps machine state to stderr after every operation.
struct TraceObserver {
    stack: bool,
    variables: bool,
}

impl ExecutionObserver for TraceObserver {
    fn on_step(&mut self, operation: &Operation, machine: &Machine) {
        if !self.stack && !self.variables {
            return;
        }
        let mut err = io::stderr().lock();
        let _ = write!(err, "{:>5} {:<6}", operation.index, operation.op.to_string());
        if self.stack {
            let _ = write!(err, " stack: {}", machine.stack);
        }
        if self.variables {
            let _ = write!(err, " variables: {}", machine.variables);
        }
        let _ = writeln!(err);
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
