//! Command line entry point.
//!
//! Grounded on `original_source/runac/__main__.py`'s `COMMANDS` dispatch
//! table: one subcommand per pipeline stage, each taking a single source
//! file. `clap`'s derive API replaces the original's `optparse` options and
//! its unique-abbreviation command matching.

use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use runac::driver::{self, CompilerOptions};

/// The Runa compiler.
#[derive(Parser)]
#[command(name = "runac", version, about)]
struct Cli {
  #[command(subcommand)]
  command: Command,
  /// Directory holding the core library's `.rns` sources; defaults to a
  /// `corelib` directory next to the input file, if one exists.
  #[arg(long, global = true)]
  core: Option<PathBuf>,
  /// Print a full Rust backtrace instead of a rendered diagnostic.
  #[arg(long, global = true)]
  traceback: bool,
}

#[derive(Subcommand)]
enum Command {
  /// Print the lexer's token stream for a source file.
  Tokens { file: PathBuf },
  /// Parse a source file and print its AST (debug form).
  Parse { file: PathBuf },
  /// Compile a source file and print the emitted SSA IR.
  Generate { file: PathBuf },
  /// Compile a source file to SSA IR and write it next to the input,
  /// swapping the `.rns` extension for `.ll`.
  Compile { file: PathBuf },
}

fn opts_for(cli: &Cli, file: &std::path::Path) -> CompilerOptions {
  let core_library = cli.core.clone().or_else(|| driver::default_core_library(file));
  CompilerOptions { core_library, traceback: cli.traceback }
}

fn run(cli: &Cli) -> Result<(), runac::diagnostics::CompileError> {
  match &cli.command {
    Command::Tokens { file } => {
      let src = std::fs::read_to_string(file)?;
      for line in driver::tokens(&file.display().to_string(), &src)? {
        println!("{line}");
      }
    }
    Command::Parse { file } => {
      let src = std::fs::read_to_string(file)?;
      let ast = driver::parse(&file.display().to_string(), &src)?;
      println!("{ast:#?}");
    }
    Command::Generate { file } => {
      let src = std::fs::read_to_string(file)?;
      let opts = opts_for(cli, file);
      let ir = driver::compile(&file.display().to_string(), &src, &opts)?;
      println!("{ir}");
    }
    Command::Compile { file } => {
      let src = std::fs::read_to_string(file)?;
      let opts = opts_for(cli, file);
      let ir = driver::compile(&file.display().to_string(), &src, &opts)?;
      let out = file.with_extension("ll");
      std::fs::write(&out, ir)?;
      log::info!("wrote {}", out.display());
    }
  }
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();
  let cli = Cli::parse();
  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{}", e.render());
      ExitCode::FAILURE
    }
  }
}
