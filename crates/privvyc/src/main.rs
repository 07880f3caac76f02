//! The `privvy` command: run a script file, or drop into the interactive
//! prompt when no path is given.

use std::path::PathBuf;
use std::process::ExitCode;

use ariadne::{Label, Report, ReportKind, Source};
use clap::Parser as ClapParser;
use privvy_common::{Position, PrivvyError};
use privvy_parser::Parser as PrivvyParser;
use privvy_rt::Interpreter;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "privvy", version, about = "The Privvy scripting language")]
struct Cli {
    /// Script to run. Omit to start the interactive prompt.
    script: Option<PathBuf>,

    /// Raise logging verbosity (tracing output to stderr).
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the startup banner in interactive mode.
    #[arg(long)]
    no_banner: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.script {
        Some(path) => run_file(&path),
        None => run_repl(!cli.no_banner),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: could not read '{}': {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let file_name = path.display().to_string();
    let program = match PrivvyParser::parse_source(&source) {
        Ok(program) => program,
        Err(e) => {
            report_error(&file_name, &source, &e);
            return ExitCode::FAILURE;
        }
    };

    let interpreter = Interpreter::new();
    if let Err(e) = interpreter.interpret(&program) {
        report_error(&file_name, &source, &e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_repl(show_banner: bool) -> ExitCode {
    match privvy_repl::run(show_banner) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Render a diagnostic with a caret under the offending column, the way
/// other tools built on this pipeline report failures.
fn report_error(file_name: &str, source: &str, error: &PrivvyError) {
    let start = byte_offset(source, error.position());
    let end = if start < source.len() { start + 1 } else { start };
    let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_message(error.to_string())
        .with_label(Label::new(start..end).with_message(format!("in {file_name}")))
        .finish()
        .eprint(Source::from(source));
}

/// Convert a 1-based line/column position into a byte offset into
/// `source`, so `Position`'s own line/column tracking can drive
/// `ariadne`'s byte-span-oriented diagnostics.
fn byte_offset(source: &str, position: Position) -> usize {
    let mut offset = 0;
    for (line_index, line) in source.split('\n').enumerate() {
        if line_index as u32 + 1 == position.line {
            let column = position.column.saturating_sub(1) as usize;
            let byte_in_line = line.char_indices().nth(column).map(|(i, _)| i).unwrap_or(line.len());
            return offset + byte_in_line;
        }
        offset += line.len() + 1;
    }
    source.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_finds_the_right_column_on_a_later_line() {
        let source = "let x = 1\nlet y = ;\n";
        let offset = byte_offset(source, Position::new(2, 9));
        assert_eq!(&source[offset..offset + 1], ";");
    }

    #[test]
    fn byte_offset_on_first_line_matches_the_column_directly() {
        let source = "1 + @";
        let offset = byte_offset(source, Position::new(1, 5));
        assert_eq!(&source[offset..offset + 1], "@");
    }
}
