//! javafix CLI - rewrite decompiled Java into readable source

use clap::Parser;
use javafix::collect::DumpFilter;
use javafix::config::{load_config, Overrides};
use javafix::{LineEnding, Orchestrator, RunMode, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "javafix")]
#[command(version)]
#[command(args_override_self = true)]
#[command(about = "Readable Java from decompiler output")]
#[command(long_about = r#"
javafix rewrites Java sources in place: braces and indentation are
normalized, line endings unified, and identifiers renamed through a
symbol dictionary (symbols.json).

Example usage:
  javafix --dump src/                 record every resolvable symbol
  javafix --dump --dump-missing src/  record unresolved references only
  javafix --symbols=names.json src/   rewrite using an edited dictionary
  javafix --crlf Foo.java             rewrite one file with CRLF endings
"#)]
struct Cli {
    /// Files and directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Terminate lines with CR
    #[arg(long, overrides_with = "crlf")]
    cr: bool,

    /// Terminate lines with CRLF
    #[arg(long, overrides_with = "cr")]
    crlf: bool,

    /// Record resolved symbols into the store instead of rewriting
    #[arg(long)]
    dump: bool,

    /// With --dump, record only unresolved references
    #[arg(long)]
    dump_missing: bool,

    /// Symbol store to read (and write when dumping)
    #[arg(long, value_name = "PATH")]
    symbols: Option<PathBuf>,

    /// Name meaningless locals and parameters after their type
    #[arg(long)]
    rename_locals: bool,

    /// Config file (default: ./javafix.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let line_ending = if self.crlf {
            Some(LineEnding::CrLf)
        } else if self.cr {
            Some(LineEnding::Cr)
        } else {
            None
        };

        let mode = match (self.dump, self.dump_missing) {
            (true, true) => RunMode::Dump(DumpFilter::Missing),
            (true, false) => RunMode::Dump(DumpFilter::Valid),
            (false, _) => RunMode::Fix,
        };

        Overrides {
            paths: self.paths.clone(),
            symbols: self.symbols.clone(),
            line_ending,
            rename_locals: self.rename_locals,
            mode,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    if cli.dump_missing && !cli.dump {
        tracing::warn!("--dump-missing has no effect without --dump");
    }

    let file_config = load_config(cli.config.as_deref())?;
    let settings = Settings::resolve(file_config, cli.overrides());
    tracing::debug!(
        "Store {}, line ending {}, mode {:?}",
        settings.symbols.display(),
        settings.line_ending.name(),
        settings.mode
    );
    if settings.mode == RunMode::Fix && !settings.symbols.exists() {
        tracing::warn!(
            "Symbol store {} not found, only layout will change",
            settings.symbols.display()
        );
    }

    let summary = Orchestrator::new(settings).run()?;
    javafix::ui::print_summary(&summary);

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("javafix").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_repeated_flags_accepted() {
        let cli = parse(&["--cr", "--cr", "--dump", "--dump", "--symbols=a.json", "--symbols=b.json", "src"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.line_ending, Some(LineEnding::Cr));
        assert_eq!(overrides.mode, RunMode::Dump(DumpFilter::Valid));
        assert_eq!(overrides.symbols, Some(PathBuf::from("b.json")));
    }

    #[test]
    fn test_last_line_ending_wins() {
        assert_eq!(parse(&["--cr", "--crlf", "A.java"]).overrides().line_ending, Some(LineEnding::CrLf));
        assert_eq!(parse(&["--crlf", "--cr", "A.java"]).overrides().line_ending, Some(LineEnding::Cr));
    }

    #[test]
    fn test_dump_missing_needs_dump() {
        assert_eq!(parse(&["--dump-missing", "src"]).overrides().mode, RunMode::Fix);
        assert_eq!(
            parse(&["--dump-missing", "--dump", "src"]).overrides().mode,
            RunMode::Dump(DumpFilter::Missing)
        );
    }
}
