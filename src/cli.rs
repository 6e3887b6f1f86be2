//! Command-line surface of the `sortstat` binary.
//!
//! - `sortstat summarize` reads one sorted stream from stdin (or `--input`)
//!   and prints one record.
//! - `sortstat multi PATH...` sorts and summarizes every path in parallel and
//!   prints one record per path, tagged with `_path`, in argument order.
//! - `sortstat bigcsv` splits a delimited file into temporary column files,
//!   prints the row-length histogram, then summarizes every column like
//!   `multi` does.
//!
//! Records are JSON objects with sorted keys, one per line, on stdout or the
//! `--output` file.

use crate::config::{Config, SortStrategy, resolve_concurrency};
use crate::io::compression::FinishWrite;
use crate::io::glob::expand_sources;
use crate::io::jsonl::{create_report, write_record, write_records};
use crate::io::source::{Presorted, SortedSource};
#[cfg(feature = "io-csv")]
use crate::io::split::ColumnSplitter;
use crate::summary::{summarize, summarize_reader};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::error;

/// Distributional statistics over sorted, line-delimited values.
#[derive(Debug, Parser)]
#[command(name = "sortstat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Write records here instead of stdout (compressed by extension).
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "SORTSTAT_LOG", default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize one already-sorted stream.
    Summarize(SummarizeArgs),
    /// Sort and summarize many sources in parallel.
    Multi(MultiArgs),
    /// Split a delimited file into columns and summarize each column.
    #[cfg(feature = "io-csv")]
    Bigcsv(BigcsvArgs),
}

/// Arguments for `sortstat summarize`.
#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// Read this sorted file instead of stdin.
    #[arg(long)]
    pub input: Option<String>,
}

/// How a batch of sources is sorted and run, shared by `multi` and `bigcsv`.
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// How each source is sorted.
    #[arg(long, value_enum, default_value_t = SortStrategy::External)]
    pub sort: SortStrategy,

    /// Worker threads (default: number of CPUs).
    #[arg(long, short = 'j', env = "SORTSTAT_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Print the sources that succeeded and report the failures.
    #[arg(long)]
    pub keep_going: bool,

    /// Sort executable for `--sort external`.
    #[arg(long)]
    pub sort_program: Option<String>,

    /// Extra argument for the external sort; repeatable.
    #[arg(long = "sort-arg", allow_hyphen_values = true)]
    pub sort_args: Vec<String>,
}

impl BatchArgs {
    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            concurrency: resolve_concurrency(self.concurrency),
            sort: self.sort,
            sort_program: self.sort_program.clone(),
            sort_args: self.sort_args.clone(),
            keep_going: self.keep_going,
        }
    }
}

/// Arguments for `sortstat multi`.
#[derive(Debug, Args)]
pub struct MultiArgs {
    /// Source paths, reported in this order.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Treat every path as a glob pattern.
    #[arg(long)]
    pub glob: bool,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Arguments for `sortstat bigcsv`.
#[cfg(feature = "io-csv")]
#[derive(Debug, Args)]
pub struct BigcsvArgs {
    /// Read this delimited file instead of stdin (decompressed by extension).
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Field delimiter, a single ASCII character (`\t` for tab).
    #[arg(long, short = 'd', default_value = "|", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Directory in which the temporary column files are created.
    #[arg(long, env = "SORTSTAT_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[cfg(feature = "io-csv")]
fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s {
        "\\t" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("expected one ASCII character, got {s:?}")),
        },
    }
}

/// Run the parsed command line.
///
/// # Errors
/// Any pipeline or output failure. With `--keep-going`, an error is still
/// returned after the successful records are written if any source failed.
pub fn execute(cli: Cli) -> Result<()> {
    match &cli.output {
        Some(path) => {
            let mut report = create_report(path)?;
            let outcome = run_command(&cli.command, &mut report);
            // Finish even after a --keep-going failure so the successes stay readable.
            let finished = report
                .finish()
                .with_context(|| format!("finish report {}", path.display()));
            outcome.and(finished)
        }
        None => run_command(&cli.command, &mut io::stdout().lock()),
    }
}

/// Run one subcommand, writing records to `out`.
///
/// `out` is flushed before returning, including when some sources failed.
///
/// # Errors
/// See [`execute`].
pub fn run_command(command: &Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Summarize(args) => {
            let record = match &args.input {
                Some(path) => summarize(Presorted.open(path)?),
                None => summarize_reader("<stdin>", io::stdin().lock()),
            }
            .context("summarize input")?;
            write_record(&mut *out, &record)?;
            out.flush()?;
            Ok(())
        }
        Commands::Multi(args) => {
            let paths = if args.glob {
                expand_sources(&args.paths)?
            } else {
                args.paths.clone()
            };
            run_batch(&args.batch.config(), &paths, out)
        }
        #[cfg(feature = "io-csv")]
        Commands::Bigcsv(args) => run_bigcsv(args, out),
    }
}

#[cfg(feature = "io-csv")]
fn run_bigcsv(args: &BigcsvArgs, out: &mut dyn Write) -> Result<()> {
    let mut splitter = ColumnSplitter::new().with_delimiter(args.delimiter);
    if let Some(root) = &args.temp_dir {
        splitter = splitter.with_temp_root(root);
    }
    let split = match &args.input {
        Some(path) => splitter.split_path(path)?,
        None => splitter.split(io::stdin().lock()).context("split <stdin>")?,
    };

    // Serialized directly so the row lengths stay in numeric order.
    serde_json::to_writer(&mut *out, split.histogram()).context("write histogram")?;
    out.write_all(b"\n")?;

    run_batch(&args.batch.config(), split.columns(), out)?;
    split.close()
}

/// Summarize `paths` under `config`, writing one `_path` record per success.
fn run_batch(config: &Config, paths: &[String], out: &mut dyn Write) -> Result<()> {
    let source = config.sorted_source();
    let runner = config.runner();

    if !config.keep_going {
        let results = runner.summarize_all(source.as_ref(), paths)?;
        write_records(&mut *out, &results)?;
        return Ok(());
    }

    let mut failures = 0usize;
    for outcome in runner.summarize_each(source.as_ref(), paths)? {
        match outcome {
            Ok(result) => write_record(&mut *out, &result)?,
            Err(failure) => {
                error!(path = %failure.path, error = %failure.error, "source failed");
                failures += 1;
            }
        }
    }
    out.flush()?;
    if failures > 0 {
        bail!("{failures} of {} sources failed", paths.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_with_defaults() {
        let cli = Cli::parse_from(["sortstat", "multi", "a.txt", "b.txt"]);
        let Commands::Multi(args) = cli.command else {
            panic!("expected multi");
        };
        assert_eq!(args.paths, vec!["a.txt", "b.txt"]);
        assert_eq!(args.batch.sort, SortStrategy::External);
        assert!(!args.glob);
        assert!(!args.batch.keep_going);
        assert!(cli.output.is_none());
    }

    #[test]
    fn parses_multi_flags() {
        let cli = Cli::parse_from([
            "sortstat",
            "multi",
            "--sort",
            "in-process",
            "-j",
            "3",
            "--keep-going",
            "--sort-arg",
            "-S",
            "--sort-arg",
            "1G",
            "--output",
            "out.jsonl.gz",
            "x.txt",
        ]);
        assert_eq!(cli.output, Some(PathBuf::from("out.jsonl.gz")));
        let Commands::Multi(args) = cli.command else {
            panic!("expected multi");
        };
        let config = args.batch.config();
        assert_eq!(config.sort, SortStrategy::InProcess);
        assert_eq!(config.concurrency, 3);
        assert!(config.keep_going);
        assert_eq!(config.sort_args, vec!["-S", "1G"]);
    }

    #[test]
    fn multi_requires_a_path() {
        assert!(Cli::try_parse_from(["sortstat", "multi"]).is_err());
    }

    #[cfg(feature = "io-csv")]
    #[test]
    fn parses_bigcsv_delimiters() {
        let cli = Cli::parse_from(["sortstat", "bigcsv", "--input", "t.csv"]);
        let Commands::Bigcsv(args) = cli.command else {
            panic!("expected bigcsv");
        };
        assert_eq!(args.delimiter, b'|');
        assert_eq!(args.batch.sort, SortStrategy::External);

        let cli = Cli::parse_from(["sortstat", "bigcsv", "-d", "\\t", "--sort", "presorted"]);
        let Commands::Bigcsv(args) = cli.command else {
            panic!("expected bigcsv");
        };
        assert_eq!(args.delimiter, b'\t');
        assert!(args.input.is_none());

        assert!(Cli::try_parse_from(["sortstat", "bigcsv", "-d", "ab"]).is_err());
        assert!(Cli::try_parse_from(["sortstat", "bigcsv", "-d", "\u{e9}"]).is_err());
    }

    #[test]
    fn summarize_takes_optional_input() {
        let cli = Cli::parse_from(["sortstat", "summarize", "--input", "col.txt"]);
        let Commands::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.input.as_deref(), Some("col.txt"));
    }
}
