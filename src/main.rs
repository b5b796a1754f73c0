#![forbid(unsafe_code)]
//! # Corpus Tables CLI
//!
//! Command-line front end for the `corpus_tables` crate. Point it at a
//! processed corpus (one `*.tokens.json` plus `*.meta.json` per document)
//! and it writes the four summary tables under `<out>/tables/`.
//!
//! ## Example
//! ```bash
//! cargo run --release -- path/to/processed --min-count 5 --max-ngram 3 --export-format csv
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use corpus_tables::{
    AnalysisOptions, ExportFormat, analyze_corpus, print_failed_files, write_tables,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding the processed corpus (*.tokens.json + *.meta.json)
    path: PathBuf,

    /// Output root; tables are written to <out>/tables/
    #[arg(long, default_value = "outputs")]
    out: PathBuf,

    /// Minimum occurrence count for word/N-gram/collocation rows
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    min_count: u64,

    /// Highest N-gram order to tabulate (2 = bigrams only)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(2..))]
    max_ngram: u64,

    /// Output format for export (csv, tsv, json)
    #[arg(long, default_value = "csv")]
    export_format: ExportFormat,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let opts = AnalysisOptions {
        min_count: cli.min_count,
        max_ngram: cli.max_ngram as usize,
    };

    let report = match analyze_corpus(&cli.path, &opts) {
        Ok(report) => report,
        Err(e) => {
            error!("Error: {e}");
            process::exit(1);
        }
    };

    match write_tables(&report.tables, &cli.out, cli.export_format) {
        Ok(paths) => {
            for path in paths {
                info!("wrote {}", path.display());
            }
        }
        Err(e) => {
            error!("Error: {e}");
            process::exit(1);
        }
    }

    if !report.failed_files.is_empty() {
        print_failed_files(&report.failed_files);
        process::exit(1);
    }
}
