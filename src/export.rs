//! Canonical table ordering and export.
//!
//! Sorting fixes a total order on every table (numeric keys first, then the
//! term text lexicographically) so that repeated runs produce byte-identical
//! files regardless of hash-map iteration or thread scheduling.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use csv::WriterBuilder;
use serde::Serialize;

use crate::{AnalysisError, TableSet};

/// Output format for the exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// Guard a cell against spreadsheet formula injection: cells starting with
/// `=`, `+`, `-`, or `@` get a leading apostrophe. Applied to string cells of
/// CSV/TSV exports only.
///
/// # Example
/// ```
/// use corpus_tables::csv_safe_cell;
/// assert_eq!(csv_safe_cell("=cmd()"), "'=cmd()");
/// assert_eq!(csv_safe_cell("tax"), "tax");
/// ```
pub fn csv_safe_cell(cell: &str) -> String {
    match cell.chars().next() {
        Some('=') | Some('+') | Some('-') | Some('@') => format!("'{cell}"),
        _ => cell.to_string(),
    }
}

/// Sort every table into its canonical order:
/// - words and N-grams: ascending `(source, period)`, descending count
/// - collocations: ascending `(source, period)`, descending PMI
/// - TF-IDF: ascending period, descending weight
///
/// Remaining ties break on the term text.
pub fn sort_tables(tables: &mut TableSet) {
    tables.words.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.period.cmp(&b.period))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.term.cmp(&b.term))
    });
    tables.ngrams.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.period.cmp(&b.period))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.ngram.cmp(&b.ngram))
            .then_with(|| a.n.cmp(&b.n))
    });
    tables.collocations.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.period.cmp(&b.period))
            .then_with(|| b.pmi.total_cmp(&a.pmi))
            .then_with(|| a.w1.cmp(&b.w1))
            .then_with(|| a.w2.cmp(&b.w2))
    });
    tables.tfidf.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| b.weight.total_cmp(&a.weight))
            .then_with(|| a.term.cmp(&b.term))
    });
}

fn delimited_writer(path: &Path, format: ExportFormat) -> Result<csv::Writer<File>, AnalysisError> {
    let delimiter = match format {
        ExportFormat::Tsv => b'\t',
        _ => b',',
    };
    Ok(WriterBuilder::new().delimiter(delimiter).from_path(path)?)
}

fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AnalysisError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, rows)?;
    Ok(())
}

fn write_words(tables: &TableSet, path: &Path, format: ExportFormat) -> Result<(), AnalysisError> {
    if format == ExportFormat::Json {
        return write_json(path, &tables.words);
    }
    let mut w = delimited_writer(path, format)?;
    w.write_record(["source", "period", "term", "count", "group_total_tokens"])?;
    for r in &tables.words {
        w.write_record([
            csv_safe_cell(r.source.as_str()),
            csv_safe_cell(r.period.as_str()),
            csv_safe_cell(&r.term),
            r.count.to_string(),
            r.group_total_tokens.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_ngrams(tables: &TableSet, path: &Path, format: ExportFormat) -> Result<(), AnalysisError> {
    if format == ExportFormat::Json {
        return write_json(path, &tables.ngrams);
    }
    let mut w = delimited_writer(path, format)?;
    w.write_record(["source", "period", "ngram", "n", "count", "group_total_tokens"])?;
    for r in &tables.ngrams {
        w.write_record([
            csv_safe_cell(r.source.as_str()),
            csv_safe_cell(r.period.as_str()),
            csv_safe_cell(&r.ngram),
            r.n.to_string(),
            r.count.to_string(),
            r.group_total_tokens.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_collocations(
    tables: &TableSet,
    path: &Path,
    format: ExportFormat,
) -> Result<(), AnalysisError> {
    if format == ExportFormat::Json {
        return write_json(path, &tables.collocations);
    }
    let mut w = delimited_writer(path, format)?;
    w.write_record(["source", "period", "w1", "w2", "count", "pmi"])?;
    for r in &tables.collocations {
        w.write_record([
            csv_safe_cell(r.source.as_str()),
            csv_safe_cell(r.period.as_str()),
            csv_safe_cell(&r.w1),
            csv_safe_cell(&r.w2),
            r.count.to_string(),
            r.pmi.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_tfidf(tables: &TableSet, path: &Path, format: ExportFormat) -> Result<(), AnalysisError> {
    if format == ExportFormat::Json {
        return write_json(path, &tables.tfidf);
    }
    let mut w = delimited_writer(path, format)?;
    w.write_record(["period", "term", "weight"])?;
    for r in &tables.tfidf {
        w.write_record([
            csv_safe_cell(r.period.as_str()),
            csv_safe_cell(&r.term),
            r.weight.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write the four tables under `<out_root>/tables/` and return the paths
/// written. Table stems are fixed; the extension follows the format.
pub fn write_tables(
    tables: &TableSet,
    out_root: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let dir = out_root.join("tables");
    fs::create_dir_all(&dir)?;
    let ext = format.extension();

    let words = dir.join(format!("word_frequencies_by_source_period.{ext}"));
    write_words(tables, &words, format)?;
    let ngrams = dir.join(format!("ngram_frequencies_by_source_period.{ext}"));
    write_ngrams(tables, &ngrams, format)?;
    let colloc = dir.join(format!("collocations_pmi_by_source_period.{ext}"));
    write_collocations(tables, &colloc, format)?;
    let tfidf = dir.join(format!("tfidf_top_terms_by_period.{ext}"));
    write_tfidf(tables, &tfidf, format)?;

    Ok(vec![words, ngrams, colloc, tfidf])
}
