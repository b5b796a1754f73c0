#![forbid(unsafe_code)]
//! # corpus_tables
//!
//! Deterministic corpus statistics over pre-tokenized documents.
//!
//! The crate consumes the output of an upstream normalization step: one
//! `*.tokens.json` file per document (a JSON array of normalized tokens,
//! in document order) with a sibling `*.meta.json` carrying at least a
//! `source` and a `period` (or `year`) label. From these it builds four
//! tables:
//!
//! - word frequencies per `(source, period)` group
//! - N-gram frequencies per group (bigrams up to `max_ngram`)
//! - adjacent-pair collocations with pointwise mutual information per group
//! - TF-IDF top terms per period, sources merged
//!
//! Every table is sorted under a fixed total order before export, so two
//! runs over the same corpus produce byte-identical files.

pub mod analyze;
pub mod export;
pub mod tfidf;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use walkdir::WalkDir;

pub use export::{ExportFormat, csv_safe_cell, write_tables};

/// Errors surfaced by loading and export. Per-document input problems are
/// collected as [`FailedFile`]s instead, so one bad file never aborts a run.
#[derive(Debug)]
pub enum AnalysisError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidInput { path: String, reason: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Io(e) => write!(f, "I/O error: {e}"),
            AnalysisError::Csv(e) => write!(f, "CSV error: {e}"),
            AnalysisError::Json(e) => write!(f, "JSON error: {e}"),
            AnalysisError::InvalidInput { path, reason } => {
                write!(f, "invalid input {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::Io(e)
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Csv(e)
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Json(e)
    }
}

/// A `source` or `period` value from document metadata.
///
/// Absent metadata is the `Unknown` variant rather than a magic string, so no
/// builder has to special-case it. [`Label::new`] also folds a literal
/// `"unknown"` into `Unknown`; `Known` therefore never holds that string, and
/// ordering by the rendered text stays consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn new(value: Option<String>) -> Self {
        match value {
            Some(s) if s != "unknown" => Label::Known(s),
            _ => Label::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Known(s) => s,
            Label::Unknown => "unknown",
        }
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Aggregation key: one group per distinct `(source, period)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub source: Label,
    pub period: Label,
}

/// One tokenized input document, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: String,
    pub tokens: Vec<String>,
    pub source: Label,
    pub period: Label,
}

/// A document that violated the input contract, with the reason it was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub reason: String,
}

/// Word-frequency row: term count within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCount {
    pub source: Label,
    pub period: Label,
    pub term: String,
    pub count: u64,
    pub group_total_tokens: u64,
}

/// N-gram frequency row; `ngram` is the space-joined window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NGramCount {
    pub source: Label,
    pub period: Label,
    pub ngram: String,
    pub n: usize,
    pub count: u64,
    pub group_total_tokens: u64,
}

/// Directional adjacent-pair collocation row. `(w1, w2)` and `(w2, w1)` are
/// distinct rows when both orders occur.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollocationRecord {
    pub source: Label,
    pub period: Label,
    pub w1: String,
    pub w2: String,
    pub count: u64,
    pub pmi: f64,
}

/// TF-IDF row: L2-normalized term weight within one period document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermWeightRecord {
    pub period: Label,
    pub term: String,
    pub weight: f64,
}

/// The four output tables of one corpus pass.
#[derive(Debug, Default)]
pub struct TableSet {
    pub words: Vec<TermCount>,
    pub ngrams: Vec<NGramCount>,
    pub collocations: Vec<CollocationRecord>,
    pub tfidf: Vec<TermWeightRecord>,
}

/// Result of [`analyze_corpus`]: the tables plus any dropped documents.
#[derive(Debug)]
pub struct AnalysisReport {
    pub tables: TableSet,
    pub failed_files: Vec<FailedFile>,
}

/// Thresholds for the frequency, N-gram, and collocation tables.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Minimum occurrence count for a row to be emitted. Must be >= 1.
    pub min_count: u64,
    /// Highest N-gram order tabulated; orders 2..=max_ngram are computed.
    pub max_ngram: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            min_count: 5,
            max_ngram: 3,
        }
    }
}

/// The two grouping views over one document set: by `(source, period)` for
/// the per-group tables, and by period alone (sources merged, one flattened
/// token sequence) for TF-IDF.
#[derive(Debug, Default)]
pub struct GroupedCorpus {
    pub by_group: BTreeMap<GroupKey, Vec<Vec<String>>>,
    pub by_period: BTreeMap<Label, Vec<String>>,
}

/// Partition documents into both grouping views. Token lists keep their
/// per-document identity inside a group so that N-gram windows never span a
/// document boundary; the period view is flattened in arrival order.
pub fn group_documents(docs: Vec<Document>) -> GroupedCorpus {
    let mut corpus = GroupedCorpus::default();
    for doc in docs {
        corpus
            .by_period
            .entry(doc.period.clone())
            .or_default()
            .extend(doc.tokens.iter().cloned());
        let key = GroupKey {
            source: doc.source,
            period: doc.period,
        };
        corpus.by_group.entry(key).or_default().push(doc.tokens);
    }
    corpus
}

/// Find every `*.tokens.json` under `root`, sorted by path for reproducible
/// load order.
pub fn collect_token_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".tokens.json"))
        })
        .collect();
    files.sort();
    files
}

#[derive(Deserialize)]
struct RawMeta {
    source: Option<String>,
    #[serde(alias = "year")]
    period: Option<String>,
}

fn meta_path_for(tokens_path: &Path) -> PathBuf {
    let name = tokens_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.strip_suffix(".tokens.json").unwrap_or(name);
    tokens_path.with_file_name(format!("{stem}.meta.json"))
}

fn load_document(path: &Path) -> Result<Document, AnalysisError> {
    let invalid = |reason: String| AnalysisError::InvalidInput {
        path: path.display().to_string(),
        reason,
    };
    let text = fs::read_to_string(path).map_err(|e| invalid(format!("cannot read tokens: {e}")))?;
    let tokens: Vec<String> =
        serde_json::from_str(&text).map_err(|e| invalid(format!("malformed token list: {e}")))?;

    // A missing meta file means "no metadata" (both labels unknown); a meta
    // file that exists but cannot be parsed is a contract violation.
    let meta_path = meta_path_for(path);
    let meta = if meta_path.exists() {
        let text = fs::read_to_string(&meta_path)
            .map_err(|e| invalid(format!("cannot read metadata: {e}")))?;
        serde_json::from_str::<RawMeta>(&text)
            .map_err(|e| invalid(format!("malformed metadata: {e}")))?
    } else {
        RawMeta {
            source: None,
            period: None,
        }
    };

    Ok(Document {
        path: path.display().to_string(),
        tokens,
        source: Label::new(meta.source),
        period: Label::new(meta.period),
    })
}

/// Load every tokenized document under `root`. Documents that violate the
/// input contract are dropped and reported; the rest of the corpus is kept.
pub fn load_documents(root: &Path) -> (Vec<Document>, Vec<FailedFile>) {
    let mut docs = Vec::new();
    let mut failed = Vec::new();
    for path in collect_token_files(root) {
        match load_document(&path) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                failed.push(FailedFile {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (docs, failed)
}

/// Build all four tables from a grouped corpus.
///
/// Groups are independent, so the per-group tables are computed in parallel;
/// TF-IDF runs once every period document is materialized, since document
/// frequency cuts across periods. Each table is then put into its canonical
/// order.
pub fn build_tables(corpus: &GroupedCorpus, opts: &AnalysisOptions) -> TableSet {
    let per_group: Vec<analyze::GroupTables> = corpus
        .by_group
        .par_iter()
        .map(|(key, docs)| analyze::analyze_group(key, docs, opts))
        .collect();

    let mut tables = TableSet::default();
    for group in per_group {
        tables.words.extend(group.words);
        tables.ngrams.extend(group.ngrams);
        tables.collocations.extend(group.collocations);
    }
    tables.tfidf = tfidf::rank_periods(&corpus.by_period);

    export::sort_tables(&mut tables);
    tables
}

/// One complete corpus pass: load, group, tabulate.
pub fn analyze_corpus(root: &Path, opts: &AnalysisOptions) -> Result<AnalysisReport, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::InvalidInput {
            path: root.display().to_string(),
            reason: "not a directory".into(),
        });
    }
    let (docs, failed_files) = load_documents(root);
    info!(
        "loaded {} documents ({} failed) from {}",
        docs.len(),
        failed_files.len(),
        root.display()
    );
    let corpus = group_documents(docs);
    let tables = build_tables(&corpus, opts);
    Ok(AnalysisReport {
        tables,
        failed_files,
    })
}

/// Print the documents dropped during loading to stderr.
pub fn print_failed_files(failed: &[FailedFile]) {
    eprintln!("The following documents could not be processed:");
    for f in failed {
        eprintln!("  {}: {}", f.path, f.reason);
    }
}
