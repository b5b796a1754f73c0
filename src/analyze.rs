//! Per-group table builders: word frequencies, N-gram frequencies, and
//! adjacent-pair collocations scored with pointwise mutual information.
//!
//! A group is a set of token lists, one per member document. Counts are
//! summed across the documents of a group, but windows are taken within each
//! document's own sequence, so no N-gram spans a document boundary.

use std::collections::HashMap;

use crate::{AnalysisOptions, CollocationRecord, GroupKey, NGramCount, TermCount};

/// The per-group slices of the word, N-gram, and collocation tables.
#[derive(Debug, Default)]
pub struct GroupTables {
    pub words: Vec<TermCount>,
    pub ngrams: Vec<NGramCount>,
    pub collocations: Vec<CollocationRecord>,
}

/// Count each distinct token across all documents of a group.
pub fn count_tokens(docs: &[Vec<String>]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for doc in docs {
        for token in doc {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Count contiguous windows of length `n`, rendered space-joined, within each
/// document. A document shorter than `n` contributes nothing.
fn count_windows(docs: &[Vec<String>], n: usize) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for doc in docs {
        for window in doc.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}

/// Count ordered adjacent pairs within each document.
fn count_pairs(docs: &[Vec<String>]) -> HashMap<(String, String), u64> {
    let mut counts = HashMap::new();
    for doc in docs {
        for window in doc.windows(2) {
            *counts
                .entry((window[0].clone(), window[1].clone()))
                .or_insert(0) += 1;
        }
    }
    counts
}

/// Pointwise mutual information of an ordered pair, with the group's total
/// unigram token count as the denominator for the marginals and the joint
/// probability alike. Returns `None` when any probability would be zero.
///
/// # Example
/// ```
/// use corpus_tables::analyze::pmi;
/// // pair seen once among 6 tokens, marginal counts 2 and 1:
/// // log2((1/6) / ((2/6) * (1/6))) = log2(3)
/// let val = pmi(1, 2, 1, 6).unwrap();
/// assert!((val - 3.0_f64.log2()).abs() < 1e-12);
/// assert_eq!(pmi(1, 0, 1, 6), None);
/// ```
pub fn pmi(joint: u64, c1: u64, c2: u64, total: u64) -> Option<f64> {
    if joint == 0 || c1 == 0 || c2 == 0 || total == 0 {
        return None;
    }
    let t = total as f64;
    let pxy = joint as f64 / t;
    let px = c1 as f64 / t;
    let py = c2 as f64 / t;
    Some((pxy / (px * py)).log2())
}

/// Build all three per-group tables for one `(source, period)` group.
pub fn analyze_group(key: &GroupKey, docs: &[Vec<String>], opts: &AnalysisOptions) -> GroupTables {
    let total: u64 = docs.iter().map(|d| d.len() as u64).sum();
    let word_counts = count_tokens(docs);

    let mut tables = GroupTables::default();

    for (term, &count) in &word_counts {
        if count >= opts.min_count {
            tables.words.push(TermCount {
                source: key.source.clone(),
                period: key.period.clone(),
                term: term.clone(),
                count,
                group_total_tokens: total,
            });
        }
    }

    for n in 2..=opts.max_ngram {
        for (ngram, count) in count_windows(docs, n) {
            if count >= opts.min_count {
                tables.ngrams.push(NGramCount {
                    source: key.source.clone(),
                    period: key.period.clone(),
                    ngram,
                    n,
                    count,
                    group_total_tokens: total,
                });
            }
        }
    }

    // Marginals use the unfiltered unigram counts; min_count applies only to
    // the joint count of the emitted pair.
    for ((w1, w2), count) in count_pairs(docs) {
        if count < opts.min_count {
            continue;
        }
        let c1 = word_counts.get(&w1).copied().unwrap_or(0);
        let c2 = word_counts.get(&w2).copied().unwrap_or(0);
        if let Some(val) = pmi(count, c1, c2, total.max(1)) {
            tables.collocations.push(CollocationRecord {
                source: key.source.clone(),
                period: key.period.clone(),
                w1,
                w2,
                count,
                pmi: val,
            });
        }
    }

    tables
}
