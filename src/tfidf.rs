//! TF-IDF salience ranking across period documents.
//!
//! One "period document" exists per distinct period: the merged token
//! sequence of every source and document sharing that period. Candidate terms
//! are the unigrams and bigrams of that merged sequence. Weighting uses the
//! smoothed inverse document frequency
//! `idf(t) = ln((1 + P) / (1 + df(t))) + 1` with `P` periods, followed by L2
//! normalization of each period's weight vector so weights are comparable
//! across periods of differing length.

use std::collections::{BTreeMap, HashMap};

use crate::{Label, TermWeightRecord};

/// Terms kept per period, by descending weight.
pub const TOP_K: usize = 200;

/// A term must appear in at least this many distinct periods to be ranked;
/// one-off artifacts would otherwise dominate.
pub const MIN_DF: usize = 2;

/// Raw counts of the candidate terms (unigrams and bigrams) of one period
/// document. Bigrams are taken over the merged sequence.
fn candidate_counts(tokens: &[String]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    for window in tokens.windows(2) {
        *counts.entry(window.join(" ")).or_insert(0) += 1;
    }
    counts
}

/// Rank the top-weighted terms of every period document.
///
/// Within a period, ties in weight break by lexicographic term order, so the
/// output is fully determined by the input. With fewer than two periods no
/// term can reach [`MIN_DF`] and the table is empty.
pub fn rank_periods(by_period: &BTreeMap<Label, Vec<String>>) -> Vec<TermWeightRecord> {
    let period_counts: Vec<(&Label, HashMap<String, u64>)> = by_period
        .iter()
        .map(|(period, tokens)| (period, candidate_counts(tokens)))
        .collect();
    let total_periods = period_counts.len();

    let mut df: HashMap<&str, usize> = HashMap::new();
    for (_, counts) in &period_counts {
        for term in counts.keys() {
            *df.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let mut rows = Vec::new();
    for (period, counts) in &period_counts {
        let mut weights: Vec<(&str, f64)> = counts
            .iter()
            .filter(|(term, _)| df[term.as_str()] >= MIN_DF)
            .map(|(term, &tf)| {
                let idf = ((1 + total_periods) as f64 / (1 + df[term.as_str()]) as f64).ln() + 1.0;
                (term.as_str(), tf as f64 * idf)
            })
            .collect();

        // L2 normalization over the df-filtered vocabulary of this period
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut weights {
                *w /= norm;
            }
        }

        weights.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (term, weight) in weights.into_iter().take(TOP_K) {
            rows.push(TermWeightRecord {
                period: (*period).clone(),
                term: term.to_string(),
                weight,
            });
        }
    }
    rows
}
