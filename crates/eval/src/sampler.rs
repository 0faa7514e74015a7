//! Reproducible stratified sampling by subject.

use gauge_core::SourceRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};

/// Descriptions must be longer than this (trimmed) to be usable.
pub const MIN_DESCRIPTION_CHARS: usize = 10;
/// Every stratum gets at least this many records, budget permitting.
pub const MIN_PER_STRATUM: usize = 5;

pub fn is_usable(record: &SourceRecord) -> bool {
    record.description.trim().chars().count() > MIN_DESCRIPTION_CHARS
}

/// Select `min(n, usable)` records, stratified by subject. All randomness
/// comes from `seed`; the same inputs always yield the same output.
pub fn stratified_sample(corpus: &[SourceRecord], n: usize, seed: u64) -> Vec<SourceRecord> {
    let mut rng = StdRng::seed_from_u64(seed);

    let usable: Vec<usize> = (0..corpus.len())
        .filter(|&i| is_usable(&corpus[i]))
        .collect();
    if n == 0 || usable.is_empty() {
        return Vec::new();
    }

    let mut strata: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &i in &usable {
        strata.entry(corpus[i].subject.as_str()).or_default().push(i);
    }
    // Largest first; equal sizes keep alphabetical order (stable sort).
    let mut ordered: Vec<(&str, Vec<usize>)> = strata.into_iter().collect();
    ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let total = usable.len();
    let mut remaining = n;
    let mut selected: Vec<usize> = Vec::with_capacity(n.min(total));

    for (_, pool) in &ordered {
        let proportional = n * pool.len() / total;
        let alloc = proportional
            .max(MIN_PER_STRATUM)
            .min(remaining)
            .min(pool.len());
        if alloc == 0 {
            continue;
        }
        selected.extend(pool.choose_multiple(&mut rng, alloc).copied());
        remaining -= alloc;
        if remaining == 0 {
            break;
        }
    }

    if remaining > 0 {
        let taken: BTreeSet<usize> = selected.iter().copied().collect();
        let rest: Vec<usize> = usable
            .iter()
            .copied()
            .filter(|i| !taken.contains(i))
            .collect();
        let extra = remaining.min(rest.len());
        selected.extend(rest.choose_multiple(&mut rng, extra).copied());
    }

    selected.shuffle(&mut rng);
    selected.truncate(n);
    selected.into_iter().map(|i| corpus[i].clone()).collect()
}

/// Subject → count, for previews and reports.
pub fn subject_histogram(records: &[SourceRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.subject.clone()).or_insert(0) += 1;
    }
    counts
}
