//! Compare a "current" aggregated result against a "base" snapshot.
//!
//! A pure function of its two inputs: rate deltas plus path-set differences.
//! The base snapshot comes from an external collaborator (a stored artifact)
//! and is never mutated here.

use std::collections::{HashMap, HashSet};

use crate::model::{round2, AggregatedCoverage, CoverageComparison};

/// Compute deltas and added/removed/changed file sets.
#[must_use]
pub fn compare(base: &AggregatedCoverage, current: &AggregatedCoverage) -> CoverageComparison {
    let base_files = file_stats(base);
    let current_files = file_stats(current);

    let mut files_added = Vec::new();
    let mut files_changed = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for file in &current.files {
        if !seen.insert(file.path.as_str()) {
            continue;
        }
        match base_files.get(file.path.as_str()) {
            None => files_added.push(file.path.clone()),
            Some(&base_stats) => {
                let current_stats = current_files[file.path.as_str()];
                if base_stats != current_stats {
                    files_changed.push(file.path.clone());
                }
            }
        }
    }

    let mut files_removed = Vec::new();
    seen.clear();
    for file in &base.files {
        if seen.insert(file.path.as_str()) && !current_files.contains_key(file.path.as_str()) {
            files_removed.push(file.path.clone());
        }
    }

    let delta_line_rate = round2(current.metrics.line_rate - base.metrics.line_rate);
    let delta_branch_rate = round2(current.metrics.branch_rate - base.metrics.branch_rate);

    CoverageComparison {
        delta_line_rate,
        delta_branch_rate,
        files_added,
        files_removed,
        files_changed,
        improvement: delta_line_rate >= 0.0,
    }
}

/// Per-path (statement count, line rate) pairs, first occurrence winning.
/// A file counts as "changed" when either differs between base and current.
fn file_stats(results: &AggregatedCoverage) -> HashMap<&str, (u64, f64)> {
    let mut stats = HashMap::new();
    for file in &results.files {
        stats
            .entry(file.path.as_str())
            .or_insert((file.statements, file.line_rate));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{CoverageResult, FileCoverage, LineCoverage};

    fn result_with(files: &[(&str, &[u64])]) -> AggregatedCoverage {
        let files = files
            .iter()
            .map(|&(path, hits)| {
                let mut file = FileCoverage::new(path);
                file.lines = hits
                    .iter()
                    .enumerate()
                    .map(|(i, &h)| LineCoverage::stmt(i as u32 + 1, h))
                    .collect();
                file.tally_counters();
                file.finalize();
                file
            })
            .collect();
        aggregate(vec![CoverageResult::from_files(files)])
    }

    #[test]
    fn test_compare_deltas() {
        let base = result_with(&[("a.rs", &[1, 0])]); // 50%
        let current = result_with(&[("a.rs", &[1, 1])]); // 100%

        let comparison = compare(&base, &current);
        assert_eq!(comparison.delta_line_rate, 50.0);
        assert!(comparison.improvement);
        assert_eq!(comparison.files_changed, vec!["a.rs"]);
        assert!(comparison.files_added.is_empty());
        assert!(comparison.files_removed.is_empty());
    }

    #[test]
    fn test_compare_regression() {
        let base = result_with(&[("a.rs", &[1, 1])]);
        let current = result_with(&[("a.rs", &[1, 0])]);

        let comparison = compare(&base, &current);
        assert_eq!(comparison.delta_line_rate, -50.0);
        assert!(!comparison.improvement);
    }

    #[test]
    fn test_compare_zero_delta_is_improvement() {
        let base = result_with(&[("a.rs", &[1, 0])]);
        let current = result_with(&[("a.rs", &[1, 0])]);

        let comparison = compare(&base, &current);
        assert_eq!(comparison.delta_line_rate, 0.0);
        assert!(comparison.improvement);
        assert!(comparison.files_changed.is_empty());
    }

    #[test]
    fn test_compare_file_sets() {
        let base = result_with(&[("a.rs", &[1]), ("b.rs", &[1])]);
        let current = result_with(&[("b.rs", &[1]), ("c.rs", &[1])]);

        let comparison = compare(&base, &current);
        assert_eq!(comparison.files_added, vec!["c.rs"]);
        assert_eq!(comparison.files_removed, vec!["a.rs"]);
        assert!(comparison.files_changed.is_empty());
    }

    #[test]
    fn test_compare_changed_on_statement_count() {
        // Same rate, different size: still changed.
        let base = result_with(&[("a.rs", &[1, 0])]); // 1/2
        let current = result_with(&[("a.rs", &[1, 1, 0, 0])]); // 2/4

        let comparison = compare(&base, &current);
        assert_eq!(comparison.files_changed, vec!["a.rs"]);
    }

    #[test]
    fn test_compare_does_not_mutate_inputs() {
        let base = result_with(&[("a.rs", &[1])]);
        let current = result_with(&[("a.rs", &[0])]);
        let base_rate = base.metrics.line_rate;
        let _ = compare(&base, &current);
        assert_eq!(base.metrics.line_rate, base_rate);
        assert!(base.comparison.is_none());
    }
}
