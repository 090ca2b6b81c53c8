//! Patch coverage: intersect a diff's added lines with aggregated per-line
//! coverage data.
//!
//! Matching is deliberately strict: diff destination paths must equal the
//! parser-reported coverage paths string-for-string, and line numbers must
//! refer to the new file's numbering. A diff file with no coverage entry
//! (a new file with no data yet, or a path-format mismatch) silently
//! contributes zero lines. Added lines absent from the per-line map are not
//! instrumentable (comments, blank lines, braces) and stay out of every
//! count.

use std::collections::HashMap;

use crate::diff::DiffFile;
use crate::model::{round2, AggregatedCoverage, PatchCoverage, PatchFileCoverage};

/// Compute patch coverage for the given diff against aggregated results.
#[must_use]
pub fn analyze(diff_files: &[DiffFile], coverage: &AggregatedCoverage) -> PatchCoverage {
    // Per-line hit index keyed by exact reported path. Duplicate same-path
    // entries (flag-split uploads) merge by max hit count, so a line covered
    // in any run counts as covered.
    let mut line_index: HashMap<&str, HashMap<u32, u64>> = HashMap::new();
    for file in &coverage.files {
        let entry = line_index.entry(file.path.as_str()).or_default();
        for line in &file.lines {
            let slot = entry.entry(line.line_number).or_insert(0);
            *slot = (*slot).max(line.hit_count);
        }
    }

    let mut patch = PatchCoverage::default();

    for diff_file in diff_files {
        patch.changed_files.push(diff_file.path.clone());

        let Some(lines) = line_index.get(diff_file.path.as_str()) else {
            continue;
        };

        let mut detail = PatchFileCoverage {
            path: diff_file.path.clone(),
            ..Default::default()
        };
        for &line_number in &diff_file.added_lines {
            match lines.get(&line_number) {
                Some(&hits) if hits > 0 => detail.covered_lines.push(line_number),
                Some(_) => detail.missed_lines.push(line_number),
                None => {} // not instrumentable
            }
        }

        let covered = detail.covered_lines.len() as u64;
        let missed = detail.missed_lines.len() as u64;
        detail.percentage = percentage(covered, covered + missed);
        patch.covered_lines += covered;
        patch.missed_lines += missed;
        patch.files.push(detail);
    }

    patch.total_lines = patch.covered_lines + patch.missed_lines;
    patch.percentage = percentage(patch.covered_lines, patch.total_lines);
    patch
}

/// Record a patch analysis on the aggregated results it was computed from.
pub fn annotate(results: &mut AggregatedCoverage, patch: &PatchCoverage) {
    results.patch_rate = Some(patch.percentage);
    results.total_misses = Some(patch.missed_lines);
}

/// Patch percentage: 100 by convention when there were no trackable lines.
/// Nothing to cover is distinct from zero coverage.
fn percentage(covered: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        round2(covered as f64 / total as f64 * 100.0)
    }
}
