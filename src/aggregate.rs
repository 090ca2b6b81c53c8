//! Cross-report aggregation: a pure fold over parsed coverage results.
//!
//! Counters sum field-wise and file lists concatenate in order; duplicate
//! paths across reports are preserved as separate entries, since flags or
//! split test runs legitimately upload the same file twice. Rates are
//! recomputed from the summed totals, never averaged across reports, so a
//! large file weighs more than a small one with the same rate.

use crate::model::{AggregatedCoverage, CoverageMetrics, CoverageResult};

/// Merge any number of parsed reports into one aggregated result.
/// An empty input yields an all-zero result with no files.
#[must_use]
pub fn aggregate(results: Vec<CoverageResult>) -> AggregatedCoverage {
    let mut metrics = CoverageMetrics::default();
    let mut files = Vec::new();

    for result in results {
        metrics.statements += result.metrics.statements;
        metrics.covered_statements += result.metrics.covered_statements;
        metrics.conditionals += result.metrics.conditionals;
        metrics.covered_conditionals += result.metrics.covered_conditionals;
        metrics.methods += result.metrics.methods;
        metrics.covered_methods += result.metrics.covered_methods;
        files.extend(result.files);
    }
    metrics.update_rates();

    AggregatedCoverage {
        metrics,
        files,
        ..Default::default()
    }
}
