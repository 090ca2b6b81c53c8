//! Uniform in-memory representation of coverage data, independent of any
//! specific report format. Parsers produce a `CoverageResult` which is then
//! aggregated, intersected with a diff, compared against a baseline, and
//! checked against thresholds.

use serde::{Deserialize, Serialize};

/// Compute a coverage rate as a percentage rounded to two decimals.
/// Returns 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(covered as f64 / total as f64 * 100.0)
    }
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// What kind of instrumentable construct a line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Statement,
    Conditional,
    Method,
}

/// A single instrumentable line.
///
/// `hit_count` is the overall hit indicator for the line regardless of kind.
/// Conditional lines additionally carry a covered/total branch-arm pair used
/// for branch-rate math and partial-line detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineCoverage {
    pub line_number: u32,
    pub hit_count: u64,
    pub kind: LineKind,
    #[serde(default)]
    pub branches_covered: u32,
    #[serde(default)]
    pub branches_total: u32,
}

impl LineCoverage {
    pub fn stmt(line_number: u32, hit_count: u64) -> Self {
        Self {
            line_number,
            hit_count,
            kind: LineKind::Statement,
            branches_covered: 0,
            branches_total: 0,
        }
    }

    pub fn cond(line_number: u32, hit_count: u64, branches_covered: u32, branches_total: u32) -> Self {
        Self {
            line_number,
            hit_count,
            kind: LineKind::Conditional,
            branches_covered,
            branches_total,
        }
    }

    pub fn method(line_number: u32, hit_count: u64) -> Self {
        Self {
            line_number,
            hit_count,
            kind: LineKind::Method,
            branches_covered: 0,
            branches_total: 0,
        }
    }
}

/// Coverage data for a single source file.
///
/// `path` is whatever the parser reported: absolute for some formats,
/// repo-relative or package-qualified for others. Nothing downstream
/// normalizes it; patch matching is exact-string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCoverage {
    pub name: String,
    pub path: String,
    pub statements: u64,
    pub covered_statements: u64,
    pub conditionals: u64,
    pub covered_conditionals: u64,
    pub methods: u64,
    pub covered_methods: u64,
    pub line_rate: f64,
    pub branch_rate: f64,
    pub lines: Vec<LineCoverage>,
    pub missing_lines: Vec<u32>,
    pub partial_lines: Vec<u32>,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: basename(&path).to_string(),
            path,
            ..Default::default()
        }
    }

    /// Sum the six counters from the collected lines. Statement and
    /// conditional lines feed the statement counters; branch-arm pairs feed
    /// the conditional counters; method lines feed the method counters.
    ///
    /// Formats with authoritative file-scope totals (LCOV summary records,
    /// JaCoCo sourcefile counters, Clover metrics) skip this and set the
    /// counters directly.
    pub fn tally_counters(&mut self) {
        self.statements = 0;
        self.covered_statements = 0;
        self.conditionals = 0;
        self.covered_conditionals = 0;
        self.methods = 0;
        self.covered_methods = 0;

        for line in &self.lines {
            match line.kind {
                LineKind::Statement | LineKind::Conditional => {
                    self.statements += 1;
                    if line.hit_count > 0 {
                        self.covered_statements += 1;
                    }
                }
                LineKind::Method => {
                    self.methods += 1;
                    if line.hit_count > 0 {
                        self.covered_methods += 1;
                    }
                }
            }
            self.conditionals += u64::from(line.branches_total);
            self.covered_conditionals += u64::from(line.branches_covered);
        }
    }

    /// Recompute rates and the derived missing/partial line lists from the
    /// current counters and lines. Call once the counters are final.
    pub fn finalize(&mut self) {
        self.lines.sort_by_key(|l| l.line_number);
        self.line_rate = rate(self.covered_statements, self.statements);
        self.branch_rate = rate(self.covered_conditionals, self.conditionals);

        self.missing_lines = self
            .lines
            .iter()
            .filter(|l| l.hit_count == 0)
            .map(|l| l.line_number)
            .collect();
        self.partial_lines = self
            .lines
            .iter()
            .filter(|l| l.branches_covered > 0 && l.branches_covered < l.branches_total)
            .map(|l| l.line_number)
            .collect();
    }
}

/// Return the final path component.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Summary counters and rates for one parsed report (or an aggregate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub statements: u64,
    pub covered_statements: u64,
    pub conditionals: u64,
    pub covered_conditionals: u64,
    pub methods: u64,
    pub covered_methods: u64,
    pub line_rate: f64,
    pub branch_rate: f64,
}

impl CoverageMetrics {
    /// Sum the counters of the given files and derive rates from the sums.
    #[must_use]
    pub fn from_files(files: &[FileCoverage]) -> Self {
        let mut metrics = Self::default();
        for file in files {
            metrics.statements += file.statements;
            metrics.covered_statements += file.covered_statements;
            metrics.conditionals += file.conditionals;
            metrics.covered_conditionals += file.covered_conditionals;
            metrics.methods += file.methods;
            metrics.covered_methods += file.covered_methods;
        }
        metrics.update_rates();
        metrics
    }

    /// Recompute both rates from the counters.
    pub fn update_rates(&mut self) {
        self.line_rate = rate(self.covered_statements, self.statements);
        self.branch_rate = rate(self.covered_conditionals, self.conditionals);
    }
}

/// The complete result of parsing a single coverage report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageResult {
    pub metrics: CoverageMetrics,
    pub files: Vec<FileCoverage>,
}

impl CoverageResult {
    /// Build a result whose metrics are the sum of the file counters.
    /// Formats with authoritative report-scope totals (JaCoCo) construct
    /// the metrics themselves instead.
    #[must_use]
    pub fn from_files(files: Vec<FileCoverage>) -> Self {
        let metrics = CoverageMetrics::from_files(&files);
        Self { metrics, files }
    }
}

/// Cross-report totals plus everything later stages attach to them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedCoverage {
    pub metrics: CoverageMetrics,
    pub files: Vec<FileCoverage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<CoverageComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_misses: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Differences between a base and a current aggregated result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageComparison {
    pub delta_line_rate: f64,
    pub delta_branch_rate: f64,
    pub files_added: Vec<String>,
    pub files_removed: Vec<String>,
    pub files_changed: Vec<String>,
    pub improvement: bool,
}

/// Coverage restricted to the lines a diff added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchCoverage {
    pub covered_lines: u64,
    pub missed_lines: u64,
    pub total_lines: u64,
    pub percentage: f64,
    pub files: Vec<PatchFileCoverage>,
    pub changed_files: Vec<String>,
}

/// Per-file patch coverage detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchFileCoverage {
    pub path: String,
    pub covered_lines: Vec<u32>,
    pub missed_lines: Vec<u32>,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_zero_total() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);
    }

    #[test]
    fn test_rate_rounds_two_decimals() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(2, 3), 66.67);
        assert_eq!(rate(7, 10), 70.0);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/home/user/src/main.py"), "main.py");
        assert_eq!(basename("src/lib.rs"), "lib.rs");
        assert_eq!(basename("lib.rs"), "lib.rs");
        assert_eq!(basename("com\\example\\Foo.java"), "Foo.java");
    }

    #[test]
    fn test_tally_counters() {
        let mut file = FileCoverage::new("/src/lib.rs");
        file.lines = vec![
            LineCoverage::stmt(1, 5),
            LineCoverage::stmt(2, 0),
            LineCoverage::cond(3, 2, 1, 2),
            LineCoverage::method(4, 1),
        ];
        file.tally_counters();
        file.finalize();

        assert_eq!(file.statements, 3); // stmt + stmt + cond
        assert_eq!(file.covered_statements, 2);
        assert_eq!(file.conditionals, 2);
        assert_eq!(file.covered_conditionals, 1);
        assert_eq!(file.methods, 1);
        assert_eq!(file.covered_methods, 1);
        assert!(file.covered_statements <= file.statements);
        assert_eq!(file.line_rate, 66.67);
        assert_eq!(file.branch_rate, 50.0);
        assert_eq!(file.missing_lines, vec![2]);
        assert_eq!(file.partial_lines, vec![3]);
    }

    #[test]
    fn test_finalize_empty_file_is_all_zero() {
        let mut file = FileCoverage::new("empty.rs");
        file.tally_counters();
        file.finalize();
        assert_eq!(file.line_rate, 0.0);
        assert_eq!(file.branch_rate, 0.0);
        assert!(file.missing_lines.is_empty());
        assert!(file.partial_lines.is_empty());
    }

    #[test]
    fn test_partial_requires_some_taken() {
        let mut file = FileCoverage::new("branch.rs");
        file.lines = vec![
            LineCoverage::cond(1, 0, 0, 3), // none taken → missing, not partial
            LineCoverage::cond(2, 1, 1, 2), // some taken → partial
            LineCoverage::cond(3, 3, 3, 3), // all taken → neither
        ];
        file.tally_counters();
        file.finalize();
        assert_eq!(file.missing_lines, vec![1]);
        assert_eq!(file.partial_lines, vec![2]);
    }

    #[test]
    fn test_metrics_from_files_sums_counters() {
        let mut a = FileCoverage::new("a.rs");
        a.lines = vec![LineCoverage::stmt(1, 1), LineCoverage::stmt(2, 0)];
        a.tally_counters();
        a.finalize();

        let mut b = FileCoverage::new("b.rs");
        b.lines = vec![LineCoverage::stmt(1, 1)];
        b.tally_counters();
        b.finalize();

        let metrics = CoverageMetrics::from_files(&[a, b]);
        assert_eq!(metrics.statements, 3);
        assert_eq!(metrics.covered_statements, 2);
        assert_eq!(metrics.line_rate, 66.67);
        assert_eq!(metrics.branch_rate, 0.0);
    }
}
