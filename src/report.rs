//! Plain-text rendering of results for the CLI.

use std::fmt::Write;

use crate::model::{AggregatedCoverage, CoverageComparison, PatchCoverage};
use crate::status::StatusCheckResult;

/// Render the aggregate totals.
#[must_use]
pub fn summary_text(results: &AggregatedCoverage) -> String {
    let metrics = &results.metrics;
    let mut out = String::new();

    if let Some(name) = &results.name {
        writeln!(out, "Report:     {name}").unwrap();
    }
    if let Some(flags) = &results.flags {
        if !flags.is_empty() {
            writeln!(out, "Flags:      {}", flags.join(", ")).unwrap();
        }
    }
    writeln!(out, "Files:      {}", results.files.len()).unwrap();
    writeln!(
        out,
        "Lines:      {}/{} ({:.2}%)",
        metrics.covered_statements, metrics.statements, metrics.line_rate
    )
    .unwrap();
    if metrics.conditionals > 0 {
        writeln!(
            out,
            "Branches:   {}/{} ({:.2}%)",
            metrics.covered_conditionals, metrics.conditionals, metrics.branch_rate
        )
        .unwrap();
    }
    if metrics.methods > 0 {
        writeln!(
            out,
            "Methods:    {}/{}",
            metrics.covered_methods, metrics.methods
        )
        .unwrap();
    }
    out
}

/// Render the base comparison.
#[must_use]
pub fn comparison_text(comparison: &CoverageComparison) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Vs base:    {:+.2}% lines, {:+.2}% branches",
        comparison.delta_line_rate, comparison.delta_branch_rate
    )
    .unwrap();
    if !comparison.files_added.is_empty() {
        writeln!(out, "  added:    {}", comparison.files_added.join(", ")).unwrap();
    }
    if !comparison.files_removed.is_empty() {
        writeln!(out, "  removed:  {}", comparison.files_removed.join(", ")).unwrap();
    }
    if !comparison.files_changed.is_empty() {
        writeln!(out, "  changed:  {}", comparison.files_changed.join(", ")).unwrap();
    }
    out
}

/// Render patch coverage with per-file missed-line ranges.
#[must_use]
pub fn patch_text(patch: &PatchCoverage) -> String {
    let mut out = String::new();

    if patch.total_lines == 0 {
        writeln!(
            out,
            "Patch:      no instrumentable lines in diff ({} files changed)",
            patch.changed_files.len()
        )
        .unwrap();
        return out;
    }

    writeln!(
        out,
        "Patch:      {}/{} changed lines covered ({:.2}%)",
        patch.covered_lines, patch.total_lines, patch.percentage
    )
    .unwrap();

    let mut files_with_misses: Vec<_> = patch
        .files
        .iter()
        .filter(|f| !f.missed_lines.is_empty())
        .collect();
    files_with_misses.sort_by(|a, b| a.percentage.total_cmp(&b.percentage));
    for file in files_with_misses {
        writeln!(
            out,
            "  {}  {:.2}%  missed: {}",
            file.path,
            file.percentage,
            format_line_ranges(&file.missed_lines)
        )
        .unwrap();
    }
    out
}

/// Render one status check as a line.
#[must_use]
pub fn status_text(name: &str, result: &StatusCheckResult) -> String {
    let tag = if result.informational {
        " [informational]"
    } else {
        ""
    };
    format!(
        "{name:<8}{status}{tag} — {description}\n",
        status = result.status,
        description = result.description
    )
}

/// Format sorted line numbers into compact range notation, e.g. "1, 3-5, 8".
#[must_use]
pub fn format_line_ranges(lines: &[u32]) -> String {
    if lines.is_empty() {
        return String::new();
    }

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = lines[0];
    let mut end = lines[0];
    for &line in &lines[1..] {
        if line == end + 1 {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }
    ranges.push((start, end));

    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoverageMetrics, PatchFileCoverage};
    use crate::status::{CheckStatus, StatusCheckResult};

    #[test]
    fn test_format_line_ranges() {
        assert_eq!(format_line_ranges(&[]), "");
        assert_eq!(format_line_ranges(&[5]), "5");
        assert_eq!(format_line_ranges(&[1, 2, 3]), "1-3");
        assert_eq!(format_line_ranges(&[1, 3, 4, 5, 10]), "1, 3-5, 10");
    }

    #[test]
    fn test_summary_text() {
        let results = AggregatedCoverage {
            metrics: CoverageMetrics {
                statements: 10,
                covered_statements: 7,
                conditionals: 4,
                covered_conditionals: 2,
                methods: 2,
                covered_methods: 1,
                line_rate: 70.0,
                branch_rate: 50.0,
            },
            name: Some("nightly".to_string()),
            ..Default::default()
        };
        let out = summary_text(&results);
        assert!(out.contains("Report:     nightly"));
        assert!(out.contains("Lines:      7/10 (70.00%)"));
        assert!(out.contains("Branches:   2/4 (50.00%)"));
        assert!(out.contains("Methods:    1/2"));
    }

    #[test]
    fn test_summary_text_hides_empty_sections() {
        let out = summary_text(&AggregatedCoverage::default());
        assert!(out.contains("Lines:"));
        assert!(!out.contains("Branches:"));
        assert!(!out.contains("Methods:"));
    }

    #[test]
    fn test_patch_text_with_misses() {
        let patch = PatchCoverage {
            covered_lines: 3,
            missed_lines: 2,
            total_lines: 5,
            percentage: 60.0,
            files: vec![PatchFileCoverage {
                path: "src/foo.rs".to_string(),
                covered_lines: vec![1, 2, 3],
                missed_lines: vec![5, 6],
                percentage: 60.0,
            }],
            changed_files: vec!["src/foo.rs".to_string()],
        };
        let out = patch_text(&patch);
        assert!(out.contains("3/5 changed lines covered (60.00%)"));
        assert!(out.contains("src/foo.rs"));
        assert!(out.contains("5-6"));
    }

    #[test]
    fn test_patch_text_no_trackable_lines() {
        let patch = PatchCoverage {
            percentage: 100.0,
            changed_files: vec!["README.md".to_string()],
            ..Default::default()
        };
        let out = patch_text(&patch);
        assert!(out.contains("no instrumentable lines"));
    }

    #[test]
    fn test_status_text() {
        let result = StatusCheckResult {
            status: CheckStatus::Failure,
            description: "61.00% coverage (target 80.00%)".to_string(),
            informational: true,
        };
        let out = status_text("project", &result);
        assert!(out.contains("project"));
        assert!(out.contains("failure"));
        assert!(out.contains("[informational]"));
        assert!(out.contains("61.00%"));
    }
}
