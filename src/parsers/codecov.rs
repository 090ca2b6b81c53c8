/// Parser for the Codecov custom JSON format.
///
/// Format:
///   { "coverage": { "<path>": { "<line>": <value>, ... }, ... } }
///
/// where each line value is one of:
///   - an integer hit count
///   - a string "covered/total" branch indicator, e.g. "1/2"
///   - null for non-executable lines (comments, blank lines)
///
/// Null lines are skipped entirely: they must not appear in statement
/// totals at all, not even as count 0. A branch-indicator line also counts
/// once as a statement, covered iff covered > 0; with covered < total it is
/// additionally a partial line. An unparseable branch string degrades to a
/// missed statement with no branch data (minor toolchain differences in
/// formatting are expected). Methods are never tracked by this format.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{parse_err, sniff_head, CoverageParser, Format};
use crate::error::{CovcheckError, Result};
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage};

/// Pre-compiled regex for "covered/total" branch indicators.
static FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)$").unwrap());

/// Codecov custom JSON parser.
pub struct CodecovParser;

impl CoverageParser for CodecovParser {
    fn format(&self) -> Format {
        Format::Codecov
    }

    fn can_parse(&self, content: &str, path_hint: Option<&std::path::Path>) -> bool {
        if let Some(name) = path_hint
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            if name.eq_ignore_ascii_case("codecov.json") {
                return true;
            }
        }

        let head = sniff_head(content);
        let trimmed = head.trim_start();
        // A "coverage" key also shows up in unrelated JSON; excluding the
        // Istanbul markers keeps the signatures mutually exclusive.
        trimmed.starts_with('{')
            && trimmed.contains("\"coverage\"")
            && !trimmed.contains("\"statementMap\"")
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// Parse Codecov custom JSON coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let root: Value = serde_json::from_str(content).map_err(|source| CovcheckError::Json {
        format: Format::Codecov,
        source,
    })?;

    let Some(coverage) = root.get("coverage").and_then(|v| v.as_object()) else {
        return Err(parse_err(
            Format::Codecov,
            "missing top-level \"coverage\" object",
        ));
    };

    let mut files = Vec::with_capacity(coverage.len());
    for (path, line_map) in coverage {
        let Some(line_map) = line_map.as_object() else {
            continue;
        };

        let mut file = FileCoverage::new(path);
        for (line_str, value) in line_map {
            let Ok(line_number) = line_str.parse::<u32>() else {
                continue;
            };
            if let Some(line) = parse_line_value(line_number, value) {
                file.lines.push(line);
            }
        }
        file.tally_counters();
        file.finalize();
        files.push(file);
    }

    let metrics = CoverageMetrics::from_files(&files);
    Ok(CoverageResult { metrics, files })
}

/// Interpret one line value; `None` means the line is non-executable.
fn parse_line_value(line_number: u32, value: &Value) -> Option<LineCoverage> {
    match value {
        Value::Null => None,
        Value::Number(n) => {
            let count = n.as_u64().unwrap_or(0);
            Some(LineCoverage::stmt(line_number, count))
        }
        Value::String(s) => match FRACTION_RE.captures(s) {
            Some(caps) => {
                let covered: u32 = caps[1].parse().ok()?;
                let total: u32 = caps[2].parse().ok()?;
                Some(LineCoverage::cond(
                    line_number,
                    u64::from(covered),
                    covered,
                    total,
                ))
            }
            // Unrecognized string shape: a missed statement, no branch data.
            None => Some(LineCoverage::stmt(line_number, 0)),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineKind;

    #[test]
    fn test_parse_codecov() {
        let input = include_str!("../../tests/fixtures/sample_codecov.json");
        let result = parse(input).unwrap();

        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.path, "src/app.py");

        // Line 5 is null → excluded entirely.
        assert_eq!(file.lines.len(), 5);
        assert!(file.lines.iter().all(|l| l.line_number != 5));

        assert_eq!(file.statements, 5);
        assert_eq!(file.covered_statements, 3); // lines 1, 2, 6
        assert_eq!(file.conditionals, 8); // 2 + 3 + 3
        assert_eq!(file.covered_conditionals, 4); // 1 + 0 + 3
        assert_eq!(file.methods, 0);
        assert_eq!(file.missing_lines, vec![3, 4]);
        assert_eq!(file.partial_lines, vec![2]);

        let branch = file.lines.iter().find(|l| l.line_number == 2).unwrap();
        assert_eq!(branch.kind, LineKind::Conditional);
        assert_eq!(branch.hit_count, 1);
        assert_eq!(branch.branches_covered, 1);
        assert_eq!(branch.branches_total, 2);

        assert_eq!(result.metrics.line_rate, 60.0);
        assert_eq!(result.metrics.branch_rate, 50.0);
    }

    #[test]
    fn test_parse_codecov_unparseable_branch_string() {
        let input = r#"{"coverage": {"a.py": {"1": "huh?", "2": 3}}}"#;
        let result = parse(input).unwrap();
        let file = &result.files[0];
        // "huh?" → missed statement, no branch data.
        assert_eq!(file.statements, 2);
        assert_eq!(file.covered_statements, 1);
        assert_eq!(file.conditionals, 0);
        assert_eq!(file.missing_lines, vec![1]);
    }

    #[test]
    fn test_parse_codecov_missing_coverage_key() {
        let result = parse(r#"{"files": {}}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("codecov"), "{err}");
        assert!(err.contains("coverage"), "{err}");
    }

    #[test]
    fn test_parse_codecov_invalid_json() {
        let result = parse("{nope");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("codecov"), "{err}");
    }

    #[test]
    fn test_parse_codecov_empty_coverage() {
        let result = parse(r#"{"coverage": {}}"#).unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.metrics.line_rate, 0.0);
    }

    #[test]
    fn test_can_parse_codecov() {
        let parser = CodecovParser;
        assert!(parser.can_parse(r#"{"coverage": {"a.py": {"1": 1}}}"#, None));
        assert!(parser.can_parse("", Some(std::path::Path::new("codecov.json"))));
        // Istanbul must not match.
        assert!(!parser.can_parse(
            r#"{"/src/lib.js": {"statementMap": {}, "fnMap": {}, "coverage": 1}}"#,
            None
        ));
        assert!(!parser.can_parse("SF:/src/lib.rs\nDA:1,1\n", None));
    }
}
