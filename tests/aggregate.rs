//! Aggregation scenarios across real parser output.

use covcheck::aggregate::aggregate;
use covcheck::parsers::{lcov, gocover};

#[test]
fn lcov_two_files_aggregate_to_seventy_percent() {
    // 6 + 4 = 10 instrumentable lines, 3 + 4 = 7 hit.
    let input = "\
SF:/src/lib.rs
DA:1,5
DA:2,5
DA:3,0
DA:4,0
DA:6,2
DA:7,0
end_of_record
SF:/src/util.rs
DA:1,1
DA:2,1
DA:3,3
DA:4,2
end_of_record
";
    let result = aggregate(vec![lcov::parse(input).unwrap()]);
    assert_eq!(result.metrics.statements, 10);
    assert_eq!(result.metrics.covered_statements, 7);
    assert_eq!(result.metrics.line_rate, 70.0);
}

#[test]
fn aggregating_separate_reports_matches_single_upload() {
    let first = lcov::parse("SF:/src/lib.rs\nDA:1,5\nDA:2,0\nDA:3,1\nend_of_record\n").unwrap();
    let second = lcov::parse("SF:/src/util.rs\nDA:1,0\nDA:2,2\nend_of_record\n").unwrap();

    let result = aggregate(vec![first.clone(), second.clone()]);

    assert_eq!(
        result.metrics.statements,
        first.metrics.statements + second.metrics.statements
    );
    assert_eq!(
        result.metrics.covered_statements,
        first.metrics.covered_statements + second.metrics.covered_statements
    );
    assert_eq!(result.files.len(), 2);
    assert_eq!(result.files[0].path, "/src/lib.rs");
    assert_eq!(result.files[1].path, "/src/util.rs");
    // 3 of 5 lines hit.
    assert_eq!(result.metrics.line_rate, 60.0);
}

#[test]
fn aggregation_spans_formats() {
    let lcov_report = lcov::parse("SF:/src/lib.rs\nDA:1,1\nDA:2,0\nend_of_record\n").unwrap();
    let go_report = gocover::parse("mode: set\nexample.com/pkg/f.go:1.1,2.2 2 1\n").unwrap();

    let result = aggregate(vec![lcov_report, go_report]);
    assert_eq!(result.files.len(), 2);
    // 1/2 from lcov + 2/2 from go = 3/4.
    assert_eq!(result.metrics.statements, 4);
    assert_eq!(result.metrics.covered_statements, 3);
    assert_eq!(result.metrics.line_rate, 75.0);
}

#[test]
fn empty_aggregate_is_not_an_error() {
    let result = aggregate(vec![]);
    assert_eq!(result.metrics.statements, 0);
    assert_eq!(result.metrics.line_rate, 0.0);
    assert_eq!(result.metrics.branch_rate, 0.0);
    assert!(result.files.is_empty());
}
