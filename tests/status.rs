//! Threshold evaluation over real comparison and patch data.

use covcheck::aggregate::aggregate;
use covcheck::compare::compare;
use covcheck::config::{Config, FileConfig, Overrides};
use covcheck::parsers::lcov;
use covcheck::status::{patch_status, project_status, CheckStatus};
use covcheck::{diff, patch};

fn lcov_with_rate(covered: u32, total: u32) -> covcheck::model::AggregatedCoverage {
    let mut input = String::from("SF:src/lib.rs\n");
    for n in 1..=total {
        let hits = if n <= covered { 1 } else { 0 };
        input.push_str(&format!("DA:{n},{hits}\n"));
    }
    input.push_str("end_of_record\n");
    aggregate(vec![lcov::parse(&input).unwrap()])
}

#[test]
fn auto_target_with_five_point_tolerance() {
    // Config straight from its file shape: {target: "auto", threshold: 5}.
    let file = FileConfig::from_json(
        r#"{"status": {"project": {"target": "auto", "threshold": 5}}}"#,
    )
    .unwrap();
    let config = Config::resolve(Some(file), &Overrides::default());

    let base = lcov_with_rate(80, 100);

    // Current at 70%: a 10-point drop exceeds the 5-point tolerance.
    let mut current = lcov_with_rate(70, 100);
    current.comparison = Some(compare(&base, &current));
    let result = project_status(&current, &config.status.project);
    assert_eq!(result.status, CheckStatus::Failure);

    // Current at 79%: a 1-point drop is within tolerance.
    let mut current = lcov_with_rate(79, 100);
    current.comparison = Some(compare(&base, &current));
    let result = project_status(&current, &config.status.project);
    assert_eq!(result.status, CheckStatus::Success);

    // Exactly at the tolerance boundary: still a pass.
    let mut current = lcov_with_rate(75, 100);
    current.comparison = Some(compare(&base, &current));
    let result = project_status(&current, &config.status.project);
    assert_eq!(result.status, CheckStatus::Success);
}

#[test]
fn auto_target_without_base_always_succeeds() {
    let file = FileConfig::from_json(
        r#"{"status": {"project": {"target": "auto", "threshold": 5}}}"#,
    )
    .unwrap();
    let config = Config::resolve(Some(file), &Overrides::default());

    let current = lcov_with_rate(1, 100); // dreadful coverage, no baseline
    let result = project_status(&current, &config.status.project);
    assert_eq!(result.status, CheckStatus::Success);
    assert!(result.description.contains("no base report"));
}

#[test]
fn numeric_project_target_boundary_inclusive() {
    let file =
        FileConfig::from_json(r#"{"status": {"project": {"target": "70%"}}}"#).unwrap();
    let config = Config::resolve(Some(file), &Overrides::default());

    let current = lcov_with_rate(70, 100);
    assert_eq!(
        project_status(&current, &config.status.project).status,
        CheckStatus::Success
    );

    let current = lcov_with_rate(69, 100);
    assert_eq!(
        project_status(&current, &config.status.project).status,
        CheckStatus::Failure
    );
}

#[test]
fn patch_check_end_to_end() {
    let file = FileConfig::from_json(r#"{"status": {"patch": {"target": 75}}}"#).unwrap();
    let config = Config::resolve(Some(file), &Overrides::default());

    let coverage = aggregate(vec![lcov::parse(
        "SF:src/main.rs\nDA:1,1\nDA:2,1\nDA:3,1\nDA:4,0\nend_of_record\n",
    )
    .unwrap()]);
    let diff_files = diff::parse(
        "--- a/src/main.rs\n+++ b/src/main.rs\n@@ -0,0 +1,4 @@\n+a\n+b\n+c\n+d\n",
    );
    let patch_results = patch::analyze(&diff_files, &coverage);

    // 3 of 4 changed lines covered = 75%, target 75% → boundary pass.
    let result = patch_status(Some(&patch_results), &config.status.patch);
    assert_eq!(result.status, CheckStatus::Success);
}

#[test]
fn patch_check_without_diff_context_is_na() {
    let config = Config::resolve(None, &Overrides::default());
    let result = patch_status(None, &config.status.patch);
    assert_eq!(result.status, CheckStatus::Success);
    assert!(result.description.contains("N/A"));
}

#[test]
fn informational_config_never_flips_status() {
    let file = FileConfig::from_json(
        r#"{"status": {"project": {"target": 99, "informational": true}}}"#,
    )
    .unwrap();
    let config = Config::resolve(Some(file), &Overrides::default());

    let current = lcov_with_rate(10, 100);
    let result = project_status(&current, &config.status.project);
    assert_eq!(result.status, CheckStatus::Failure);
    assert!(result.informational);
    assert!(!result.is_blocking_failure());
}
